//! Installation profiles.

use std::collections::BTreeSet;

use serde_yaml::Value;

use crate::Error;
use crate::yaml::emit::YamlWriter;
use crate::yaml::parse;

/// A named subset of a stream's RPMs offered to end users as an
/// install preset.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Profile {
    /// The profile name.
    pub name: String,
    /// An optional description of what the profile installs.
    pub description: Option<String>,
    /// The binary RPM names installed by this profile.
    pub rpms: BTreeSet<String>,
    /// Whether this profile is marked as the default in a packager
    /// document.
    ///
    /// Only the packager authoring format carries this flag; module
    /// stream documents express default profiles through a separate
    /// defaults document.
    pub is_default: bool,
}

impl Profile {
    /// Creates an empty [`Profile`] with the given name.
    pub fn new(name: impl Into<String>) -> Profile {
        Profile {
            name: name.into(),
            ..Profile::default()
        }
    }

    /// Parses the body of one `profiles:` entry.
    ///
    /// The `default:` flag is only accepted when `packager` is set;
    /// stream documents treat it as an unknown attribute.
    pub(crate) fn parse(
        name: String,
        value: &Value,
        path: &str,
        strict: bool,
        packager: bool,
    ) -> Result<Profile, Error> {
        let mut profile = Profile::new(name);
        for (raw_key, raw_value) in parse::mapping(value, path)? {
            let key = parse::key(raw_key, path)?;
            let key_path = parse::child(path, &key);
            match key.as_str() {
                "description" => profile.description = Some(parse::string(raw_value, &key_path)?),
                "rpms" => profile.rpms = parse::string_set(raw_value, &key_path)?,
                "default" if packager => {
                    profile.is_default = parse::bool(raw_value, &key_path)?;
                }
                _ => parse::unknown_key(strict, path, &key)?,
            }
        }
        Ok(profile)
    }

    /// Emits this profile as one `profiles:` entry.
    pub(crate) fn emit(&self, writer: &mut YamlWriter) {
        writer.begin_map(&self.name);
        if let Some(description) = &self.description {
            writer.entry("description", description);
        }
        if !self.rpms.is_empty() {
            writer.string_seq("rpms", self.rpms.iter().map(String::as_str));
        }
        if self.is_default {
            writer.bool_entry("default", true);
        }
        writer.end_map();
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use testresult::TestResult;

    use super::*;

    #[rstest]
    fn profile_parses_description_and_rpms() -> TestResult {
        let value: Value = serde_yaml::from_str("description: Minimal\nrpms: [bar, bar-extras]")?;
        let profile = Profile::parse("minimal".to_string(), &value, "data.profiles.minimal", true, false)?;
        assert_eq!(profile.name, "minimal");
        assert_eq!(profile.description.as_deref(), Some("Minimal"));
        assert_eq!(profile.rpms.len(), 2);
        Ok(())
    }

    #[rstest]
    fn profile_default_flag_is_packager_only() -> TestResult {
        let value: Value = serde_yaml::from_str("default: true")?;
        assert!(Profile::parse("x".to_string(), &value, "p", true, false).is_err());
        let profile = Profile::parse("x".to_string(), &value, "p", true, true)?;
        assert!(profile.is_default);
        Ok(())
    }
}
