//! Component build options.

use std::collections::BTreeSet;

use serde_yaml::Value;

use crate::Error;
use crate::yaml::emit::YamlWriter;
use crate::yaml::parse;

/// Options passed to the component build environment of a stream.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Buildopts {
    /// Extra RPM macros injected into every component build.
    pub rpm_macros: Option<String>,
    /// Binary RPM names allowed to be tagged into the buildroot.
    pub rpm_whitelist: BTreeSet<String>,
    /// Architectures the stream is built for.
    pub arches: BTreeSet<String>,
}

impl Buildopts {
    /// Returns true when no option is set.
    pub fn is_empty(&self) -> bool {
        self.rpm_macros.is_none() && self.rpm_whitelist.is_empty() && self.arches.is_empty()
    }

    /// Parses a `buildopts:` block.
    pub(crate) fn parse(value: &Value, path: &str, strict: bool) -> Result<Buildopts, Error> {
        let mut buildopts = Buildopts::default();
        for (raw_key, raw_value) in parse::mapping(value, path)? {
            let key = parse::key(raw_key, path)?;
            let key_path = parse::child(path, &key);
            match key.as_str() {
                "rpms" => {
                    for (raw_key, raw_value) in parse::mapping(raw_value, &key_path)? {
                        let key = parse::key(raw_key, &key_path)?;
                        let rpm_path = parse::child(&key_path, &key);
                        match key.as_str() {
                            "macros" => {
                                buildopts.rpm_macros =
                                    Some(parse::string(raw_value, &rpm_path)?);
                            }
                            "whitelist" => {
                                buildopts.rpm_whitelist =
                                    parse::string_set(raw_value, &rpm_path)?;
                            }
                            _ => parse::unknown_key(strict, &key_path, &key)?,
                        }
                    }
                }
                "arches" => buildopts.arches = parse::string_set(raw_value, &key_path)?,
                _ => parse::unknown_key(strict, path, &key)?,
            }
        }
        Ok(buildopts)
    }

    /// Emits a `buildopts:` block.
    pub(crate) fn emit(&self, writer: &mut YamlWriter) {
        writer.begin_map("buildopts");
        if self.rpm_macros.is_some() || !self.rpm_whitelist.is_empty() {
            writer.begin_map("rpms");
            if let Some(macros) = &self.rpm_macros {
                writer.entry("macros", macros);
            }
            if !self.rpm_whitelist.is_empty() {
                writer.string_seq("whitelist", self.rpm_whitelist.iter().map(String::as_str));
            }
            writer.end_map();
        }
        if !self.arches.is_empty() {
            writer.string_seq("arches", self.arches.iter().map(String::as_str));
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
    fn buildopts_parses_macros_and_whitelist() -> TestResult {
        let value: Value = serde_yaml::from_str(
            "rpms:\n  macros: |\n    %demomacro 1\n  whitelist: [fooscl-one]\narches: [x86_64]",
        )?;
        let buildopts = Buildopts::parse(&value, "data.buildopts", true)?;
        assert_eq!(buildopts.rpm_macros.as_deref(), Some("%demomacro 1\n"));
        assert_eq!(buildopts.rpm_whitelist.len(), 1);
        assert_eq!(buildopts.arches.len(), 1);
        Ok(())
    }

    #[rstest]
    fn buildopts_roundtrips_through_emitter() -> TestResult {
        let value: Value =
            serde_yaml::from_str("rpms:\n  macros: |\n    %demomacro 1\narches: [i686, x86_64]")?;
        let buildopts = Buildopts::parse(&value, "data.buildopts", true)?;
        let mut writer = YamlWriter::new();
        buildopts.emit(&mut writer);
        assert_eq!(
            writer.into_string(),
            "buildopts:\n  rpms:\n    macros: |\n      %demomacro 1\n  arches:\n  - i686\n  - x86_64\n"
        );
        Ok(())
    }
}
