//! Version 2 packager documents.

use serde_yaml::Value;

use crate::defaults::{Defaults, DefaultsV1};
use crate::module_stream::v2::ModuleStreamV2;
use crate::module_stream::ModuleStream;
use crate::Error;

/// A version 2 packager document.
///
/// The body schema is identical to a v2 module stream, with relaxed
/// requirements: name, stream and licenses are optional (a missing
/// module license defaults to MIT), and profiles may be marked as
/// default.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PackagerV2 {
    /// The underlying stream data.
    pub stream: ModuleStreamV2,
}

impl PackagerV2 {
    /// Parses the `data:` mapping of a v2 `modulemd-packager` document.
    pub(crate) fn parse(data: &Value, strict: bool) -> Result<PackagerV2, Error> {
        let mut stream = ModuleStreamV2::parse_with(data, strict, true)?;
        if stream.module_licenses.is_empty() {
            stream.module_licenses.insert("MIT".to_string());
        }
        Ok(PackagerV2 { stream })
    }

    /// Lowers the document to a stream v2 document, synthesizing a
    /// defaults document when profiles are marked as default.
    pub(crate) fn to_stream_v2(&self) -> Result<(ModuleStream, Option<Defaults>), Error> {
        let stream = self.stream.clone();
        let defaults = synthesize_defaults(
            stream.module_name.as_deref(),
            stream.stream_name.as_deref(),
            stream.profiles.values().filter_map(|profile| {
                profile.is_default.then_some(profile.name.as_str())
            }),
        );
        Ok((ModuleStream::V2(stream), defaults))
    }
}

/// Builds the defaults document implied by default-marked profiles.
pub(crate) fn synthesize_defaults<'a>(
    module_name: Option<&str>,
    stream_name: Option<&str>,
    default_profiles: impl Iterator<Item = &'a str>,
) -> Option<Defaults> {
    let profiles: Vec<&str> = default_profiles.collect();
    if profiles.is_empty() {
        return None;
    }
    let (Some(module_name), Some(stream_name)) = (module_name, stream_name) else {
        return None;
    };
    let mut defaults = DefaultsV1::new(module_name);
    defaults.profile_defaults.insert(
        stream_name.to_string(),
        profiles.into_iter().map(String::from).collect(),
    );
    Some(Defaults::V1(defaults))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use testresult::TestResult;

    use super::*;

    #[rstest]
    fn packager_v2_defaults_module_license() -> TestResult {
        let data: Value = serde_yaml::from_str(
            "name: foo\nstream: latest\nsummary: s\ndescription: d",
        )?;
        let packager = PackagerV2::parse(&data, true)?;
        assert!(packager.stream.module_licenses.contains("MIT"));
        Ok(())
    }

    #[rstest]
    fn packager_v2_synthesizes_defaults() -> TestResult {
        let data: Value = serde_yaml::from_str(
            r#"
name: foo
stream: latest
summary: s
description: d
profiles:
  minimal:
    rpms: [foo]
    default: true
"#,
        )?;
        let packager = PackagerV2::parse(&data, true)?;
        let (stream, defaults) = packager.to_stream_v2()?;
        assert_eq!(stream.mdversion().as_u64(), 2);
        let defaults = defaults.expect("default profile should synthesize defaults");
        assert_eq!(defaults.module_name(), Some("foo"));
        Ok(())
    }
}
