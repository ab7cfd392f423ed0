//! Service level windows.

use modulemd_types::EolDate;
use serde_yaml::Value;

use crate::Error;
use crate::yaml::emit::YamlWriter;
use crate::yaml::parse;

/// A named support window with an optional end-of-life date.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ServiceLevel {
    /// The service level name, e.g. `rawhide` or `stable_api`.
    pub name: String,
    /// The end of the support window, if bounded.
    pub eol: Option<EolDate>,
}

impl ServiceLevel {
    /// Creates an empty [`ServiceLevel`] with the given name.
    pub fn new(name: impl Into<String>) -> ServiceLevel {
        ServiceLevel {
            name: name.into(),
            eol: None,
        }
    }

    /// Parses the body of one `servicelevels:` entry.
    pub(crate) fn parse(
        name: String,
        value: &Value,
        path: &str,
        strict: bool,
    ) -> Result<ServiceLevel, Error> {
        let mut service_level = ServiceLevel::new(name);
        for (raw_key, raw_value) in parse::mapping(value, path)? {
            let key = parse::key(raw_key, path)?;
            let key_path = parse::child(path, &key);
            match key.as_str() {
                "eol" => service_level.eol = Some(parse::date(raw_value, &key_path)?),
                _ => parse::unknown_key(strict, path, &key)?,
            }
        }
        Ok(service_level)
    }

    /// Emits this service level as one `servicelevels:` entry.
    pub(crate) fn emit(&self, writer: &mut YamlWriter) {
        writer.begin_map(&self.name);
        if let Some(eol) = &self.eol {
            writer.entry("eol", &eol.to_string());
        }
        writer.end_map();
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use testresult::TestResult;

    use super::*;

    #[rstest]
    fn service_level_parses_eol() -> TestResult {
        let value: Value = serde_yaml::from_str("eol: 2020-12-31")?;
        let sl = ServiceLevel::parse("rawhide".to_string(), &value, "data.servicelevels.rawhide", true)?;
        assert_eq!(sl.eol, Some(EolDate::from_str("2020-12-31")?));
        Ok(())
    }

    #[rstest]
    fn service_level_rejects_bad_date() {
        let value: Value = serde_yaml::from_str("eol: someday").unwrap();
        assert!(ServiceLevel::parse("rawhide".to_string(), &value, "p", true).is_err());
    }
}
