//! Defaults documents: site policy for a module.

use std::collections::{BTreeMap, BTreeSet};

use serde_yaml::Value;

use crate::Error;
use crate::yaml::emit::YamlWriter;
use crate::yaml::parse;

/// Per-intent overrides of a module's defaults.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Intent {
    /// The default stream within this intent.
    pub default_stream: Option<String>,
    /// Default profiles per stream within this intent.
    pub profile_defaults: BTreeMap<String, BTreeSet<String>>,
}

/// Version 1 defaults document for one module.
///
/// Names the default stream and the default installation profiles per
/// stream, optionally refined per system intent. Streams named here
/// need not (yet) exist in the module; defaults may predate streams.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DefaultsV1 {
    /// The module the defaults apply to.
    pub module_name: Option<String>,
    /// The module's default stream.
    pub default_stream: Option<String>,
    /// Default profiles per stream.
    pub profile_defaults: BTreeMap<String, BTreeSet<String>>,
    /// Per-intent overrides by intent name.
    pub intents: BTreeMap<String, Intent>,
}

impl DefaultsV1 {
    /// Creates empty defaults for the given module.
    pub fn new(module_name: impl Into<String>) -> DefaultsV1 {
        DefaultsV1 {
            module_name: Some(module_name.into()),
            ..DefaultsV1::default()
        }
    }

    /// Returns the default profiles for `stream`, honoring `intent`
    /// overrides when given.
    pub fn profiles_for_stream(
        &self,
        stream: &str,
        intent: Option<&str>,
    ) -> Option<&BTreeSet<String>> {
        if let Some(intent) = intent.and_then(|name| self.intents.get(name)) {
            if let Some(profiles) = intent.profile_defaults.get(stream) {
                return Some(profiles);
            }
        }
        self.profile_defaults.get(stream)
    }

    /// Returns the default stream, honoring `intent` overrides when
    /// given.
    pub fn default_stream(&self, intent: Option<&str>) -> Option<&str> {
        if let Some(intent) = intent.and_then(|name| self.intents.get(name)) {
            if let Some(stream) = &intent.default_stream {
                return Some(stream);
            }
        }
        self.default_stream.as_deref()
    }

    /// Parses the `data:` mapping of a `modulemd-defaults` document.
    pub(crate) fn parse(data: &Value, strict: bool) -> Result<DefaultsV1, Error> {
        let path = "data";
        let mut defaults = DefaultsV1::default();
        for (raw_key, raw_value) in parse::mapping(data, path)? {
            let key = parse::key(raw_key, path)?;
            let key_path = parse::child(path, &key);
            match key.as_str() {
                "module" => defaults.module_name = Some(parse::string(raw_value, &key_path)?),
                "stream" => defaults.default_stream = Some(parse::string(raw_value, &key_path)?),
                "profiles" => {
                    defaults.profile_defaults = parse::nested_set(raw_value, &key_path)?;
                }
                "intents" => {
                    for (raw_key, raw_value) in parse::mapping(raw_value, &key_path)? {
                        let name = parse::key(raw_key, &key_path)?;
                        let intent_path = parse::child(&key_path, &name);
                        let mut intent = Intent::default();
                        for (raw_key, raw_value) in parse::mapping(raw_value, &intent_path)? {
                            let field = parse::key(raw_key, &intent_path)?;
                            let field_path = parse::child(&intent_path, &field);
                            match field.as_str() {
                                "stream" => {
                                    intent.default_stream =
                                        Some(parse::string(raw_value, &field_path)?);
                                }
                                "profiles" => {
                                    intent.profile_defaults =
                                        parse::nested_set(raw_value, &field_path)?;
                                }
                                _ => parse::unknown_key(strict, &intent_path, &field)?,
                            }
                        }
                        defaults.intents.insert(name, intent);
                    }
                }
                _ => parse::unknown_key(strict, path, &key)?,
            }
        }
        if defaults.module_name.is_none() {
            return Err(parse::missing(path, "module"));
        }
        Ok(defaults)
    }

    /// Emits the document, including its `document:`/`version:` header.
    pub(crate) fn emit(&self, writer: &mut YamlWriter) {
        writer.doc_start();
        writer.entry("document", "modulemd-defaults");
        writer.u64_entry("version", 1);
        writer.begin_map("data");
        if let Some(module) = &self.module_name {
            writer.entry("module", module);
        }
        if let Some(stream) = &self.default_stream {
            writer.quoted_entry("stream", stream);
        }
        if !self.profile_defaults.is_empty() {
            writer.begin_map("profiles");
            for (stream, profiles) in &self.profile_defaults {
                writer.string_seq(stream, profiles.iter().map(String::as_str));
            }
            writer.end_map();
        }
        if !self.intents.is_empty() {
            writer.begin_map("intents");
            for (name, intent) in &self.intents {
                writer.begin_map(name);
                if let Some(stream) = &intent.default_stream {
                    writer.quoted_entry("stream", stream);
                }
                if !intent.profile_defaults.is_empty() {
                    writer.begin_map("profiles");
                    for (stream, profiles) in &intent.profile_defaults {
                        writer.string_seq(stream, profiles.iter().map(String::as_str));
                    }
                    writer.end_map();
                }
                writer.end_map();
            }
            writer.end_map();
        }
        writer.end_map();
    }

    /// Validates the document's own invariants.
    ///
    /// A stream listed in the top-level profile defaults must not
    /// reappear under an intent with a fully disjoint, non-empty
    /// profile set; such documents are ambiguous about what the
    /// intent actually overrides.
    pub fn validate(&self) -> Result<(), Error> {
        for (intent_name, intent) in &self.intents {
            for (stream, intent_profiles) in &intent.profile_defaults {
                let Some(profiles) = self.profile_defaults.get(stream) else {
                    continue;
                };
                if !profiles.is_empty()
                    && !intent_profiles.is_empty()
                    && profiles.is_disjoint(intent_profiles)
                {
                    return Err(Error::Validate(format!(
                        "intent {intent_name:?} redefines the profile set of stream \
                         {stream:?} with no overlap"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// A defaults document, tagged by schema version.
///
/// Version 1 is the only published schema.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Defaults {
    /// The version 1 defaults format.
    V1(DefaultsV1),
}

impl Defaults {
    /// Returns the module name the defaults apply to.
    pub fn module_name(&self) -> Option<&str> {
        match self {
            Defaults::V1(defaults) => defaults.module_name.as_deref(),
        }
    }

    /// Returns the metadata schema version of the document.
    pub fn mdversion(&self) -> u64 {
        match self {
            Defaults::V1(_) => 1,
        }
    }

    /// Returns the default stream, honoring `intent` overrides.
    pub fn default_stream(&self, intent: Option<&str>) -> Option<&str> {
        match self {
            Defaults::V1(defaults) => defaults.default_stream(intent),
        }
    }

    /// Returns the default profiles for `stream`, honoring `intent`
    /// overrides.
    pub fn profiles_for_stream(
        &self,
        stream: &str,
        intent: Option<&str>,
    ) -> Option<&BTreeSet<String>> {
        match self {
            Defaults::V1(defaults) => defaults.profiles_for_stream(stream, intent),
        }
    }

    /// Upgrades the document to `target`, which must be a known
    /// defaults schema version not below the current one.
    pub fn upgrade(&self, target: u64) -> Result<Defaults, Error> {
        match target {
            1 => Ok(self.clone()),
            _ => Err(Error::Upgrade(format!(
                "cannot upgrade defaults from version {} to {target}",
                self.mdversion()
            ))),
        }
    }

    /// Validates the document's own invariants.
    pub fn validate(&self) -> Result<(), Error> {
        match self {
            Defaults::V1(defaults) => defaults.validate(),
        }
    }

    pub(crate) fn emit(&self, writer: &mut YamlWriter) {
        match self {
            Defaults::V1(defaults) => defaults.emit(writer),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use testresult::TestResult;

    use super::*;

    const DEFAULTS: &str = r#"
module: postgresql
stream: "8.1"
profiles:
  "8.1": [client, server]
  "8.2": []
intents:
  desktop:
    stream: "8.2"
    profiles:
      "8.1": [client]
"#;

    #[rstest]
    fn defaults_parse_streams_and_intents() -> TestResult {
        let data: Value = serde_yaml::from_str(DEFAULTS)?;
        let defaults = DefaultsV1::parse(&data, true)?;
        assert_eq!(defaults.default_stream(None), Some("8.1"));
        assert_eq!(defaults.default_stream(Some("desktop")), Some("8.2"));
        assert_eq!(defaults.default_stream(Some("unknown")), Some("8.1"));
        assert_eq!(
            defaults.profiles_for_stream("8.1", Some("desktop")),
            Some(&BTreeSet::from(["client".to_string()]))
        );
        defaults.validate()?;
        Ok(())
    }

    #[rstest]
    fn defaults_require_module_name() {
        let data: Value = serde_yaml::from_str("stream: latest").unwrap();
        assert!(matches!(
            DefaultsV1::parse(&data, true),
            Err(Error::MissingRequired { .. })
        ));
    }

    #[rstest]
    fn defaults_validate_rejects_disjoint_intent_profiles() -> TestResult {
        let data: Value = serde_yaml::from_str(
            "module: m\nprofiles:\n  s: [a]\nintents:\n  server:\n    profiles:\n      s: [b]",
        )?;
        let defaults = DefaultsV1::parse(&data, true)?;
        assert!(matches!(defaults.validate(), Err(Error::Validate(_))));
        Ok(())
    }
}
