//! Translation documents: locale overrides for one stream.

use std::collections::BTreeMap;
use std::str::FromStr;

use modulemd_types::Locale;
use serde_yaml::Value;

use crate::Error;
use crate::yaml::emit::YamlWriter;
use crate::yaml::parse;

/// The translated strings of one stream for one locale.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TranslationEntry {
    /// The locale the entry translates into.
    pub locale: Option<Locale>,
    /// The translated one-line summary.
    pub summary: Option<String>,
    /// The translated long description.
    pub description: Option<String>,
    /// Translated profile descriptions by profile name.
    pub profile_descriptions: BTreeMap<String, String>,
}

impl TranslationEntry {
    /// Creates an empty [`TranslationEntry`] for the given locale.
    pub fn new(locale: Locale) -> TranslationEntry {
        TranslationEntry {
            locale: Some(locale),
            ..TranslationEntry::default()
        }
    }

    /// Returns true when the entry translates nothing.
    pub fn is_empty(&self) -> bool {
        self.summary.is_none()
            && self.description.is_none()
            && self.profile_descriptions.is_empty()
    }

    fn parse(locale: Locale, value: &Value, path: &str, strict: bool) -> Result<TranslationEntry, Error> {
        let mut entry = TranslationEntry::new(locale);
        for (raw_key, raw_value) in parse::mapping(value, path)? {
            let key = parse::key(raw_key, path)?;
            let key_path = parse::child(path, &key);
            match key.as_str() {
                "summary" => entry.summary = Some(parse::string(raw_value, &key_path)?),
                "description" => entry.description = Some(parse::string(raw_value, &key_path)?),
                "profiles" => {
                    entry.profile_descriptions = parse::string_string_map(raw_value, &key_path)?;
                }
                _ => parse::unknown_key(strict, path, &key)?,
            }
        }
        if entry.is_empty() {
            return Err(Error::parse(
                path,
                "translation entry translates neither summary, description nor profiles",
            ));
        }
        Ok(entry)
    }

    fn emit(&self, writer: &mut YamlWriter) {
        let locale = self
            .locale
            .as_ref()
            .map(Locale::as_str)
            .unwrap_or_default();
        writer.begin_map(locale);
        if let Some(summary) = &self.summary {
            writer.entry("summary", summary);
        }
        if let Some(description) = &self.description {
            writer.entry("description", description);
        }
        if !self.profile_descriptions.is_empty() {
            writer.begin_map("profiles");
            for (profile, description) in &self.profile_descriptions {
                writer.entry(profile, description);
            }
            writer.end_map();
        }
        writer.end_map();
    }
}

/// Locale overrides for one module stream.
///
/// The `modified` field is a monotonically increasing
/// `YYYYMMDDhhmm`-style stamp; when several translation documents for
/// the same stream meet, the largest `modified` wins.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Translation {
    /// The module the translations apply to.
    pub module_name: Option<String>,
    /// The stream the translations apply to.
    pub stream_name: Option<String>,
    /// The monotonic last-modified stamp.
    pub modified: u64,
    /// Translation entries by locale.
    pub entries: BTreeMap<Locale, TranslationEntry>,
}

impl Translation {
    /// Creates an empty [`Translation`] for a module stream.
    pub fn new(module_name: impl Into<String>, stream_name: impl Into<String>) -> Translation {
        Translation {
            module_name: Some(module_name.into()),
            stream_name: Some(stream_name.into()),
            ..Translation::default()
        }
    }

    /// Returns the entry for `locale`, if one is carried.
    pub fn entry(&self, locale: &Locale) -> Option<&TranslationEntry> {
        self.entries.get(locale)
    }

    /// Parses the `data:` mapping of a `modulemd-translations` document.
    pub(crate) fn parse(data: &Value, strict: bool) -> Result<Translation, Error> {
        let path = "data";
        let mut translation = Translation::default();
        for (raw_key, raw_value) in parse::mapping(data, path)? {
            let key = parse::key(raw_key, path)?;
            let key_path = parse::child(path, &key);
            match key.as_str() {
                "module" => translation.module_name = Some(parse::string(raw_value, &key_path)?),
                "stream" => translation.stream_name = Some(parse::string(raw_value, &key_path)?),
                "modified" => translation.modified = parse::u64(raw_value, &key_path)?,
                "translations" => {
                    for (raw_key, raw_value) in parse::mapping(raw_value, &key_path)? {
                        let raw_locale = parse::key(raw_key, &key_path)?;
                        let entry_path = parse::child(&key_path, &raw_locale);
                        let locale = Locale::from_str(&raw_locale)
                            .map_err(|error| Error::parse(entry_path.as_str(), error.to_string()))?;
                        let entry =
                            TranslationEntry::parse(locale.clone(), raw_value, &entry_path, strict)?;
                        translation.entries.insert(locale, entry);
                    }
                }
                _ => parse::unknown_key(strict, path, &key)?,
            }
        }
        if translation.module_name.is_none() {
            return Err(parse::missing(path, "module"));
        }
        if translation.stream_name.is_none() {
            return Err(parse::missing(path, "stream"));
        }
        if translation.modified == 0 {
            return Err(parse::missing(path, "modified"));
        }
        Ok(translation)
    }

    /// Emits the document, including its `document:`/`version:` header.
    pub(crate) fn emit(&self, writer: &mut YamlWriter) {
        writer.doc_start();
        writer.entry("document", "modulemd-translations");
        writer.u64_entry("version", 1);
        writer.begin_map("data");
        if let Some(module) = &self.module_name {
            writer.entry("module", module);
        }
        if let Some(stream) = &self.stream_name {
            writer.quoted_entry("stream", stream);
        }
        writer.u64_entry("modified", self.modified);
        if !self.entries.is_empty() {
            writer.begin_map("translations");
            for entry in self.entries.values() {
                entry.emit(writer);
            }
            writer.end_map();
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

    const TRANSLATION: &str = r#"
module: foo
stream: latest
modified: 202001012020
translations:
  cs_CZ:
    summary: ahoj
    profiles:
      default: vychozi
  en_GB:
    description: colourful
"#;

    #[rstest]
    fn translation_parses_locale_entries() -> TestResult {
        let data: Value = serde_yaml::from_str(TRANSLATION)?;
        let translation = Translation::parse(&data, true)?;
        assert_eq!(translation.modified, 202001012020);
        let locale = Locale::from_str("cs_CZ")?;
        assert_eq!(
            translation.entry(&locale).and_then(|e| e.summary.as_deref()),
            Some("ahoj")
        );
        Ok(())
    }

    #[rstest]
    fn translation_rejects_empty_entry() {
        let data: Value = serde_yaml::from_str(
            "module: foo\nstream: latest\nmodified: 1\ntranslations:\n  cs_CZ: {}",
        )
        .unwrap();
        assert!(Translation::parse(&data, true).is_err());
    }

    #[rstest]
    #[case("stream: latest\nmodified: 1")]
    #[case("module: foo\nmodified: 1")]
    #[case("module: foo\nstream: latest")]
    fn translation_requires_header_fields(#[case] yaml: &str) {
        let data: Value = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(
            Translation::parse(&data, true),
            Err(Error::MissingRequired { .. })
        ));
    }
}
