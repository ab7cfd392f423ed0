//! One module: all streams, defaults, translations and obsoletes for
//! one module name.

use std::collections::BTreeMap;

use modulemd_types::Locale;

use crate::defaults::Defaults;
use crate::module_stream::ModuleStream;
use crate::obsoletes::Obsoletes;
use crate::translation::Translation;
use crate::Error;

/// All metadata gathered for one module name.
///
/// A module owns its streams, its optional defaults document, its
/// translations (keyed by stream name) and its obsoletes records.
/// Streams ask their module for translations and obsoletes on demand,
/// so removing those documents later cannot leave streams with
/// dangling references.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Module {
    name: String,
    streams: Vec<ModuleStream>,
    defaults: Option<Defaults>,
    translations: BTreeMap<String, Translation>,
    obsoletes: Vec<Obsoletes>,
}

impl Module {
    /// Creates an empty [`Module`] with the given name.
    pub fn new(name: impl Into<String>) -> Module {
        Module {
            name: name.into(),
            ..Module::default()
        }
    }

    /// Returns the module name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns all streams in insertion order.
    pub fn streams(&self) -> &[ModuleStream] {
        &self.streams
    }

    /// Returns the defaults document, if one is attached.
    pub fn defaults(&self) -> Option<&Defaults> {
        self.defaults.as_ref()
    }

    /// Returns all obsoletes records in insertion order.
    pub fn obsoletes(&self) -> &[Obsoletes] {
        &self.obsoletes
    }

    /// Returns the sorted, deduplicated stream names of this module.
    pub fn get_stream_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .streams
            .iter()
            .filter_map(ModuleStream::stream_name)
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Returns the streams matching every given field.
    ///
    /// A [`None`] filter matches any value.
    pub fn search_streams(
        &self,
        stream_name: Option<&str>,
        version: Option<u64>,
        context: Option<&str>,
        arch: Option<&str>,
    ) -> Vec<&ModuleStream> {
        self.streams
            .iter()
            .filter(|stream| stream_name.is_none_or(|name| stream.stream_name() == Some(name)))
            .filter(|stream| version.is_none_or(|version| stream.version() == version))
            .filter(|stream| context.is_none_or(|context| stream.context() == Some(context)))
            .filter(|stream| arch.is_none_or(|arch| stream.arch() == Some(arch)))
            .collect()
    }

    /// Returns the translation document for `stream_name`, if one is
    /// attached.
    pub fn translation(&self, stream_name: &str) -> Option<&Translation> {
        self.translations.get(stream_name)
    }

    /// Returns the summary of `stream` translated into `locale`,
    /// falling back to the untranslated summary.
    pub fn localized_summary<'a>(
        &'a self,
        stream: &'a ModuleStream,
        locale: &Locale,
    ) -> Option<&'a str> {
        let translation = stream.stream_name().and_then(|name| self.translation(name));
        stream.localized_summary(translation, locale)
    }

    /// Returns the description of `stream` translated into `locale`,
    /// falling back to the untranslated description.
    pub fn localized_description<'a>(
        &'a self,
        stream: &'a ModuleStream,
        locale: &Locale,
    ) -> Option<&'a str> {
        let translation = stream.stream_name().and_then(|name| self.translation(name));
        stream.localized_description(translation, locale)
    }

    /// Returns the newest applicable obsoletes record for a stream.
    ///
    /// Records narrowed to a context only apply when the queried
    /// context matches. A newest record carrying `reset` withdraws the
    /// deprecation, so [`None`] is returned.
    pub fn active_obsoletes(
        &self,
        stream_name: &str,
        context: Option<&str>,
    ) -> Option<&Obsoletes> {
        let newest = self
            .obsoletes
            .iter()
            .filter(|obsoletes| obsoletes.applies_to(stream_name, context))
            .max_by_key(|obsoletes| obsoletes.modified)?;
        (!newest.reset).then_some(newest)
    }

    /// Attaches a defaults document to this module.
    ///
    /// # Errors
    ///
    /// Returns an error if the document names a different module.
    pub fn set_defaults(&mut self, defaults: Defaults) -> Result<(), Error> {
        match defaults.module_name() {
            Some(module) if module == self.name => {
                self.defaults = Some(defaults);
                Ok(())
            }
            Some(module) => Err(Error::Validate(format!(
                "defaults for module {module:?} cannot be attached to module {:?}",
                self.name
            ))),
            None => Err(Error::Validate(
                "defaults without a module name cannot be attached".to_string(),
            )),
        }
    }

    /// Attaches a translation document with last-modified-wins
    /// precedence.
    ///
    /// # Errors
    ///
    /// Returns an error if the document carries no stream name.
    pub fn add_translation(&mut self, translation: Translation) -> Result<(), Error> {
        let Some(stream_name) = translation.stream_name.clone() else {
            return Err(Error::Validate(
                "translation without a stream name cannot be attached".to_string(),
            ));
        };
        match self.translations.get(&stream_name) {
            Some(existing) if existing.modified >= translation.modified => {}
            _ => {
                self.translations.insert(stream_name, translation);
            }
        }
        Ok(())
    }

    /// Records an obsoletes document for this module.
    pub fn add_obsoletes(&mut self, obsoletes: Obsoletes) {
        self.obsoletes.push(obsoletes);
    }

    /// Inserts a stream, enforcing NSVCA uniqueness.
    ///
    /// Re-inserting an identical stream is a no-op; inserting a
    /// different stream under an existing NSVCA is an error.
    pub(crate) fn add_stream(&mut self, stream: ModuleStream) -> Result<(), Error> {
        if let Some(existing) = self
            .streams
            .iter()
            .find(|existing| existing.same_nsvca(&stream))
        {
            if *existing == stream {
                return Ok(());
            }
            return Err(Error::Validate(format!(
                "module {:?} already has a different stream {}",
                self.name,
                stream.nsvca()
            )));
        }
        self.streams.push(stream);
        Ok(())
    }

    /// Replaces all streams; used by bulk upgrades.
    pub(crate) fn replace_streams(&mut self, streams: Vec<ModuleStream>) {
        self.streams = streams;
    }

    /// Returns all translations keyed by stream name.
    pub fn translations(&self) -> &BTreeMap<String, Translation> {
        &self.translations
    }

    /// Returns the streams sorted by their NSVCA, the order used for
    /// emission.
    pub(crate) fn streams_sorted(&self) -> Vec<&ModuleStream> {
        let mut streams: Vec<&ModuleStream> = self.streams.iter().collect();
        streams.sort_by_key(|stream| stream.nsvca().to_string());
        streams
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use testresult::TestResult;

    use super::*;
    use crate::module_stream::v2::ModuleStreamV2;

    fn stream(name: &str, stream_name: &str, version: u64, summary: &str) -> ModuleStream {
        ModuleStream::V2(ModuleStreamV2 {
            module_name: Some(name.to_string()),
            stream_name: Some(stream_name.to_string()),
            version,
            summary: Some(summary.to_string()),
            ..ModuleStreamV2::default()
        })
    }

    #[rstest]
    fn add_stream_accepts_identical_reinsert() -> TestResult {
        let mut module = Module::new("foo");
        module.add_stream(stream("foo", "latest", 1, "s"))?;
        module.add_stream(stream("foo", "latest", 1, "s"))?;
        assert_eq!(module.streams().len(), 1);
        Ok(())
    }

    #[rstest]
    fn add_stream_rejects_conflicting_content() -> TestResult {
        let mut module = Module::new("foo");
        module.add_stream(stream("foo", "latest", 1, "s"))?;
        let result = module.add_stream(stream("foo", "latest", 1, "different"));
        assert!(matches!(result, Err(Error::Validate(_))));
        Ok(())
    }

    #[rstest]
    fn set_defaults_rejects_foreign_module() {
        let mut module = Module::new("foo");
        let defaults = Defaults::V1(crate::DefaultsV1::new("bar"));
        assert!(matches!(
            module.set_defaults(defaults),
            Err(Error::Validate(_))
        ));
    }

    #[rstest]
    fn add_translation_keeps_newest() -> TestResult {
        let mut module = Module::new("foo");
        let mut old = Translation::new("foo", "latest");
        old.modified = 1;
        let mut new = Translation::new("foo", "latest");
        new.modified = 2;

        module.add_translation(new.clone())?;
        module.add_translation(old)?;
        assert_eq!(module.translation("latest"), Some(&new));
        Ok(())
    }

    #[rstest]
    fn active_obsoletes_honors_reset_and_modified() {
        let mut module = Module::new("foo");
        let mut first = Obsoletes::new(1, "foo", "latest");
        first.message = Some("go away".to_string());
        module.add_obsoletes(first.clone());
        assert_eq!(module.active_obsoletes("latest", None), Some(&first));

        let mut reset = Obsoletes::new(2, "foo", "latest");
        reset.reset = true;
        module.add_obsoletes(reset);
        assert_eq!(module.active_obsoletes("latest", None), None);
    }
}
