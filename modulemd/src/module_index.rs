//! The in-memory aggregate of module metadata documents.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use modulemd_types::MdVersion;

use crate::defaults::Defaults;
use crate::module::Module;
use crate::module_stream::ModuleStream;
use crate::obsoletes::Obsoletes;
use crate::subdocument::{self, Document, SubdocumentInfo};
use crate::translation::Translation;
use crate::yaml::emit::YamlWriter;
use crate::Error;

/// The prefix of autogenerated placeholder module names.
const UNNAMED_MODULE_PREFIX: &str = "__unnamed_module_";

/// The prefix of autogenerated placeholder stream names.
const UNNAMED_STREAM_PREFIX: &str = "__unnamed_stream_";

/// An aggregate of all metadata documents for one or more modules.
///
/// The index is the central entry point of the crate: it loads
/// heterogeneous subdocuments from files, strings or readers, enforces
/// cross-document invariants, upgrades schema versions and emits the
/// whole collection deterministically.
///
/// All streams in one index share a single effective metadata version,
/// the highest ever inserted: inserting an older stream upgrades that
/// stream, inserting a newer one upgrades the whole index. This keeps
/// the index emittable without mixing schema versions.
///
/// An index is single-threaded: distinct instances may be used from
/// different threads freely, but one instance must be externally
/// serialized.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModuleIndex {
    modules: BTreeMap<String, Module>,
    stream_mdversion: Option<MdVersion>,
    unnamed_counter: u64,
}

impl ModuleIndex {
    /// Creates an empty index.
    pub fn new() -> ModuleIndex {
        ModuleIndex::default()
    }

    /// Returns the module with the given name, if present.
    pub fn get_module(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    /// Returns the sorted names of all modules in the index.
    pub fn get_module_names(&self) -> Vec<String> {
        self.modules.keys().cloned().collect()
    }

    /// Returns all modules, sorted by name.
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    /// Removes a module and everything it owns.
    ///
    /// Returns false when no module by that name exists. Streams hold
    /// no references of their own into the removed data, so this is
    /// always safe.
    pub fn remove_module(&mut self, name: &str) -> bool {
        self.modules.remove(name).is_some()
    }

    /// Returns the effective stream metadata version of the index, if
    /// any stream has been inserted.
    pub fn stream_mdversion(&self) -> Option<MdVersion> {
        self.stream_mdversion
    }

    /// Returns the default stream per module, for every module that
    /// carries one.
    pub fn default_streams(&self) -> BTreeMap<String, String> {
        self.modules
            .iter()
            .filter_map(|(name, module)| {
                module
                    .defaults()
                    .and_then(|defaults| defaults.default_stream(None))
                    .map(|stream| (name.clone(), stream.to_string()))
            })
            .collect()
    }

    /// Inserts a stream, creating the parent module lazily.
    ///
    /// Unnamed documents receive autogenerated placeholder names so
    /// that NSVCA keys stay unique; such an index refuses emission.
    /// The stream is upgraded to the index's effective metadata
    /// version, or the whole index upgrades when the stream is newer.
    ///
    /// # Errors
    ///
    /// Returns an error if an upgrade fails, or if the module already
    /// holds a different stream under the same NSVCA.
    pub fn add_module_stream(&mut self, stream: ModuleStream) -> Result<(), Error> {
        let mut stream = stream;
        if stream.module_name().is_none() {
            self.unnamed_counter += 1;
            stream.set_module_name(format!("{UNNAMED_MODULE_PREFIX}{}", self.unnamed_counter));
        }
        if stream.stream_name().is_none() {
            self.unnamed_counter += 1;
            stream.set_stream_name(format!("{UNNAMED_STREAM_PREFIX}{}", self.unnamed_counter));
        }

        match self.stream_mdversion {
            None => self.stream_mdversion = Some(stream.mdversion()),
            Some(floor) if stream.mdversion() < floor => {
                stream = stream.upgrade(floor)?;
            }
            Some(floor) if stream.mdversion() > floor => {
                self.upgrade_streams(stream.mdversion())?;
            }
            Some(_) => {}
        }

        let name = stream
            .module_name()
            .expect("module name was just ensured")
            .to_string();
        self.modules
            .entry(name.clone())
            .or_insert_with(|| Module::new(name))
            .add_stream(stream)
    }

    /// Attaches a defaults document, creating the parent module
    /// lazily.
    ///
    /// # Errors
    ///
    /// Returns an error if the document carries no module name.
    pub fn add_defaults(&mut self, defaults: Defaults) -> Result<(), Error> {
        let Some(name) = defaults.module_name().map(String::from) else {
            return Err(Error::Validate(
                "defaults without a module name cannot be added to an index".to_string(),
            ));
        };
        self.modules
            .entry(name.clone())
            .or_insert_with(|| Module::new(name))
            .set_defaults(defaults)
    }

    /// Attaches a translation document with last-modified-wins
    /// precedence, creating the parent module lazily.
    ///
    /// Streams look translations up through their module on demand, so
    /// every present and future matching stream sees the newest
    /// document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document carries no module or stream
    /// name.
    pub fn add_translation(&mut self, translation: Translation) -> Result<(), Error> {
        let Some(name) = translation.module_name.clone() else {
            return Err(Error::Validate(
                "translation without a module name cannot be added to an index".to_string(),
            ));
        };
        self.modules
            .entry(name.clone())
            .or_insert_with(|| Module::new(name))
            .add_translation(translation)
    }

    /// Records an obsoletes document, creating the parent module
    /// lazily.
    ///
    /// # Errors
    ///
    /// Returns an error if the document carries no module name.
    pub fn add_obsoletes(&mut self, obsoletes: Obsoletes) -> Result<(), Error> {
        let Some(name) = obsoletes.module_name.clone() else {
            return Err(Error::Validate(
                "obsoletes without a module name cannot be added to an index".to_string(),
            ));
        };
        self.modules
            .entry(name.clone())
            .or_insert_with(|| Module::new(name))
            .add_obsoletes(obsoletes);
        Ok(())
    }

    /// Upgrades every stream in the index to `target`.
    ///
    /// # Errors
    ///
    /// Returns an error as soon as one stream fails to upgrade; the
    /// index is left in an unspecified state in that case and should
    /// be rebuilt from its sources.
    pub fn upgrade_streams(&mut self, target: MdVersion) -> Result<(), Error> {
        for module in self.modules.values_mut() {
            let mut upgraded = Vec::with_capacity(module.streams().len());
            for stream in module.streams() {
                upgraded.push(stream.upgrade(target)?);
            }
            module.replace_streams(upgraded);
        }
        self.stream_mdversion = Some(target);
        Ok(())
    }

    /// Upgrades every defaults document in the index to `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if `target` is not a supported defaults schema
    /// version.
    pub fn upgrade_defaults(&mut self, target: u64) -> Result<(), Error> {
        for module in self.modules.values_mut() {
            if let Some(defaults) = module.defaults() {
                let upgraded = defaults.upgrade(target)?;
                module.set_defaults(upgraded)?;
            }
        }
        Ok(())
    }

    /// Returns every stream whose NSVCA matches the shell glob
    /// `pattern`.
    ///
    /// # Errors
    ///
    /// Returns an error if `pattern` is not a valid glob.
    pub fn search_streams_by_glob(&self, pattern: &str) -> Result<Vec<&ModuleStream>, Error> {
        let pattern = glob::Pattern::new(pattern)
            .map_err(|error| Error::Validate(format!("invalid glob pattern: {error}")))?;
        Ok(self
            .modules
            .values()
            .flat_map(|module| module.streams())
            .filter(|stream| pattern.matches(&stream.nsvca().to_string()))
            .collect())
    }

    /// Returns every stream whose NSVCA matches the shell glob
    /// `pattern`, requiring at least one match.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoMatches`] when nothing matches, and an error
    /// if `pattern` is not a valid glob.
    pub fn search_streams_required(&self, pattern: &str) -> Result<Vec<&ModuleStream>, Error> {
        let streams = self.search_streams_by_glob(pattern)?;
        if streams.is_empty() {
            return Err(Error::NoMatches(pattern.to_string()));
        }
        Ok(streams)
    }

    /// Validates every document held by the index.
    ///
    /// Runs the per-entity checks of all streams and defaults; the
    /// whole-index invariants (NSVCA uniqueness within a module, the
    /// shared stream metadata version) are enforced at insertion time
    /// and therefore always hold. Validation never mutates.
    ///
    /// # Errors
    ///
    /// Returns the first validation error encountered.
    pub fn validate(&self) -> Result<(), Error> {
        for module in self.modules.values() {
            for stream in module.streams() {
                stream.validate()?;
            }
            if let Some(defaults) = module.defaults() {
                defaults.validate()?;
            }
        }
        Ok(())
    }

    /// Loads all subdocuments of a metadata file into the index.
    ///
    /// Returns the failure records of subdocuments that could not be
    /// parsed or inserted; a bad subdocument never aborts the whole
    /// load.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn update_from_file(
        &mut self,
        path: impl AsRef<Path>,
        strict: bool,
    ) -> Result<Vec<SubdocumentInfo>, Error> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| {
            Error::FileAccess(PathBuf::from(path), "opening metadata file", source)
        })?;
        self.update_from_stream(file, strict)
    }

    /// Loads all subdocuments of a metadata string into the index.
    ///
    /// Returns the failure records of subdocuments that could not be
    /// parsed or inserted; a bad subdocument never aborts the whole
    /// load.
    ///
    /// # Errors
    ///
    /// This function itself only fails on internal invariant
    /// violations; malformed documents end up in the failure records.
    pub fn update_from_string(
        &mut self,
        yaml: &str,
        strict: bool,
    ) -> Result<Vec<SubdocumentInfo>, Error> {
        let (parsed, mut failures) = subdocument::parse_string_with_info(yaml, strict)?;
        for document in parsed {
            if let Err(error) = self.insert_document(&document.document) {
                failures.push(document.into_failure(error));
            }
        }
        Ok(failures)
    }

    /// Loads all subdocuments from a reader into the index.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the input is not UTF-8.
    pub fn update_from_stream(
        &mut self,
        mut reader: impl std::io::Read,
        strict: bool,
    ) -> Result<Vec<SubdocumentInfo>, Error> {
        let mut buf = String::new();
        reader
            .read_to_string(&mut buf)
            .map_err(|source| Error::Io {
                context: "reading metadata documents",
                source,
            })?;
        self.update_from_string(&buf, strict)
    }

    /// Loads all subdocuments from a pull callback into the index.
    ///
    /// `read_fn` fills the passed buffer and returns the number of
    /// bytes produced, zero meaning end of input; this adapts sources
    /// that cannot expose a [`std::io::Read`] directly.
    ///
    /// # Errors
    ///
    /// Returns an error if the callback fails or the input is not
    /// UTF-8.
    pub fn update_from_custom(
        &mut self,
        mut read_fn: impl FnMut(&mut [u8]) -> std::io::Result<usize>,
        strict: bool,
    ) -> Result<Vec<SubdocumentInfo>, Error> {
        let mut data = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = read_fn(&mut buf).map_err(|source| Error::Io {
                context: "pulling metadata documents from a callback",
                source,
            })?;
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buf[..n]);
        }
        let yaml = String::from_utf8(data).map_err(|error| Error::YamlUnparseable {
            line: 0,
            column: 0,
            message: error.to_string(),
        })?;
        self.update_from_string(&yaml, strict)
    }

    fn insert_document(&mut self, document: &Document) -> Result<(), Error> {
        match document {
            Document::Stream(stream) => {
                stream.validate()?;
                self.add_module_stream(stream.clone())
            }
            Document::Defaults(defaults) => {
                defaults.validate()?;
                self.add_defaults(defaults.clone())
            }
            Document::Translation(translation) => self.add_translation(translation.clone()),
            Document::Packager(packager) => {
                let (stream, defaults) = packager.to_stream_v2()?;
                stream.validate()?;
                let module_name = stream.module_name().map(String::from);
                self.add_module_stream(stream)?;
                if let Some(defaults) = defaults {
                    let has_defaults = module_name
                        .as_deref()
                        .and_then(|name| self.get_module(name))
                        .is_some_and(|module| module.defaults().is_some());
                    if !has_defaults {
                        self.add_defaults(defaults)?;
                    }
                }
                Ok(())
            }
            Document::Obsoletes(obsoletes) => self.add_obsoletes(obsoletes.clone()),
        }
    }

    /// Emits the whole index as a multi-document YAML string.
    ///
    /// Modules are emitted sorted by name; per module the defaults
    /// document comes first, followed by the streams sorted by NSVCA,
    /// the translations sorted by stream name and the obsoletes
    /// records. Equal indexes emit byte-identical output.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is empty or still contains
    /// autogenerated placeholder names.
    pub fn dump_to_string(&self) -> Result<String, Error> {
        if self.modules.is_empty() {
            return Err(Error::Validate("the index contains no modules".to_string()));
        }
        for (name, module) in &self.modules {
            if name.starts_with(UNNAMED_MODULE_PREFIX) {
                return Err(Error::Validate(format!(
                    "refusing to emit autogenerated placeholder module name {name:?}"
                )));
            }
            if let Some(stream_name) = module
                .streams()
                .iter()
                .filter_map(ModuleStream::stream_name)
                .find(|stream| stream.starts_with(UNNAMED_STREAM_PREFIX))
            {
                return Err(Error::Validate(format!(
                    "refusing to emit autogenerated placeholder stream name {stream_name:?}"
                )));
            }
        }

        let mut writer = YamlWriter::new();
        for module in self.modules.values() {
            if let Some(defaults) = module.defaults() {
                defaults.emit(&mut writer);
            }
            for stream in module.streams_sorted() {
                stream.emit(&mut writer);
            }
            for translation in module.translations().values() {
                translation.emit(&mut writer);
            }
            for obsoletes in module.obsoletes() {
                obsoletes.emit(&mut writer);
            }
        }
        writer.stream_end();
        Ok(writer.into_string())
    }

    /// Emits the whole index into a file.
    ///
    /// # Errors
    ///
    /// Returns an error under the same conditions as
    /// [`ModuleIndex::dump_to_string`], or if the file cannot be
    /// written.
    pub fn dump_to_file(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let yaml = self.dump_to_string()?;
        let path = path.as_ref();
        std::fs::write(path, yaml).map_err(|source| {
            Error::FileAccess(PathBuf::from(path), "writing metadata file", source)
        })
    }

    /// Emits the whole index into a writer.
    ///
    /// # Errors
    ///
    /// Returns an error under the same conditions as
    /// [`ModuleIndex::dump_to_string`], or if the writer fails.
    pub fn dump_to_stream(&self, mut writer: impl Write) -> Result<(), Error> {
        let yaml = self.dump_to_string()?;
        writer
            .write_all(yaml.as_bytes())
            .map_err(|source| Error::YamlEmit("writing metadata documents", source))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use testresult::TestResult;

    use super::*;
    use crate::module_stream::v1::ModuleStreamV1;
    use crate::module_stream::v2::ModuleStreamV2;

    fn v2_stream(module: &str, stream: &str, version: u64) -> ModuleStream {
        ModuleStream::V2(ModuleStreamV2 {
            module_name: Some(module.to_string()),
            stream_name: Some(stream.to_string()),
            version,
            summary: Some("s".to_string()),
            description: Some("d".to_string()),
            module_licenses: std::collections::BTreeSet::from(["MIT".to_string()]),
            ..ModuleStreamV2::default()
        })
    }

    #[rstest]
    fn index_upgrades_older_stream_on_insert() -> TestResult {
        let mut index = ModuleIndex::new();
        index.add_module_stream(v2_stream("foo", "latest", 1))?;
        index.add_module_stream(ModuleStream::V1(ModuleStreamV1 {
            module_name: Some("bar".to_string()),
            stream_name: Some("rolling".to_string()),
            version: 1,
            ..ModuleStreamV1::default()
        }))?;

        assert_eq!(index.stream_mdversion(), Some(MdVersion::Two));
        let bar = index.get_module("bar").unwrap();
        assert_eq!(bar.streams()[0].mdversion(), MdVersion::Two);
        Ok(())
    }

    #[rstest]
    fn index_upgrades_everything_on_newer_insert() -> TestResult {
        let mut index = ModuleIndex::new();
        index.add_module_stream(v2_stream("foo", "latest", 1))?;

        let v3 = v2_stream("bar", "rolling", 1).upgrade(MdVersion::Three)?;
        index.add_module_stream(v3)?;

        assert_eq!(index.stream_mdversion(), Some(MdVersion::Three));
        let foo = index.get_module("foo").unwrap();
        assert_eq!(foo.streams()[0].mdversion(), MdVersion::Three);
        Ok(())
    }

    #[rstest]
    fn index_assigns_placeholder_names_and_refuses_to_emit_them() -> TestResult {
        let mut index = ModuleIndex::new();
        index.add_module_stream(ModuleStream::V2(ModuleStreamV2 {
            summary: Some("s".to_string()),
            ..ModuleStreamV2::default()
        }))?;

        let names = index.get_module_names();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with(UNNAMED_MODULE_PREFIX));
        assert!(matches!(index.dump_to_string(), Err(Error::Validate(_))));
        Ok(())
    }

    #[rstest]
    fn index_search_by_glob() -> TestResult {
        let mut index = ModuleIndex::new();
        index.add_module_stream(v2_stream("foo", "latest", 1))?;
        index.add_module_stream(v2_stream("foo", "rolling", 2))?;
        index.add_module_stream(v2_stream("bar", "latest", 3))?;

        assert_eq!(index.search_streams_by_glob("foo:*")?.len(), 2);
        assert_eq!(index.search_streams_by_glob("*:latest:*")?.len(), 2);
        assert!(matches!(
            index.search_streams_required("baz:*"),
            Err(Error::NoMatches(_))
        ));
        Ok(())
    }

    #[rstest]
    fn remove_module_forgets_everything() -> TestResult {
        let mut index = ModuleIndex::new();
        index.add_module_stream(v2_stream("foo", "latest", 1))?;
        assert!(index.remove_module("foo"));
        assert!(!index.remove_module("foo"));
        assert!(index.get_module_names().is_empty());
        Ok(())
    }

    #[rstest]
    fn empty_index_refuses_to_dump() {
        let index = ModuleIndex::new();
        assert!(matches!(index.dump_to_string(), Err(Error::Validate(_))));
    }
}
