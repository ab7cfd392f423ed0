//! Module stream documents across all metadata schema versions.

pub(crate) mod v1;
pub(crate) mod v2;
pub(crate) mod v3;

use std::fs::File;
use std::path::{Path, PathBuf};

use modulemd_types::{Locale, MdVersion, Nsvca};
use serde_yaml::Value;

pub use v1::ModuleStreamV1;
pub use v2::ModuleStreamV2;
pub use v3::ModuleStreamV3;

use crate::subdocument::{self, Document};
use crate::translation::Translation;
use crate::yaml::emit::YamlWriter;
use crate::Error;

/// One module stream revision, tagged by metadata schema version.
///
/// All versions share the identifying header (module name, stream
/// name, version, context, architecture); the bodies differ mainly in
/// how dependencies are expressed.
#[derive(Clone, Debug, PartialEq)]
pub enum ModuleStream {
    /// The legacy version 1 format.
    V1(ModuleStreamV1),
    /// The production version 2 format.
    V2(ModuleStreamV2),
    /// The version 3 format with flattened dependencies.
    V3(ModuleStreamV3),
}

impl ModuleStream {
    /// Creates an empty stream of the given schema version.
    pub fn new(mdversion: MdVersion) -> ModuleStream {
        match mdversion {
            MdVersion::One => ModuleStream::V1(ModuleStreamV1::default()),
            MdVersion::Two => ModuleStream::V2(ModuleStreamV2::default()),
            MdVersion::Three => ModuleStream::V3(ModuleStreamV3::default()),
        }
    }

    /// Returns the metadata schema version of the document.
    pub fn mdversion(&self) -> MdVersion {
        match self {
            ModuleStream::V1(_) => MdVersion::One,
            ModuleStream::V2(_) => MdVersion::Two,
            ModuleStream::V3(_) => MdVersion::Three,
        }
    }

    /// Returns the module name, if set.
    pub fn module_name(&self) -> Option<&str> {
        match self {
            ModuleStream::V1(s) => s.module_name.as_deref(),
            ModuleStream::V2(s) => s.module_name.as_deref(),
            ModuleStream::V3(s) => s.module_name.as_deref(),
        }
    }

    /// Sets the module name.
    pub fn set_module_name(&mut self, name: impl Into<String>) {
        let name = Some(name.into());
        match self {
            ModuleStream::V1(s) => s.module_name = name,
            ModuleStream::V2(s) => s.module_name = name,
            ModuleStream::V3(s) => s.module_name = name,
        }
    }

    /// Returns the stream name, if set.
    pub fn stream_name(&self) -> Option<&str> {
        match self {
            ModuleStream::V1(s) => s.stream_name.as_deref(),
            ModuleStream::V2(s) => s.stream_name.as_deref(),
            ModuleStream::V3(s) => s.stream_name.as_deref(),
        }
    }

    /// Sets the stream name.
    pub fn set_stream_name(&mut self, name: impl Into<String>) {
        let name = Some(name.into());
        match self {
            ModuleStream::V1(s) => s.stream_name = name,
            ModuleStream::V2(s) => s.stream_name = name,
            ModuleStream::V3(s) => s.stream_name = name,
        }
    }

    /// Returns the stream version.
    pub fn version(&self) -> u64 {
        match self {
            ModuleStream::V1(s) => s.version,
            ModuleStream::V2(s) => s.version,
            ModuleStream::V3(s) => s.version,
        }
    }

    /// Sets the stream version.
    pub fn set_version(&mut self, version: u64) {
        match self {
            ModuleStream::V1(s) => s.version = version,
            ModuleStream::V2(s) => s.version = version,
            ModuleStream::V3(s) => s.version = version,
        }
    }

    /// Returns the build context, if set.
    pub fn context(&self) -> Option<&str> {
        match self {
            ModuleStream::V1(s) => s.context.as_deref(),
            ModuleStream::V2(s) => s.context.as_deref(),
            ModuleStream::V3(s) => s.context.as_deref(),
        }
    }

    /// Returns the architecture, if set.
    pub fn arch(&self) -> Option<&str> {
        match self {
            ModuleStream::V1(s) => s.arch.as_deref(),
            ModuleStream::V2(s) => s.arch.as_deref(),
            ModuleStream::V3(s) => s.arch.as_deref(),
        }
    }

    /// Returns the untranslated one-line summary, if set.
    pub fn summary(&self) -> Option<&str> {
        match self {
            ModuleStream::V1(s) => s.summary.as_deref(),
            ModuleStream::V2(s) => s.summary.as_deref(),
            ModuleStream::V3(s) => s.summary.as_deref(),
        }
    }

    /// Returns the untranslated long description, if set.
    pub fn description(&self) -> Option<&str> {
        match self {
            ModuleStream::V1(s) => s.description.as_deref(),
            ModuleStream::V2(s) => s.description.as_deref(),
            ModuleStream::V3(s) => s.description.as_deref(),
        }
    }

    /// Returns the canonical NSVCA identifier of this stream.
    ///
    /// Missing name components are rendered as empty segments.
    pub fn nsvca(&self) -> Nsvca {
        let mut nsvca = Nsvca::new(
            self.module_name().unwrap_or_default(),
            self.stream_name().unwrap_or_default(),
        );
        if self.version() != 0 {
            nsvca = nsvca.with_version(self.version());
        }
        if let Some(context) = self.context() {
            nsvca = nsvca.with_context(context);
        }
        if let Some(arch) = self.arch() {
            nsvca = nsvca.with_arch(arch);
        }
        nsvca
    }

    /// Returns true when two streams describe the same NSVCA.
    pub(crate) fn same_nsvca(&self, other: &ModuleStream) -> bool {
        self.stream_name() == other.stream_name()
            && self.version() == other.version()
            && self.context() == other.context()
            && self.arch() == other.arch()
    }

    /// Returns the summary translated into `locale`, falling back to
    /// the untranslated summary.
    ///
    /// The special locales `C` and `POSIX` always yield the original.
    pub fn localized_summary<'a>(
        &'a self,
        translation: Option<&'a Translation>,
        locale: &Locale,
    ) -> Option<&'a str> {
        translated(translation, locale, |entry| entry.summary.as_deref())
            .or_else(|| self.summary())
    }

    /// Returns the description translated into `locale`, falling back
    /// to the untranslated description.
    pub fn localized_description<'a>(
        &'a self,
        translation: Option<&'a Translation>,
        locale: &Locale,
    ) -> Option<&'a str> {
        translated(translation, locale, |entry| entry.description.as_deref())
            .or_else(|| self.description())
    }

    /// Returns the description of `profile` translated into `locale`,
    /// falling back to the profile's own description.
    pub fn localized_profile_description<'a>(
        &'a self,
        translation: Option<&'a Translation>,
        locale: &Locale,
        profile: &str,
    ) -> Option<&'a str> {
        translated(translation, locale, |entry| {
            entry.profile_descriptions.get(profile).map(String::as_str)
        })
        .or_else(|| self.profile(profile).and_then(|p| p.description.as_deref()))
    }

    /// Returns the named profile, if the stream carries it.
    pub fn profile(&self, name: &str) -> Option<&crate::Profile> {
        match self {
            ModuleStream::V1(s) => s.profiles.get(name),
            ModuleStream::V2(s) => s.profiles.get(name),
            ModuleStream::V3(s) => s.profiles.get(name),
        }
    }

    /// Returns true when any artifact NEVRA matches the shell glob
    /// `pattern`.
    ///
    /// # Errors
    ///
    /// Returns an error if `pattern` is not a valid glob.
    pub fn includes_nevra(&self, pattern: &str) -> Result<bool, Error> {
        let pattern = glob::Pattern::new(pattern)
            .map_err(|error| Error::Validate(format!("invalid glob pattern: {error}")))?;
        let artifacts = match self {
            ModuleStream::V1(s) => &s.rpm_artifacts,
            ModuleStream::V2(s) => &s.rpm_artifacts,
            ModuleStream::V3(s) => &s.rpm_artifacts,
        };
        Ok(artifacts
            .iter()
            .any(|nevra| pattern.matches(&nevra.to_string())))
    }

    /// Returns true when the stream build-depends on `stream` of
    /// `module`.
    pub fn build_depends_on_stream(&self, module: &str, stream: &str) -> bool {
        match self {
            ModuleStream::V1(s) => s.buildrequires.get(module).map(String::as_str) == Some(stream),
            ModuleStream::V2(s) => s.build_depends_on_stream(module, stream),
            ModuleStream::V3(s) => s.build_depends_on_stream(module, stream),
        }
    }

    /// Returns true when the stream run-depends on `stream` of
    /// `module`.
    pub fn depends_on_stream(&self, module: &str, stream: &str) -> bool {
        match self {
            ModuleStream::V1(s) => s.requires.get(module).map(String::as_str) == Some(stream),
            ModuleStream::V2(s) => s.depends_on_stream(module, stream),
            ModuleStream::V3(s) => s.depends_on_stream(module, stream),
        }
    }

    /// Validates the stream's own invariants.
    pub fn validate(&self) -> Result<(), Error> {
        match self {
            ModuleStream::V1(s) => s.validate(),
            ModuleStream::V2(s) => s.validate(),
            ModuleStream::V3(s) => s.validate(),
        }
    }

    /// Parses the `data:` mapping of a `modulemd` document of the
    /// given schema version.
    pub(crate) fn parse(
        mdversion: MdVersion,
        data: &Value,
        strict: bool,
    ) -> Result<ModuleStream, Error> {
        match mdversion {
            MdVersion::One => Ok(ModuleStream::V1(ModuleStreamV1::parse(data, strict)?)),
            MdVersion::Two => Ok(ModuleStream::V2(ModuleStreamV2::parse(data, strict)?)),
            MdVersion::Three => Ok(ModuleStream::V3(ModuleStreamV3::parse(data, strict)?)),
        }
    }

    /// Emits the document, including its `document:`/`version:` header.
    pub(crate) fn emit(&self, writer: &mut YamlWriter) {
        match self {
            ModuleStream::V1(s) => s.emit(writer),
            ModuleStream::V2(s) => s.emit(writer),
            ModuleStream::V3(s) => s.emit(writer),
        }
    }

    /// Reads a single module stream document from a string.
    ///
    /// Accepts `modulemd` and `modulemd-packager` documents; the
    /// latter are lowered to a v2 stream. When `module_name` or
    /// `stream_name` are given they override any value parsed from the
    /// document, which is how nameless packager fragments receive
    /// their identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the input does not contain exactly one
    /// module stream or packager document, or if that document fails
    /// to parse.
    pub fn read_string(
        yaml: &str,
        strict: bool,
        module_name: Option<&str>,
        stream_name: Option<&str>,
    ) -> Result<ModuleStream, Error> {
        let (documents, mut failures) = subdocument::parse_string(yaml, strict)?;
        if let Some(failure) = failures.pop() {
            return Err(failure.into_error());
        }
        let mut streams: Vec<ModuleStream> = documents
            .into_iter()
            .map(|document| match document {
                Document::Stream(stream) => Ok(Some(stream)),
                Document::Packager(packager) => {
                    packager.to_stream_v2().map(|(stream, _)| Some(stream))
                }
                _ => Ok(None),
            })
            .collect::<Result<Vec<_>, Error>>()?
            .into_iter()
            .flatten()
            .collect();
        if streams.len() != 1 {
            return Err(Error::parse(
                "top level",
                format!(
                    "expected exactly one module stream document, found {}",
                    streams.len()
                ),
            ));
        }
        let mut stream = streams.remove(0);
        if let Some(module_name) = module_name {
            stream.set_module_name(module_name);
        }
        if let Some(stream_name) = stream_name {
            stream.set_stream_name(stream_name);
        }
        Ok(stream)
    }

    /// Reads a single module stream document from a file.
    ///
    /// # Errors
    ///
    /// Returns an error under the same conditions as
    /// [`ModuleStream::read_string`], or if the file cannot be read.
    pub fn read_file(
        path: impl AsRef<Path>,
        strict: bool,
        module_name: Option<&str>,
        stream_name: Option<&str>,
    ) -> Result<ModuleStream, Error> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| {
            Error::FileAccess(PathBuf::from(path), "opening module stream document", source)
        })?;
        Self::read_stream(file, strict, module_name, stream_name)
    }

    /// Reads a single module stream document from a reader.
    ///
    /// # Errors
    ///
    /// Returns an error under the same conditions as
    /// [`ModuleStream::read_string`], or if the reader fails.
    pub fn read_stream(
        mut reader: impl std::io::Read,
        strict: bool,
        module_name: Option<&str>,
        stream_name: Option<&str>,
    ) -> Result<ModuleStream, Error> {
        let mut buf = String::new();
        reader
            .read_to_string(&mut buf)
            .map_err(|source| Error::Io {
                context: "reading module stream document",
                source,
            })?;
        Self::read_string(&buf, strict, module_name, stream_name)
    }
}

/// Looks up a translated string for `locale`.
///
/// The special locales `C` and `POSIX` never translate.
fn translated<'a>(
    translation: Option<&'a Translation>,
    locale: &Locale,
    select: impl Fn(&'a crate::TranslationEntry) -> Option<&'a str>,
) -> Option<&'a str> {
    if locale.as_str() == "C" || locale.as_str() == "POSIX" {
        return None;
    }
    translation
        .and_then(|translation| translation.entry(locale))
        .and_then(select)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use testresult::TestResult;

    use super::*;

    const STREAM: &str = r#"
document: modulemd
version: 2
data:
  name: foo
  stream: "1.0"
  version: 5
  context: deadbeef
  arch: x86_64
  summary: An example module
  description: An example module.
  license:
    module: [MIT]
"#;

    #[rstest]
    fn read_string_reads_one_stream() -> TestResult {
        let stream = ModuleStream::read_string(STREAM, true, None, None)?;
        assert_eq!(stream.mdversion(), MdVersion::Two);
        assert_eq!(stream.nsvca().to_string(), "foo:1.0:5:deadbeef:x86_64");
        Ok(())
    }

    #[rstest]
    fn read_string_applies_name_overrides() -> TestResult {
        let stream = ModuleStream::read_string(STREAM, true, Some("bar"), Some("rolling"))?;
        assert_eq!(stream.module_name(), Some("bar"));
        assert_eq!(stream.stream_name(), Some("rolling"));
        Ok(())
    }

    #[rstest]
    fn localized_lookups_fall_back() -> TestResult {
        let stream = ModuleStream::read_string(STREAM, true, None, None)?;
        let mut translation = Translation::new("foo", "1.0");
        translation.modified = 1;
        let locale = Locale::from_str("cs_CZ")?;
        translation.entries.insert(
            locale.clone(),
            crate::TranslationEntry {
                locale: Some(locale.clone()),
                summary: Some("ahoj".to_string()),
                ..crate::TranslationEntry::default()
            },
        );

        assert_eq!(
            stream.localized_summary(Some(&translation), &locale),
            Some("ahoj")
        );
        assert_eq!(
            stream.localized_summary(Some(&translation), &Locale::from_str("en_US")?),
            Some("An example module")
        );
        assert_eq!(
            stream.localized_summary(Some(&translation), &Locale::from_str("C")?),
            Some("An example module")
        );
        assert_eq!(stream.localized_summary(None, &locale), Some("An example module"));
        Ok(())
    }
}
