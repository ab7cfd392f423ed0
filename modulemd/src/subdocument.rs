//! Subdocument splitting and routing.
//!
//! A metadata file is a sequence of `---`/`...` delimited YAML
//! subdocuments. Each subdocument carries a `document:`/`version:`
//! header that routes it to the matching variant parser. A failing
//! subdocument never aborts the stream: its raw slice and error are
//! captured in a [`SubdocumentInfo`] and parsing continues.

use std::str::FromStr;

use serde_yaml::Value;
use strum::{Display, EnumString};

use crate::defaults::{Defaults, DefaultsV1};
use crate::module_stream::ModuleStream;
use crate::obsoletes::Obsoletes;
use crate::packager::{Packager, PackagerV2, PackagerV3};
use crate::translation::Translation;
use crate::yaml::parse;
use crate::Error;

/// The known document types of the metadata family.
#[derive(Clone, Copy, Debug, Display, EnumString, Eq, PartialEq)]
pub enum DocumentType {
    /// A module stream document.
    #[strum(serialize = "modulemd")]
    ModuleStream,
    /// A defaults document.
    #[strum(serialize = "modulemd-defaults")]
    Defaults,
    /// A translations document.
    #[strum(serialize = "modulemd-translations")]
    Translations,
    /// A packager authoring document.
    #[strum(serialize = "modulemd-packager")]
    Packager,
    /// An obsoletes document.
    #[strum(serialize = "modulemd-obsoletes")]
    Obsoletes,
}

/// The outcome record of parsing one subdocument.
///
/// Carries whatever header information could be read, the raw YAML
/// slice and, for failed subdocuments, the parse error. The record
/// owns its data and may outlive the parse session.
#[derive(Debug)]
pub struct SubdocumentInfo {
    doctype: Option<DocumentType>,
    mdversion: Option<u64>,
    yaml: String,
    line: usize,
    error: Option<Error>,
}

impl SubdocumentInfo {
    fn new(
        doctype: Option<DocumentType>,
        mdversion: Option<u64>,
        yaml: String,
        line: usize,
        error: Option<Error>,
    ) -> SubdocumentInfo {
        SubdocumentInfo {
            doctype,
            mdversion,
            yaml,
            line,
            error,
        }
    }

    /// Returns the document type, if the header could be read.
    pub fn document_type(&self) -> Option<DocumentType> {
        self.doctype
    }

    /// Returns the schema version, if the header could be read.
    pub fn mdversion(&self) -> Option<u64> {
        self.mdversion
    }

    /// Returns the raw YAML slice of the subdocument.
    pub fn yaml(&self) -> &str {
        &self.yaml
    }

    /// Returns the line the subdocument starts at in the input
    /// (1-based).
    pub fn line(&self) -> usize {
        self.line
    }

    /// Returns the parse error, if the subdocument failed.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Consumes the record and returns its error.
    pub fn into_error(self) -> Error {
        self.error.unwrap_or_else(|| {
            Error::parse("top level", "subdocument failed without a recorded error")
        })
    }
}

/// A successfully routed and parsed subdocument.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Document {
    /// A `modulemd` document.
    Stream(ModuleStream),
    /// A `modulemd-defaults` document.
    Defaults(Defaults),
    /// A `modulemd-translations` document.
    Translation(Translation),
    /// A `modulemd-packager` document.
    Packager(Packager),
    /// A `modulemd-obsoletes` document.
    Obsoletes(Obsoletes),
}

/// A parsed subdocument together with its outcome record.
#[derive(Debug)]
pub(crate) struct ParsedDocument {
    pub(crate) document: Document,
    pub(crate) doctype: DocumentType,
    pub(crate) yaml: String,
    pub(crate) line: usize,
}

impl ParsedDocument {
    /// Converts this successfully parsed subdocument into a failure
    /// record, used when a later step (validation, insertion) rejects
    /// it.
    pub(crate) fn into_failure(self, error: Error) -> SubdocumentInfo {
        let mdversion = match &self.document {
            Document::Stream(stream) => stream.mdversion().as_u64(),
            Document::Defaults(defaults) => defaults.mdversion(),
            Document::Translation(_) | Document::Obsoletes(_) => 1,
            Document::Packager(packager) => packager.mdversion(),
        };
        SubdocumentInfo::new(
            Some(self.doctype),
            Some(mdversion),
            self.yaml,
            self.line,
            Some(error),
        )
    }
}

/// Splits a multi-document YAML string into `(starting line, slice)`
/// pairs.
///
/// Slices keep their leading `---` marker; segments containing only
/// blank lines and comments are dropped.
fn split_documents(input: &str) -> Vec<(usize, String)> {
    let mut documents = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut start = 1;
    let mut saw_content = false;

    let mut flush =
        |current: &mut Vec<&str>, start: usize, saw_content: bool| {
            if saw_content {
                let mut yaml = current.join("\n");
                yaml.push('\n');
                documents.push((start, yaml));
            }
            current.clear();
        };

    for (index, line) in input.lines().enumerate() {
        let lineno = index + 1;
        if line == "---" || line.starts_with("--- ") {
            flush(&mut current, start, saw_content);
            start = lineno;
            current.push(line);
            saw_content = line.len() > 4;
        } else if line == "..." || line.starts_with("... ") {
            flush(&mut current, start, saw_content);
            start = lineno + 1;
            saw_content = false;
        } else {
            if current.is_empty() {
                start = lineno;
            }
            let trimmed = line.trim();
            if !trimmed.is_empty() && !trimmed.starts_with('#') {
                saw_content = true;
            }
            current.push(line);
        }
    }
    flush(&mut current, start, saw_content);
    documents
}

/// Parses every subdocument of `input`.
///
/// Returns the successfully parsed documents and the failure records;
/// a single bad subdocument never aborts the whole stream.
pub(crate) fn parse_string(
    input: &str,
    strict: bool,
) -> Result<(Vec<Document>, Vec<SubdocumentInfo>), Error> {
    let (parsed, failures) = parse_string_with_info(input, strict)?;
    Ok((parsed.into_iter().map(|p| p.document).collect(), failures))
}

/// Parses every subdocument of `input`, keeping per-document outcome
/// records for the successes as well.
pub(crate) fn parse_string_with_info(
    input: &str,
    strict: bool,
) -> Result<(Vec<ParsedDocument>, Vec<SubdocumentInfo>), Error> {
    let mut parsed = Vec::new();
    let mut failures = Vec::new();
    for (line, yaml) in split_documents(input) {
        match parse_subdocument(&yaml, line, strict) {
            Ok((doctype, document)) => parsed.push(ParsedDocument {
                document,
                doctype,
                yaml,
                line,
            }),
            Err((doctype, mdversion, error)) => {
                failures.push(SubdocumentInfo::new(
                    doctype,
                    mdversion,
                    yaml,
                    line,
                    Some(error),
                ));
            }
        }
    }
    Ok((parsed, failures))
}

type HeaderFailure = (Option<DocumentType>, Option<u64>, Error);

/// Parses one subdocument, routing it by its header.
fn parse_subdocument(
    yaml: &str,
    start_line: usize,
    strict: bool,
) -> Result<(DocumentType, Document), HeaderFailure> {
    let mut doctype = None;
    let mut mdversion = None;

    let result = route_subdocument(yaml, start_line, strict, &mut doctype, &mut mdversion);
    match result {
        Ok(document) => Ok((doctype.expect("doctype is set on success"), document)),
        Err(error) => Err((doctype, mdversion, error)),
    }
}

fn route_subdocument(
    yaml: &str,
    start_line: usize,
    strict: bool,
    doctype: &mut Option<DocumentType>,
    mdversion: &mut Option<u64>,
) -> Result<Document, Error> {
    let value: Value = serde_yaml::from_str(yaml)
        .map_err(|error| Error::from_backend(error, start_line.saturating_sub(1)))?;
    let path = "top level";
    let mut raw_doctype = None;
    let mut data = None;
    for (raw_key, raw_value) in parse::mapping(&value, path)? {
        let key = parse::key(raw_key, path)?;
        match key.as_str() {
            "document" => raw_doctype = Some(parse::string(raw_value, "document")?),
            "version" => *mdversion = Some(parse::u64(raw_value, "version")?),
            "data" => data = Some(raw_value),
            _ => parse::unknown_key(strict, path, &key)?,
        }
    }

    let raw_doctype = raw_doctype.ok_or_else(|| parse::missing(path, "document"))?;
    let routed = DocumentType::from_str(&raw_doctype).map_err(|_| {
        Error::parse("document", format!("unknown document type {raw_doctype:?}"))
    })?;
    *doctype = Some(routed);
    let version = mdversion.ok_or_else(|| parse::missing(path, "version"))?;
    let data = data.ok_or_else(|| parse::missing(path, "data"))?;

    match (routed, version) {
        (DocumentType::ModuleStream, 1..=3) => {
            let mdversion = modulemd_types::MdVersion::try_from(version)
                .expect("range checked by match arm");
            Ok(Document::Stream(ModuleStream::parse(
                mdversion, data, strict,
            )?))
        }
        (DocumentType::Defaults, 1) => Ok(Document::Defaults(Defaults::V1(DefaultsV1::parse(
            data, strict,
        )?))),
        (DocumentType::Translations, 1) => {
            Ok(Document::Translation(Translation::parse(data, strict)?))
        }
        (DocumentType::Packager, 2) => Ok(Document::Packager(Packager::V2(PackagerV2::parse(
            data, strict,
        )?))),
        (DocumentType::Packager, 3) => Ok(Document::Packager(Packager::V3(PackagerV3::parse(
            data, strict,
        )?))),
        (DocumentType::Obsoletes, 1) => Ok(Document::Obsoletes(Obsoletes::parse(data, strict)?)),
        (routed, version) => Err(Error::parse(
            "version",
            format!("unsupported version {version} for document type {routed}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use testresult::TestResult;

    use super::*;

    #[rstest]
    fn split_tracks_starting_lines() {
        let input = "---\na: 1\n...\n---\nb: 2\n";
        let documents = split_documents(input);
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].0, 1);
        assert_eq!(documents[0].1, "---\na: 1\n");
        assert_eq!(documents[1].0, 4);
    }

    #[rstest]
    fn split_keeps_undelimited_first_document() {
        let documents = split_documents("a: 1\n---\nb: 2\n");
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].1, "a: 1\n");
    }

    #[rstest]
    fn split_drops_comment_only_segments() {
        let documents = split_documents("# header comment\n---\na: 1\n");
        assert_eq!(documents.len(), 1);
    }

    #[rstest]
    fn router_captures_bad_subdocument_and_continues() -> TestResult {
        let input = r#"---
document: modulemd-defaults
version: 1
data:
  module: foo
  stream: latest
...
---
document: modulemd-defaults
version: 1
data: "not a map"
...
"#;
        let (documents, failures) = parse_string(input, true)?;
        assert_eq!(documents.len(), 1);
        assert_eq!(failures.len(), 1);
        let failure = &failures[0];
        assert_eq!(failure.document_type(), Some(DocumentType::Defaults));
        assert_eq!(failure.mdversion(), Some(1));
        assert_eq!(failure.line(), 8);
        assert!(failure.yaml().contains("not a map"));
        assert!(failure.error().is_some());
        Ok(())
    }

    #[rstest]
    #[case("document: modulemd-defaults\ndata: {module: foo}", "version")]
    #[case("version: 1\ndata: {module: foo}", "document")]
    #[case("document: modulemd-defaults\nversion: 1", "data")]
    fn router_requires_header_keys(#[case] input: &str, #[case] key: &str) -> TestResult {
        let (documents, failures) = parse_string(input, true)?;
        assert!(documents.is_empty());
        assert_eq!(failures.len(), 1);
        assert!(failures[0].error().unwrap().to_string().contains(key));
        Ok(())
    }

    #[rstest]
    fn router_rejects_unknown_doctype() -> TestResult {
        let (_, failures) =
            parse_string("document: modulemd-unknown\nversion: 1\ndata: {}", true)?;
        assert_eq!(failures.len(), 1);
        assert!(failures[0].document_type().is_none());
        Ok(())
    }

    #[rstest]
    fn router_rejects_unsupported_version() -> TestResult {
        let (_, failures) = parse_string("document: modulemd\nversion: 4\ndata: {}", true)?;
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].document_type(), Some(DocumentType::ModuleStream));
        assert_eq!(failures[0].mdversion(), Some(4));
        Ok(())
    }
}
