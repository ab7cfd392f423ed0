//! Obsoletes documents: deprecation records for a stream.

use modulemd_types::EolDate;
use serde_yaml::Value;

use crate::Error;
use crate::yaml::emit::YamlWriter;
use crate::yaml::parse;

/// The replacement a deprecated stream points its users at.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ObsoletedBy {
    /// The replacing module.
    pub module_name: Option<String>,
    /// The replacing stream.
    pub stream_name: Option<String>,
}

/// A deprecation record pointing users away from a stream.
///
/// `modified` is a monotonically increasing `YYYYMMDDhhmm`-style
/// stamp; the newest record for a stream is authoritative, and a
/// record with `reset` discards all previous records for the stream.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Obsoletes {
    /// The monotonic last-modified stamp.
    pub modified: u64,
    /// The module the record applies to.
    pub module_name: Option<String>,
    /// The stream the record applies to.
    pub stream_name: Option<String>,
    /// The build context the record is narrowed to, if any.
    pub context: Option<String>,
    /// The message shown to users of the obsoleted stream.
    pub message: Option<String>,
    /// The day the stream goes end-of-life; active immediately when
    /// absent.
    pub eol_date: Option<EolDate>,
    /// The replacement stream, if any.
    pub obsoleted_by: Option<ObsoletedBy>,
    /// Whether this record withdraws all earlier records for the
    /// stream.
    pub reset: bool,
}

impl Obsoletes {
    /// Creates an empty [`Obsoletes`] for a module stream.
    pub fn new(
        modified: u64,
        module_name: impl Into<String>,
        stream_name: impl Into<String>,
    ) -> Obsoletes {
        Obsoletes {
            modified,
            module_name: Some(module_name.into()),
            stream_name: Some(stream_name.into()),
            ..Obsoletes::default()
        }
    }

    /// Parses the `data:` mapping of a `modulemd-obsoletes` document.
    pub(crate) fn parse(data: &Value, strict: bool) -> Result<Obsoletes, Error> {
        let path = "data";
        let mut obsoletes = Obsoletes::default();
        for (raw_key, raw_value) in parse::mapping(data, path)? {
            let key = parse::key(raw_key, path)?;
            let key_path = parse::child(path, &key);
            match key.as_str() {
                "modified" => obsoletes.modified = parse::u64(raw_value, &key_path)?,
                "module" => obsoletes.module_name = Some(parse::string(raw_value, &key_path)?),
                "stream" => obsoletes.stream_name = Some(parse::string(raw_value, &key_path)?),
                "context" => obsoletes.context = Some(parse::string(raw_value, &key_path)?),
                "message" => obsoletes.message = Some(parse::string(raw_value, &key_path)?),
                "eol_date" => obsoletes.eol_date = Some(parse::date(raw_value, &key_path)?),
                "reset" => obsoletes.reset = parse::bool(raw_value, &key_path)?,
                "obsoleted_by" => {
                    let mut obsoleted_by = ObsoletedBy::default();
                    for (raw_key, raw_value) in parse::mapping(raw_value, &key_path)? {
                        let field = parse::key(raw_key, &key_path)?;
                        let field_path = parse::child(&key_path, &field);
                        match field.as_str() {
                            "module" => {
                                obsoleted_by.module_name =
                                    Some(parse::string(raw_value, &field_path)?);
                            }
                            "stream" => {
                                obsoleted_by.stream_name =
                                    Some(parse::string(raw_value, &field_path)?);
                            }
                            _ => parse::unknown_key(strict, &key_path, &field)?,
                        }
                    }
                    obsoletes.obsoleted_by = Some(obsoleted_by);
                }
                _ => parse::unknown_key(strict, path, &key)?,
            }
        }
        if obsoletes.modified == 0 {
            return Err(parse::missing(path, "modified"));
        }
        if obsoletes.module_name.is_none() {
            return Err(parse::missing(path, "module"));
        }
        if obsoletes.stream_name.is_none() {
            return Err(parse::missing(path, "stream"));
        }
        if obsoletes.message.is_none() && !obsoletes.reset {
            return Err(parse::missing(path, "message"));
        }
        Ok(obsoletes)
    }

    /// Emits the document, including its `document:`/`version:` header.
    pub(crate) fn emit(&self, writer: &mut YamlWriter) {
        writer.doc_start();
        writer.entry("document", "modulemd-obsoletes");
        writer.u64_entry("version", 1);
        writer.begin_map("data");
        writer.u64_entry("modified", self.modified);
        if self.reset {
            writer.bool_entry("reset", true);
        }
        if let Some(module) = &self.module_name {
            writer.entry("module", module);
        }
        if let Some(stream) = &self.stream_name {
            writer.quoted_entry("stream", stream);
        }
        if let Some(context) = &self.context {
            writer.entry("context", context);
        }
        if let Some(message) = &self.message {
            writer.entry("message", message);
        }
        if let Some(eol_date) = &self.eol_date {
            writer.entry("eol_date", &eol_date.to_string());
        }
        if let Some(obsoleted_by) = &self.obsoleted_by {
            writer.begin_map("obsoleted_by");
            if let Some(module) = &obsoleted_by.module_name {
                writer.entry("module", module);
            }
            if let Some(stream) = &obsoleted_by.stream_name {
                writer.quoted_entry("stream", stream);
            }
            writer.end_map();
        }
        writer.end_map();
    }

    /// Returns true when this record applies to the given stream and
    /// context.
    pub(crate) fn applies_to(&self, stream_name: &str, context: Option<&str>) -> bool {
        if self.stream_name.as_deref() != Some(stream_name) {
            return false;
        }
        match (&self.context, context) {
            (Some(own), Some(context)) => own == context,
            (Some(_), None) => false,
            (None, _) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use testresult::TestResult;

    use super::*;

    const OBSOLETES: &str = r#"
modified: 202201241155
module: perl
stream: "5.30"
message: Stream is EOL, please switch.
eol_date: 2022-06-01
obsoleted_by:
  module: perl
  stream: "5.32"
"#;

    #[rstest]
    fn obsoletes_parse_replacement() -> TestResult {
        let data: Value = serde_yaml::from_str(OBSOLETES)?;
        let obsoletes = Obsoletes::parse(&data, true)?;
        assert_eq!(obsoletes.modified, 202201241155);
        assert_eq!(
            obsoletes
                .obsoleted_by
                .as_ref()
                .and_then(|o| o.stream_name.as_deref()),
            Some("5.32")
        );
        assert!(obsoletes.applies_to("5.30", None));
        assert!(!obsoletes.applies_to("5.32", None));
        Ok(())
    }

    #[rstest]
    fn obsoletes_require_message_unless_reset() {
        let data: Value =
            serde_yaml::from_str("modified: 1\nmodule: m\nstream: s").unwrap();
        assert!(Obsoletes::parse(&data, true).is_err());

        let data: Value =
            serde_yaml::from_str("modified: 1\nmodule: m\nstream: s\nreset: true").unwrap();
        assert!(Obsoletes::parse(&data, true).is_ok());
    }
}
