//! Deterministic block-style YAML emission.
//!
//! The writer produces two-space indented block YAML with a fixed set
//! of scalar rules: strings that are empty, look numeric or equal a
//! reserved word are double-quoted, multi-line strings become literal
//! block scalars, and callers can force quoting for keys whose values
//! must never be re-interpreted by downstream parsers (`stream:`).

/// The YAML reserved words that require quoting when used as a string.
const RESERVED: [&str; 4] = ["true", "false", "null", "~"];

/// Returns true when `value` looks like a decimal integer or float.
fn looks_numeric(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    if digits.is_empty() {
        return false;
    }
    match digits.split_once('.') {
        Some((whole, frac)) => {
            !whole.is_empty()
                && !frac.is_empty()
                && whole.chars().all(|c| c.is_ascii_digit())
                && frac.chars().all(|c| c.is_ascii_digit())
        }
        None => digits.chars().all(|c| c.is_ascii_digit()),
    }
}

/// Returns true when `value` cannot be emitted as a plain scalar.
fn needs_quoting(value: &str) -> bool {
    if value.is_empty() || looks_numeric(value) || RESERVED.contains(&value) {
        return true;
    }
    if value.starts_with(char::is_whitespace) || value.ends_with(char::is_whitespace) {
        return true;
    }
    if value.ends_with(':') || value.contains(": ") || value.contains(" #") {
        return true;
    }
    let first = value.chars().next().unwrap_or(' ');
    if "-?:,[]{}#&*!|>'\"%@`".contains(first) {
        return true;
    }
    value
        .chars()
        .any(|c| c.is_control() || matches!(c, '\t' | '\n'))
}

/// Escapes `value` for a double-quoted scalar.
fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            '\r' => escaped.push_str("\\r"),
            c if c.is_control() => escaped.push_str(&format!("\\u{:04x}", c as u32)),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Renders a scalar, quoting it when the plain form would be unsafe.
fn scalar(value: &str) -> String {
    if needs_quoting(value) {
        format!("\"{}\"", escape(value))
    } else {
        value.to_string()
    }
}

/// A deterministic block-style YAML writer.
///
/// Indentation is two spaces per nesting level. Sequence items are
/// emitted at the indentation of their key, nested mappings one level
/// deeper. The writer is infallible; I/O happens only when the
/// finished buffer is handed to a sink.
#[derive(Debug)]
pub(crate) struct YamlWriter {
    out: String,
    indent: usize,
    dash_pending: bool,
}

impl YamlWriter {
    /// Creates an empty writer.
    pub(crate) fn new() -> YamlWriter {
        YamlWriter {
            out: String::new(),
            indent: 0,
            dash_pending: false,
        }
    }

    /// Returns the accumulated YAML text.
    pub(crate) fn into_string(self) -> String {
        self.out
    }

    /// Starts a new document.
    pub(crate) fn doc_start(&mut self) {
        self.out.push_str("---\n");
    }

    /// Terminates the stream.
    pub(crate) fn stream_end(&mut self) {
        self.out.push_str("...\n");
    }

    fn line(&mut self, text: &str) {
        if self.dash_pending {
            for _ in 0..self.indent.saturating_sub(2) {
                self.out.push(' ');
            }
            self.out.push_str("- ");
            self.dash_pending = false;
        } else {
            for _ in 0..self.indent {
                self.out.push(' ');
            }
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    /// Emits `key: value` with automatic scalar quoting.
    ///
    /// Multi-line values become literal block scalars. Values that a
    /// literal block cannot represent faithfully (leading newline,
    /// several trailing newlines, indented first line) fall back to a
    /// double-quoted scalar.
    pub(crate) fn entry(&mut self, key: &str, value: &str) {
        if value.contains('\n') {
            let (indicator, content) = match value.strip_suffix('\n') {
                Some(content) if !content.ends_with('\n') => ("|", content),
                None => ("|-", value),
                Some(_) => ("", ""),
            };
            if !indicator.is_empty()
                && !content.starts_with('\n')
                && !content.starts_with(' ')
            {
                self.line(&format!("{}: {indicator}", scalar(key)));
                let content = content.to_string();
                for raw in content.split('\n') {
                    if raw.is_empty() {
                        self.out.push('\n');
                    } else {
                        for _ in 0..self.indent + 2 {
                            self.out.push(' ');
                        }
                        self.out.push_str(raw);
                        self.out.push('\n');
                    }
                }
                return;
            }
        }
        self.line(&format!("{}: {}", scalar(key), scalar(value)));
    }

    /// Emits `key: "value"` with forced double quoting.
    pub(crate) fn quoted_entry(&mut self, key: &str, value: &str) {
        self.line(&format!("{}: \"{}\"", scalar(key), escape(value)));
    }

    /// Emits `key: null`.
    pub(crate) fn null_entry(&mut self, key: &str) {
        self.line(&format!("{}: null", scalar(key)));
    }

    /// Emits an unsigned integer entry.
    pub(crate) fn u64_entry(&mut self, key: &str, value: u64) {
        self.line(&format!("{}: {value}", scalar(key)));
    }

    /// Emits a signed integer entry.
    pub(crate) fn i64_entry(&mut self, key: &str, value: i64) {
        self.line(&format!("{}: {value}", scalar(key)));
    }

    /// Emits a floating point entry.
    pub(crate) fn f64_entry(&mut self, key: &str, value: f64) {
        self.line(&format!("{}: {value:?}", scalar(key)));
    }

    /// Emits a boolean entry.
    pub(crate) fn bool_entry(&mut self, key: &str, value: bool) {
        self.line(&format!("{}: {value}", scalar(key)));
    }

    /// Opens a nested mapping under `key`.
    pub(crate) fn begin_map(&mut self, key: &str) {
        self.line(&format!("{}:", scalar(key)));
        self.indent += 2;
    }

    /// Closes the innermost mapping.
    pub(crate) fn end_map(&mut self) {
        self.indent = self.indent.saturating_sub(2);
    }

    /// Emits a block sequence of scalars under `key`.
    ///
    /// Items are emitted in iteration order; callers pass ordered
    /// collections.
    pub(crate) fn string_seq<'a>(
        &mut self,
        key: &str,
        items: impl IntoIterator<Item = &'a str>,
    ) {
        let mut items = items.into_iter().peekable();
        if items.peek().is_none() {
            // An empty set is meaningful (e.g. "any stream"), a bare
            // key would read back as null.
            self.line(&format!("{}: []", scalar(key)));
            return;
        }
        self.line(&format!("{}:", scalar(key)));
        for item in items {
            self.line(&format!("- {}", scalar(item)));
        }
    }

    /// Opens a block sequence under `key`; items follow via
    /// [`YamlWriter::begin_seq_item`].
    pub(crate) fn begin_seq(&mut self, key: &str) {
        self.line(&format!("{}:", scalar(key)));
    }

    /// Opens a mapping item of the innermost sequence.
    pub(crate) fn begin_seq_item(&mut self) {
        self.indent += 2;
        self.dash_pending = true;
    }

    /// Closes a mapping item of the innermost sequence.
    pub(crate) fn end_seq_item(&mut self) {
        self.indent = self.indent.saturating_sub(2);
        self.dash_pending = false;
    }
}

/// Emits an extensible metadata value under `key`, preserving its
/// nested shape.
pub(crate) fn emit_xmd(writer: &mut YamlWriter, key: &str, value: &modulemd_types::Xmd) {
    use modulemd_types::Xmd;

    match value {
        Xmd::Null => writer.null_entry(key),
        Xmd::Bool(b) => writer.bool_entry(key, *b),
        Xmd::Int(i) => writer.i64_entry(key, *i),
        Xmd::Float(f) => writer.f64_entry(key, *f),
        Xmd::Str(s) => writer.entry(key, s),
        Xmd::Seq(seq) => {
            if seq.is_empty() {
                writer.line(&format!("{}: []", scalar(key)));
                return;
            }
            writer.begin_seq(key);
            for item in seq {
                emit_xmd_item(writer, item);
            }
        }
        Xmd::Map(map) => {
            if map.is_empty() {
                writer.line(&format!("{}: {{}}", scalar(key)));
                return;
            }
            writer.begin_map(key);
            for (key, value) in map {
                emit_xmd(writer, key, value);
            }
            writer.end_map();
        }
    }
}

/// Emits one sequence item of an extensible metadata value.
fn emit_xmd_item(writer: &mut YamlWriter, value: &modulemd_types::Xmd) {
    use modulemd_types::Xmd;

    match value {
        Xmd::Null => writer.line("- null"),
        Xmd::Bool(b) => writer.line(&format!("- {b}")),
        Xmd::Int(i) => writer.line(&format!("- {i}")),
        Xmd::Float(f) => writer.line(&format!("- {f:?}")),
        Xmd::Str(s) => writer.line(&format!("- {}", scalar(s))),
        Xmd::Seq(seq) => {
            writer.begin_seq_item();
            if seq.is_empty() {
                writer.line("[]");
            }
            for item in seq {
                emit_xmd_item(writer, item);
            }
            writer.end_seq_item();
        }
        Xmd::Map(map) => {
            writer.begin_seq_item();
            if map.is_empty() {
                writer.line("{}");
            }
            for (key, value) in map {
                emit_xmd(writer, key, value);
            }
            writer.end_seq_item();
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("plain", false)]
    #[case("An example module.", false)]
    #[case("https://example.org/docs", false)]
    #[case("", true)]
    #[case("5.30", true)]
    #[case("-12", true)]
    #[case("true", true)]
    #[case("~", true)]
    #[case("trailing:", true)]
    #[case("a: b", true)]
    #[case(" leading", true)]
    fn scalar_quoting(#[case] input: &str, #[case] quoted: bool) {
        assert_eq!(needs_quoting(input), quoted, "{input:?}");
    }

    #[rstest]
    fn writer_nests_maps_and_seqs() {
        let mut writer = YamlWriter::new();
        writer.doc_start();
        writer.entry("document", "modulemd");
        writer.u64_entry("version", 2);
        writer.begin_map("data");
        writer.quoted_entry("stream", "5.30");
        writer.begin_seq("dependencies");
        writer.begin_seq_item();
        writer.begin_map("buildrequires");
        writer.string_seq("platform", ["f33"]);
        writer.end_map();
        writer.begin_map("requires");
        writer.string_seq("platform", ["f33"]);
        writer.end_map();
        writer.end_seq_item();
        writer.end_map();
        writer.stream_end();

        assert_eq!(
            writer.into_string(),
            r#"---
document: modulemd
version: 2
data:
  stream: "5.30"
  dependencies:
  - buildrequires:
      platform:
      - f33
    requires:
      platform:
      - f33
...
"#
        );
    }

    #[rstest]
    fn writer_emits_literal_blocks() {
        let mut writer = YamlWriter::new();
        writer.begin_map("buildopts");
        writer.begin_map("rpms");
        writer.entry("macros", "%demomacro 1\n%demomacro2 %{demomacro}23\n");
        writer.end_map();
        writer.end_map();

        assert_eq!(
            writer.into_string(),
            "buildopts:\n  rpms:\n    macros: |\n      %demomacro 1\n      %demomacro2 %{demomacro}23\n"
        );
    }
}
