use std::path::PathBuf;

use thiserror::Error;

/// The Error that can occur when working with module metadata documents.
///
/// Schema mismatches reference the offending value by its dotted key
/// path from the subdocument root (e.g.
/// `data.components.rpms.bar.buildorder`); syntax errors carry the
/// line and column reported by the YAML backend.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// I/O error with path info for context.
    #[error("I/O error at path {0:?} while {1}:\n{2}")]
    FileAccess(PathBuf, &'static str, std::io::Error),

    /// I/O error while reading from or writing to a stream.
    #[error("I/O error while {context}:\n{source}")]
    Io {
        /// The context in which the error occurred.
        ///
        /// This is meant to complete the sentence "I/O error while ".
        context: &'static str,
        /// The error source.
        source: std::io::Error,
    },

    /// The byte stream is not valid YAML.
    #[error("Invalid YAML at line {line}, column {column}:\n{message}")]
    YamlUnparseable {
        /// The line the YAML backend reported (1-based, 0 when unknown).
        line: usize,
        /// The column the YAML backend reported (1-based, 0 when unknown).
        column: usize,
        /// The backend's error message.
        message: String,
    },

    /// The YAML is well-formed but does not match the document schema.
    #[error("YAML schema mismatch at {path}: {message}")]
    YamlParse {
        /// Dotted key path from the subdocument root.
        path: String,
        /// What was expected at that path.
        message: String,
    },

    /// A YAML emitter output failure.
    #[error("Failed to emit YAML while {0}:\n{1}")]
    YamlEmit(&'static str, std::io::Error),

    /// An unrecognized key was encountered in strict parse mode.
    #[error("Unknown attribute {key:?} at {path}")]
    UnknownAttribute {
        /// Dotted key path of the mapping holding the key.
        path: String,
        /// The unrecognized key.
        key: String,
    },

    /// A mandatory attribute is absent.
    #[error("Missing required attribute {key:?} at {path}")]
    MissingRequired {
        /// Dotted key path of the mapping the attribute is missing from.
        path: String,
        /// The missing key.
        key: &'static str,
    },

    /// A cross-field or cross-entity invariant is violated.
    #[error("Validation failed: {0}")]
    Validate(String),

    /// An unsupported version upgrade was requested.
    #[error("Unsupported upgrade: {0}")]
    Upgrade(String),

    /// Two merge inputs disagree at equal priority without override.
    #[error("Merge conflict in module {module}: {reason}")]
    MergeConflict {
        /// The module the conflicting documents belong to.
        module: String,
        /// The conflicting field and values.
        reason: String,
    },

    /// A search returned no matches where the caller asserted some.
    #[error("No module streams matched {0:?}")]
    NoMatches(String),

    /// A value type error.
    #[error("Module metadata type error: {0}")]
    Type(#[from] modulemd_types::Error),
}

impl Error {
    /// Creates a [`Error::YamlUnparseable`] from a backend error,
    /// shifting the reported line by the subdocument's offset in the
    /// original input.
    pub(crate) fn from_backend(error: serde_yaml::Error, line_offset: usize) -> Error {
        let (line, column) = error
            .location()
            .map(|l| (l.line() + line_offset, l.column()))
            .unwrap_or((0, 0));
        Error::YamlUnparseable {
            line,
            column,
            message: error.to_string(),
        }
    }

    /// Creates a [`Error::YamlParse`] with the given path and message.
    pub(crate) fn parse(path: impl Into<String>, message: impl Into<String>) -> Error {
        Error::YamlParse {
            path: path.into(),
            message: message.into(),
        }
    }
}
