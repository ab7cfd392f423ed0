//! Schema-aware YAML plumbing.
//!
//! The [`parse`] module provides typed readers that interpret
//! [`serde_yaml::Value`] trees while tracking the dotted key path for
//! error reporting. The [`emit`] module provides a deterministic block
//! emitter implementing the quoting and ordering rules of the document
//! family.

pub(crate) mod emit;
pub(crate) mod parse;
