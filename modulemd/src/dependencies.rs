//! Version 2 dependency expressions.

use std::collections::{BTreeMap, BTreeSet};

use serde_yaml::Value;

use crate::Error;
use crate::yaml::emit::YamlWriter;
use crate::yaml::parse;

/// One parallel build/runtime dependency slice of a v2 stream.
///
/// A v2 stream carries a list of these; each entry expresses one
/// combination of build-time and run-time requirements, with a set of
/// acceptable streams per required module. An empty stream set means
/// "any stream"; a stream name prefixed with `-` excludes that stream.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Dependencies {
    /// Required modules and their acceptable streams at build time.
    pub buildrequires: BTreeMap<String, BTreeSet<String>>,
    /// Required modules and their acceptable streams at run time.
    pub requires: BTreeMap<String, BTreeSet<String>>,
}

impl Dependencies {
    /// Returns true when neither side carries a requirement.
    pub fn is_empty(&self) -> bool {
        self.buildrequires.is_empty() && self.requires.is_empty()
    }

    /// Parses one entry of a `dependencies:` list.
    pub(crate) fn parse(value: &Value, path: &str, strict: bool) -> Result<Dependencies, Error> {
        let mut dependencies = Dependencies::default();
        for (raw_key, raw_value) in parse::mapping(value, path)? {
            let key = parse::key(raw_key, path)?;
            let key_path = parse::child(path, &key);
            match key.as_str() {
                "buildrequires" => {
                    dependencies.buildrequires = parse::nested_set(raw_value, &key_path)?;
                }
                "requires" => dependencies.requires = parse::nested_set(raw_value, &key_path)?,
                _ => parse::unknown_key(strict, path, &key)?,
            }
        }
        Ok(dependencies)
    }

    /// Emits one entry of a `dependencies:` list.
    pub(crate) fn emit(&self, writer: &mut YamlWriter) {
        writer.begin_seq_item();
        if !self.buildrequires.is_empty() {
            writer.begin_map("buildrequires");
            for (module, streams) in &self.buildrequires {
                writer.string_seq(module, streams.iter().map(String::as_str));
            }
            writer.end_map();
        }
        if !self.requires.is_empty() {
            writer.begin_map("requires");
            for (module, streams) in &self.requires {
                writer.string_seq(module, streams.iter().map(String::as_str));
            }
            writer.end_map();
        }
        writer.end_seq_item();
    }
}
