//! Typed readers over parsed YAML values.
//!
//! Every reader takes the [`Value`] holding the data and the dotted key
//! path leading to it, and fails with [`Error::YamlParse`] on a type
//! mismatch. Mapping keys are always scalars; unknown keys are routed
//! through [`unknown_key`], which errors in strict mode and logs
//! otherwise.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use log::debug;
use modulemd_types::{EolDate, Xmd};
use serde_yaml::{Mapping, Value};

use crate::Error;

/// Returns a short human-readable name for the shape of a value.
pub(crate) fn shape(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Joins a parent path and a key into a dotted path.
pub(crate) fn child(path: &str, key: &str) -> String {
    format!("{path}.{key}")
}

/// Reads a scalar string.
///
/// Scalars that the backend resolved to numbers or booleans are taken
/// in their string representation, matching the permissive scalar
/// handling of unquoted YAML input.
pub(crate) fn string(value: &Value, path: &str) -> Result<String, Error> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(Error::parse(
            path,
            format!("expected a scalar string, found {}", shape(other)),
        )),
    }
}

/// Reads a boolean scalar.
pub(crate) fn bool(value: &Value, path: &str) -> Result<bool, Error> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s == "true" => Ok(true),
        Value::String(s) if s == "false" => Ok(false),
        other => Err(Error::parse(
            path,
            format!("expected a boolean, found {}", shape(other)),
        )),
    }
}

/// Reads an unsigned integer scalar.
pub(crate) fn u64(value: &Value, path: &str) -> Result<u64, Error> {
    match value {
        Value::Number(n) => n.as_u64().ok_or_else(|| {
            Error::parse(path, format!("expected an unsigned integer, found {n}"))
        }),
        Value::String(s) => s.parse::<u64>().map_err(|_| {
            Error::parse(path, format!("expected an unsigned integer, found {s:?}"))
        }),
        other => Err(Error::parse(
            path,
            format!("expected an unsigned integer, found {}", shape(other)),
        )),
    }
}

/// Reads a signed integer scalar.
pub(crate) fn i64(value: &Value, path: &str) -> Result<i64, Error> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| Error::parse(path, format!("expected an integer, found {n}"))),
        Value::String(s) => s
            .parse::<i64>()
            .map_err(|_| Error::parse(path, format!("expected an integer, found {s:?}"))),
        other => Err(Error::parse(
            path,
            format!("expected an integer, found {}", shape(other)),
        )),
    }
}

/// Reads a `YYYY-MM-DD` date scalar.
pub(crate) fn date(value: &Value, path: &str) -> Result<EolDate, Error> {
    let raw = string(value, path)?;
    EolDate::from_str(&raw).map_err(|error| Error::parse(path, error.to_string()))
}

/// Borrows a value as a mapping.
pub(crate) fn mapping<'a>(value: &'a Value, path: &str) -> Result<&'a Mapping, Error> {
    value.as_mapping().ok_or_else(|| {
        Error::parse(path, format!("expected a mapping, found {}", shape(value)))
    })
}

/// Borrows a value as a sequence.
pub(crate) fn sequence<'a>(value: &'a Value, path: &str) -> Result<&'a Vec<Value>, Error> {
    match value {
        Value::Sequence(seq) => Ok(seq),
        other => Err(Error::parse(
            path,
            format!("expected a sequence, found {}", shape(other)),
        )),
    }
}

/// Reads a mapping key, which must be a scalar.
pub(crate) fn key(value: &Value, path: &str) -> Result<String, Error> {
    string(value, path).map_err(|_| {
        Error::parse(
            path,
            format!("expected a scalar mapping key, found {}", shape(value)),
        )
    })
}

/// Reads a sequence of scalars into a deduplicated, ordered set.
pub(crate) fn string_set(value: &Value, path: &str) -> Result<BTreeSet<String>, Error> {
    let mut set = BTreeSet::new();
    for (index, item) in sequence(value, path)?.iter().enumerate() {
        set.insert(string(item, &format!("{path}[{index}]"))?);
    }
    Ok(set)
}

/// Reads a mapping with scalar keys and scalar values.
pub(crate) fn string_string_map(
    value: &Value,
    path: &str,
) -> Result<BTreeMap<String, String>, Error> {
    let mut map = BTreeMap::new();
    for (raw_key, raw_value) in mapping(value, path)? {
        let key = key(raw_key, path)?;
        let value = string(raw_value, &child(path, &key))?;
        map.insert(key, value);
    }
    Ok(map)
}

/// Reads a mapping with scalar keys and string-set values.
pub(crate) fn nested_set(
    value: &Value,
    path: &str,
) -> Result<BTreeMap<String, BTreeSet<String>>, Error> {
    let mut map = BTreeMap::new();
    for (raw_key, raw_value) in mapping(value, path)? {
        let key = key(raw_key, path)?;
        let set = string_set(raw_value, &child(path, &key))?;
        map.insert(key, set);
    }
    Ok(map)
}

/// Reads a free-form extensible metadata value.
pub(crate) fn xmd(value: &Value, path: &str) -> Result<Xmd, Error> {
    match value {
        Value::Null => Ok(Xmd::Null),
        Value::Bool(b) => Ok(Xmd::Bool(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Xmd::Int(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Xmd::Float(f))
            } else {
                Err(Error::parse(path, format!("unrepresentable number {n}")))
            }
        }
        Value::String(s) => Ok(Xmd::Str(s.clone())),
        Value::Sequence(seq) => {
            let mut items = Vec::with_capacity(seq.len());
            for (index, item) in seq.iter().enumerate() {
                items.push(xmd(item, &format!("{path}[{index}]"))?);
            }
            Ok(Xmd::Seq(items))
        }
        Value::Mapping(map) => {
            let mut items = BTreeMap::new();
            for (raw_key, raw_value) in map {
                let key = key(raw_key, path)?;
                let value = xmd(raw_value, &child(path, &key))?;
                items.insert(key, value);
            }
            Ok(Xmd::Map(items))
        }
        Value::Tagged(_) => Err(Error::parse(
            path,
            "tagged values are not allowed in extensible metadata",
        )),
    }
}

/// Handles an unrecognized mapping key.
///
/// In strict mode this is an error; otherwise the subtree is ignored
/// with a debug log, so forward-compatible schema additions pass.
pub(crate) fn unknown_key(strict: bool, path: &str, key: &str) -> Result<(), Error> {
    if strict {
        return Err(Error::UnknownAttribute {
            path: path.to_string(),
            key: key.to_string(),
        });
    }
    debug!("Ignoring unknown key {key:?} at {path}");
    Ok(())
}

/// Returns a [`Error::MissingRequired`] for `key` at `path`.
pub(crate) fn missing(path: &str, key: &'static str) -> Error {
    Error::MissingRequired {
        path: path.to_string(),
        key,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use testresult::TestResult;

    use super::*;

    fn value(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[rstest]
    #[case("plain", "plain")]
    #[case("\"5.30\"", "5.30")]
    #[case("5.3", "5.3")]
    #[case("true", "true")]
    fn string_accepts_scalars(#[case] yaml: &str, #[case] expected: &str) -> TestResult {
        assert_eq!(string(&value(yaml), "data.stream")?, expected);
        Ok(())
    }

    #[rstest]
    fn string_rejects_collections() {
        let error = string(&value("[a, b]"), "data.stream").unwrap_err();
        assert_eq!(
            error.to_string(),
            "YAML schema mismatch at data.stream: expected a scalar string, found a sequence"
        );
    }

    #[rstest]
    fn string_set_deduplicates_and_sorts() -> TestResult {
        let set = string_set(&value("[b, a, b]"), "data.api.rpms")?;
        assert_eq!(
            set.into_iter().collect::<Vec<_>>(),
            ["a".to_string(), "b".to_string()]
        );
        Ok(())
    }

    #[rstest]
    fn nested_set_reads_numeric_keys() -> TestResult {
        let map = nested_set(&value("10: [default]"), "data.profiles")?;
        assert_eq!(map.keys().collect::<Vec<_>>(), ["10"]);
        Ok(())
    }

    #[rstest]
    fn xmd_roundtrips_nested_shapes() -> TestResult {
        let parsed = xmd(&value("key:\n  nested: [1, two]\nflag: true"), "data.xmd")?;
        let expected = Xmd::from([
            (
                "key".to_string(),
                Xmd::from([(
                    "nested".to_string(),
                    Xmd::Seq(vec![Xmd::Int(1), Xmd::from("two")]),
                )]),
            ),
            ("flag".to_string(), Xmd::Bool(true)),
        ]);
        assert_eq!(parsed, expected);
        Ok(())
    }

    #[rstest]
    #[case(true)]
    #[case(false)]
    fn unknown_key_honors_strictness(#[case] strict: bool) {
        let result = unknown_key(strict, "data", "surprise");
        assert_eq!(result.is_err(), strict);
    }
}
