//! Extensible metadata values.

use std::collections::BTreeMap;

/// An opaque, arbitrarily nested extensible-metadata value.
///
/// Module streams may carry a free-form `xmd` block for private
/// consumer use. Its contents are carried verbatim through parsing,
/// emission and version upgrades; only the shape (scalars, sequences
/// and string-keyed mappings of the same) is constrained.
///
/// # Examples
///
/// ```
/// use modulemd_types::Xmd;
///
/// let xmd = Xmd::from([("owner".to_string(), Xmd::from("infra-team"))]);
/// assert_eq!(xmd.get("owner").and_then(Xmd::as_str), Some("infra-team"));
/// ```
#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(untagged)]
pub enum Xmd {
    /// An explicit null scalar.
    Null,
    /// A boolean scalar.
    Bool(bool),
    /// An integer scalar.
    Int(i64),
    /// A floating point scalar.
    Float(f64),
    /// A string scalar.
    Str(String),
    /// A sequence of nested values.
    Seq(Vec<Xmd>),
    /// A string-keyed mapping of nested values.
    Map(BTreeMap<String, Xmd>),
}

impl Xmd {
    /// Returns the string slice of a string scalar, or [`None`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Xmd::Str(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the value of an integer scalar, or [`None`].
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Xmd::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Looks up a key in a mapping value.
    ///
    /// Returns [`None`] for non-mapping values and missing keys.
    pub fn get(&self, key: &str) -> Option<&Xmd> {
        match self {
            Xmd::Map(map) => map.get(key),
            _ => None,
        }
    }

    /// Returns true for an empty mapping, sequence or null value.
    pub fn is_empty(&self) -> bool {
        match self {
            Xmd::Null => true,
            Xmd::Seq(seq) => seq.is_empty(),
            Xmd::Map(map) => map.is_empty(),
            _ => false,
        }
    }
}

impl Default for Xmd {
    /// Returns an empty mapping, the usual root shape of an `xmd` block.
    fn default() -> Xmd {
        Xmd::Map(BTreeMap::new())
    }
}

impl From<bool> for Xmd {
    fn from(value: bool) -> Xmd {
        Xmd::Bool(value)
    }
}

impl From<i64> for Xmd {
    fn from(value: i64) -> Xmd {
        Xmd::Int(value)
    }
}

impl From<&str> for Xmd {
    fn from(value: &str) -> Xmd {
        Xmd::Str(value.to_string())
    }
}

impl From<String> for Xmd {
    fn from(value: String) -> Xmd {
        Xmd::Str(value)
    }
}

impl From<Vec<Xmd>> for Xmd {
    fn from(value: Vec<Xmd>) -> Xmd {
        Xmd::Seq(value)
    }
}

impl From<BTreeMap<String, Xmd>> for Xmd {
    fn from(value: BTreeMap<String, Xmd>) -> Xmd {
        Xmd::Map(value)
    }
}

impl<const N: usize> From<[(String, Xmd); N]> for Xmd {
    fn from(value: [(String, Xmd); N]) -> Xmd {
        Xmd::Map(BTreeMap::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xmd_nested_lookup() {
        let xmd = Xmd::from([(
            "build".to_string(),
            Xmd::from([("jobs".to_string(), Xmd::from(4))]),
        )]);
        assert_eq!(
            xmd.get("build").and_then(|build| build.get("jobs")),
            Some(&Xmd::Int(4))
        );
        assert_eq!(xmd.get("missing"), None);
    }

    #[test]
    fn xmd_emptiness() {
        assert!(Xmd::default().is_empty());
        assert!(Xmd::Null.is_empty());
        assert!(!Xmd::from("x").is_empty());
    }
}
