//! Canonical module stream identifiers.

use std::fmt::Display;
use std::str::FromStr;

use crate::Error;

/// The canonical identifier of a module stream.
///
/// An NSVCA tracks the module name, stream name and optionally the
/// version, context and architecture of one module stream, rendered as
/// `name:stream:version[:context[:arch]]`.
///
/// Trailing missing components are omitted from the canonical form.
/// A missing component followed by a present one is rendered as an
/// empty segment, so the positions stay fixed:
///
/// ```
/// use modulemd_types::Nsvca;
///
/// let nsvca = Nsvca::new("foo", "latest")
///     .with_version(20201015)
///     .with_arch("x86_64");
/// assert_eq!(nsvca.to_string(), "foo:latest:20201015::x86_64");
/// ```
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize)]
#[serde(into = "String")]
#[serde(try_from = "String")]
pub struct Nsvca {
    name: String,
    stream: String,
    version: Option<u64>,
    context: Option<String>,
    arch: Option<String>,
}

impl Nsvca {
    /// Creates a new [`Nsvca`] from a module name and a stream name.
    pub fn new(name: impl Into<String>, stream: impl Into<String>) -> Nsvca {
        Nsvca {
            name: name.into(),
            stream: stream.into(),
            version: None,
            context: None,
            arch: None,
        }
    }

    /// Sets the stream version.
    #[must_use]
    pub fn with_version(mut self, version: u64) -> Nsvca {
        self.version = Some(version);
        self
    }

    /// Sets the stream context.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Nsvca {
        self.context = Some(context.into());
        self
    }

    /// Sets the stream architecture.
    #[must_use]
    pub fn with_arch(mut self, arch: impl Into<String>) -> Nsvca {
        self.arch = Some(arch.into());
        self
    }

    /// Returns the module name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the stream name.
    pub fn stream(&self) -> &str {
        &self.stream
    }

    /// Returns the stream version, if one is carried.
    pub fn version(&self) -> Option<u64> {
        self.version
    }

    /// Returns the stream context, if one is carried.
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Returns the stream architecture, if one is carried.
    pub fn arch(&self) -> Option<&str> {
        self.arch.as_deref()
    }
}

impl FromStr for Nsvca {
    type Err = Error;

    /// Creates an [`Nsvca`] from its canonical string form.
    ///
    /// Empty segments are read back as missing components.
    ///
    /// # Errors
    ///
    /// Returns an error if `input` has fewer than two or more than five
    /// segments, if name or stream are empty, or if the version segment
    /// is not a non-negative integer.
    fn from_str(input: &str) -> Result<Nsvca, Self::Err> {
        let segments: Vec<&str> = input.split(':').collect();
        if !(2..=5).contains(&segments.len()) || segments[0].is_empty() || segments[1].is_empty() {
            return Err(Error::InvalidNsvca(input.to_string()));
        }

        let version = match segments.get(2) {
            None | Some(&"") => None,
            Some(version) => Some(
                version
                    .parse::<u64>()
                    .map_err(|_| Error::InvalidNsvca(input.to_string()))?,
            ),
        };

        let optional = |segment: Option<&&str>| -> Option<String> {
            segment
                .filter(|segment| !segment.is_empty())
                .map(|segment| segment.to_string())
        };

        Ok(Nsvca {
            name: segments[0].to_string(),
            stream: segments[1].to_string(),
            version,
            context: optional(segments.get(3)),
            arch: optional(segments.get(4)),
        })
    }
}

impl From<Nsvca> for String {
    fn from(nsvca: Nsvca) -> String {
        nsvca.to_string()
    }
}

impl TryFrom<String> for Nsvca {
    type Error = Error;

    fn try_from(value: String) -> Result<Nsvca, Self::Error> {
        Nsvca::from_str(&value)
    }
}

impl Display for Nsvca {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut segments = vec![
            self.name.clone(),
            self.stream.clone(),
            self.version.map(|v| v.to_string()).unwrap_or_default(),
            self.context.clone().unwrap_or_default(),
            self.arch.clone().unwrap_or_default(),
        ];
        while segments.len() > 2 && segments.last().is_some_and(|s| s.is_empty()) {
            segments.pop();
        }
        write!(f, "{}", segments.join(":"))
    }
}
