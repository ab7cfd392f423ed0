//! Metadata schema versions of module stream documents.

use std::fmt::{Display, Formatter};

use crate::Error;

/// The metadata schema version of a module stream document.
///
/// Tracks the `version:` header value of `modulemd` documents. The
/// variants are ordered, so version comparisons read naturally:
///
/// ```
/// use modulemd_types::MdVersion;
///
/// assert!(MdVersion::One < MdVersion::Three);
/// assert_eq!(MdVersion::LATEST, MdVersion::Three);
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum MdVersion {
    /// Metadata schema version 1.
    One = 1,
    /// Metadata schema version 2.
    Two = 2,
    /// Metadata schema version 3.
    Three = 3,
}

impl MdVersion {
    /// The most recent supported metadata schema version.
    pub const LATEST: MdVersion = MdVersion::Three;

    /// Returns the schema version as the plain integer used on the wire.
    pub fn as_u64(self) -> u64 {
        self as u64
    }

    /// Returns the next schema version, or [`None`] for [`MdVersion::LATEST`].
    pub fn next(self) -> Option<MdVersion> {
        match self {
            MdVersion::One => Some(MdVersion::Two),
            MdVersion::Two => Some(MdVersion::Three),
            MdVersion::Three => None,
        }
    }
}

impl TryFrom<u64> for MdVersion {
    type Error = Error;

    /// Creates an [`MdVersion`] from a `version:` header value.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` is outside of the supported range.
    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(MdVersion::One),
            2 => Ok(MdVersion::Two),
            3 => Ok(MdVersion::Three),
            _ => Err(Error::UnsupportedMdVersion(value)),
        }
    }
}

impl Display for MdVersion {
    fn fmt(&self, fmt: &mut Formatter) -> std::fmt::Result {
        write!(fmt, "{}", self.as_u64())
    }
}
