use thiserror::Error;

/// The Error that can occur when working with module metadata value types.
#[derive(Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// An invalid end-of-life date.
    #[error("Invalid end-of-life date (expected YYYY-MM-DD): {0}")]
    InvalidDate(String),

    /// An invalid libc locale name.
    #[error("Invalid locale name: {0}")]
    InvalidLocale(String),

    /// An invalid NEVRA string.
    #[error("Invalid NEVRA (expected name-[epoch:]version-release.arch):\n{0}")]
    InvalidNevra(String),

    /// An invalid NSVCA string.
    #[error("Invalid NSVCA (expected name:stream[:version[:context[:arch]]]): {0}")]
    InvalidNsvca(String),

    /// A metadata version outside of the supported range.
    #[error("Unsupported metadata version: {0}")]
    UnsupportedMdVersion(u64),

    /// An extensible metadata value that cannot be represented.
    #[error("Unrepresentable extensible metadata value: {0}")]
    UnrepresentableXmd(String),
}
