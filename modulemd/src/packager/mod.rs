//! Packager documents: the build-system authoring input format.
//!
//! A packager document is what a human maintainer writes; the build
//! service lowers it into one or more module stream documents plus an
//! optional synthesized defaults document carrying the profiles marked
//! as default.

mod v2;
pub use v2::PackagerV2;

mod v3;
pub use v3::{BuildConfig, PackagerV3};

use crate::defaults::Defaults;
use crate::module_stream::ModuleStream;
use crate::Error;

/// A packager document, tagged by schema version.
#[derive(Clone, Debug, PartialEq)]
pub enum Packager {
    /// The version 2 packager format, a relaxed stream v2 schema.
    V2(PackagerV2),
    /// The version 3 packager format with per-context build
    /// configurations.
    V3(PackagerV3),
}

impl Packager {
    /// Returns the metadata schema version of the document.
    pub fn mdversion(&self) -> u64 {
        match self {
            Packager::V2(_) => 2,
            Packager::V3(_) => 3,
        }
    }

    /// Returns the module name, if the author provided one.
    pub fn module_name(&self) -> Option<&str> {
        match self {
            Packager::V2(packager) => packager.stream.module_name.as_deref(),
            Packager::V3(packager) => packager.module_name.as_deref(),
        }
    }

    /// Returns the stream name, if the author provided one.
    pub fn stream_name(&self) -> Option<&str> {
        match self {
            Packager::V2(packager) => packager.stream.stream_name.as_deref(),
            Packager::V3(packager) => packager.stream_name.as_deref(),
        }
    }

    /// Overrides the module name.
    pub fn set_module_name(&mut self, name: impl Into<String>) {
        match self {
            Packager::V2(packager) => packager.stream.module_name = Some(name.into()),
            Packager::V3(packager) => packager.module_name = Some(name.into()),
        }
    }

    /// Overrides the stream name.
    pub fn set_stream_name(&mut self, name: impl Into<String>) {
        match self {
            Packager::V2(packager) => packager.stream.stream_name = Some(name.into()),
            Packager::V3(packager) => packager.stream_name = Some(name.into()),
        }
    }

    /// Lowers the document to a stream v2 document.
    ///
    /// Returns the stream together with a synthesized defaults
    /// document when any profile is marked as default.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be expressed as a v2
    /// stream.
    pub fn to_stream_v2(&self) -> Result<(ModuleStream, Option<Defaults>), Error> {
        match self {
            Packager::V2(packager) => packager.to_stream_v2(),
            Packager::V3(packager) => packager.to_stream_v2(),
        }
    }

    /// Lowers the document to a stream v3 document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document carries more than one build
    /// configuration; v3 streams express exactly one.
    pub fn to_stream_v3(&self) -> Result<(ModuleStream, Option<Defaults>), Error> {
        match self {
            Packager::V2(_) => Err(Error::Upgrade(
                "cannot lower a v2 packager document to a v3 stream".to_string(),
            )),
            Packager::V3(packager) => packager.to_stream_v3(),
        }
    }
}
