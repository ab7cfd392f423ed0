#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]

mod buildopts;
pub use buildopts::Buildopts;

mod component;
pub use component::{ComponentModule, ComponentRpm};

mod defaults;
pub use defaults::{Defaults, DefaultsV1, Intent};

mod dependencies;
pub use dependencies::Dependencies;

mod error;
pub use error::Error;

mod merge;
pub use merge::Merger;

mod module;
pub use module::Module;

mod module_index;
pub use module_index::ModuleIndex;

mod module_stream;
pub use module_stream::{ModuleStream, ModuleStreamV1, ModuleStreamV2, ModuleStreamV3};

mod obsoletes;
pub use obsoletes::{ObsoletedBy, Obsoletes};

mod packager;
pub use packager::{BuildConfig, Packager, PackagerV2, PackagerV3};

mod profile;
pub use profile::Profile;

mod service_level;
pub use service_level::ServiceLevel;

mod subdocument;
pub use subdocument::{DocumentType, SubdocumentInfo};

mod translation;
pub use translation::{Translation, TranslationEntry};

mod upgrade;

mod yaml;
