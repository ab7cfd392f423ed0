#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]

mod date;
pub use date::EolDate;

mod error;
pub use error::Error;

mod locale;
pub use locale::Locale;

mod mdversion;
pub use mdversion::MdVersion;

mod nevra;
pub use nevra::Nevra;

mod nsvca;
pub use nsvca::Nsvca;

mod xmd;
pub use xmd::Xmd;
