//! RPM artifact identifiers.

use std::fmt::Display;
use std::str::FromStr;

use log::debug;
use winnow::{
    ModalResult,
    Parser,
    ascii::digit1,
    combinator::{cut_err, eof, opt, repeat, repeat_till, terminated},
    error::{StrContext, StrContextValue},
    token::{any, take_until, take_while},
};

use crate::Error;

/// An RPM artifact identifier in `name-[epoch:]version-release.arch` form.
///
/// The name component may contain dashes, the release component may
/// contain dots. The version and release components may not contain
/// dashes and the architecture may not contain dots, which makes the
/// format unambiguous when read from the right.
///
/// # Examples
///
/// ```
/// use std::str::FromStr;
///
/// use modulemd_types::Nevra;
///
/// let nevra = Nevra::from_str("bar-0:1.23-1.module_deadbeef.x86_64").unwrap();
/// assert_eq!(nevra.name(), "bar");
/// assert_eq!(nevra.epoch(), Some(0));
/// assert_eq!(nevra.version(), "1.23");
/// assert_eq!(nevra.release(), "1.module_deadbeef");
/// assert_eq!(nevra.arch(), "x86_64");
/// assert_eq!(nevra.to_string(), "bar-0:1.23-1.module_deadbeef.x86_64");
/// ```
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize)]
#[serde(into = "String")]
#[serde(try_from = "String")]
pub struct Nevra {
    name: String,
    epoch: Option<u64>,
    version: String,
    release: String,
    arch: String,
}

impl Nevra {
    /// Returns the package name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the epoch, if one is carried.
    pub fn epoch(&self) -> Option<u64> {
        self.epoch
    }

    /// Returns the package version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the package release.
    pub fn release(&self) -> &str {
        &self.release
    }

    /// Returns the package architecture.
    pub fn arch(&self) -> &str {
        &self.arch
    }

    /// Recognizes a [`Nevra`] in a string slice.
    ///
    /// The name is detected by counting dashes: everything up to the
    /// second-to-last dash belongs to the name, the final two dashes
    /// delimit version and release.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the components cannot be recognized.
    pub fn parser(value: &mut &str) -> ModalResult<Self> {
        debug!("Recognizing NEVRA in {value}.");
        // The name may contain dashes; with exactly two dashes reserved
        // for the version and release delimiters, the remainder belongs
        // to the name.
        let dashes: usize = value.chars().filter(|c| *c == '-').count();
        let dashes_in_name = dashes.saturating_sub(2);

        let name = cut_err(
            repeat::<_, _, (), _, _>(
                dashes_in_name + 1,
                repeat_till::<_, _, (), _, _, _, _>(0.., any, "-"),
            )
            .take()
            .and_then(
                repeat_till(0.., any, ("-", eof))
                    .map(|(name, _match): (String, (&str, &str))| name),
            ),
        )
        .verify(|name: &String| !name.is_empty())
        .context(StrContext::Label("package name"))
        .parse_next(value)?;

        let epoch = opt(terminated(digit1.parse_to::<u64>(), ":")).parse_next(value)?;

        let version = cut_err(terminated(take_until(1.., "-"), "-"))
            .context(StrContext::Label("package version"))
            .parse_next(value)?;

        // The release may contain dots; the architecture after the final
        // dot may not.
        let dots: usize = value.chars().filter(|c| *c == '.').count();
        let dots_in_release = dots.saturating_sub(1);

        let release = cut_err(
            repeat::<_, _, (), _, _>(
                dots_in_release + 1,
                repeat_till::<_, _, (), _, _, _, _>(0.., any, "."),
            )
            .take()
            .and_then(
                repeat_till(0.., any, (".", eof))
                    .map(|(release, _match): (String, (&str, &str))| release),
            ),
        )
        .verify(|release: &String| !release.is_empty())
        .context(StrContext::Label("package release"))
        .parse_next(value)?;

        let arch = cut_err(terminated(
            take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_'),
            eof,
        ))
        .context(StrContext::Label("package architecture"))
        .context(StrContext::Expected(StrContextValue::Description(
            "trailing architecture such as x86_64 or noarch",
        )))
        .parse_next(value)?;

        Ok(Nevra {
            name,
            epoch,
            version: version.to_string(),
            release,
            arch: arch.to_string(),
        })
    }
}

impl FromStr for Nevra {
    type Err = Error;

    /// Creates a [`Nevra`] from a string slice.
    ///
    /// # Errors
    ///
    /// Returns an error if `input` does not form a valid NEVRA.
    fn from_str(input: &str) -> Result<Nevra, Self::Err> {
        Nevra::parser
            .parse(input)
            .map_err(|_| Error::InvalidNevra(input.to_string()))
    }
}

impl From<Nevra> for String {
    fn from(nevra: Nevra) -> String {
        nevra.to_string()
    }
}

impl TryFrom<String> for Nevra {
    type Error = Error;

    fn try_from(value: String) -> Result<Nevra, Self::Error> {
        Nevra::from_str(&value)
    }
}

impl Display for Nevra {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.epoch {
            Some(epoch) => write!(
                f,
                "{}-{}:{}-{}.{}",
                self.name, epoch, self.version, self.release, self.arch
            ),
            None => write!(
                f,
                "{}-{}-{}.{}",
                self.name, self.version, self.release, self.arch
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use testresult::TestResult;

    use super::*;

    #[rstest]
    #[case("bar-0:1.23-1.module_deadbeef.x86_64", "bar", Some(0), "1.23", "1.module_deadbeef", "x86_64")]
    #[case("baz-macros-2:9.4.2-2.module_deadbeef.noarch", "baz-macros", Some(2), "9.4.2", "2.module_deadbeef", "noarch")]
    #[case("glibc-2.33-5.fc34.src", "glibc", None, "2.33", "5.fc34", "src")]
    fn nevra_from_str(
        #[case] input: &str,
        #[case] name: &str,
        #[case] epoch: Option<u64>,
        #[case] version: &str,
        #[case] release: &str,
        #[case] arch: &str,
    ) -> TestResult {
        let nevra = Nevra::from_str(input)?;
        assert_eq!(nevra.name(), name);
        assert_eq!(nevra.epoch(), epoch);
        assert_eq!(nevra.version(), version);
        assert_eq!(nevra.release(), release);
        assert_eq!(nevra.arch(), arch);
        assert_eq!(nevra.to_string(), input);
        Ok(())
    }

    #[rstest]
    #[case("")]
    #[case("no-dashes.x86_64")]
    #[case("name-1.0-1")]
    #[case("-1.0-1.x86_64")]
    #[case("name-1.0-1.arch.with.dots!")]
    fn nevra_from_str_rejects(#[case] input: &str) {
        assert!(Nevra::from_str(input).is_err());
    }
}
