//! Libc locale names.

use std::fmt::Display;
use std::str::FromStr;

use winnow::{
    ModalResult,
    Parser,
    combinator::{eof, opt, preceded},
    token::take_while,
};

use crate::Error;

/// A libc locale name.
///
/// Follows the `language[_territory][.codeset][@modifier]` convention,
/// e.g. `cs_CZ.UTF-8` or `sr_RS@latin`. The special locales `C` and
/// `POSIX` are accepted as well.
///
/// # Examples
///
/// ```
/// use std::str::FromStr;
///
/// use modulemd_types::Locale;
///
/// assert!(Locale::from_str("cs_CZ").is_ok());
/// assert!(Locale::from_str("C").is_ok());
/// assert!(Locale::from_str("not a locale").is_err());
/// ```
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize)]
#[serde(into = "String")]
#[serde(try_from = "String")]
pub struct Locale(String);

impl Locale {
    /// Returns the locale name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the bare language code, without territory, codeset or
    /// modifier.
    pub fn language(&self) -> &str {
        let end = self
            .0
            .find(['_', '.', '@'])
            .unwrap_or(self.0.len());
        &self.0[..end]
    }

    fn parser(value: &mut &str) -> ModalResult<()> {
        take_while(1..=8, |c: char| c.is_ascii_alphabetic()).parse_next(value)?;
        opt(preceded(
            "_",
            take_while(1..=8, |c: char| c.is_ascii_alphanumeric()),
        ))
        .parse_next(value)?;
        opt(preceded(
            ".",
            take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '-'),
        ))
        .parse_next(value)?;
        opt(preceded(
            "@",
            take_while(1.., |c: char| c.is_ascii_alphanumeric()),
        ))
        .parse_next(value)?;
        eof.parse_next(value)?;
        Ok(())
    }
}

impl FromStr for Locale {
    type Err = Error;

    /// Creates a [`Locale`] from a string slice.
    ///
    /// # Errors
    ///
    /// Returns an error if `input` is not a well-formed locale name.
    fn from_str(input: &str) -> Result<Locale, Self::Err> {
        if input == "C" || input == "POSIX" {
            return Ok(Locale(input.to_string()));
        }
        Locale::parser
            .parse(input)
            .map(|()| Locale(input.to_string()))
            .map_err(|_| Error::InvalidLocale(input.to_string()))
    }
}

impl From<Locale> for String {
    fn from(locale: Locale) -> String {
        locale.0
    }
}

impl TryFrom<String> for Locale {
    type Error = Error;

    fn try_from(value: String) -> Result<Locale, Self::Error> {
        Locale::from_str(&value)
    }
}

impl Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("C")]
    #[case("POSIX")]
    #[case("en")]
    #[case("en_US")]
    #[case("cs_CZ.UTF-8")]
    #[case("sr_RS@latin")]
    #[case("ca_ES.UTF-8@valencia")]
    fn locale_accepts(#[case] input: &str) {
        assert_eq!(Locale::from_str(input).map(|l| l.to_string()), Ok(input.to_string()));
    }

    #[rstest]
    #[case("")]
    #[case("not a locale")]
    #[case("_US")]
    #[case("en_US_")]
    #[case("en@")]
    fn locale_rejects(#[case] input: &str) {
        assert!(Locale::from_str(input).is_err());
    }

    #[rstest]
    #[case("cs_CZ.UTF-8", "cs")]
    #[case("en", "en")]
    #[case("sr_RS@latin", "sr")]
    fn locale_language(#[case] input: &str, #[case] language: &str) {
        assert_eq!(Locale::from_str(input).unwrap().language(), language);
    }
}
