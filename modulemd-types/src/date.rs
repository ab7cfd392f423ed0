//! End-of-life date handling.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::NaiveDate;

use crate::Error;

/// An end-of-life date in `YYYY-MM-DD` form.
///
/// Used by service levels and obsoletes records to track the end of a
/// support window.
///
/// # Examples
///
/// ```
/// use std::str::FromStr;
///
/// use modulemd_types::EolDate;
///
/// let eol = EolDate::from_str("2020-12-31").unwrap();
/// assert_eq!("2020-12-31", eol.to_string());
///
/// assert!(EolDate::from_str("2020-13-01").is_err());
/// assert!(EolDate::from_str("20201231").is_err());
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize)]
#[serde(into = "String")]
#[serde(try_from = "String")]
pub struct EolDate(NaiveDate);

impl EolDate {
    /// Creates a new [`EolDate`] from a calendar date.
    pub fn new(date: NaiveDate) -> EolDate {
        EolDate(date)
    }

    /// Creates a new [`EolDate`] from year, month and day numbers.
    ///
    /// # Errors
    ///
    /// Returns an error if the numbers do not form a valid calendar date.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<EolDate, Error> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(EolDate)
            .ok_or_else(|| Error::InvalidDate(format!("{year:04}-{month:02}-{day:02}")))
    }

    /// Returns a reference to the inner [`NaiveDate`].
    pub fn inner(&self) -> &NaiveDate {
        &self.0
    }
}

impl From<NaiveDate> for EolDate {
    fn from(date: NaiveDate) -> EolDate {
        EolDate(date)
    }
}

impl From<EolDate> for String {
    fn from(date: EolDate) -> String {
        date.to_string()
    }
}

impl TryFrom<String> for EolDate {
    type Error = Error;

    fn try_from(value: String) -> Result<EolDate, Self::Error> {
        EolDate::from_str(&value)
    }
}

impl FromStr for EolDate {
    type Err = Error;

    /// Creates an [`EolDate`] from a `YYYY-MM-DD` string slice.
    ///
    /// # Errors
    ///
    /// Returns an error if `input` is not a valid date in `YYYY-MM-DD` form.
    fn from_str(input: &str) -> Result<EolDate, Self::Err> {
        NaiveDate::parse_from_str(input, "%Y-%m-%d")
            .map(EolDate)
            .map_err(|_| Error::InvalidDate(input.to_string()))
    }
}

impl Display for EolDate {
    fn fmt(&self, fmt: &mut Formatter) -> std::fmt::Result {
        write!(fmt, "{}", self.0.format("%Y-%m-%d"))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("2020-12-31", Ok("2020-12-31"))]
    #[case("1999-01-01", Ok("1999-01-01"))]
    #[case("2020-02-30", Err(Error::InvalidDate("2020-02-30".to_string())))]
    #[case("not-a-date", Err(Error::InvalidDate("not-a-date".to_string())))]
    #[case("2020/12/31", Err(Error::InvalidDate("2020/12/31".to_string())))]
    fn eol_date_from_str(#[case] input: &str, #[case] expected: Result<&str, Error>) {
        assert_eq!(
            EolDate::from_str(input),
            expected.map(|date| EolDate::from_str(date).unwrap())
        );
    }

    #[rstest]
    fn eol_date_roundtrip() {
        let eol = EolDate::from_ymd(2031, 7, 1).unwrap();
        assert_eq!(EolDate::from_str(&eol.to_string()), Ok(eol));
    }
}
