// Copyright (c) 2026-present, valet-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{segmenter, Error, Fragment, Result};
use std::path::PathBuf;

/// Maximum number of symbols in a fragment (rendered forms top out at 33).
pub const MAX_FRAGMENT_LEN: usize = 29;

/// Width of the strict-parse window around the current year.
const YEAR_WINDOW: i32 = 17;

/// A registry identifier: a 4-digit year followed by an uppercase fragment.
///
/// Identifiers are immutable value types; equality is by rendered form.
/// The rendered form maps bijectively onto a directory path via the
/// Fibonacci segmenter.
///
/// ```
/// use valet::Identifier;
///
/// let id = Identifier::parse("2024ABC123DEF")?;
/// assert_eq!(2024, id.year());
/// assert_eq!("ABC123DEF", id.fragment().as_str());
/// assert_eq!("2024ABC123DEF", id.to_string());
/// # Ok::<(), valet::Error>(())
/// ```
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Identifier {
    year: i16,
    fragment: Fragment,
}

impl Identifier {
    /// Constructs an identifier from its parts.
    #[must_use]
    pub fn new(year: i16, fragment: Fragment) -> Self {
        Self { year, fragment }
    }

    /// Parses a rendered identifier.
    ///
    /// The year must be numeric; the fragment is uppercase-normalized but
    /// not validated against the alphabet (generator-produced fragments are
    /// within the alphabet by construction).
    ///
    /// # Errors
    ///
    /// `Parse` if the string is shorter than 5 characters, `InvalidYear` if
    /// the 4-character prefix is not numeric.
    pub fn parse(identifier: &str) -> Result<Self> {
        let year_part = identifier
            .get(0..segmenter::YEAR_LEN)
            .ok_or_else(|| Error::Parse(identifier.to_string()))?;

        let code = identifier
            .get(segmenter::YEAR_LEN..)
            .filter(|code| !code.is_empty())
            .ok_or_else(|| Error::Parse(identifier.to_string()))?;

        let year = year_part
            .parse::<i16>()
            .map_err(|_| Error::InvalidYear(year_part.to_string()))?;

        Ok(Self {
            year,
            fragment: Fragment::from_code(code),
        })
    }

    /// Parses a rendered identifier, additionally requiring the year to be
    /// within ±17 of the current year.
    ///
    /// # Errors
    ///
    /// Same as [`Identifier::parse`], plus `YearOutOfRange`.
    pub fn parse_strict(identifier: &str) -> Result<Self> {
        let id = Self::parse(identifier)?;
        let now = i32::from(crate::time::current_year());

        if (i32::from(id.year) - now).abs() > YEAR_WINDOW {
            return Err(Error::YearOutOfRange(id.year));
        }

        Ok(id)
    }

    /// The identifier's year.
    #[must_use]
    pub fn year(&self) -> i16 {
        self.year
    }

    /// The identifier's fragment.
    #[must_use]
    pub fn fragment(&self) -> &Fragment {
        &self.fragment
    }

    /// The identifier's relative directory path.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        segmenter::segment_path(&self.to_string())
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}{}", self.year, self.fragment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn parse_splits_year_and_fragment() -> crate::Result<()> {
        let id = Identifier::parse("2024ABC123DEF")?;
        assert_eq!(2024, id.year());
        assert_eq!("ABC123DEF", id.fragment().as_str());
        Ok(())
    }

    #[test]
    fn parse_is_permissive_about_years() -> crate::Result<()> {
        let id = Identifier::parse("3333ABC123DEF")?;
        assert_eq!(3333, id.year());
        Ok(())
    }

    #[test]
    fn parse_canonicalizes_case() -> crate::Result<()> {
        let id = Identifier::parse("2024abc123def")?;
        assert_eq!("2024ABC123DEF", id.to_string());
        Ok(())
    }

    #[test]
    fn parse_rejects_short_strings() {
        assert!(matches!(Identifier::parse(""), Err(Error::Parse(_))));
        assert!(matches!(Identifier::parse("202"), Err(Error::Parse(_))));
        assert!(matches!(Identifier::parse("2024"), Err(Error::Parse(_))));
    }

    #[test]
    fn parse_rejects_non_numeric_years() {
        assert!(matches!(
            Identifier::parse("20XXABC"),
            Err(Error::InvalidYear(_))
        ));
    }

    #[test]
    fn strict_parse_enforces_year_window() {
        let now = crate::time::current_year();

        assert!(Identifier::parse_strict(&format!("{now:04}ABC")).is_ok());
        assert!(Identifier::parse_strict(&format!("{:04}ABC", now + 17)).is_ok());
        assert!(matches!(
            Identifier::parse_strict(&format!("{:04}ABC", now + 18)),
            Err(Error::YearOutOfRange(_))
        ));
        assert!(matches!(
            Identifier::parse_strict("3333ABC123DEF"),
            Err(Error::YearOutOfRange(3333))
        ));
    }

    #[test]
    fn round_trip() -> crate::Result<()> {
        for rendered in ["2024ABC123", "0001Z", "20240002JP"] {
            assert_eq!(rendered, Identifier::parse(rendered)?.to_string());
        }
        Ok(())
    }

    #[test]
    fn rendered_year_is_zero_padded() {
        let id = Identifier::new(7, Fragment::from_code("AB"));
        assert_eq!("0007AB", id.to_string());
    }

    #[test]
    fn path_uses_the_segmenter() -> crate::Result<()> {
        let id = Identifier::parse("2024ABC123")?;
        assert_eq!(PathBuf::from("2024/A/B/C1/23"), id.path());
        Ok(())
    }

    #[test]
    fn equality_is_by_rendered_form() -> crate::Result<()> {
        assert_eq!(
            Identifier::parse("2024abc")?,
            Identifier::parse("2024ABC")?,
        );
        Ok(())
    }
}
