// Copyright (c) 2026-present, valet-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{base36, Identifier, Result};

/// Minimum width of integer-derived fragments; shorter encodings are
/// zero-padded so counter-minted identifiers stay within the rendered
/// length the rescan accepts.
const INTEGER_FRAGMENT_WIDTH: usize = 6;

/// The alphanumeric portion of an identifier, excluding the 4-digit year.
///
/// Fragments are uppercase-normalized on construction; characters outside
/// the alphabet are only rejected once the fragment becomes part of an
/// [`Identifier`].
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Fragment(String);

impl Fragment {
    /// Builds a fragment from a user-supplied code, uppercasing it.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        Self(code.to_uppercase())
    }

    /// Builds a fragment from a non-negative integer via base-36 encoding.
    ///
    /// ```
    /// use valet::Fragment;
    ///
    /// assert_eq!("0002JP", Fragment::from_integer(3_301).as_str());
    /// assert_eq!("00KBS0", Fragment::from_integer(948_384).as_str());
    /// ```
    #[must_use]
    pub fn from_integer(value: u64) -> Self {
        Self(format!(
            "{:0>width$}",
            base36::encode(value),
            width = INTEGER_FRAGMENT_WIDTH,
        ))
    }

    /// The fragment's symbols.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of symbols in the fragment.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.chars().count()
    }

    /// Whether the fragment holds no symbols.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Combines the fragment with the current UTC year into an identifier.
    ///
    /// # Errors
    ///
    /// Fails if the combination does not parse as an identifier.
    pub fn to_identifier(&self) -> Result<Identifier> {
        self.to_year_identifier(crate::time::current_year())
    }

    /// Combines the fragment with an explicit year into an identifier.
    ///
    /// # Errors
    ///
    /// Fails if the combination does not parse as an identifier.
    pub fn to_year_identifier(&self, year: i16) -> Result<Identifier> {
        Identifier::parse(&format!("{year:04}{}", self.0))
    }
}

impl std::fmt::Display for Fragment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Fragment {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn code_is_uppercased() {
        assert_eq!("ABC123", Fragment::from_code("abc123").as_str());
        assert_eq!("ABC123", Fragment::from_code("ABC123").as_str());
    }

    #[test]
    fn integer_fragments_are_padded() {
        assert_eq!("0002JP", Fragment::from_integer(3_301).as_str());
        assert_eq!("00018I", Fragment::from_integer(1_602).as_str());
        assert_eq!("00KBS0", Fragment::from_integer(948_384).as_str());
        assert_eq!("000002", Fragment::from_integer(2).as_str());
    }

    #[test]
    fn long_integers_are_not_truncated() {
        let fragment = Fragment::from_integer(u64::MAX);
        assert!(fragment.len() > INTEGER_FRAGMENT_WIDTH);
    }

    #[test]
    fn year_identifier() -> crate::Result<()> {
        let id = Fragment::from_code("ABC123").to_year_identifier(2024)?;
        assert_eq!("2024ABC123", id.to_string());
        Ok(())
    }

    #[test]
    fn current_year_identifier() -> crate::Result<()> {
        let id = Fragment::from_integer(2).to_identifier()?;
        assert_eq!(crate::time::current_year(), id.year());
        Ok(())
    }
}
