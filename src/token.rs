// Copyright (c) 2026-present, valet-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{base36, identifier::MAX_FRAGMENT_LEN, Error, Identifier, Result};
use rand::Rng;

/// Hard ceiling on token reconstruction attempts.
pub(crate) const TOKEN_BUDGET: usize = 17;

/// Mints a candidate identifier from `length` uniformly drawn alphabet
/// symbols, prefixed with the current UTC year.
///
/// The draw uses a cryptographically secure source; `random_range` performs
/// rejection sampling over the source's native range, so the distribution
/// over the alphabet stays uniform.
///
/// # Errors
///
/// `InvalidLength` if `length` exceeds the maximum fragment length,
/// `NoAttemptsLeft` if `attempts` is zero, `TokenExhausted` once 17
/// constructions failed the strict re-parse.
pub fn new_token(length: usize, attempts: usize) -> Result<Identifier> {
    if length > MAX_FRAGMENT_LEN {
        return Err(Error::InvalidLength(length));
    }
    if attempts == 0 {
        return Err(Error::NoAttemptsLeft);
    }

    let mut rng = rand::rng();
    let mut budget = attempts;

    loop {
        let mut code = String::with_capacity(length);

        for _ in 0..length {
            let idx = rng.random_range(0..base36::ALPHABET.len());

            if let Some(&symbol) = base36::ALPHABET.get(idx) {
                code.push(char::from(symbol));
            }
        }

        let candidate = format!("{:04}{code}", crate::time::current_year());

        match Identifier::parse_strict(&candidate) {
            Ok(id) => return Ok(id),
            Err(e) => {
                budget += 1;

                if budget > TOKEN_BUDGET {
                    return Err(Error::TokenExhausted);
                }

                log::trace!("rejecting candidate token {candidate:?}: {e:?}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn token_has_year_prefix_and_requested_length() -> crate::Result<()> {
        for length in [1, 6, 29] {
            let id = new_token(length, 17)?;
            assert_eq!(crate::time::current_year(), id.year());
            assert_eq!(length, id.fragment().len());
            assert_eq!(length + 4, id.to_string().chars().count());
        }
        Ok(())
    }

    #[test]
    fn token_symbols_are_within_the_alphabet() -> crate::Result<()> {
        let id = new_token(20, 17)?;

        for c in id.fragment().as_str().chars() {
            assert!(
                base36::ALPHABET.iter().any(|&s| char::from(s) == c),
                "unexpected symbol {c:?}",
            );
        }
        Ok(())
    }

    #[test]
    fn empty_token_never_parses() {
        // a bare year has no fragment, so every construction fails
        assert!(matches!(new_token(0, 17), Err(Error::TokenExhausted)));
    }

    #[test]
    fn overlong_token_is_rejected() {
        assert!(matches!(
            new_token(30, 17),
            Err(Error::InvalidLength(30))
        ));
    }

    #[test]
    fn zero_attempts_are_rejected() {
        assert!(matches!(new_token(6, 0), Err(Error::NoAttemptsLeft)));
    }
}
