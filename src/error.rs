// Copyright (c) 2026-present, valet-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

/// Represents errors that can occur in the identifier registry
#[derive(Debug)]
pub enum Error {
    /// I/O error
    Io(std::io::Error),

    /// Decode saw a character outside the base-36 alphabet
    InvalidCharacter(char),

    /// Token length is above the maximum fragment length
    InvalidLength(usize),

    /// The 4-character year prefix is not numeric
    InvalidYear(String),

    /// Year is outside the accepted window around the current year (strict parse only)
    YearOutOfRange(i16),

    /// The generator was invoked with no attempts left
    NoAttemptsLeft,

    /// No acceptable token could be constructed within the attempt budget
    TokenExhausted,

    /// No free identifier could be found within the attempt budget
    UniqueCollision,

    /// Identifier minting exceeded its deadline
    Timeout,

    /// The `.locked` sentinel did not clear within the polling budget
    LockTimeout(String),

    /// The operation required a registered identifier but none was found
    UnknownIdentifier(String),

    /// Malformed identifier string
    Parse(String),

    /// `.lastid` is missing when one was required
    NoCounter,

    /// The registry's cancellation signal fired
    Cancelled,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ValetError: {self:?}")
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Registry result
pub type Result<T> = std::result::Result<T, Error>;
