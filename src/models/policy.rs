//! Password policy and the symbol alphabet shared with salt generation.

use crate::constants::DEFAULT_MIN_PASSWORD_LENGTH;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a password was rejected by [`PasswordPolicy::check`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyViolation {
    #[error("password must be at least {min} characters (got {actual})")]
    TooShort { min: usize, actual: usize },

    #[error("password contains disallowed character {ch:?} at position {position}")]
    InvalidCharacter { ch: char, position: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AlphabetError {
    #[error("alphabet cannot be empty")]
    Empty,
    #[error("alphabet lists {0:?} more than once")]
    Duplicate(char),
}

/// An ordered set of distinct symbols.
///
/// Serialized as a plain string, e.g. `alphabet = "abc123"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Alphabet {
    symbols: Vec<char>,
}

impl Alphabet {
    pub fn new(symbols: &str) -> Result<Self, AlphabetError> {
        let mut seen = Vec::new();
        for c in symbols.chars() {
            if seen.contains(&c) {
                return Err(AlphabetError::Duplicate(c));
            }
            seen.push(c);
        }
        if seen.is_empty() {
            return Err(AlphabetError::Empty);
        }
        Ok(Self { symbols: seen })
    }

    /// The 62-symbol set `A-Z`, `a-z`, `0-9`.
    pub fn alphanumeric() -> Self {
        Self {
            symbols: ('A'..='Z').chain('a'..='z').chain('0'..='9').collect(),
        }
    }

    pub fn contains(&self, c: char) -> bool {
        self.symbols.contains(&c)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Draw `len` symbols independently and uniformly from the alphabet.
    pub fn sample<R: Rng>(&self, rng: &mut R, len: usize) -> String {
        (0..len)
            .map(|_| self.symbols[rng.gen_range(0..self.symbols.len())])
            .collect()
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self::alphanumeric()
    }
}

impl fmt::Display for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.symbols {
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

impl TryFrom<String> for Alphabet {
    type Error = AlphabetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Alphabet> for String {
    fn from(value: Alphabet) -> Self {
        value.to_string()
    }
}

/// Gate applied to a plaintext password before it becomes a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordPolicy {
    /// Minimum length in characters.
    #[serde(default = "default_min_length")]
    pub min_length: usize,

    /// Characters a password may contain.
    #[serde(default)]
    pub alphabet: Alphabet,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: default_min_length(),
            alphabet: Alphabet::default(),
        }
    }
}

fn default_min_length() -> usize {
    DEFAULT_MIN_PASSWORD_LENGTH
}

impl PasswordPolicy {
    /// Length is checked before the character set.
    pub fn check(&self, password: &str) -> Result<(), PolicyViolation> {
        let actual = password.chars().count();
        if actual < self.min_length {
            return Err(PolicyViolation::TooShort {
                min: self.min_length,
                actual,
            });
        }
        if let Some((position, ch)) = password
            .chars()
            .enumerate()
            .find(|(_, c)| !self.alphabet.contains(*c))
        {
            return Err(PolicyViolation::InvalidCharacter { ch, position });
        }
        Ok(())
    }
}
