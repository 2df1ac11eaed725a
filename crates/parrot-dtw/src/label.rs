use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DtwError;

const NAMES: [&str; 10] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine",
];

/// A spoken digit label in `0..=9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Digit(u8);

impl Digit {
    /// All ten digits in ascending order.
    pub const ALL: [Digit; 10] = [
        Digit(0),
        Digit(1),
        Digit(2),
        Digit(3),
        Digit(4),
        Digit(5),
        Digit(6),
        Digit(7),
        Digit(8),
        Digit(9),
    ];

    /// Create a digit label.
    ///
    /// # Errors
    ///
    /// Returns [`DtwError::InvalidDigit`] if `value > 9`.
    pub fn new(value: u8) -> Result<Self, DtwError> {
        if value > 9 {
            return Err(DtwError::InvalidDigit { value });
        }
        Ok(Self(value))
    }

    /// Return the numeric value.
    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    /// Return the zero-based index (same as the value).
    #[must_use]
    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    /// Return the English word for this digit, e.g. `"seven"`.
    #[must_use]
    pub fn name(self) -> &'static str {
        NAMES[self.index()]
    }
}

impl TryFrom<u8> for Digit {
    type Error = DtwError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Digit> for u8 {
    fn from(digit: Digit) -> Self {
        digit.0
    }
}

/// Parses either a numeral (`"7"`) or an English word (`"seven"`, any case).
impl FromStr for Digit {
    type Err = DtwError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        if let Some(pos) = NAMES.iter().position(|&n| n == lower) {
            return Ok(Self::ALL[pos]);
        }
        match lower.parse::<u8>() {
            Ok(v) if v <= 9 => Ok(Self(v)),
            _ => Err(DtwError::UnknownDigit {
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Digit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_ten() {
        assert!(matches!(Digit::new(10), Err(DtwError::InvalidDigit { value: 10 })));
    }

    #[test]
    fn names_and_values() {
        let d = Digit::new(7).unwrap();
        assert_eq!(d.value(), 7);
        assert_eq!(d.name(), "seven");
        assert_eq!(format!("{d}"), "seven");
    }

    #[test]
    fn parses_words_and_numerals() {
        assert_eq!("three".parse::<Digit>().unwrap(), Digit::new(3).unwrap());
        assert_eq!("Nine".parse::<Digit>().unwrap(), Digit::new(9).unwrap());
        assert_eq!("0".parse::<Digit>().unwrap(), Digit::new(0).unwrap());
        assert!(matches!("eleven".parse::<Digit>(), Err(DtwError::UnknownDigit { .. })));
        assert!("12".parse::<Digit>().is_err());
    }

    #[test]
    fn ordering_follows_value() {
        assert!(Digit::ALL.windows(2).all(|w| w[0] < w[1]));
    }
}
