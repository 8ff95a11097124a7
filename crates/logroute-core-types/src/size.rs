//! Byte size thresholds
//!
//! Grammar: `<number>[ ]<unit>` where the number is an integer or decimal and
//! the unit is one of `B`, `KB`, `MB`, `GB`, `TB` (powers of 1000) or `KiB`,
//! `MiB`, `GiB`, `TiB` (powers of 1024), case-insensitive. A bare integer is a
//! byte count. Zero is rejected.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const UNITS: &[(&str, u64)] = &[
    ("b", 1),
    ("kb", 1_000),
    ("mb", 1_000_000),
    ("gb", 1_000_000_000),
    ("tb", 1_000_000_000_000),
    ("kib", 1 << 10),
    ("mib", 1 << 20),
    ("gib", 1 << 30),
    ("tib", 1 << 40),
];

// Display order: largest unit first, binary before decimal at equal rank
const DISPLAY_UNITS: &[(&str, u64)] = &[
    ("TiB", 1 << 40),
    ("TB", 1_000_000_000_000),
    ("GiB", 1 << 30),
    ("GB", 1_000_000_000),
    ("MiB", 1 << 20),
    ("MB", 1_000_000),
    ("KiB", 1 << 10),
    ("KB", 1_000),
];

/// A positive number of bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ByteSize(u64);

impl ByteSize {
    /// Construct from a raw byte count
    pub const fn from_bytes(bytes: u64) -> Self {
        Self(bytes)
    }

    /// Number of bytes
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseSizeError {
    #[error("size is empty")]
    Empty,

    #[error("invalid number in size '{0}'")]
    InvalidNumber(String),

    #[error("unknown size unit '{0}' (expected B, KB, MB, GB, TB, KiB, MiB, GiB or TiB)")]
    UnknownUnit(String),

    #[error("size must be greater than zero")]
    Zero,

    #[error("size '{0}' does not fit in 64 bits")]
    Overflow(String),
}

impl FromStr for ByteSize {
    type Err = ParseSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        if input.is_empty() {
            return Err(ParseSizeError::Empty);
        }

        let split = input
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(input.len());
        let (number, unit) = input.split_at(split);
        let unit = unit.trim().to_ascii_lowercase();

        let multiplier = if unit.is_empty() {
            1
        } else {
            UNITS
                .iter()
                .find(|(name, _)| *name == unit)
                .map(|(_, m)| *m)
                .ok_or_else(|| ParseSizeError::UnknownUnit(unit.clone()))?
        };

        let bytes = if number.contains('.') {
            let value: f64 = number
                .parse()
                .map_err(|_| ParseSizeError::InvalidNumber(input.to_string()))?;
            let bytes = (value * multiplier as f64).round();
            if !bytes.is_finite() || bytes >= u64::MAX as f64 {
                return Err(ParseSizeError::Overflow(input.to_string()));
            }
            bytes as u64
        } else {
            let value: u64 = number
                .parse()
                .map_err(|_| ParseSizeError::InvalidNumber(input.to_string()))?;
            value
                .checked_mul(multiplier)
                .ok_or_else(|| ParseSizeError::Overflow(input.to_string()))?
        };

        if bytes == 0 {
            return Err(ParseSizeError::Zero);
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, unit) in DISPLAY_UNITS {
            if self.0 >= *unit && self.0 % unit == 0 {
                return write!(f, "{} {}", self.0 / unit, name);
            }
        }
        write!(f, "{} B", self.0)
    }
}

impl Serialize for ByteSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct ByteSizeVisitor;

impl<'de> Visitor<'de> for ByteSizeVisitor {
    type Value = ByteSize;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a byte count or a size such as \"10 MB\"")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<ByteSize, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<ByteSize, E> {
        if v == 0 {
            return Err(E::custom(ParseSizeError::Zero));
        }
        Ok(ByteSize(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<ByteSize, E> {
        let v = u64::try_from(v).map_err(|_| E::custom(ParseSizeError::Zero))?;
        self.visit_u64(v)
    }
}

impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ByteSizeVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_decimal_and_binary_units() {
        assert_eq!("10 MB".parse::<ByteSize>().unwrap().as_u64(), 10_000_000);
        assert_eq!("10MB".parse::<ByteSize>().unwrap().as_u64(), 10_000_000);
        assert_eq!("512 KiB".parse::<ByteSize>().unwrap().as_u64(), 512 * 1024);
        assert_eq!("1.5 kb".parse::<ByteSize>().unwrap().as_u64(), 1_500);
        assert_eq!("4096".parse::<ByteSize>().unwrap().as_u64(), 4096);
        assert_eq!("7 b".parse::<ByteSize>().unwrap().as_u64(), 7);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<ByteSize>(), Err(ParseSizeError::Empty));
        assert_eq!("0 MB".parse::<ByteSize>(), Err(ParseSizeError::Zero));
        assert_eq!(
            "10 parsecs".parse::<ByteSize>(),
            Err(ParseSizeError::UnknownUnit("parsecs".to_string()))
        );
        assert!(matches!(
            "1.2.3 MB".parse::<ByteSize>(),
            Err(ParseSizeError::InvalidNumber(_))
        ));
        assert!(matches!(
            "99999999999 TB".parse::<ByteSize>(),
            Err(ParseSizeError::Overflow(_))
        ));
    }

    #[test]
    fn test_display_picks_exact_unit() {
        assert_eq!(ByteSize::from_bytes(10_000_000).to_string(), "10 MB");
        assert_eq!(ByteSize::from_bytes(2048).to_string(), "2 KiB");
        assert_eq!(ByteSize::from_bytes(1001).to_string(), "1001 B");
    }

    #[test]
    fn test_deserialize_from_string_or_integer() {
        let from_str: ByteSize = serde_json::from_str("\"1 MiB\"").unwrap();
        let from_int: ByteSize = serde_json::from_str("1048576").unwrap();
        assert_eq!(from_str, from_int);
        assert!(serde_json::from_str::<ByteSize>("0").is_err());
    }

    proptest! {
        #[test]
        fn prop_kib_is_1024_bytes(n in 1u64..1_000_000) {
            let parsed: ByteSize = format!("{} KiB", n).parse().unwrap();
            prop_assert_eq!(parsed.as_u64(), n * 1024);
        }

        #[test]
        fn prop_display_reparses_to_same_size(n in 1u64..u32::MAX as u64) {
            let size = ByteSize::from_bytes(n);
            let reparsed: ByteSize = size.to_string().parse().unwrap();
            prop_assert_eq!(reparsed, size);
        }
    }
}
