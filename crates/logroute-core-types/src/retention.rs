//! Archive retention policies
//!
//! Grammar:
//! - a bare integer `N` keeps the `N` most recent archives
//! - otherwise one or more `<number>[ ]<unit>` terms, summed into a maximum
//!   age (`"1 month"`, `"1 week 2 days"`, `"36h"`)
//!
//! Units (case-insensitive): `s/sec/second(s)`, `m/min/minute(s)`,
//! `h/hr/hour(s)`, `d/day(s)`, `w/week(s)`, `month(s)` (30 days),
//! `y/year(s)` (365 days).

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;
const MONTH: u64 = 30 * DAY;
const YEAR: u64 = 365 * DAY;

// Largest first; used for display
const DISPLAY_UNITS: &[(&str, u64)] = &[
    ("year", YEAR),
    ("month", MONTH),
    ("week", WEEK),
    ("day", DAY),
    ("hour", HOUR),
    ("minute", MINUTE),
    ("second", 1),
];

fn unit_seconds(unit: &str) -> Option<u64> {
    let secs = match unit {
        "s" | "sec" | "secs" | "second" | "seconds" => 1,
        "m" | "min" | "mins" | "minute" | "minutes" => MINUTE,
        "h" | "hr" | "hrs" | "hour" | "hours" => HOUR,
        "d" | "day" | "days" => DAY,
        "w" | "week" | "weeks" => WEEK,
        "month" | "months" => MONTH,
        "y" | "year" | "years" => YEAR,
        _ => return None,
    };
    Some(secs)
}

/// How long rotated archives are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// Delete archives older than this age
    Age(Duration),
    /// Keep only this many of the most recent archives
    Count(usize),
}

impl Retention {
    pub fn max_age(&self) -> Option<Duration> {
        match self {
            Retention::Age(age) => Some(*age),
            Retention::Count(_) => None,
        }
    }

    pub fn max_count(&self) -> Option<usize> {
        match self {
            Retention::Count(n) => Some(*n),
            Retention::Age(_) => None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseRetentionError {
    #[error("retention is empty")]
    Empty,

    #[error("invalid number in retention '{0}'")]
    InvalidNumber(String),

    #[error("missing unit after '{0}' in retention")]
    MissingUnit(String),

    #[error("unknown retention unit '{0}'")]
    UnknownUnit(String),

    #[error("retention must be greater than zero")]
    Zero,

    #[error("retention '{0}' is too long")]
    Overflow(String),
}

impl FromStr for Retention {
    type Err = ParseRetentionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        if input.is_empty() {
            return Err(ParseRetentionError::Empty);
        }

        if input.chars().all(|c| c.is_ascii_digit()) {
            let count: usize = input
                .parse()
                .map_err(|_| ParseRetentionError::InvalidNumber(input.to_string()))?;
            if count == 0 {
                return Err(ParseRetentionError::Zero);
            }
            return Ok(Retention::Count(count));
        }

        let mut total = 0f64;
        let mut rest = input;
        while !rest.is_empty() {
            let number_end = rest
                .find(|c: char| !(c.is_ascii_digit() || c == '.'))
                .unwrap_or(rest.len());
            let (number, tail) = rest.split_at(number_end);
            let value: f64 = number
                .parse()
                .map_err(|_| ParseRetentionError::InvalidNumber(input.to_string()))?;

            let tail = tail.trim_start();
            let unit_end = tail
                .find(|c: char| !c.is_ascii_alphabetic())
                .unwrap_or(tail.len());
            let (unit, tail) = tail.split_at(unit_end);
            if unit.is_empty() {
                return Err(ParseRetentionError::MissingUnit(number.to_string()));
            }
            let unit = unit.to_ascii_lowercase();
            let secs = unit_seconds(&unit).ok_or(ParseRetentionError::UnknownUnit(unit))?;

            total += value * secs as f64;
            rest = tail.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
        }

        if total <= 0.0 {
            return Err(ParseRetentionError::Zero);
        }
        let age = Duration::try_from_secs_f64(total)
            .map_err(|_| ParseRetentionError::Overflow(input.to_string()))?;
        Ok(Retention::Age(age))
    }
}

impl fmt::Display for Retention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Retention::Count(n) => write!(f, "{}", n),
            Retention::Age(age) => {
                let secs = age.as_secs();
                let (name, unit) = DISPLAY_UNITS
                    .iter()
                    .find(|(_, unit)| secs >= *unit && secs % unit == 0)
                    .copied()
                    .unwrap_or(("second", 1));
                let n = secs / unit;
                let plural = if n == 1 { "" } else { "s" };
                write!(f, "{} {}{}", n, name, plural)
            }
        }
    }
}

impl Serialize for Retention {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct RetentionVisitor;

impl<'de> Visitor<'de> for RetentionVisitor {
    type Value = Retention;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an archive count or a duration such as \"1 month\"")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Retention, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Retention, E> {
        let count = usize::try_from(v).map_err(E::custom)?;
        if count == 0 {
            return Err(E::custom(ParseRetentionError::Zero));
        }
        Ok(Retention::Count(count))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Retention, E> {
        let v = u64::try_from(v).map_err(|_| E::custom(ParseRetentionError::Zero))?;
        self.visit_u64(v)
    }
}

impl<'de> Deserialize<'de> for Retention {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(RetentionVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_calendar_units() {
        assert_eq!(
            "1 month".parse::<Retention>().unwrap(),
            Retention::Age(Duration::from_secs(30 * DAY))
        );
        assert_eq!(
            "2 Weeks".parse::<Retention>().unwrap(),
            Retention::Age(Duration::from_secs(14 * DAY))
        );
        assert_eq!(
            "36h".parse::<Retention>().unwrap(),
            Retention::Age(Duration::from_secs(36 * HOUR))
        );
    }

    #[test]
    fn test_parse_sums_multiple_terms() {
        assert_eq!(
            "1 week, 2 days".parse::<Retention>().unwrap(),
            Retention::Age(Duration::from_secs(9 * DAY))
        );
        assert_eq!(
            "1h 30min".parse::<Retention>().unwrap(),
            Retention::Age(Duration::from_secs(90 * MINUTE))
        );
    }

    #[test]
    fn test_bare_integer_is_a_count() {
        assert_eq!("10".parse::<Retention>().unwrap(), Retention::Count(10));
        assert_eq!(Retention::Count(3).max_count(), Some(3));
        assert_eq!(Retention::Count(3).max_age(), None);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Retention>(), Err(ParseRetentionError::Empty));
        assert_eq!("0".parse::<Retention>(), Err(ParseRetentionError::Zero));
        assert_eq!("0 days".parse::<Retention>(), Err(ParseRetentionError::Zero));
        assert_eq!(
            "3 fortnights".parse::<Retention>(),
            Err(ParseRetentionError::UnknownUnit("fortnights".to_string()))
        );
        assert!(matches!(
            "1 day 5".parse::<Retention>(),
            Err(ParseRetentionError::MissingUnit(_))
        ));
        assert!(matches!(
            "month".parse::<Retention>(),
            Err(ParseRetentionError::InvalidNumber(_))
        ));
    }

    #[test]
    fn test_parse_overflow() {
        assert_eq!(
            "99999999999999999999999 years".parse::<Retention>(),
            Err(ParseRetentionError::Overflow(
                "99999999999999999999999 years".to_string()
            ))
        );
        let digits = "9".repeat(400);
        assert!(matches!(
            format!("{} days", digits).parse::<Retention>(),
            Err(ParseRetentionError::Overflow(_))
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!("1 month".parse::<Retention>().unwrap().to_string(), "1 month");
        assert_eq!("48 hours".parse::<Retention>().unwrap().to_string(), "2 days");
        assert_eq!(Retention::Count(5).to_string(), "5");
    }

    #[test]
    fn test_deserialize_from_string_or_integer() {
        let age: Retention = serde_json::from_str("\"10 days\"").unwrap();
        assert_eq!(age.max_age(), Some(Duration::from_secs(10 * DAY)));
        let count: Retention = serde_json::from_str("7").unwrap();
        assert_eq!(count, Retention::Count(7));
    }

    proptest! {
        #[test]
        fn prop_days_scale_linearly(n in 1u64..10_000) {
            let parsed: Retention = format!("{} days", n).parse().unwrap();
            prop_assert_eq!(parsed.max_age(), Some(Duration::from_secs(n * DAY)));
        }
    }
}
