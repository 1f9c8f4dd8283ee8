//! A [`Duration`] written as unit fragments, like `30s`, `1h10m` or `2d12h`.
//!
//! The provider uses it for the poll interval of long-running operations and
//! for the deadline of a lifecycle operation. It derefs to
//! [`std::time::Duration`].

use std::{fmt::Display, num::ParseIntError, ops::Deref, str::FromStr};

use snafu::{ResultExt as _, Snafu, ensure};
use strum::IntoEnumIterator as _;

#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(module)]
pub enum DurationParseError {
    #[snafu(display("duration is empty"))]
    Empty,

    #[snafu(display("unexpected character {chr:?} at position {position}"))]
    UnexpectedCharacter { chr: char, position: usize },

    #[snafu(display("value {value} has no unit"))]
    MissingUnit { value: u64 },

    #[snafu(display("unknown unit {unit:?}, expected one of d, h, m, s or ms"))]
    UnknownUnit { unit: String },

    #[snafu(display("unit {unit} must come before {previous}"))]
    UnitOrder {
        unit: DurationUnit,
        previous: DurationUnit,
    },

    #[snafu(display("failed to parse value {value:?}"))]
    ParseValue {
        source: ParseIntError,
        value: String,
    },

    #[snafu(display("duration is too long"))]
    Overflow,
}

#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Duration(std::time::Duration);

impl Duration {
    pub const fn from_secs(secs: u64) -> Self {
        Self(std::time::Duration::from_secs(secs))
    }

    /// Overflows for minute counts beyond `u64::MAX / 60`.
    pub const fn from_minutes_unchecked(minutes: u64) -> Self {
        Self::from_secs(minutes * 60)
    }

    pub const fn from_millis(millis: u64) -> Self {
        Self(std::time::Duration::from_millis(millis))
    }
}

impl FromStr for Duration {
    type Err = DurationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use duration_parse_error::*;

        let input = s.trim();
        ensure!(!input.is_empty(), EmptySnafu);

        let mut millis: u64 = 0;
        let mut previous: Option<DurationUnit> = None;
        let mut rest = input;

        while !rest.is_empty() {
            let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
            if digits == 0 {
                let chr = rest.chars().next().unwrap_or_default();
                let position = input.len() - rest.len();
                return UnexpectedCharacterSnafu { chr, position }.fail();
            }
            let (value, tail) = rest.split_at(digits);
            let value = value.parse::<u64>().context(ParseValueSnafu { value })?;

            let letters = tail
                .find(|c: char| !c.is_ascii_alphabetic())
                .unwrap_or(tail.len());
            ensure!(letters > 0 || !tail.is_empty(), MissingUnitSnafu { value });
            if letters == 0 {
                let chr = tail.chars().next().unwrap_or_default();
                let position = input.len() - tail.len();
                return UnexpectedCharacterSnafu { chr, position }.fail();
            }
            let (unit, tail) = tail.split_at(letters);
            let unit = unit
                .parse::<DurationUnit>()
                .map_err(|_| DurationParseError::UnknownUnit {
                    unit: unit.to_owned(),
                })?;

            if let Some(previous) = previous {
                ensure!(unit > previous, UnitOrderSnafu { unit, previous });
            }
            previous = Some(unit);

            millis = value
                .checked_mul(unit.millis())
                .and_then(|fragment| millis.checked_add(fragment))
                .ok_or(DurationParseError::Overflow)?;
            rest = tail;
        }

        Ok(Self::from_millis(millis))
    }
}

impl Display for Duration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut remaining = self.0.as_millis();
        if remaining == 0 {
            return write!(f, "0{}", DurationUnit::Seconds);
        }

        for unit in DurationUnit::iter() {
            let size = u128::from(unit.millis());
            if remaining >= size {
                write!(f, "{}{unit}", remaining / size)?;
                remaining %= size;
            }
        }

        Ok(())
    }
}

impl Deref for Duration {
    type Target = std::time::Duration;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<std::time::Duration> for Duration {
    fn from(value: std::time::Duration) -> Self {
        Self(value)
    }
}

impl From<Duration> for std::time::Duration {
    fn from(value: Duration) -> Self {
        value.0
    }
}

/// Units in the order they have to appear in, largest first.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    strum::EnumString,
    strum::Display,
    strum::EnumIter,
)]
pub enum DurationUnit {
    #[strum(serialize = "d")]
    Days,

    #[strum(serialize = "h")]
    Hours,

    #[strum(serialize = "m")]
    Minutes,

    #[strum(serialize = "s")]
    Seconds,

    #[strum(serialize = "ms")]
    Milliseconds,
}

impl DurationUnit {
    const fn millis(self) -> u64 {
        match self {
            Self::Days => 86_400_000,
            Self::Hours => 3_600_000,
            Self::Minutes => 60_000,
            Self::Seconds => 1_000,
            Self::Milliseconds => 1,
        }
    }
}
