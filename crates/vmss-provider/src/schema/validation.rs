// The naming rules follow the documented Azure restrictions for resource and
// computer names, see
// https://learn.microsoft.com/azure/azure-resource-manager/management/resource-name-rules

use std::{fmt::Display, str::FromStr, sync::LazyLock};

use base64::Engine as _;
use const_format::concatcp;
use regex::Regex;
use serde::Serialize;
use snafu::{ResultExt as _, Snafu};

use crate::{
    identity::{self, ResourceId},
    value::{Value, ValueKind},
};

/// Characters which are never allowed in a resource name.
const NAME_FORBIDDEN_CHARS: &str = r#"\\/"\[\]:|<>+=;,?*@&"#;

/// A name must not start with '_' and must not end with '.' or '-'.
const NAME_FMT: &str = concatcp!(
    "[^_", NAME_FORBIDDEN_CHARS, ".-]",
    "|",
    "[^_", NAME_FORBIDDEN_CHARS, "][^", NAME_FORBIDDEN_CHARS, "]*[^", NAME_FORBIDDEN_CHARS, ".-]"
);
const NAME_ERROR_MSG: &str = r#"a name cannot contain the special characters \/"[]:|<>+=;,?*@&, must not start with '_' and must not end with '.' or '-'"#;

const LINUX_NAME_MAX_LENGTH: usize = 64;
const WINDOWS_COMPUTER_NAME_PREFIX_MAX_LENGTH: usize = 15;

static NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^(?:{NAME_FMT})$")).expect("failed to compile resource name regex")
});

type Result<T = (), E = Errors> = std::result::Result<T, E>;

/// A collection of errors discovered during validation.
#[derive(Debug)]
pub struct Errors(Vec<Error>);

impl Errors {
    pub fn iter(&self) -> impl Iterator<Item = &Error> {
        self.0.iter()
    }
}

impl Display for Errors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            let prefix = match i {
                0 => "",
                _ => ", ",
            };
            write!(f, "{prefix}{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Errors {}

impl From<Error> for Errors {
    fn from(error: Error) -> Self {
        Self(vec![error])
    }
}

/// A single validation error.
#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(transparent)]
    Regex { source: RegexError },

    #[snafu(display("input is {length} characters long but must be no more than {max_length}"))]
    TooLong { length: usize, max_length: usize },

    #[snafu(display("input must not be empty"))]
    Empty,

    #[snafu(display("expected {value} to be at least {min}"))]
    TooSmall { value: i64, min: i64 },

    #[snafu(display("expected {value} to be in the range {min}..={max}"))]
    OutOfRange { value: i64, min: i64, max: i64 },

    #[snafu(display("expected {value:?} to be one of {allowed:?}"))]
    NotAllowed {
        value: String,
        allowed: &'static [&'static str],
    },

    #[snafu(display("input is not a valid resource id"))]
    InvalidResourceId { source: identity::Error },

    #[snafu(display("input is not valid base64"))]
    InvalidBase64 { source: base64::DecodeError },

    #[snafu(display("validator cannot be applied to a {kind}"))]
    UnsupportedValue { kind: ValueKind },
}

#[derive(Debug)]
pub struct RegexError {
    /// The primary error message.
    msg: &'static str,

    /// The regex that the input must match.
    regex: &'static str,

    /// Examples of valid inputs (if non-empty).
    examples: &'static [&'static str],
}

impl Display for RegexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self {
            msg,
            regex,
            examples,
        } = self;
        write!(f, "{msg} (")?;
        for (i, example) in examples.iter().enumerate() {
            let prefix = match i {
                0 => "e.g.",
                _ => "or",
            };
            write!(f, "{prefix} {example:?}, ")?;
        }
        write!(f, "regex used for validation is {regex:?})")
    }
}

impl std::error::Error for RegexError {}

/// A predicate attached to a field of the schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorFn {
    NoEmptyStrings,
    IntAtLeast(i64),
    IntBetween(i64, i64),
    StringInSlice(&'static [&'static str]),
    ResourceId,
    ResourceIdOrEmpty,
    LinuxName,
    WindowsComputerNamePrefix,
    Base64,
}

impl ValidatorFn {
    pub fn validate(&self, value: &Value) -> Result {
        match (self, value) {
            (ValidatorFn::IntAtLeast(min), Value::Int(value)) => {
                validate_all([validate_int_range(*value, *min, i64::MAX)])
            }
            (ValidatorFn::IntBetween(min, max), Value::Int(value)) => {
                validate_all([validate_int_range(*value, *min, *max)])
            }
            (_, Value::String(value)) => self.validate_str(value),
            (_, other) => Err(UnsupportedValueSnafu { kind: other.kind() }.build().into()),
        }
    }

    fn validate_str(&self, value: &str) -> Result {
        match self {
            ValidatorFn::NoEmptyStrings => validate_all([validate_not_blank(value)]),
            ValidatorFn::StringInSlice(allowed) => validate_all([validate_in_slice(value, allowed)]),
            ValidatorFn::ResourceId => is_resource_id(value),
            ValidatorFn::ResourceIdOrEmpty if value.is_empty() => Ok(()),
            ValidatorFn::ResourceIdOrEmpty => is_resource_id(value),
            ValidatorFn::LinuxName => is_linux_name(value),
            ValidatorFn::WindowsComputerNamePrefix => is_windows_computer_name_prefix(value),
            ValidatorFn::Base64 => is_base64(value),
            ValidatorFn::IntAtLeast(_) | ValidatorFn::IntBetween(..) => Err(UnsupportedValueSnafu {
                kind: ValueKind::String,
            }
            .build()
            .into()),
        }
    }
}

/// Returns [`Ok`] if `value`'s length fits within `max_length`.
fn validate_str_length(value: &str, max_length: usize) -> Result<(), Error> {
    let length = value.chars().count();
    if length > max_length {
        TooLongSnafu { length, max_length }.fail()
    } else {
        Ok(())
    }
}

/// Returns [`Ok`] if `value` matches `regex`.
fn validate_str_regex(
    value: &str,
    regex: &'static Regex,
    error_msg: &'static str,
    examples: &'static [&'static str],
) -> Result<(), Error> {
    if regex.is_match(value) {
        Ok(())
    } else {
        Err(RegexError {
            msg: error_msg,
            regex: regex
                .as_str()
                // Clean up start/end-of-line markers
                .trim_start_matches('^')
                .trim_end_matches('$'),
            examples,
        }
        .into())
    }
}

fn validate_not_blank(value: &str) -> Result<(), Error> {
    if value.trim().is_empty() {
        EmptySnafu.fail()
    } else {
        Ok(())
    }
}

fn validate_int_range(value: i64, min: i64, max: i64) -> Result<(), Error> {
    match (min..=max).contains(&value) {
        true => Ok(()),
        false if max == i64::MAX => TooSmallSnafu { value, min }.fail(),
        false => OutOfRangeSnafu { value, min, max }.fail(),
    }
}

fn validate_in_slice(value: &str, allowed: &'static [&'static str]) -> Result<(), Error> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        NotAllowedSnafu { value, allowed }.fail()
    }
}

/// Returns [`Ok`] if *all* validations are [`Ok`], otherwise returns all errors.
fn validate_all(validations: impl IntoIterator<Item = Result<(), Error>>) -> Result {
    let errors = validations
        .into_iter()
        .filter_map(|res| res.err())
        .collect::<Vec<_>>();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Errors(errors))
    }
}

fn is_name(value: &str, max_length: usize, examples: &'static [&'static str]) -> Result {
    if value.is_empty() {
        return Err(Error::Empty.into());
    }

    validate_all([
        validate_str_length(value, max_length),
        validate_str_regex(value, &NAME_REGEX, NAME_ERROR_MSG, examples),
    ])
}

/// Tests for a valid Linux scale set or computer name prefix (1-64 characters).
pub fn is_linux_name(value: &str) -> Result {
    is_name(value, LINUX_NAME_MAX_LENGTH, &["example-vmss", "web.01"])
}

/// Tests for a valid Windows computer name prefix (1-15 characters).
pub fn is_windows_computer_name_prefix(value: &str) -> Result {
    is_name(value, WINDOWS_COMPUTER_NAME_PREFIX_MAX_LENGTH, &["web", "app-01"])
}

pub fn is_resource_id(value: &str) -> Result {
    ResourceId::from_str(value)
        .map(|_| ())
        .context(InvalidResourceIdSnafu)
        .map_err(Errors::from)
}

pub fn is_base64(value: &str) -> Result {
    base64::engine::general_purpose::STANDARD
        .decode(value)
        .map(|_| ())
        .context(InvalidBase64Snafu)
        .map_err(Errors::from)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("example-vmss")]
    #[case("a")]
    #[case("web.01")]
    #[case("Name_With_Underscores")]
    fn valid_linux_names(#[case] value: &str) {
        assert!(is_linux_name(value).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("_leading")]
    #[case("trailing-")]
    #[case("trailing.")]
    #[case("-")]
    #[case("has/slash")]
    #[case("at@sign")]
    #[case("semi;colon")]
    fn invalid_linux_names(#[case] value: &str) {
        assert!(is_linux_name(value).is_err());
    }

    #[test]
    fn linux_name_length() {
        assert!(is_linux_name(&"a".repeat(64)).is_ok());

        let err = is_linux_name(&"a".repeat(65)).unwrap_err();
        assert!(matches!(err.iter().next(), Some(Error::TooLong {
            length: 65,
            max_length: 64
        })));
    }

    #[rstest]
    #[case("web", true)]
    #[case("abcdefghijklmno", true)]
    #[case("abcdefghijklmnop", false)]
    #[case("web-", false)]
    fn windows_computer_name_prefix(#[case] value: &str, #[case] valid: bool) {
        assert_eq!(is_windows_computer_name_prefix(value).is_ok(), valid);
    }

    #[rstest]
    #[case(ValidatorFn::IntBetween(4, 32), 4, true)]
    #[case(ValidatorFn::IntBetween(4, 32), 33, false)]
    #[case(ValidatorFn::IntBetween(0, 1023), 0, true)]
    #[case(ValidatorFn::IntAtLeast(0), -1, false)]
    #[case(ValidatorFn::IntAtLeast(0), 100, true)]
    fn int_validators(#[case] validator: ValidatorFn, #[case] value: i64, #[case] valid: bool) {
        assert_eq!(validator.validate(&Value::Int(value)).is_ok(), valid);
    }

    #[rstest]
    #[case(ValidatorFn::NoEmptyStrings, "  ", false)]
    #[case(ValidatorFn::NoEmptyStrings, "x", true)]
    #[case(ValidatorFn::StringInSlice(&["Manual", "Rolling"]), "Rolling", true)]
    #[case(ValidatorFn::StringInSlice(&["Manual", "Rolling"]), "rolling", false)]
    #[case(ValidatorFn::ResourceIdOrEmpty, "", true)]
    #[case(ValidatorFn::ResourceId, "", false)]
    #[case(
        ValidatorFn::ResourceId,
        "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet/subnets/internal",
        true
    )]
    #[case(ValidatorFn::Base64, "aGVsbG8=", true)]
    #[case(ValidatorFn::Base64, "not base64!", false)]
    fn string_validators(#[case] validator: ValidatorFn, #[case] value: &str, #[case] valid: bool) {
        assert_eq!(validator.validate(&Value::from(value)).is_ok(), valid);
    }

    #[test]
    fn validator_rejects_other_kinds() {
        let err = ValidatorFn::LinuxName.validate(&Value::Bool(true)).unwrap_err();
        assert!(matches!(err.iter().next(), Some(Error::UnsupportedValue {
            kind: ValueKind::Bool
        })));
    }
}
