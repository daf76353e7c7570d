//! Strongly-typed value objects used by domain entities.
//!
//! These wrappers enforce basic invariants (positive identifiers, normalized
//! emails, bounded percentages, known status codes) so that once a value
//! reaches the domain layer it can be treated as trusted.
use std::fmt::{Display, Formatter};
use std::{ops::Deref, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::ValidateEmail;

/// Errors produced when attempting to construct a constrained value object.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeConstraintError {
    /// Provided identifier is zero or negative.
    #[error("id must be greater than zero")]
    NonPositiveId,
    /// Provided email failed format validation.
    #[error("invalid email address")]
    InvalidEmail,
    /// Provided string contained no non-whitespace characters.
    #[error("value cannot be empty")]
    EmptyString,
    /// Provided number is outside of the accepted range.
    #[error("value out of range: {0}")]
    OutOfRange(String),
    /// Provided value failed custom validation.
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

/// Normalizes and validates an email string.
fn normalize_email<S: Into<String>>(email: S) -> Result<String, TypeConstraintError> {
    let normalized = email.into().trim().to_lowercase();
    if normalized.validate_email() {
        Ok(normalized)
    } else {
        Err(TypeConstraintError::InvalidEmail)
    }
}

/// Macro to generate lightweight newtypes for positive identifiers.
macro_rules! id_newtype {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(
            Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
        )]
        pub struct $name(i32);

        impl $name {
            /// Creates a new identifier ensuring it is greater than zero.
            pub fn new(value: i32) -> Result<Self, TypeConstraintError> {
                if value > 0 {
                    Ok(Self(value))
                } else {
                    Err(TypeConstraintError::NonPositiveId)
                }
            }

            /// Returns the raw `i32` backing this identifier.
            pub const fn get(self) -> i32 {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<i32> for $name {
            type Error = TypeConstraintError;

            fn try_from(value: i32) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for i32 {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

id_newtype!(CompanyId, "Tenant identifier every record is scoped to.");
id_newtype!(UserId, "Unique identifier for a user.");
id_newtype!(StageId, "Unique identifier for an opportunity stage.");
id_newtype!(OpportunityId, "Unique identifier for an opportunity.");
id_newtype!(
    FiscalYearConfigId,
    "Unique identifier for a company's fiscal year configuration."
);
id_newtype!(FiscalYearId, "Unique identifier for a fiscal year.");
id_newtype!(QuarterId, "Unique identifier for a fiscal quarter.");
id_newtype!(PeriodId, "Unique identifier for a fiscal period.");
id_newtype!(ForecastTypeId, "Unique identifier for a forecast type.");
id_newtype!(
    ForecastConditionId,
    "Unique identifier for a forecast condition row."
);
id_newtype!(ForecastTargetId, "Unique identifier for a forecast target.");
id_newtype!(ForecastId, "Unique identifier for a forecast bucket.");
id_newtype!(ShortcutKeyId, "Unique identifier for a shortcut key.");
id_newtype!(SplitTypeId, "Unique identifier for an opportunity split type.");
id_newtype!(OpportunitySplitId, "Unique identifier for an opportunity split row.");

/// Lower-cased and validated email address.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct UserEmail(String);

impl UserEmail {
    /// Validates and normalizes an email string.
    pub fn new<S: Into<String>>(email: S) -> Result<Self, TypeConstraintError> {
        let normalized = normalize_email(email)?;
        Ok(Self(normalized))
    }

    /// Borrow the email as a `&str`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert into the owned inner `String`.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for UserEmail {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&str> for UserEmail {
    type Error = TypeConstraintError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Wrapper for non-empty, trimmed strings.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Trims whitespace and rejects empty inputs.
    pub fn new<S: Into<String>>(value: S) -> Result<Self, TypeConstraintError> {
        let trimmed = value.into().trim().to_string();
        if trimmed.is_empty() {
            return Err(TypeConstraintError::EmptyString);
        }
        Ok(Self(trimmed))
    }

    /// Consume the wrapper returning the owned string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

macro_rules! non_empty_string_newtype {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(String);

        impl $name {
            /// Constructs a trimmed, non-empty value.
            pub fn new<S: Into<String>>(value: S) -> Result<Self, TypeConstraintError> {
                let inner = NonEmptyString::new(value)?;
                Ok(Self(inner.into_inner()))
            }

            /// Borrow the value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the owned string.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Deref for $name {
            type Target = str;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = TypeConstraintError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = TypeConstraintError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }
    };
}

non_empty_string_newtype!(UserName, "User display name enforcing non-empty values.");
non_empty_string_newtype!(
    OpportunityName,
    "Opportunity title enforcing non-empty values."
);
non_empty_string_newtype!(StageName, "Pipeline stage label enforcing non-empty values.");
non_empty_string_newtype!(
    ForecastTypeName,
    "Forecast type label enforcing non-empty values."
);
non_empty_string_newtype!(SplitLabel, "Split type label enforcing non-empty values.");
non_empty_string_newtype!(
    PageUrl,
    "Application page path a shortcut key points to."
);

/// Whole percentage between 0 and 100.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Probability(u8);

impl Probability {
    /// Rejects values outside of `0..=100`.
    pub fn new(value: i32) -> Result<Self, TypeConstraintError> {
        if (0..=100).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(TypeConstraintError::OutOfRange(format!(
                "probability {value} not within 0..=100"
            )))
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    /// Share of `amount` weighted by this probability.
    pub fn weight(self, amount: f64) -> f64 {
        amount * f64::from(self.0) / 100.0
    }
}

impl From<Probability> for i32 {
    fn from(value: Probability) -> Self {
        i32::from(value.0)
    }
}

/// Single keyboard character bound to a shortcut, stored upper-case.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ShortcutChar(char);

impl ShortcutChar {
    pub fn new(value: &str) -> Result<Self, TypeConstraintError> {
        let mut chars = value.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_alphanumeric() => Ok(Self(c.to_ascii_uppercase())),
            (None, _) => Err(TypeConstraintError::EmptyString),
            _ => Err(TypeConstraintError::InvalidValue(format!(
                "shortcut key must be a single letter or digit, got `{value}`"
            ))),
        }
    }

    pub const fn get(self) -> char {
        self.0
    }
}

impl Display for ShortcutChar {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Generates a closed set of variants stored as lowercase text codes.
macro_rules! code_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $code:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every variant in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Text code persisted in the database.
            pub const fn code(self) -> &'static str {
                match self {
                    $($name::$variant => $code),+
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.code())
            }
        }

        impl FromStr for $name {
            type Err = TypeConstraintError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($code => Ok($name::$variant),)+
                    other => Err(TypeConstraintError::InvalidValue(format!(
                        concat!("unknown ", stringify!($name), " `{}`"),
                        other
                    ))),
                }
            }
        }
    };
}

code_enum!(
    /// Outcome class of a pipeline stage.
    StageType {
        Open => "open",
        Won => "won",
        Lost => "lost",
    }
);

code_enum!(
    /// Forecast bucket an opportunity is reported under.
    ForecastCategory {
        Pipeline => "pipeline",
        BestCase => "best_case",
        Commit => "commit",
        Closed => "closed",
        Omitted => "omitted",
    }
);

code_enum!(
    /// What a forecast type sums over the matching opportunities.
    ForecastMeasure {
        Amount => "amount",
        ExpectedRevenue => "expected_revenue",
        Quantity => "quantity",
    }
);

code_enum!(
    /// Calendar-aligned or week-based fiscal year.
    FiscalYearType {
        Standard => "standard",
        Custom => "custom",
    }
);

code_enum!(
    /// Layout family of a custom fiscal year.
    FormatType {
        QuarterBased => "quarter_based",
        YearBased => "year_based",
    }
);

code_enum!(
    /// Weeks per period inside every quarter.
    QuarterBasedFormat {
        FourFourFive => "4-4-5",
        FourFiveFour => "4-5-4",
        FiveFourFour => "5-4-4",
    }
);

code_enum!(
    /// Four-week periods per quarter across a 13-period year.
    YearBasedFormat {
        ThreeThreeThreeFour => "3-3-3-4",
        ThreeThreeFourThree => "3-3-4-3",
        ThreeFourThreeThree => "3-4-3-3",
        FourThreeThreeThree => "4-3-3-3",
    }
);

code_enum!(
    /// Which calendar year names a fiscal year.
    DisplayYearBasedOn {
        StartingYear => "starting_year",
        EndingYear => "ending_year",
    }
);

code_enum!(
    /// Numbering scheme for period names.
    PeriodDisplay {
        NumberByYear => "number_by_year",
        NumberByQuarter => "number_by_quarter",
    }
);

code_enum!(
    /// Opportunity value a split type divides between team members.
    SplitField {
        Amount => "amount",
        ExpectedRevenue => "expected_revenue",
    }
);

code_enum!(
    /// Modifier key that must be held with a shortcut.
    ShortcutCommand {
        Alt => "alt",
        Ctrl => "ctrl",
        Shift => "shift",
    }
);

impl QuarterBasedFormat {
    /// Weeks in each of the three periods of a quarter.
    pub const fn weeks(self) -> [u8; 3] {
        match self {
            QuarterBasedFormat::FourFourFive => [4, 4, 5],
            QuarterBasedFormat::FourFiveFour => [4, 5, 4],
            QuarterBasedFormat::FiveFourFour => [5, 4, 4],
        }
    }
}

impl YearBasedFormat {
    /// Number of 28-day periods in each quarter.
    pub const fn periods(self) -> [u8; 4] {
        match self {
            YearBasedFormat::ThreeThreeThreeFour => [3, 3, 3, 4],
            YearBasedFormat::ThreeThreeFourThree => [3, 3, 4, 3],
            YearBasedFormat::ThreeFourThreeThree => [3, 4, 3, 3],
            YearBasedFormat::FourThreeThreeThree => [4, 3, 3, 3],
        }
    }
}
