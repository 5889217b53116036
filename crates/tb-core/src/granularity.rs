//! Bucket granularity as the single source of truth for bucket size strings.

use std::fmt;
use std::str::FromStr;

/// Calendar unit used to partition a query range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Granularity {
    #[default]
    Day,
    /// Monday through Sunday.
    Week,
    Month,
}

impl Granularity {
    /// All granularities, smallest first.
    pub const ALL: [Self; 3] = [Self::Day, Self::Week, Self::Month];

    /// String representation used in query parameters.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }

    /// Parses a caller-supplied bucket parameter, falling back to [`Granularity::Day`]
    /// when the value is absent or unrecognized.
    pub fn parse_or_default(value: Option<&str>) -> Self {
        let Some(value) = value else {
            return Self::default();
        };
        value.trim().parse().unwrap_or_else(|err: UnknownGranularity| {
            tracing::debug!(%err, "falling back to day buckets");
            Self::default()
        })
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = UnknownGranularity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            _ => Err(UnknownGranularity(s.to_string())),
        }
    }
}

/// Error type for unknown granularity strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownGranularity(String);

impl fmt::Display for UnknownGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown bucket granularity: {}", self.0)
    }
}

impl std::error::Error for UnknownGranularity {}
