//! Dispatch priority tiers.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Ordering tier for listeners and consumers.
///
/// Variants are declared from highest to lowest, so the derived `Ord` sorts
/// `Highest` first. Within a tier, registration order decides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    /// Runs before every other tier.
    Highest,
    /// Runs after `Highest`.
    High,
    /// The default tier.
    #[default]
    Normal,
    /// Runs last.
    Low,
}

impl Priority {
    /// Number of tiers.
    pub const COUNT: usize = 4;

    /// All tiers in dispatch order.
    pub const ALL: [Priority; Self::COUNT] = [Self::Highest, Self::High, Self::Normal, Self::Low];

    /// Position of this tier in [`Priority::ALL`].
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns the tier name in lowercase.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Highest => "highest",
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no [`Priority`] tier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown priority '{input}', expected one of: highest, high, normal, low")]
pub struct ParsePriorityError {
    input: String,
}

impl ParsePriorityError {
    /// The rejected input.
    pub fn input(&self) -> &str {
        &self.input
    }
}

impl FromStr for Priority {
    type Err = ParsePriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "highest" => Ok(Self::Highest),
            "high" => Ok(Self::High),
            "normal" => Ok(Self::Normal),
            "low" => Ok(Self::Low),
            _ => Err(ParsePriorityError {
                input: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_is_highest_first() {
        let mut tiers = vec![Priority::Low, Priority::Highest, Priority::Normal, Priority::High];
        tiers.sort();
        assert_eq!(tiers, Priority::ALL.to_vec());
    }

    #[test]
    fn test_index_matches_all() {
        for (i, p) in Priority::ALL.iter().enumerate() {
            assert_eq!(p.index(), i);
        }
    }

    #[test]
    fn test_from_str() {
        assert_eq!("HIGH".parse::<Priority>(), Ok(Priority::High));
        assert_eq!(Priority::default(), Priority::Normal);
    }

    #[test]
    fn test_parse_error_names_input() {
        let err = "urgent".parse::<Priority>().unwrap_err();
        assert_eq!(err.input(), "urgent");
        assert_eq!(
            err.to_string(),
            "unknown priority 'urgent', expected one of: highest, high, normal, low"
        );
    }
}
