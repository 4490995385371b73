//! # Dependency Priorities
//!
//! Every edge in the dependency tree carries one of four strengths. Smaller
//! values are stronger: a `required` dependency must be built first, while an
//! `external` one is only recorded and never expanded.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Strength of a dependency edge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Must be built before the dependent package
    #[default]
    Required = 1,
    /// Built first unless that creates an unbreakable loop
    Recommended = 2,
    /// Only pulled in for directly requested packages
    Optional = 3,
    /// Provided outside the build, recorded as a leaf
    External = 4,
}

impl Priority {
    /// Numeric level as used in dependency listings (1..=4)
    pub fn level(self) -> u8 {
        self as u8
    }

    /// Parse a numeric level
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(Priority::Required),
            2 => Some(Priority::Recommended),
            3 => Some(Priority::Optional),
            4 => Some(Priority::External),
            _ => None,
        }
    }

    /// True if `self` is strictly stronger than `other`
    pub fn is_stronger_than(self, other: Priority) -> bool {
        self < other
    }

    /// Whether an edge of this priority is expanded under `ceiling`.
    ///
    /// External edges always pass: they are recorded as leaves regardless of
    /// how deep the expansion goes.
    pub fn admitted_by(self, ceiling: Priority) -> bool {
        self == Priority::External || self <= ceiling
    }

    /// Lowercase name used in configuration files
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Required => "required",
            Priority::Recommended => "recommended",
            Priority::Optional => "optional",
            Priority::External => "external",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a priority string is not recognised
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid priority '{0}': expected required, recommended, optional, external or 1-4")]
pub struct ParsePriorityError(pub String);

impl FromStr for Priority {
    type Err = ParsePriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "required" | "req" | "1" => Ok(Priority::Required),
            "recommended" | "rec" | "2" => Ok(Priority::Recommended),
            "optional" | "opt" | "3" => Ok(Priority::Optional),
            "external" | "ext" | "4" => Ok(Priority::External),
            _ => Err(ParsePriorityError(s.to_string())),
        }
    }
}
