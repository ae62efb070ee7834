//! Core types module - shared data structures and constants
//!
//! This module defines the fundamental types exchanged between the bot adapter
//! and the external decision agent. All types are pure data structures with no
//! external dependencies, making them usable in any context (adapter logic,
//! gateway host, wire protocol).
//!
//! # Teams
//!
//! A match has two sides. The harness assigns one of them when the bot is
//! initialized and it never changes afterwards:
//!
//! | Variant | Wire name | Side |
//! |---------|-----------|------|
//! | `Team::Blue` | `"blue"` | first side |
//! | `Team::Orange` | `"orange"` | second side |
//!
//! # Vectors
//!
//! Observation and action vectors are opaque numeric sequences owned by the
//! external agent. The adapter only reads one scalar from the observation,
//! at [`DIAGNOSTIC_INDEX`], for its per-decision diagnostic line.
//!
//! # Examples
//!
//! ```
//! use tarebot_types::{InputVector, Team, BOT_NAME, DIAGNOSTIC_INDEX};
//!
//! // Parse from string (case-insensitive)
//! let team = Team::from_str("Blue").unwrap();
//! assert_eq!(team, Team::Blue);
//! assert_eq!(team.as_str(), "blue");
//!
//! // Diagnostic scalar
//! let mut values = vec![0.0; 33];
//! values[DIAGNOSTIC_INDEX] = 3.1415;
//! let input = InputVector::new(values);
//! assert_eq!(input.diagnostic_value(), Some(3.1415));
//!
//! assert_eq!(BOT_NAME, "TareBot");
//! ```

/// Display name shown by the harness for this bot.
pub const BOT_NAME: &str = "TareBot";

/// Index of the observation scalar echoed in the diagnostic line.
pub const DIAGNOSTIC_INDEX: usize = 32;

/// Minimum observation length for the diagnostic scalar to be present.
pub const DIAGNOSTIC_MIN_LEN: usize = DIAGNOSTIC_INDEX + 1;

/// Side of the field the bot plays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Team {
    /// First side.
    Blue,
    /// Second side.
    Orange,
}

impl Team {
    /// Parse a team label (case-insensitive, surrounding whitespace ignored)
    ///
    /// # Examples
    ///
    /// ```
    /// use tarebot_types::Team;
    ///
    /// assert_eq!(Team::from_str("blue"), Some(Team::Blue));
    /// assert_eq!(Team::from_str(" ORANGE "), Some(Team::Orange));
    /// assert_eq!(Team::from_str("green"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("blue") {
            Some(Team::Blue)
        } else if s.eq_ignore_ascii_case("orange") {
            Some(Team::Orange)
        } else {
            None
        }
    }

    /// Lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Team::Blue => "blue",
            Team::Orange => "orange",
        }
    }

}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observation handed to the bot by the harness on every frame.
///
/// The layout is defined by the external agent; the adapter forwards it
/// untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InputVector(pub Vec<f64>);

impl InputVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Scalar at [`DIAGNOSTIC_INDEX`], if the observation is long enough.
    pub fn diagnostic_value(&self) -> Option<f64> {
        self.0.get(DIAGNOSTIC_INDEX).copied()
    }
}

impl From<Vec<f64>> for InputVector {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

/// Action chosen by the external agent for one frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OutputVector(pub Vec<f64>);

impl OutputVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

impl From<Vec<f64>> for OutputVector {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}
