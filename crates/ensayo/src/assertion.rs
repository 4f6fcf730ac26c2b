//! Scoped assertions over the console log buffer and DOM values.
//!
//! Log-message substrings are the de facto wire protocol between the game
//! and the harness. Assertions here are always scoped to a checkpoint
//! captured before the action under test, so a residual log from an
//! earlier action can never satisfy them.

use crate::console::{ConsoleEntry, LogBuffer, LogCheckpoint};
use crate::result::{EnsayoError, EnsayoResult};
use regex::{Regex, RegexBuilder};

/// Predicate over a console message's text.
#[derive(Debug, Clone)]
pub enum LogPredicate {
    /// Case-insensitive substring match
    Substring(String),
    /// Regex match (compiled case-insensitive via [`LogPredicate::pattern`])
    Pattern(Regex),
    /// Satisfied if any inner predicate matches
    AnyOf(Vec<LogPredicate>),
}

impl LogPredicate {
    /// Case-insensitive substring predicate.
    #[must_use]
    pub fn substring(needle: impl Into<String>) -> Self {
        Self::Substring(needle.into())
    }

    /// Case-insensitive regex predicate.
    ///
    /// # Errors
    ///
    /// Returns [`EnsayoError::Evaluation`] if the pattern does not compile.
    pub fn pattern(pattern: &str) -> EnsayoResult<Self> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| EnsayoError::Evaluation {
                message: format!("invalid log pattern '{pattern}': {e}"),
            })?;
        Ok(Self::Pattern(regex))
    }

    /// Predicate satisfied by any of the alternatives.
    ///
    /// The game logs either a direct warning or a dialog notice for the
    /// same condition, so several tests accept two message shapes.
    #[must_use]
    pub fn any_of(alternatives: Vec<LogPredicate>) -> Self {
        Self::AnyOf(alternatives)
    }

    /// Check the predicate against a message text.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Self::Substring(needle) => text.to_lowercase().contains(&needle.to_lowercase()),
            Self::Pattern(regex) => regex.is_match(text),
            Self::AnyOf(alternatives) => alternatives.iter().any(|p| p.matches(text)),
        }
    }

    /// Human-readable description for failure messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Substring(needle) => format!("log containing \"{needle}\""),
            Self::Pattern(regex) => format!("log matching /{}/", regex.as_str()),
            Self::AnyOf(alternatives) => {
                let parts: Vec<String> = alternatives.iter().map(Self::describe).collect();
                parts.join(" OR ")
            }
        }
    }
}

/// Find the first scoped entry matching the predicate.
#[must_use]
pub fn find_match<'a>(
    entries: &'a [ConsoleEntry],
    predicate: &LogPredicate,
) -> Option<&'a ConsoleEntry> {
    entries.iter().find(|entry| predicate.matches(&entry.text))
}

/// Assert that at least one entry produced after `checkpoint` matches.
///
/// Returns the matching entry so callers can parse values out of it.
///
/// # Errors
///
/// Returns [`EnsayoError::AssertionMismatch`] carrying the unmatched
/// predicate description and the scoped log slice.
pub fn assert_log_contains(
    buffer: &LogBuffer,
    predicate: &LogPredicate,
    checkpoint: LogCheckpoint,
) -> EnsayoResult<ConsoleEntry> {
    let scoped = buffer.since(checkpoint);
    match find_match(&scoped, predicate) {
        Some(entry) => Ok(entry.clone()),
        None => Err(EnsayoError::AssertionMismatch {
            message: format!("expected {}", predicate.describe()),
            scoped_logs: scoped.iter().map(ConsoleEntry::dump_line).collect(),
        }),
    }
}

/// Assert that no entry produced after `checkpoint` matches.
///
/// Used to verify an action completed without warnings.
///
/// # Errors
///
/// Returns [`EnsayoError::AssertionMismatch`] naming the offending entry.
pub fn assert_no_log_matches(
    buffer: &LogBuffer,
    predicate: &LogPredicate,
    checkpoint: LogCheckpoint,
) -> EnsayoResult<()> {
    let scoped = buffer.since(checkpoint);
    if let Some(entry) = find_match(&scoped, predicate) {
        return Err(EnsayoError::AssertionMismatch {
            message: format!(
                "expected no {}, but saw \"{}\"",
                predicate.describe(),
                entry.text
            ),
            scoped_logs: scoped.iter().map(ConsoleEntry::dump_line).collect(),
        });
    }
    Ok(())
}

/// Assert two observed string values are equal (slider values, titles).
///
/// # Errors
///
/// Returns [`EnsayoError::AssertionMismatch`] describing the difference.
pub fn assert_value_eq(what: &str, expected: &str, actual: &str) -> EnsayoResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(EnsayoError::AssertionMismatch {
            message: format!("{what}: expected '{expected}', got '{actual}'"),
            scoped_logs: Vec::new(),
        })
    }
}

/// Assert two floats agree within epsilon (parsed slider/fuel values).
///
/// # Errors
///
/// Returns [`EnsayoError::AssertionMismatch`] describing the difference.
pub fn assert_approx_eq(what: &str, expected: f64, actual: f64, epsilon: f64) -> EnsayoResult<()> {
    if (expected - actual).abs() < epsilon {
        Ok(())
    } else {
        Err(EnsayoError::AssertionMismatch {
            message: format!("{what}: expected {expected} (±{epsilon}), got {actual}"),
            scoped_logs: Vec::new(),
        })
    }
}
