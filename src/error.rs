//! Crate error types.
//!
//! Two failure classes exist. Malformed input is reported before any
//! dispatching happens, with one [`InputError`] per offending field.
//! An inconsistency is a bug: the integrity audit found an emitted
//! schedule violating its own invariants, and the whole call fails
//! rather than returning a partial schedule. An order that merely
//! misses its due date is neither; it is reported in the summary.

use thiserror::Error;

/// A single invalid field in the scheduling request.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{field}: {message}")]
pub struct InputError {
    /// Dotted path of the offending field (e.g. `orders[2].cluster`).
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl InputError {
    /// Creates an input error for a field.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors returned by the scheduler entry point.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// The request violated a precondition. All detected problems are listed.
    #[error("invalid scheduling request: {0:?}")]
    InvalidInput(Vec<InputError>),

    /// The emitted schedule failed the integrity audit.
    #[error("schedule integrity violated: {0}")]
    Inconsistency(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_error_display() {
        let e = InputError::new("orders[0].due", "must be non-negative");
        assert_eq!(e.to_string(), "orders[0].due: must be non-negative");
    }

    #[test]
    fn test_schedule_error_display() {
        let e = ScheduleError::InvalidInput(vec![InputError::new("machines", "must not be empty")]);
        assert!(e.to_string().contains("machines"));

        let e = ScheduleError::Inconsistency("overlap on L1".into());
        assert!(e.to_string().contains("overlap on L1"));
    }
}
