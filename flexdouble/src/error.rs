// vim: tw=80
//! Error definitions
//!
//! Every failure the engine can report is a variant of [`Error`].  Routing
//! failures are returned from [`Double::invoke`](crate::Double::invoke) at the
//! point of the call; count failures are collected by
//! [`Double::verify`](crate::Double::verify) into a single report.

use std::fmt::Write;

use thiserror::Error;

use crate::times::{CountPolicy, times_in_words};

/// One count policy that did not hold when its expectation was verified.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CountViolation {
    /// Description of the offending expectation, e.g. `update(5)`
    pub expectation: String,
    /// The policy that failed
    pub policy: CountPolicy,
    /// How many calls the expectation actually handled
    pub actual: usize,
}

impl CountViolation {
    fn describe(&self, out: &mut String) {
        let _ = writeln!(out,
            "  method '{}' called incorrect number of times", self.expectation);
        let _ = writeln!(out, "    expected: {}", self.policy.describe_limit());
        let _ = writeln!(out, "    actual:   {}", times_in_words(self.actual));
    }
}

/// Main error type for flexdouble
#[derive(Error, Debug)]
pub enum Error {
    /// A call's arguments matched no declared expectation.
    #[error("in double '{double}': no matching handler found for {call}{detail}\n{log}")]
    NoMatchingHandler {
        double: String,
        method: String,
        /// The call, formatted as `name(arg, ...)`
        call: String,
        /// The declared expectations for the method, for diagnosis
        detail: String,
        /// Replay of the double's call log, ending with this call
        log: String,
    },

    /// A call targeted a method with no expectations and no fallback.
    #[error("in double '{double}': undefined method '{method}' called as {call}")]
    NoSuchMethod {
        double: String,
        method: String,
        call: String,
    },

    /// One or more count policies failed during verification.
    #[error("in double '{double}': {}", describe_violations(.violations, .log))]
    CountViolation {
        double: String,
        violations: Vec<CountViolation>,
        /// Replay of the double's call log
        log: String,
    },

    /// An ordered expectation fired before its order slot was reached.
    #[error("in double '{double}': method {call} called out of order (expected order {expected}, was {current})")]
    OrderViolation {
        double: String,
        call: String,
        expected: usize,
        current: usize,
    },

    /// Declaration-time misuse of the API
    #[error("{0}")]
    Usage(String),

    /// Raised by an expectation declared with `and_raise`
    #[error("in double '{double}': {method} raised: {message}")]
    Raised {
        double: String,
        method: String,
        message: String,
    },

    /// A spy assertion failed
    #[error("{0}")]
    NotReceived(String),

    /// Several doubles failed verification at once
    #[error("{}", describe_aggregate(.0))]
    Aggregate(Vec<Error>),
}

impl Error {
    /// Create a usage error.
    #[must_use]
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    /// Fold a list of failures into a single result.
    pub(crate) fn collect(mut errors: Vec<Error>) -> Result<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Error::Aggregate(errors)),
        }
    }
}

fn describe_violations(violations: &[CountViolation], log: &str) -> String {
    let mut out = String::from("verification failed\n");
    for v in violations {
        v.describe(&mut out);
    }
    out.push_str(log);
    out
}

fn describe_aggregate(errors: &[Error]) -> String {
    let mut out = format!("{} doubles failed verification", errors.len());
    for e in errors {
        let _ = write!(out, "\n\n{e}");
    }
    out
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Report a declaration-chain misuse.  Chained declarators return `&mut Self`,
/// so misuse can't be returned as a [`Result`]; it panics instead.
#[track_caller]
pub(crate) fn usage_panic(message: String) -> ! {
    let e = Error::Usage(message);
    tracing::error!(error = %e, "declaration misuse");
    panic!("{e}")
}
