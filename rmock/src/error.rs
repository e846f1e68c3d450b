// vim: tw=80
//! Failures reported by mocks and doubles.
//!
//! Every variant describes a defect in the test, never a transient
//! condition.  Nothing inside the crate retries or recovers from them.

use thiserror::Error;

/// Everything that can go wrong while configuring, calling, or verifying a
/// [`Mock`](crate::Mock).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The double was called with a method name that was never stubbed or
    /// expected.
    #[error("unexpected call to unconfigured method {method}({args})")]
    UnknownMethod {
        method: String,
        args: String,
    },

    /// The method is configured, but none of its handlers accepted the
    /// actual arguments.
    #[error("no match for arguments: {method}({args}){detail}")]
    NoMatchingHandler {
        method: String,
        args: String,
        /// One line per registered handler, explaining why it was rejected.
        detail: String,
    },

    /// An expectation was matched again after it had already been
    /// satisfied.
    #[error("expected call {method}({patterns}) happened more than once")]
    DuplicateExpectationCall {
        method: String,
        patterns: String,
    },

    /// A handler's response called the double in a way that selected the
    /// same handler again.
    #[error("response of {method}({patterns}) called {method} recursively and matched itself")]
    RecursiveCall {
        method: String,
        patterns: String,
    },

    /// Verification found an expectation that was never matched.  Only the
    /// earliest registered one is reported.
    #[error("expected call {method}({patterns}) did not happen")]
    UnmetExpectation {
        method: String,
        patterns: String,
    },

    /// A [`Value`](crate::Value) was extracted as the wrong type.
    #[error("expected a return value of type {expected}, but the response produced {found}")]
    ValueType {
        expected: &'static str,
        found: &'static str,
    },

    /// A pattern could not be built, e.g. an invalid regular expression.
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),
}

/// Render a sequence of items the way they appear between the parentheses
/// of a call.
pub(crate) fn join<I, T>(items: I) -> String
    where I: IntoIterator<Item = T>,
          T: std::fmt::Display
{
    items.into_iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
