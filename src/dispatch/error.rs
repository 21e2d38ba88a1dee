//! Error type for dynamic dispatch.

use std::fmt;

/// A call that could not be made. These faults are never retried: a missing
/// method or a malformed argument list fails the same way every time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// No method with this name is registered for the target type.
    UnknownMethod {
        /// Requested method name.
        method: String,
        /// Type the method was looked up on.
        type_name: &'static str,
    },
    /// The number of arguments does not match the method's arity.
    ArgumentCount {
        /// Method being called.
        method: String,
        /// Declared arity.
        expected: usize,
        /// Number of arguments supplied.
        actual: usize,
    },
    /// An argument is not of the type the method reads it as.
    ArgumentType {
        /// Method being called.
        method: String,
        /// Zero-based argument position.
        index: usize,
        /// Type the method expected at that position.
        expected: &'static str,
    },
}

impl DispatchError {
    /// Name of the method the fault relates to.
    pub fn method(&self) -> &str {
        match self {
            Self::UnknownMethod { method, .. }
            | Self::ArgumentCount { method, .. }
            | Self::ArgumentType { method, .. } => method,
        }
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownMethod { method, type_name } => write!(
                f,
                "method with name '{}' does not exist on object '{}'",
                method, type_name
            ),
            Self::ArgumentCount {
                method,
                expected,
                actual,
            } => write!(
                f,
                "method '{}' takes {} argument(s) but {} were supplied",
                method, expected, actual
            ),
            Self::ArgumentType {
                method,
                index,
                expected,
            } => write!(
                f,
                "argument {} of method '{}' is not a '{}'",
                index, method, expected
            ),
        }
    }
}

impl std::error::Error for DispatchError {}
