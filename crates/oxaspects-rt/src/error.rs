//! Error types for the `OxAspects` runtime.
//!
//! Every fallible runtime operation returns [`Result`]. Faults raised by a
//! method implementation travel through dispatch as [`Error::Raised`] so the
//! caller of a message observes them exactly as the implementation produced
//! them.

use std::fmt;

/// Errors that can occur in the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Class name already exists in registry.
    ClassAlreadyExists {
        /// The rejected class name.
        name: String,
    },

    /// Inheritance cycle detected.
    InheritanceCycle,

    /// Invalid type encoding string.
    InvalidEncoding {
        /// The rejected encoding.
        encoding: String,
    },

    /// Selector names must not be empty.
    InvalidSelector,

    /// Selector not found in class or inheritance chain.
    SelectorNotFound {
        /// The selector that could not be resolved.
        selector: String,
    },

    /// Argument count mismatch for method signature.
    ArgumentCountMismatch {
        /// Expected number of arguments (excluding self and `_cmd`)
        expected: usize,
        /// Actual number of arguments provided
        got: usize,
    },

    /// Argument type mismatch for method signature.
    ArgumentTypeMismatch {
        /// Expected type encoding
        expected: char,
        /// Actual type encoding
        got: char,
        /// Argument index
        index: usize,
    },

    /// An implementation returned a value of the wrong type.
    ReturnTypeMismatch {
        /// Declared return type
        expected: char,
        /// Type of the returned value
        got: char,
    },

    /// Neither the hooked class nor any superclass has a body to run.
    NoOriginalImplementation {
        /// The selector whose original body is missing.
        selector: String,
    },

    /// A method implementation faulted.
    Raised {
        /// The selector whose implementation faulted.
        selector: String,
        /// Human-readable reason.
        reason: String,
    },
}

impl Error {
    /// Builds the fault value an implementation returns to abort a message.
    ///
    /// ```
    /// use oxaspects_rt::{Error, Selector};
    /// use std::str::FromStr;
    ///
    /// let sel = Selector::from_str("save").unwrap();
    /// let err = Error::raised(&sel, "disk full");
    /// assert_eq!(err.to_string(), "'save' raised: disk full");
    /// ```
    pub fn raised(
        selector: &crate::runtime::Selector,
        reason: impl Into<String>,
    ) -> Self {
        Error::Raised {
            selector: selector.name().to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ClassAlreadyExists { name } => {
                write!(f, "Class '{name}' already exists in registry")
            }
            Error::InheritanceCycle => write!(f, "Inheritance cycle detected"),
            Error::InvalidEncoding { encoding } => {
                write!(f, "Invalid type encoding string: {encoding:?}")
            }
            Error::InvalidSelector => write!(f, "Selector name must not be empty"),
            Error::SelectorNotFound { selector } => {
                write!(f, "Selector '{selector}' not found in class or inheritance chain")
            }
            Error::ArgumentCountMismatch { expected, got } => {
                write!(f, "Argument count mismatch: expected {expected}, got {got}")
            }
            Error::ArgumentTypeMismatch {
                expected,
                got,
                index,
            } => {
                write!(
                    f,
                    "Argument type mismatch at index {index}: expected '{expected}', got '{got}'"
                )
            }
            Error::ReturnTypeMismatch { expected, got } => {
                write!(f, "Return type mismatch: expected '{expected}', got '{got}'")
            }
            Error::NoOriginalImplementation { selector } => {
                write!(f, "No original implementation for '{selector}'")
            }
            Error::Raised { selector, reason } => {
                write!(f, "'{selector}' raised: {reason}")
            }
        }
    }
}

impl std::error::Error for Error {}

/// Result type for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::ArgumentCountMismatch {
                expected: 1,
                got: 2
            }
            .to_string(),
            "Argument count mismatch: expected 1, got 2"
        );
        assert_eq!(
            Error::SelectorNotFound {
                selector: "greet".into()
            }
            .to_string(),
            "Selector 'greet' not found in class or inheritance chain"
        );
    }

    #[test]
    fn test_error_equality() {
        assert_eq!(Error::InheritanceCycle, Error::InheritanceCycle);
        assert_ne!(
            Error::ReturnTypeMismatch {
                expected: 'i',
                got: '*'
            },
            Error::ReturnTypeMismatch {
                expected: 'i',
                got: 'd'
            }
        );
    }
}
