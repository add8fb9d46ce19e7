//! Error types for hook registration.
//!
//! Registration failures are returned as [`AspectError`] values and never
//! leave partial state behind. Faults raised while advice or an original
//! implementation runs are not registration failures: they travel through
//! dispatch as [`oxaspects_rt::Error`] exactly as an unhooked call would
//! report them.

use std::fmt;

/// Result code reported for a successful registration.
pub const SUCCESS_CODE: i32 = 1;

/// Errors that can occur while hooking a method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AspectError {
    /// The selector does not resolve on the target's class hierarchy.
    MethodNotFound {
        /// The selector that was requested.
        selector: String,
    },

    /// The block's declared types do not fit the hooked method.
    BlockSignatureMismatch {
        /// Encoding of the hooked method.
        method: String,
        /// Encoding declared by the block.
        block: String,
    },

    /// A record with this identifier is already registered for the method.
    IdentifierExists {
        /// The duplicated identifier.
        identifier: String,
    },

    /// The method already has an Instead record.
    InsteadSlotOccupied {
        /// Identifier of the Instead record holding the slot.
        existing: String,
    },

    /// Any other failure, including substrate errors.
    Other(String),
}

impl AspectError {
    /// Numeric result code of this error.
    ///
    /// ```
    /// use oxaspects::AspectError;
    ///
    /// let err = AspectError::IdentifierExists { identifier: "log".into() };
    /// assert_eq!(err.code(), -3);
    /// ```
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            AspectError::MethodNotFound { .. } => -1,
            AspectError::BlockSignatureMismatch { .. } => -2,
            AspectError::IdentifierExists { .. } => -3,
            AspectError::Other(_) => -4,
            AspectError::InsteadSlotOccupied { .. } => -5,
        }
    }
}

/// Maps a registration result to its numeric code.
///
/// ```
/// use oxaspects::{AspectError, result_code};
///
/// assert_eq!(result_code(&Ok(())), 1);
/// assert_eq!(result_code(&Err(AspectError::Other("x".into()))), -4);
/// ```
#[must_use]
pub const fn result_code(result: &Result<()>) -> i32 {
    match result {
        Ok(()) => SUCCESS_CODE,
        Err(err) => err.code(),
    }
}

impl fmt::Display for AspectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AspectError::MethodNotFound { selector } => {
                write!(f, "Method '{selector}' not found")
            }
            AspectError::BlockSignatureMismatch { method, block } => {
                write!(f, "Block signature '{block}' does not match method '{method}'")
            }
            AspectError::IdentifierExists { identifier } => {
                write!(f, "Identifier '{identifier}' already registered")
            }
            AspectError::InsteadSlotOccupied { existing } => {
                write!(f, "Instead slot already held by '{existing}'")
            }
            AspectError::Other(reason) => f.write_str(reason),
        }
    }
}

impl std::error::Error for AspectError {}

impl From<oxaspects_rt::Error> for AspectError {
    fn from(err: oxaspects_rt::Error) -> Self {
        AspectError::Other(err.to_string())
    }
}

/// Result type for hook registration.
pub type Result<T> = std::result::Result<T, AspectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(
            AspectError::MethodNotFound {
                selector: "x".into()
            }
            .code(),
            -1
        );
        assert_eq!(
            AspectError::BlockSignatureMismatch {
                method: "v@:".into(),
                block: "v@i".into()
            }
            .code(),
            -2
        );
        assert_eq!(
            AspectError::InsteadSlotOccupied {
                existing: "a".into()
            }
            .code(),
            -5
        );
    }

    #[test]
    fn test_from_runtime_error() {
        let err: AspectError = oxaspects_rt::Error::ClassAlreadyExists {
            name: "_OxAspects_Foo".into(),
        }
        .into();
        assert_eq!(
            err,
            AspectError::Other("Class '_OxAspects_Foo' already exists in registry".into())
        );
    }

    #[test]
    fn test_display() {
        let err = AspectError::BlockSignatureMismatch {
            method: "i@:i".into(),
            block: "v@d".into(),
        };
        assert_eq!(
            err.to_string(),
            "Block signature 'v@d' does not match method 'i@:i'"
        );
    }
}
