//! Type encodings for method and block signatures.
//!
//! Encodings follow Objective-C's `@encode()` alphabet, one character per
//! type:
//!
//! - `v` - void
//! - `@` - object
//! - `:` - selector
//! - `i` - int (i32)
//! - `l` - long (i64)
//! - `q` - long long (i64)
//! - `f` - float (f32)
//! - `d` - double (f64)
//! - `B` - bool
//! - `*` - string
//! - `^` - pointer
//! - `#` - class
//! - `?` - unknown, compatible with every type
//!
//! A **method** encoding is the return type followed by the receiver (`@`),
//! the selector (`:`) and the arguments: `"i@:i"` returns an int and takes one
//! int. A **block** encoding is the return type followed by the block's
//! parameters, the first of which is the invocation context and must be `@`:
//! `"v@i"` is a void block receiving the context and one int.

use crate::error::{Error, Result};
use std::fmt;
use std::sync::Arc;

/// Type encoding constants.
pub mod types {
    /// Void type encoding
    pub const VOID: char = 'v';
    /// Object type encoding
    pub const OBJECT: char = '@';
    /// Selector type encoding
    pub const SELECTOR: char = ':';
    /// Int (i32) type encoding
    pub const INT: char = 'i';
    /// Long (i64) type encoding
    pub const LONG: char = 'l';
    /// Long long (i64) type encoding
    pub const LONG_LONG: char = 'q';
    /// Float (f32) type encoding
    pub const FLOAT: char = 'f';
    /// Double (f64) type encoding
    pub const DOUBLE: char = 'd';
    /// Bool type encoding
    pub const BOOL: char = 'B';
    /// String type encoding
    pub const STRING: char = '*';
    /// Pointer type encoding
    pub const POINTER: char = '^';
    /// Class type encoding
    pub const CLASS: char = '#';
    /// Unknown type encoding
    pub const UNKNOWN: char = '?';
}

/// Checks if a character is a valid type encoding character.
#[must_use]
pub const fn is_valid_type_char(ch: char) -> bool {
    matches!(
        ch,
        'v' | '@' | ':' | 'i' | 'l' | 'q' | 'f' | 'd' | 'B' | '*' | '^' | '#' | '?'
    )
}

/// Returns `true` if a value declared as `got` may be used where `expected`
/// is declared.
///
/// ```
/// use oxaspects_rt::runtime::encoding::types_compatible;
///
/// assert!(types_compatible('i', 'i'));
/// assert!(types_compatible('?', '@'));
/// assert!(!types_compatible('i', 'd'));
/// ```
#[must_use]
pub const fn types_compatible(expected: char, got: char) -> bool {
    expected == got || expected == types::UNKNOWN || got == types::UNKNOWN
}

fn invalid(encoding: &str) -> Error {
    Error::InvalidEncoding {
        encoding: encoding.to_string(),
    }
}

/// Validates a method type encoding.
///
/// # Errors
///
/// Returns [`Error::InvalidEncoding`] if the string is empty, contains an
/// unknown type character, declares an argument as `v`, or does not start its
/// argument list with `@:`.
///
/// ```
/// use oxaspects_rt::runtime::encoding::validate_encoding;
///
/// assert!(validate_encoding("v@:").is_ok());
/// assert!(validate_encoding("i@:i").is_ok());
/// assert!(validate_encoding("xyz").is_err());
/// assert!(validate_encoding("@").is_err());
/// ```
pub fn validate_encoding(encoding: &str) -> Result<()> {
    let mut chars = encoding.chars();
    let Some(return_type) = chars.next() else {
        return Err(invalid(encoding));
    };
    if !is_valid_type_char(return_type) {
        return Err(invalid(encoding));
    }

    let arg_types: Vec<char> = chars.collect();
    if arg_types.len() < 2 || arg_types[0] != '@' || arg_types[1] != ':' {
        return Err(invalid(encoding));
    }
    if arg_types[2..]
        .iter()
        .any(|&ch| !is_valid_type_char(ch) || ch == types::VOID)
    {
        return Err(invalid(encoding));
    }

    Ok(())
}

/// Parses a method encoding into its return type and full argument list
/// (including self and `_cmd`).
///
/// # Errors
///
/// Returns [`Error::InvalidEncoding`] as described in [`validate_encoding`].
///
/// ```
/// use oxaspects_rt::runtime::encoding::parse_signature;
///
/// let (ret, args) = parse_signature("i@:if").unwrap();
/// assert_eq!(ret, 'i');
/// assert_eq!(args, vec!['@', ':', 'i', 'f']);
/// ```
pub fn parse_signature(encoding: &str) -> Result<(char, Vec<char>)> {
    validate_encoding(encoding)?;

    let mut chars = encoding.chars();
    let return_type = chars.next().ok_or_else(|| invalid(encoding))?;
    Ok((return_type, chars.collect()))
}

/// Parsed method type signature.
///
/// Cheap to clone; the parsed parts are shared.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    encoding: Arc<str>,
    return_type: char,
    /// Argument types excluding self and `_cmd`
    arguments: Arc<[char]>,
}

impl Signature {
    /// Parses a method encoding such as `"v@:i"`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEncoding`] for malformed encodings.
    pub fn parse(encoding: &str) -> Result<Self> {
        let (return_type, args) = parse_signature(encoding)?;
        Ok(Signature {
            encoding: encoding.into(),
            return_type,
            arguments: args[2..].into(),
        })
    }

    /// The full encoding string.
    #[must_use]
    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    /// The declared return type.
    #[must_use]
    pub fn return_type(&self) -> char {
        self.return_type
    }

    /// Argument types, excluding self and `_cmd`.
    #[must_use]
    pub fn argument_types(&self) -> &[char] {
        &self.arguments
    }

    /// Number of arguments, excluding self and `_cmd`.
    #[must_use]
    pub fn argument_count(&self) -> usize {
        self.arguments.len()
    }

    /// Returns `true` for `v` return types.
    #[must_use]
    pub fn returns_void(&self) -> bool {
        self.return_type == types::VOID
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Signature").field(&self.encoding()).finish()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.encoding())
    }
}

/// Parsed block type signature.
///
/// The first declared parameter is the invocation context; the rest are the
/// forwarded method arguments the block wants to receive.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BlockSignature {
    encoding: Arc<str>,
    return_type: char,
    context_type: char,
    parameters: Arc<[char]>,
}

impl BlockSignature {
    /// Parses a block encoding such as `"v@i"`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEncoding`] if the encoding is empty, contains an
    /// unknown type character, declares no context parameter, or declares a
    /// `v` parameter.
    ///
    /// ```
    /// use oxaspects_rt::BlockSignature;
    ///
    /// let sig = BlockSignature::parse("i@iq").unwrap();
    /// assert_eq!(sig.return_type(), 'i');
    /// assert_eq!(sig.parameter_types(), &['i', 'q']);
    /// assert!(BlockSignature::parse("v").is_err());
    /// ```
    pub fn parse(encoding: &str) -> Result<Self> {
        let chars: Vec<char> = encoding.chars().collect();
        if chars.len() < 2 || chars.iter().any(|&ch| !is_valid_type_char(ch)) {
            return Err(invalid(encoding));
        }
        if chars[1..].contains(&types::VOID) {
            return Err(invalid(encoding));
        }

        Ok(BlockSignature {
            encoding: encoding.into(),
            return_type: chars[0],
            context_type: chars[1],
            parameters: chars[2..].into(),
        })
    }

    /// The full encoding string.
    #[must_use]
    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    /// The declared return type.
    #[must_use]
    pub fn return_type(&self) -> char {
        self.return_type
    }

    /// The declared type of the context parameter.
    #[must_use]
    pub fn context_type(&self) -> char {
        self.context_type
    }

    /// Declared parameters after the context.
    #[must_use]
    pub fn parameter_types(&self) -> &[char] {
        &self.parameters
    }
}

impl fmt::Debug for BlockSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BlockSignature").field(&self.encoding()).finish()
    }
}
