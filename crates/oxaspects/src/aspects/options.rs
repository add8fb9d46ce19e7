//! Hook options: advice position plus behavior flags.

use crate::error::{AspectError, Result};
use std::fmt;

bitflags::bitflags! {
    /// Options word passed with every hook request.
    ///
    /// The low three bits select the position ([`Position`]); an empty word
    /// means [`AspectOptions::AFTER`]. Unknown bits are retained so that an
    /// invalid position can be reported instead of silently ignored.
    ///
    /// ```
    /// use oxaspects::{AspectOptions, Position};
    ///
    /// let options = AspectOptions::BEFORE | AspectOptions::AUTOMATIC_REMOVAL;
    /// assert_eq!(options.position(), Ok(Position::Before));
    /// assert!(options.automatic_removal());
    /// assert_eq!(AspectOptions::default().position(), Ok(Position::After));
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AspectOptions: u32 {
        /// Replace the original implementation.
        const INSTEAD = 1;
        /// Run before the original implementation.
        const BEFORE = 1 << 1;
        /// Remove the advice right after its first execution.
        const AUTOMATIC_REMOVAL = 1 << 3;
        /// Only check the first forwarded parameter and the return type.
        /// Honored for Instead advice only.
        const WEAK_SIGNATURE_CHECK = 1 << 16;

        const _ = !0;
    }
}

impl AspectOptions {
    /// Run after the original implementation (the default).
    pub const AFTER: Self = Self::empty();

    /// Bits holding the position.
    pub const POSITION_MASK: u32 = 0x07;

    /// Decodes the position bits.
    ///
    /// # Errors
    ///
    /// Returns [`AspectError::Other`] for position values other than 0, 1
    /// and 2.
    pub fn position(self) -> Result<Position> {
        match self.bits() & Self::POSITION_MASK {
            0 => Ok(Position::After),
            1 => Ok(Position::Instead),
            2 => Ok(Position::Before),
            other => Err(AspectError::Other(format!("invalid advice position {other}"))),
        }
    }

    #[must_use]
    pub fn automatic_removal(self) -> bool {
        self.contains(Self::AUTOMATIC_REMOVAL)
    }

    #[must_use]
    pub fn weak_signature_check(self) -> bool {
        self.contains(Self::WEAK_SIGNATURE_CHECK)
    }
}

impl Default for AspectOptions {
    fn default() -> Self {
        Self::AFTER
    }
}

impl From<Position> for AspectOptions {
    fn from(position: Position) -> Self {
        match position {
            Position::Before => Self::BEFORE,
            Position::Instead => Self::INSTEAD,
            Position::After => Self::AFTER,
        }
    }
}

/// Where advice runs relative to the original implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    Before,
    Instead,
    After,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Position::Before => "before",
            Position::Instead => "instead",
            Position::After => "after",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions() {
        assert_eq!(AspectOptions::AFTER.position(), Ok(Position::After));
        assert_eq!(AspectOptions::INSTEAD.position(), Ok(Position::Instead));
        assert_eq!(
            (AspectOptions::BEFORE | AspectOptions::WEAK_SIGNATURE_CHECK).position(),
            Ok(Position::Before)
        );
    }

    #[test]
    fn test_invalid_positions_rejected() {
        assert!((AspectOptions::BEFORE | AspectOptions::INSTEAD).position().is_err());
        assert!(AspectOptions::from_bits_retain(4).position().is_err());
        assert!(AspectOptions::from_bits_retain(7).position().is_err());
    }

    #[test]
    fn test_raw_option_words() {
        let options = AspectOptions::from_bits_retain((1 << 16) | (1 << 3) | 1);
        assert_eq!(options.position(), Ok(Position::Instead));
        assert!(options.automatic_removal());
        assert!(options.weak_signature_check());
    }

    #[test]
    fn test_from_position() {
        for position in [Position::Before, Position::Instead, Position::After] {
            assert_eq!(AspectOptions::from(position).position(), Ok(position));
        }
    }
}
