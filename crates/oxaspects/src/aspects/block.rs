//! Advice callbacks and their signature check.
//!
//! A [`Block`] is a closure together with the block encoding it declares.
//! Before a block is accepted its encoding is checked against the hooked
//! method's signature, because the engine forwards the method's arguments to
//! it and, for Instead advice, hands its result back to the caller.

use crate::aspects::context::InvocationContext;
use crate::aspects::options::Position;
use crate::error::{AspectError, Result};
use oxaspects_rt::runtime::encoding::{types, types_compatible};
use oxaspects_rt::{BlockSignature, Signature, Value};
use std::fmt;
use std::sync::Arc;

type BlockFn =
    dyn Fn(&InvocationContext, &[Value]) -> oxaspects_rt::Result<Value> + Send + Sync;

/// An advice callback.
///
/// The encoding is `<return><context><params...>`: the first parameter is the
/// [`InvocationContext`] and must be `@`; the rest are the forwarded method
/// arguments the closure receives.
///
/// # Example
///
/// ```rust
/// use oxaspects::Block;
/// use oxaspects_rt::Value;
///
/// // void block receiving the context and one int
/// let block = Block::new("v@i", |ctx, args| {
///     println!("{} called with {:?}", ctx.selector(), args[0]);
///     Ok(Value::Void)
/// })
/// .unwrap();
/// assert_eq!(block.signature().parameter_types(), &['i']);
/// ```
#[derive(Clone)]
pub struct Block {
    signature: BlockSignature,
    body: Arc<BlockFn>,
}

impl Block {
    /// Creates a block from its encoding and body.
    ///
    /// # Errors
    ///
    /// Returns [`oxaspects_rt::Error::InvalidEncoding`] for malformed block
    /// encodings.
    pub fn new<F>(encoding: &str, body: F) -> oxaspects_rt::Result<Self>
    where
        F: Fn(&InvocationContext, &[Value]) -> oxaspects_rt::Result<Value>
            + Send
            + Sync
            + 'static,
    {
        Ok(Block {
            signature: BlockSignature::parse(encoding)?,
            body: Arc::new(body),
        })
    }

    #[must_use]
    pub fn signature(&self) -> &BlockSignature {
        &self.signature
    }

    /// Runs the block with the forwarded arguments, truncated to the number
    /// of parameters the block declares.
    pub(crate) fn call(
        &self,
        context: &InvocationContext,
        args: &[Value],
    ) -> oxaspects_rt::Result<Value> {
        let declared = self.signature.parameter_types().len().min(args.len());
        (self.body)(context, &args[..declared])
    }

    /// Checks this block against the hooked method.
    ///
    /// The full check requires the forwarded parameters to match the method's
    /// arguments one for one. The relaxed check, honored for Instead advice
    /// only, compares the first forwarded parameter when both sides declare
    /// one. The return type is compared for Instead advice in both modes.
    pub(crate) fn check_signature(
        &self,
        method: &Signature,
        position: Position,
        relaxed: bool,
    ) -> Result<()> {
        let mismatch = || AspectError::BlockSignatureMismatch {
            method: method.encoding().to_string(),
            block: self.signature.encoding().to_string(),
        };

        if !types_compatible(types::OBJECT, self.signature.context_type()) {
            return Err(mismatch());
        }

        let params = self.signature.parameter_types();
        let args = method.argument_types();
        if relaxed && position == Position::Instead {
            if let (Some(&param), Some(&arg)) = (params.first(), args.first()) {
                if !types_compatible(arg, param) {
                    return Err(mismatch());
                }
            }
        } else {
            if params.len() != args.len() {
                return Err(mismatch());
            }
            if params
                .iter()
                .zip(args)
                .any(|(&param, &arg)| !types_compatible(arg, param))
            {
                return Err(mismatch());
            }
        }

        if position == Position::Instead
            && !types_compatible(method.return_type(), self.signature.return_type())
        {
            return Err(mismatch());
        }

        Ok(())
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("signature", &self.signature.encoding())
            .finish_non_exhaustive()
    }
}
