//! Advice records.

use crate::aspects::block::Block;
use crate::aspects::options::Position;
use std::sync::Arc;

/// One registered piece of advice. Immutable once created.
#[derive(Debug, Clone)]
pub(crate) struct AspectInfo {
    identifier: Arc<str>,
    position: Position,
    automatic_removal: bool,
    block: Block,
}

impl AspectInfo {
    pub(crate) fn new(
        identifier: &str,
        position: Position,
        automatic_removal: bool,
        block: Block,
    ) -> Self {
        AspectInfo {
            identifier: identifier.into(),
            position,
            automatic_removal,
            block,
        }
    }

    #[must_use]
    pub(crate) fn identifier(&self) -> &str {
        &self.identifier
    }

    #[must_use]
    pub(crate) fn position(&self) -> Position {
        self.position
    }

    /// Returns `true` for one-shot advice.
    #[must_use]
    pub(crate) fn automatic_removal(&self) -> bool {
        self.automatic_removal
    }

    #[must_use]
    pub(crate) fn block(&self) -> &Block {
        &self.block
    }
}
