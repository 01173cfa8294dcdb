//! Process-wide registry of mounted block elements.
//!
//! # Invariants
//! - The registry holds weak handles only; it never keeps an element alive.
//! - Reads after unmount, or after the element was dropped, return `None`.
//! - Remounting an id replaces the previous handle.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use once_cell::sync::Lazy;

use crate::geometry::Rect;
use crate::model::block::BlockId;

/// On-screen geometry of one mounted block, in viewport space.
#[derive(Debug, Default)]
pub struct BlockElement {
    rect: RwLock<Rect>,
}

impl BlockElement {
    pub fn new(rect: Rect) -> Self {
        Self {
            rect: RwLock::new(rect),
        }
    }

    pub fn rect(&self) -> Rect {
        *self.rect.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Called by the host after layout.
    pub fn set_rect(&self, rect: Rect) {
        *self.rect.write().unwrap_or_else(PoisonError::into_inner) = rect;
    }
}

#[derive(Debug, Default)]
pub struct ElementRegistry {
    elements: RwLock<HashMap<BlockId, Weak<BlockElement>>>,
}

static BLOCK_ELEMENTS: Lazy<ElementRegistry> = Lazy::new(ElementRegistry::default);

/// Registry shared by every canvas in the process.
pub fn block_elements() -> &'static ElementRegistry {
    &BLOCK_ELEMENTS
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mount(&self, id: BlockId, element: &Arc<BlockElement>) {
        self.elements
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::downgrade(element));
    }

    pub fn unmount(&self, id: BlockId) {
        self.elements
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }

    pub fn get(&self, id: BlockId) -> Option<Arc<BlockElement>> {
        self.elements
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .and_then(Weak::upgrade)
    }

    pub fn rect(&self, id: BlockId) -> Option<Rect> {
        self.get(id).map(|element| element.rect())
    }

    /// Drops entries whose element no longer exists. Returns how many.
    pub fn prune(&self) -> usize {
        let mut elements = self.elements.write().unwrap_or_else(PoisonError::into_inner);
        let before = elements.len();
        elements.retain(|_, handle| handle.strong_count() > 0);
        before - elements.len()
    }
}
