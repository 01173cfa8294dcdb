//! Canvas state and the block element registry.

pub mod elements;
pub mod state;

pub use elements::{block_elements, BlockElement, ElementRegistry};
pub use state::{CanvasState, ContextMenu, RelationDraft, DEFAULT_BLOCK_SIZE};
