//! Canvas domain model.
//!
//! # Responsibility
//! - Define the persisted shapes: concepts, their typed content, blocks,
//!   relations and app settings.
//! - Keep content payload shapes owned by [`content::Content`]; no other code
//!   inspects raw payloads.
//!
//! # Invariants
//! - Every concept is identified by a stable `ConceptId`.
//! - Blocks are placements owned by the concept that hosts them; several
//!   blocks may point at the same concept.

pub mod block;
pub mod concept;
pub mod content;
pub mod relation;
pub mod settings;
pub mod status;
