//! Concept search for the search/link overlay.
//!
//! # Responsibility
//! - Match a query against the searchable text of each concept.
//! - Keep result shaping inside core.

pub mod concepts;

pub use concepts::{search_concepts, SearchHit, SearchQuery};
