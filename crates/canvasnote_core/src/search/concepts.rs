//! In-memory concept search over factory serializers.
//!
//! # Invariants
//! - Text comes only from [`FactoryRegistry::concept_string`]; concepts
//!   whose factory has no serializer are skipped, never an error.
//! - Every whitespace-separated term must match, case-insensitively.
//! - Ordering is deterministic: most recently updated first, then by id.

use crate::factory::FactoryRegistry;
use crate::model::concept::{Concept, ConceptId};

const SNIPPET_CHARS: usize = 80;

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub text: String,
    /// Optional content-type filter.
    pub kind: Option<String>,
    /// Maximum number of hits to return.
    pub limit: usize,
}

impl SearchQuery {
    /// Creates a query with the default limit and no type filter.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: None,
            limit: 20,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub concept_id: ConceptId,
    pub kind: String,
    pub snippet: String,
}

/// Returns matching concepts. Blank queries return nothing.
pub fn search_concepts(
    registry: &FactoryRegistry,
    concepts: &[Concept],
    query: &SearchQuery,
) -> Vec<SearchHit> {
    let terms = query
        .text
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>();
    if terms.is_empty() || query.limit == 0 {
        return Vec::new();
    }

    let mut matches = concepts
        .iter()
        .filter(|concept| {
            query
                .kind
                .as_deref()
                .map_or(true, |kind| concept.kind() == kind)
        })
        .filter_map(|concept| {
            let text = registry.concept_string(concept)?;
            let haystack = text.to_lowercase();
            terms
                .iter()
                .all(|term| haystack.contains(term.as_str()))
                .then_some((concept, text))
        })
        .collect::<Vec<_>>();

    matches.sort_by(|(a, _), (b, _)| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| a.id.cmp(&b.id))
    });

    matches
        .into_iter()
        .take(query.limit)
        .map(|(concept, text)| SearchHit {
            concept_id: concept.id,
            kind: concept.kind().to_string(),
            snippet: snippet(&text),
        })
        .collect()
}

fn snippet(text: &str) -> String {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out = normalized.chars().take(SNIPPET_CHARS).collect::<String>();
    if normalized.chars().count() > SNIPPET_CHARS {
        out.push_str("...");
    }
    out
}
