//! Typed edges between addressable entities.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub type RelationId = Uuid;

/// Kind of entity a relation endpoint addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Concept,
    Block,
    View,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: Entity,
    pub id: Uuid,
}

impl EntityRef {
    pub fn concept(id: Uuid) -> Self {
        Self {
            kind: Entity::Concept,
            id,
        }
    }

    pub fn block(id: Uuid) -> Self {
        Self {
            kind: Entity::Block,
            id,
        }
    }

    pub fn view(id: Uuid) -> Self {
        Self {
            kind: Entity::View,
            id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub id: RelationId,
    pub from: EntityRef,
    pub to: EntityRef,
    /// Arbitrary user data (label, arrow style, ...).
    #[serde(default)]
    pub data: Value,
}

impl Relation {
    pub fn new(from: EntityRef, to: EntityRef) -> Self {
        Self {
            id: Uuid::new_v4(),
            from,
            to,
            data: Value::Null,
        }
    }

    /// Whether either endpoint addresses `entity`.
    pub fn touches(&self, entity: &EntityRef) -> bool {
        self.from == *entity || self.to == *entity
    }
}
