//! Decoding of persisted concept and settings rows.
//!
//! Older persisted shapes may lack `relations`; hydration backfills it with an
//! empty list before typed decoding.

use serde_json::Value;

use crate::model::concept::Concept;
use crate::model::settings::Settings;

pub fn hydrate_concept(raw: &str) -> serde_json::Result<Concept> {
    let mut value: Value = serde_json::from_str(raw)?;
    if let Value::Object(map) = &mut value {
        let relations = map.entry("relations").or_insert(Value::Null);
        if relations.is_null() {
            *relations = Value::Array(Vec::new());
        }
    }
    serde_json::from_value(value)
}

pub fn hydrate_settings(raw: &str) -> serde_json::Result<Settings> {
    serde_json::from_str(raw)
}
