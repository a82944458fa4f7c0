//! Normalized schema model shared by both engines.
//!
//! Introspection turns a live database into a `NormalizedSchema`: entity name
//! (table or collection) to field name to [`FieldInfo`]. Ordered maps keep
//! the rendering deterministic, which the prompt builder relies on.

pub mod infer;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Mapping from entity name (table/collection) to its field descriptions.
pub type NormalizedSchema = BTreeMap<String, EntitySchema>;

/// Fields of one table or collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntitySchema {
    pub fields: BTreeMap<String, FieldInfo>,
}

/// Inferred description of one field.
///
/// `field_type` is the engine-native type name for relational engines; for
/// document stores it is one of the runtime value kinds (`"string"`,
/// `"number"`, `"ObjectId"`, ...) or the sentinels `"object"`, `"array"`,
/// `"mixed"`, `"null"`. It is never empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldInfo {
    #[serde(rename = "type")]
    pub field_type: String,

    /// Field layout of object fields and array-of-object elements, one level
    /// deep.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nested: Option<BTreeMap<String, FieldInfo>>,

    /// Best-effort guess at the referenced collection for ObjectId-shaped
    /// fields, derived from the field name alone. Never validated against
    /// the collections that actually exist.
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl FieldInfo {
    pub fn of_type(field_type: impl Into<String>) -> Self {
        Self {
            field_type: field_type.into(),
            nested: None,
            reference: None,
        }
    }
}
