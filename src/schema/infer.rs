//! Runtime type inference for sampled documents.
//!
//! A bounded sample of documents per collection is merged into one
//! [`EntitySchema`]: the first document to mention a field decides its type,
//! a later document that disagrees downgrades the field to `"mixed"`, and
//! fields missing from some documents are still recorded. Nested objects and
//! arrays are described one level deep ([`NESTED_DEPTH_LIMIT`]); an array's
//! element type comes from its first element only.

use std::collections::BTreeMap;

use mongodb::bson::{Bson, Document};

use super::{EntitySchema, FieldInfo};

/// How many levels of object/array nesting are described below a top-level
/// field. Deliberately shallow: the schema feeds a prompt, not a validator.
pub const NESTED_DEPTH_LIMIT: u8 = 1;

/// Merge one sampled document into the running field map.
pub fn merge_document(schema: &mut EntitySchema, doc: &Document) {
    for (key, value) in doc.iter() {
        let inferred = infer_field_type(value, key, 0);
        match schema.fields.get_mut(key) {
            None => {
                schema.fields.insert(key.clone(), inferred);
            }
            Some(existing) => {
                if existing.field_type != inferred.field_type {
                    existing.field_type = "mixed".to_string();
                }
                // A reference seen in a later sample still counts.
                if existing.reference.is_none() && inferred.reference.is_some() {
                    existing.reference = inferred.reference;
                }
            }
        }
    }
}

/// Infer the [`FieldInfo`] for a single runtime value.
pub fn infer_field_type(value: &Bson, key: &str, depth: u8) -> FieldInfo {
    match value {
        Bson::Null | Bson::Undefined => FieldInfo::of_type("null"),
        Bson::ObjectId(_) => {
            let mut info = FieldInfo::of_type("ObjectId");
            info.reference = guess_reference(key);
            info
        }
        Bson::Array(items) => {
            let mut info = FieldInfo::of_type("array");
            if depth < NESTED_DEPTH_LIMIT {
                if let Some(first) = items.first() {
                    let mut nested = BTreeMap::new();
                    nested.insert("0".to_string(), infer_field_type(first, "", depth + 1));
                    info.nested = Some(nested);
                }
            }
            info
        }
        Bson::Document(doc) => {
            let mut info = FieldInfo::of_type("object");
            if depth < NESTED_DEPTH_LIMIT {
                let nested: BTreeMap<String, FieldInfo> = doc
                    .iter()
                    .map(|(k, v)| (k.clone(), infer_field_type(v, k, depth + 1)))
                    .collect();
                info.nested = Some(nested);
            }
            info
        }
        Bson::String(_) | Bson::Symbol(_) => FieldInfo::of_type("string"),
        Bson::Boolean(_) => FieldInfo::of_type("boolean"),
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => {
            FieldInfo::of_type("number")
        }
        Bson::DateTime(_) | Bson::Timestamp(_) => FieldInfo::of_type("date"),
        Bson::Binary(_) => FieldInfo::of_type("binary"),
        other => FieldInfo::of_type(format!("{:?}", other.element_type()).to_lowercase()),
    }
}

/// Guess the collection an ObjectId-shaped field points at, from the field
/// name alone: strip a trailing `id`/`Id`, lowercase, pluralize. `authorId`
/// becomes `authors`. A bare `id`/`_id` has no stem to name a collection and
/// yields nothing. The guess is never checked against real collections.
fn guess_reference(key: &str) -> Option<String> {
    if !key.to_lowercase().ends_with("id") {
        return None;
    }
    let stem = key[..key.len() - 2].to_lowercase();
    let stem = stem.trim_matches('_');
    if stem.is_empty() {
        return None;
    }
    if stem.ends_with('s') {
        Some(stem.to_string())
    } else {
        Some(format!("{stem}s"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{doc, oid::ObjectId};

    #[test]
    fn merge_is_deterministic() {
        let docs = [
            doc! { "name": "Alice", "age": 31 },
            doc! { "name": "Bob", "email": "bob@example.com" },
        ];
        let mut first = EntitySchema::default();
        let mut second = EntitySchema::default();
        for d in &docs {
            merge_document(&mut first, d);
            merge_document(&mut second, d);
        }
        assert_eq!(first, second);
        assert_eq!(first.fields["name"].field_type, "string");
        assert_eq!(first.fields["age"].field_type, "number");
        // Present in only one sample, still recorded.
        assert_eq!(first.fields["email"].field_type, "string");
    }

    #[test]
    fn conflicting_types_downgrade_to_mixed() {
        let mut schema = EntitySchema::default();
        merge_document(&mut schema, &doc! { "value": 10 });
        merge_document(&mut schema, &doc! { "value": "ten" });
        assert_eq!(schema.fields["value"].field_type, "mixed");
    }

    #[test]
    fn object_id_with_id_suffix_gets_reference() {
        let info = infer_field_type(&Bson::ObjectId(ObjectId::new()), "authorId", 0);
        assert_eq!(info.field_type, "ObjectId");
        assert_eq!(info.reference.as_deref(), Some("authors"));
    }

    #[test]
    fn already_plural_stem_is_not_double_pluralized() {
        let info = infer_field_type(&Bson::ObjectId(ObjectId::new()), "newsId", 0);
        assert_eq!(info.reference.as_deref(), Some("news"));
    }

    #[test]
    fn non_id_field_never_gets_reference() {
        let info = infer_field_type(&Bson::ObjectId(ObjectId::new()), "tags", 0);
        assert!(info.reference.is_none());
        let info = infer_field_type(&Bson::String("x".into()), "userId", 0);
        assert!(info.reference.is_none());
    }

    #[test]
    fn bare_id_key_has_no_reference() {
        let info = infer_field_type(&Bson::ObjectId(ObjectId::new()), "_id", 0);
        assert!(info.reference.is_none());
    }

    #[test]
    fn nesting_stops_after_one_level() {
        let value = Bson::Document(doc! {
            "street": "Main St",
            "geo": { "lat": 1.0, "lng": 2.0 },
        });
        let info = infer_field_type(&value, "address", 0);
        let nested = info.nested.expect("top level object is described");
        assert_eq!(nested["street"].field_type, "string");
        // One level down the geo object keeps its type but not its layout.
        assert_eq!(nested["geo"].field_type, "object");
        assert!(nested["geo"].nested.is_none());
    }

    #[test]
    fn array_type_comes_from_first_element_only() {
        let value = Bson::Array(vec![Bson::String("a".into()), Bson::Int32(1)]);
        let info = infer_field_type(&value, "tags", 0);
        assert_eq!(info.field_type, "array");
        let nested = info.nested.expect("first element described");
        assert_eq!(nested["0"].field_type, "string");
    }
}
