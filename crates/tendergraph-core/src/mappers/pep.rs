//! Mapper for `pep_gold` documents (politically exposed persons).
//!
//! The document id is the person's full name; associations carry role,
//! equity, government and parliament histories as lists. Null entries are
//! filtered out — the graph store rejects nulls inside arrays.

use serde_json::Value;

use crate::document::{json_to_id, CanonicalDocument};
use crate::error::MapperError;
use crate::graph::{MapperResult, NodeRef, NodeSpec, RelationshipSpec};

use super::slugify;

pub fn map(doc: &CanonicalDocument) -> Result<MapperResult, MapperError> {
    if doc.id.is_empty() {
        return Err(MapperError::invalid("pep document has an empty id"));
    }
    let person_name = doc.id.as_str();
    let person_id = format!("pep:{}", slugify(person_name));

    let person = NodeSpec::new("Person", person_id.clone())
        .prop("person_name", person_name)
        .prop("pep", true);

    let mut result = MapperResult::default();

    for assoc in doc.array_field("associated").into_iter().flatten() {
        let Some(nif) = assoc.get("nif").and_then(json_to_id) else {
            continue;
        };

        let mut rel = RelationshipSpec::new(
            "ASSOCIATED_WITH",
            person.reference(),
            NodeRef::new("Entity", nif),
        );
        for field in ["ri_roles", "equity_interests"] {
            let values = non_null_strings(assoc.get(field));
            if !values.is_empty() {
                rel = rel.prop(field, values);
            }
        }
        for field in ["governments", "parliaments"] {
            let values = non_null_integers(assoc.get(field));
            if !values.is_empty() {
                rel = rel.prop(field, values);
            }
        }
        result.relationships.push(rel);
    }

    result.nodes.push(person);
    Ok(result)
}

/// Non-null array entries as strings; numeric entries are stringified the
/// same way identifiers are.
fn non_null_strings(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(json_to_id).collect())
        .unwrap_or_default()
}

/// Non-null array entries as integers; numeric strings are coerced.
fn non_null_integers(value: Option<&Value>) -> Vec<i64> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| match v {
                    Value::Number(n) => n.as_i64(),
                    Value::String(s) => s.trim().parse().ok(),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_person_with_associations() {
        let fields = json!({
            "associated": [
                {"nif": "501525882", "ri_roles": ["Gestor", null], "parliaments": [14, null]},
                {"nif": null},
                {"nif": "500100200"}
            ]
        });
        let doc = CanonicalDocument::new(
            "ALBERTO JORGE FONSECA",
            "pep_gold",
            fields.as_object().unwrap().clone(),
        );
        let result = map(&doc).unwrap();

        assert_eq!(result.nodes.len(), 1);
        let person = &result.nodes[0];
        assert_eq!(person.key, "pep:alberto-jorge-fonseca");
        assert_eq!(person.properties["pep"], json!(true));

        // The null-nif association is dropped.
        assert_eq!(result.relationships.len(), 2);
        let first = &result.relationships[0];
        assert_eq!(first.properties["ri_roles"], json!(["Gestor"]));
        assert_eq!(first.properties["parliaments"], json!([14]));
        // Empty lists never appear as properties.
        assert!(!result.relationships[1].properties.contains_key("ri_roles"));
    }

    /// Registries mix types inside lists: legislature numbers arrive as
    /// strings, equity interests as bare numbers. Both are coerced.
    #[test]
    fn test_list_values_are_coerced() {
        let fields = json!({
            "associated": [
                {
                    "nif": "501525882",
                    "parliaments": ["14", 15, "x"],
                    "equity_interests": [50, "Quota"]
                }
            ]
        });
        let doc = CanonicalDocument::new(
            "MARIA SILVA",
            "pep_gold",
            fields.as_object().unwrap().clone(),
        );
        let result = map(&doc).unwrap();

        let rel = &result.relationships[0];
        assert_eq!(rel.properties["parliaments"], json!([14, 15]));
        assert_eq!(rel.properties["equity_interests"], json!(["50", "Quota"]));
    }
}
