//! Mapper for `orbis_gold` documents (company-registry people linked to the
//! entities they manage or hold shares in). Person ids here come straight
//! from the registry; PEP persons use a separate `pep:` id space and are
//! matched downstream by name.

use crate::document::{json_to_id, CanonicalDocument};
use crate::error::MapperError;
use crate::graph::{MapperResult, NodeSpec};

use super::one_to_many;

pub fn map(doc: &CanonicalDocument) -> Result<MapperResult, MapperError> {
    let person_id = doc
        .get("id")
        .and_then(json_to_id)
        .ok_or(MapperError::MissingField("id"))?;

    let mut person = NodeSpec::new("Person", person_id);
    if let Some(name) = doc.str_field("name") {
        person = person.prop("person_name", name);
    }

    let mut result = MapperResult::default();
    result.relationships.extend(one_to_many(
        "DIRECTOR_OR_MANAGER_FOR",
        person.reference(),
        "Entity",
        &doc.str_list("dm"),
    ));
    result.relationships.extend(one_to_many(
        "SHAREHOLDER_FOR",
        person.reference(),
        "Entity",
        &doc.str_list("sh"),
    ));
    result.nodes.push(person);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(fields: serde_json::Value) -> CanonicalDocument {
        CanonicalDocument::new("P1", "orbis_gold", fields.as_object().unwrap().clone())
    }

    #[test]
    fn test_person_with_mandates() {
        let result = map(&doc(json!({
            "id": "PT0001234",
            "name": "João Pereira",
            "dm": ["500100200", "500300400"],
            "sh": ["500100200"]
        })))
        .unwrap();

        assert_eq!(result.nodes.len(), 1);
        let person = &result.nodes[0];
        assert_eq!(person.key, "PT0001234");
        assert_eq!(person.properties["person_name"], json!("João Pereira"));

        let directs: Vec<_> = result
            .relationships
            .iter()
            .filter(|r| r.rel_type == "DIRECTOR_OR_MANAGER_FOR")
            .collect();
        assert_eq!(directs.len(), 2);
        assert_eq!(directs[0].to.key, "500100200");

        let holds: Vec<_> = result
            .relationships
            .iter()
            .filter(|r| r.rel_type == "SHAREHOLDER_FOR")
            .collect();
        assert_eq!(holds.len(), 1);
        // Entity endpoints stay references: their nodes come from entities_gold.
        assert!(!result.nodes.iter().any(|n| n.label == "Entity"));
    }

    #[test]
    fn test_person_without_mandates() {
        let result = map(&doc(json!({"id": "PT0009999", "name": "Ana Costa"}))).unwrap();
        assert_eq!(result.nodes.len(), 1);
        assert!(result.relationships.is_empty());
    }

    #[test]
    fn test_missing_id() {
        assert!(matches!(
            map(&doc(json!({"name": "x"}))).unwrap_err(),
            MapperError::MissingField("id")
        ));
    }
}
