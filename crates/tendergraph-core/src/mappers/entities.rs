//! Mapper for `entities_gold` documents (registry data keyed by NIF).

use crate::document::{json_to_id, CanonicalDocument};
use crate::error::MapperError;
use crate::graph::{MapperResult, NodeSpec, RelationshipSpec};

use super::location_id;

pub fn map(doc: &CanonicalDocument) -> Result<MapperResult, MapperError> {
    let nif = doc
        .get("nif")
        .and_then(json_to_id)
        .ok_or(MapperError::MissingField("nif"))?;

    let valid_nif = doc.bool_field("valid_nif").unwrap_or(false);

    let mut entity = NodeSpec::new("Entity", nif)
        .prop("valid_nif", valid_nif);
    if let Some(name) = doc.str_field("description") {
        entity = entity.prop("entity_name", name);
    }

    let mut result = MapperResult::default();

    // Location only when the NIF resolved to real registry data.
    if valid_nif {
        if let Some(district) = doc.str_field("district") {
            let municipality = doc.str_field("municipality");
            let mut location = NodeSpec::new(
                "Location",
                location_id("Portugal", Some(district), municipality),
            )
            .prop("country", "Portugal")
            .prop("district", district);
            if let Some(m) = municipality {
                location = location.prop("municipality", m);
            }

            result.relationships.push(RelationshipSpec::new(
                "LOCATED_AT",
                entity.reference(),
                location.reference(),
            ));
            result.nodes.push(location);
        }
    }

    result.nodes.push(entity);
    Ok(result)
}
