//! Mapper for `cpv_structure_silver` documents (the CPV classification
//! tree). Each code carries a label and a level, plus a BROADER edge to its
//! parent code. Syncing this collection is what fills in the CPV endpoints
//! that contract documents reference by code only.

use crate::document::{json_to_id, CanonicalDocument};
use crate::error::MapperError;
use crate::graph::{MapperResult, NodeRef, NodeSpec, RelationshipSpec};

pub fn map(doc: &CanonicalDocument) -> Result<MapperResult, MapperError> {
    let code = doc
        .get("code")
        .and_then(json_to_id)
        .ok_or(MapperError::MissingField("code"))?;

    let mut cpv = NodeSpec::new("CPV", code);
    for (source, target) in [("labels", "label"), ("level", "level")] {
        if let Some(value) = doc.get(source).filter(|v| !v.is_null()) {
            cpv = cpv.prop(target, value.clone());
        }
    }

    let mut result = MapperResult::default();
    if let Some(parent) = doc.get("parent").and_then(json_to_id) {
        result.relationships.push(RelationshipSpec::new(
            "BROADER",
            cpv.reference(),
            NodeRef::new("CPV", parent),
        ));
    }
    result.nodes.push(cpv);
    Ok(result)
}
