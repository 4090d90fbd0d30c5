//! Built-in gold-collection mappers and their shared helpers.
//!
//! Each mapper is a pure function from a canonical document to graph
//! elements, registered under its collection name in [`default_registry`].

pub mod contracts;
pub mod cpv;
pub mod entities;
pub mod orbis;
pub mod pep;

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::graph::{NodeRef, RelationshipSpec};
use crate::mapper::MapperRegistry;

/// Registry with every built-in mapper registered under its gold collection.
pub fn default_registry() -> MapperRegistry {
    let mut registry = MapperRegistry::new();
    registry.register("contracts_gold", Arc::new(contracts::map));
    registry.register("cpv_structure_silver", Arc::new(cpv::map));
    registry.register("entities_gold", Arc::new(entities::map));
    registry.register("orbis_gold", Arc::new(orbis::map));
    registry.register("pep_gold", Arc::new(pep::map));
    registry
}

/// Lowercased, hyphen-joined identifier segment.
pub(crate) fn slugify(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut pending_sep = false;
    for c in value.chars() {
        if c.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('-');
            }
            pending_sep = false;
            out.extend(c.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

/// Hierarchical location id, e.g. `loc:portugal/lisboa/cascais`.
pub(crate) fn location_id(country: &str, district: Option<&str>, municipality: Option<&str>) -> String {
    let mut parts = vec![slugify(country)];
    if let Some(d) = district {
        parts.push(slugify(d));
    }
    if let Some(m) = municipality {
        parts.push(slugify(m));
    }
    format!("loc:{}", parts.join("/"))
}

/// ISO `YYYY-MM-DD` from a date or datetime string. Invalid input maps to
/// None rather than an error: upstream registries ship plenty of garbage
/// dates and a bad date should not sink the whole document.
pub(crate) fn parse_date(value: Option<&str>) -> Option<String> {
    let raw = value?.trim();
    if raw.is_empty() {
        return None;
    }
    let date_part = raw.split('T').next().unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .ok()
        .map(|d| d.format("%Y-%m-%d").to_string())
}

/// Public portal URL for a procurement document id.
pub(crate) fn document_url(document_id: &str) -> String {
    format!(
        "https://www.base.gov.pt/Base4/pt/resultados/?type=doc_documentos&id={document_id}&ext=.pdf"
    )
}

/// One relationship from one node to each of many targets.
pub(crate) fn one_to_many(
    rel_type: &str,
    from: NodeRef,
    to_label: &str,
    to_keys: &[String],
) -> Vec<RelationshipSpec> {
    to_keys
        .iter()
        .map(|key| RelationshipSpec::new(rel_type, from.clone(), NodeRef::new(to_label, key)))
        .collect()
}

/// One relationship from each of many sources to one node.
pub(crate) fn many_to_one(
    rel_type: &str,
    from_label: &str,
    from_keys: &[String],
    to: NodeRef,
) -> Vec<RelationshipSpec> {
    from_keys
        .iter()
        .map(|key| RelationshipSpec::new(rel_type, NodeRef::new(from_label, key), to.clone()))
        .collect()
}

/// Copy the listed fields into a property map, skipping nulls and absent
/// values. `(target property, source field)` pairs.
pub(crate) fn mapped_properties(
    fields: &Map<String, Value>,
    mapping: &[(&str, &str)],
) -> Map<String, Value> {
    let mut out = Map::new();
    for (target, source) in mapping {
        if let Some(value) = fields.get(*source) {
            if !value.is_null() {
                out.insert((*target).to_string(), value.clone());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Vila Nova de Gaia"), "vila-nova-de-gaia");
        assert_eq!(slugify("  Lisboa  "), "lisboa");
        assert_eq!(slugify("A/B--C"), "a-b-c");
    }

    #[test]
    fn test_location_id() {
        assert_eq!(
            location_id("Portugal", Some("Lisboa"), Some("Cascais")),
            "loc:portugal/lisboa/cascais"
        );
        assert_eq!(location_id("Portugal", None, None), "loc:portugal");
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date(Some("2024-01-15T10:30:00")), Some("2024-01-15".into()));
        assert_eq!(parse_date(Some("2024-01-15")), Some("2024-01-15".into()));
        assert_eq!(parse_date(Some("15/01/2024")), None);
        assert_eq!(parse_date(Some("")), None);
        assert_eq!(parse_date(None), None);
    }
}
