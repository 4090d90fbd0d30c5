//! Mapper for `contracts_gold` documents.
//!
//! One gold contract document carries flattened Tender + Contract fields
//! plus execution locations, attached documents, CPV codes and the VATs of
//! the entities involved. Entity and CPV endpoints are referenced by id
//! only — their property-bearing nodes are owned by other collections, and
//! merging `{id}`-only nodes here would race their property sets.

use serde_json::Value;

use crate::document::{json_to_id, CanonicalDocument};
use crate::error::MapperError;
use crate::graph::{MapperResult, NodeSpec, RelationshipSpec};

use super::{document_url, location_id, many_to_one, mapped_properties, one_to_many, parse_date};

const CONTRACT_FIELDS: &[(&str, &str)] = &[
    ("initial_value", "initial_price"),
    ("final_value", "final_price"),
    ("execution_deadline", "execution_deadline"),
    ("contract_type", "contract_type"),
    ("causes_deadline_change", "causes_deadline_change"),
    ("causes_price_change", "causes_price_change"),
];

const TENDER_FIELDS: &[(&str, &str)] = &[
    ("procedure_type", "procedure_type"),
    ("procurement_method", "procurement_method"),
    ("numberOfTenderers", "numberOfTenderers"),
    ("environmental_criteria", "environmental_criteria"),
    ("centralized_procedure", "centralized_procedure"),
];

pub fn map(doc: &CanonicalDocument) -> Result<MapperResult, MapperError> {
    let contract_id = doc
        .get("contract_id")
        .and_then(json_to_id)
        .ok_or(MapperError::MissingField("contract_id"))?;

    let mut result = MapperResult::default();

    // Location hierarchy: country, country/district, country/district/
    // municipality nodes, child -> parent BROADER edges, and the contract
    // linked to the most specific level of each execution location.
    let mut specific_location_ids: Vec<String> = Vec::new();
    let mut seen_locations = std::collections::HashSet::new();
    for loc in doc.array_field("execution_location").into_iter().flatten() {
        let Some(country) = loc.get("country").and_then(Value::as_str) else {
            continue;
        };
        let district = loc.get("district").and_then(Value::as_str);
        let municipality = loc.get("municipality").and_then(Value::as_str);

        let mut hierarchy = vec![NodeSpec::new("Location", location_id(country, None, None))
            .prop("country", country)];
        if let Some(d) = district {
            hierarchy.push(
                NodeSpec::new("Location", location_id(country, Some(d), None))
                    .prop("country", country)
                    .prop("district", d),
            );
            if let Some(m) = municipality {
                hierarchy.push(
                    NodeSpec::new("Location", location_id(country, Some(d), Some(m)))
                        .prop("country", country)
                        .prop("district", d)
                        .prop("municipality", m),
                );
            }
        }

        for pair in hierarchy.windows(2) {
            result.relationships.push(RelationshipSpec::new(
                "BROADER",
                pair[1].reference(),
                pair[0].reference(),
            ));
        }

        let most_specific = hierarchy.last().map(|n| n.key.clone());
        for node in hierarchy {
            if seen_locations.insert(node.key.clone()) {
                result.nodes.push(node);
            }
        }
        if let Some(id) = most_specific {
            if !specific_location_ids.contains(&id) {
                specific_location_ids.push(id);
            }
        }
    }

    // Attached documents.
    let mut document_ids: Vec<String> = Vec::new();
    let mut seen_documents = std::collections::HashSet::new();
    for item in doc.array_field("documents").into_iter().flatten() {
        let Some(id) = item.get("id").and_then(json_to_id) else {
            continue;
        };
        if !seen_documents.insert(id.clone()) {
            continue;
        }
        result.nodes.push(
            NodeSpec::new("Document", id.clone())
                .prop("document_url", document_url(&id))
                .prop(
                    "document_description",
                    item.get("description").cloned().unwrap_or(Value::Null),
                ),
        );
        document_ids.push(id);
    }

    // CPV codes: relationship targets only. Real CPV nodes come from the
    // classification structure collection; until it syncs these endpoints
    // exist as identity-only placeholders.
    let cpv_ids = doc.str_list("cpvs");

    let contracted = doc.str_list("contracted_vats");
    let contestants: Vec<String> = doc
        .str_list("contestants_vats")
        .into_iter()
        .filter(|vat| !contracted.contains(vat))
        .collect();
    let procuring = doc.str_list("contracting_agency_vats");

    let mut contract = NodeSpec::new("Contract", contract_id.clone());
    contract.properties = mapped_properties(&doc.fields, CONTRACT_FIELDS);
    if let Some(date) = parse_date(doc.str_field("signing_date")) {
        contract.properties.insert("signing_date".into(), date.into());
    }

    // The tender shares the contract's id: the source registry publishes
    // them as one flattened record.
    let mut tender = NodeSpec::new("Tender", contract_id.clone());
    tender.properties = mapped_properties(&doc.fields, TENDER_FIELDS);
    for field in ["publication_date", "close_date"] {
        if let Some(date) = parse_date(doc.str_field(field)) {
            tender.properties.insert(field.into(), date.into());
        }
    }

    let contract_ref = contract.reference();
    let tender_ref = tender.reference();
    result.nodes.push(tender);
    result.nodes.push(contract);

    result.relationships.push(RelationshipSpec::new(
        "AWARDS_CONTRACT",
        tender_ref.clone(),
        contract_ref.clone(),
    ));
    result.relationships.extend(one_to_many(
        "EXECUTED_AT_LOCATION",
        contract_ref.clone(),
        "Location",
        &specific_location_ids,
    ));
    result.relationships.extend(one_to_many(
        "HAS_DOCUMENT",
        contract_ref.clone(),
        "Document",
        &document_ids,
    ));
    result.relationships.extend(one_to_many(
        "HAS_CLASSIFICATION",
        contract_ref.clone(),
        "CPV",
        &cpv_ids,
    ));
    result.relationships.extend(many_to_one(
        "WON_TENDER",
        "Entity",
        &contracted,
        tender_ref.clone(),
    ));
    result.relationships.extend(many_to_one(
        "IS_TENDERER_FOR",
        "Entity",
        &contestants,
        tender_ref.clone(),
    ));
    result.relationships.extend(many_to_one(
        "IS_PROCURING_ENTITY_FOR",
        "Entity",
        &procuring,
        tender_ref,
    ));
    result.relationships.extend(many_to_one(
        "SIGNED_CONTRACT",
        "Entity",
        &contracted,
        contract_ref,
    ));

    Ok(result)
}
