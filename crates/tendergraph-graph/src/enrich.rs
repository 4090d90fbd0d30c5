//! Enrichment engine and rule catalogue.
//!
//! Enrichment runs strictly after sync: each rule is a graph-pattern match
//! that merges derived relationships — edges present in no source document,
//! computed from structure the sync pass loaded. Every rule is a MERGE
//! keyed by its endpoints (plus any dedupe property inside the pattern), so
//! re-running a rule over an unchanged graph creates nothing new.

use std::collections::HashSet;

use tracing::{info, warn};

use tendergraph_core::{EnrichmentReport, RuleOutcome};

use crate::store::GraphStore;

/// A derived-relationship rule. Static configuration: the pattern is
/// evaluated by the graph store's query capability and must RETURN a
/// `created` count.
#[derive(Debug, Clone)]
pub struct EnrichmentRule {
    pub name: &'static str,
    pub statement: &'static str,
    /// Collections whose sync pass must have completed before this rule is
    /// meaningful. A rule is skipped when a required collection failed or
    /// was cancelled in the current run.
    pub requires: &'static [&'static str],
}

/// The full catalogue, in execution order.
pub fn builtin_rules() -> Vec<EnrichmentRule> {
    vec![
        EnrichmentRule {
            name: "competed_with",
            statement: "MATCH (a:Entity)-[:IS_TENDERER_FOR]->(t:Tender)<-[:IS_TENDERER_FOR]-(b:Entity)
                 WHERE a.id < b.id
                 WITH a, b, count(DISTINCT t) AS competition_count
                 MERGE (a)-[r:COMPETED_WITH]-(b)
                 SET r.competition_count = competition_count
                 RETURN count(r) AS created",
            requires: &["contracts_gold"],
        },
        EnrichmentRule {
            name: "co_located_with",
            statement: "MATCH (a:Entity)-[:LOCATED_AT]->(l:Location)<-[:LOCATED_AT]-(b:Entity)
                 WHERE a.id < b.id
                 MERGE (a)-[r:CO_LOCATED_WITH]-(b)
                 SET r.location_id = l.id
                 RETURN count(r) AS created",
            requires: &["entities_gold"],
        },
        EnrichmentRule {
            name: "awarded_contract_to",
            statement: "MATCH (buyer:Entity)-[:IS_PROCURING_ENTITY_FOR]->(:Tender)
                       -[:AWARDS_CONTRACT]->(c:Contract)<-[:SIGNED_CONTRACT]-(supplier:Entity)
                 WITH buyer, supplier, count(DISTINCT c) AS contract_count
                 MERGE (buyer)-[r:AWARDED_CONTRACT_TO]->(supplier)
                 SET r.contract_count = contract_count
                 RETURN count(r) AS created",
            requires: &["contracts_gold"],
        },
    ]
}

/// Run the given rules. `blocked` names collections whose sync pass did not
/// complete in this run; rules requiring them are reported as skipped.
/// A rule that fails to execute is reported and the remaining rules still
/// run.
pub async fn enrich(
    graph: &dyn GraphStore,
    rules: &[EnrichmentRule],
    blocked: &HashSet<String>,
) -> EnrichmentReport {
    let mut report = EnrichmentReport::default();

    for rule in rules {
        if let Some(missing) = rule.requires.iter().find(|c| blocked.contains(**c)) {
            warn!(rule = rule.name, requires = missing, "Skipping enrichment rule: required collection did not complete");
            report.outcomes.push(RuleOutcome {
                rule: rule.name.to_string(),
                relationships_created: 0,
                error: None,
                skipped: true,
            });
            continue;
        }

        match graph.run_rule(rule).await {
            Ok(created) => {
                info!(rule = rule.name, created, "Enrichment rule applied");
                report.outcomes.push(RuleOutcome {
                    rule: rule.name.to_string(),
                    relationships_created: created,
                    error: None,
                    skipped: false,
                });
            }
            Err(e) => {
                warn!(rule = rule.name, error = %e, "Enrichment rule failed");
                report.outcomes.push(RuleOutcome {
                    rule: rule.name.to_string(),
                    relationships_created: 0,
                    error: Some(e.to_string()),
                    skipped: false,
                });
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryGraph;

    /// Idempotence under re-run hinges on every catalogue statement being a
    /// MERGE keyed inside the pattern, with the count the engine consumes.
    #[test]
    fn test_builtin_rules_merge_and_return_created() {
        let rules = builtin_rules();
        assert!(!rules.is_empty());
        for rule in &rules {
            assert!(rule.statement.contains("MERGE"), "{} must MERGE", rule.name);
            assert!(
                rule.statement.contains("RETURN count(r) AS created"),
                "{} must return a created count",
                rule.name
            );
            assert!(!rule.requires.is_empty());
        }
    }

    #[tokio::test]
    async fn test_rule_failure_does_not_block_others() {
        let graph = MemoryGraph::new();
        graph.script_rule("competed_with", Err("malformed pattern".into()));
        graph.script_rule("co_located_with", Ok(3));
        graph.script_rule("awarded_contract_to", Ok(1));

        let report = enrich(&graph, &builtin_rules(), &HashSet::new()).await;
        assert_eq!(report.outcomes.len(), 3);
        assert!(report.outcomes[0].error.is_some());
        assert_eq!(report.outcomes[1].relationships_created, 3);
        assert_eq!(report.outcomes[2].relationships_created, 1);
    }

    #[tokio::test]
    async fn test_blocked_collection_skips_dependent_rules() {
        let graph = MemoryGraph::new();
        graph.script_rule("co_located_with", Ok(2));

        let blocked: HashSet<String> = ["contracts_gold".to_string()].into();
        let report = enrich(&graph, &builtin_rules(), &blocked).await;

        let by_name = |name: &str| report.outcomes.iter().find(|o| o.rule == name).unwrap();
        assert!(by_name("competed_with").skipped);
        assert!(by_name("awarded_contract_to").skipped);
        assert!(!by_name("co_located_with").skipped);
        assert_eq!(by_name("co_located_with").relationships_created, 2);
    }
}
