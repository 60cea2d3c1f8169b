//! Recommendation collection over a whole plan tree

use crate::config::AnalyzerConfig;
use crate::plan::PlanNode;
use crate::recommendation::{Recommendation, sort_by_severity};
use crate::rules::{PlanRule, RuleRegistry};
use std::panic::{self, AssertUnwindSafe};

/// Applies every registered rule to every node and returns the findings
///
/// Nodes are visited pre-order in child order, and rules in registry order.
/// The result is sorted by severity; findings of equal severity keep their
/// collection order. A rule that errors or panics on a node is logged and
/// skipped without affecting the other rules.
pub fn collect_recommendations(
    root: &PlanNode,
    registry: &RuleRegistry,
    config: &AnalyzerConfig,
) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();
    let mut walker = root.walk(config.max_depth);

    for node in walker.by_ref() {
        for rule in registry.rules() {
            if let Some(recommendation) = run_rule(rule, node, config) {
                tracing::trace!(
                    rule = rule.name(),
                    node = %node.id,
                    severity = recommendation.severity.as_str(),
                    "rule matched"
                );
                recommendations.push(recommendation);
            }
        }
    }

    if walker.pruned() > 0 {
        tracing::warn!(
            pruned = walker.pruned(),
            max_depth = config.max_depth,
            "plan deeper than depth limit; subtrees skipped"
        );
    }

    sort_by_severity(&mut recommendations);
    recommendations
}

fn run_rule(rule: &dyn PlanRule, node: &PlanNode, config: &AnalyzerConfig) -> Option<Recommendation> {
    // Rules only read the plan, so nothing is left half-updated by an unwind
    match panic::catch_unwind(AssertUnwindSafe(|| rule.check(node, config))) {
        Ok(Ok(recommendation)) => recommendation,
        Ok(Err(err)) => {
            tracing::warn!(rule = rule.name(), node = %node.id, error = %err, "rule failed; skipping");
            None
        }
        Err(_) => {
            tracing::warn!(rule = rule.name(), node = %node.id, "rule panicked; skipping");
            None
        }
    }
}
