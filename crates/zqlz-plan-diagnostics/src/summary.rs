//! Plan summary statistics
//!
//! Computed in its own traversal with its own thresholds; see
//! [`SummaryThresholds`](crate::config::SummaryThresholds).

use crate::config::AnalyzerConfig;
use crate::plan::{NodeType, PlanNode};
use crate::rules::row_ratio;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Aggregate time spent in one operator type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationStat {
    pub node_type: NodeType,
    /// Number of nodes of this type
    pub count: usize,
    /// Sum of exclusive time in milliseconds
    pub total_time_ms: f64,
    /// Share of total execution time, 0-100
    pub percentage: f64,
}

/// Aggregate execution statistics for one plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub execution_time_ms: f64,
    pub planning_time_ms: Option<f64>,
    /// Sum of actual rows times loops over executed nodes
    pub total_rows: u64,
    /// Share of checked nodes whose estimate was within the accuracy band, 0-100
    pub estimation_accuracy: f64,
    /// Most expensive operator types, most expensive first
    pub top_operations: Vec<OperationStat>,
    pub has_seq_scans: bool,
    pub has_estimation_errors: bool,
}

impl PlanSummary {
    /// Returns the total time across all listed operations
    pub fn top_operations_time_ms(&self) -> f64 {
        self.top_operations.iter().map(|op| op.total_time_ms).sum()
    }
}

#[derive(Default)]
struct TypeTotals {
    count: usize,
    total_time_ms: f64,
}

/// Walks the plan once and computes its [`PlanSummary`]
pub fn calculate_summary(
    root: &PlanNode,
    execution_time_ms: f64,
    planning_time_ms: Option<f64>,
    config: &AnalyzerConfig,
) -> PlanSummary {
    let thresholds = &config.summary;
    // First-seen order doubles as the tie-break for equal totals
    let mut by_type: IndexMap<&NodeType, TypeTotals> = IndexMap::new();
    let mut total_rows: u64 = 0;
    let mut checked: usize = 0;
    let mut errors: usize = 0;
    let mut has_seq_scans = false;

    let mut walker = root.walk(config.max_depth);
    for node in walker.by_ref() {
        let totals = by_type.entry(&node.node_type).or_default();
        totals.count += 1;
        if let Some(time) = node.exclusive_time_ms.filter(|t| t.is_finite()) {
            totals.total_time_ms += time;
        }

        if let Some(actual) = node.actual_rows {
            let loops = node.actual_loops.unwrap_or(1).max(1);
            total_rows = total_rows.saturating_add(actual.saturating_mul(loops));

            checked += 1;
            let ratio = row_ratio(actual, node.plan_rows);
            if ratio < thresholds.accuracy_ratio_low || ratio > thresholds.accuracy_ratio_high {
                errors += 1;
            }
        }

        if node.is(&NodeType::SeqScan) && node.effective_rows() > thresholds.seq_scan_rows {
            has_seq_scans = true;
        }
    }

    if walker.pruned() > 0 {
        tracing::warn!(
            pruned = walker.pruned(),
            max_depth = config.max_depth,
            "plan deeper than depth limit; summary covers visited nodes only"
        );
    }

    let estimation_accuracy = if checked == 0 {
        100.0
    } else {
        (checked - errors) as f64 / checked as f64 * 100.0
    };

    let mut top_operations: Vec<OperationStat> = by_type
        .into_iter()
        .map(|(node_type, totals)| OperationStat {
            node_type: node_type.clone(),
            count: totals.count,
            total_time_ms: totals.total_time_ms,
            percentage: percentage_of(totals.total_time_ms, execution_time_ms),
        })
        .collect();
    // Stable, so ties keep first-seen order
    top_operations.sort_by(|a, b| b.total_time_ms.total_cmp(&a.total_time_ms));
    top_operations.truncate(thresholds.top_operations);

    tracing::debug!(
        total_rows,
        checked,
        errors,
        operations = top_operations.len(),
        "plan summary computed"
    );

    PlanSummary {
        execution_time_ms,
        planning_time_ms,
        total_rows,
        estimation_accuracy,
        top_operations,
        has_seq_scans,
        has_estimation_errors: errors > 0,
    }
}

fn percentage_of(part: f64, whole: f64) -> f64 {
    if whole.is_finite() && whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}
