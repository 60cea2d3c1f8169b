//! Plan rules - one anti-pattern detector per rule
//!
//! A rule looks at a single node (and at most its direct children) and either
//! produces a [`Recommendation`] or nothing. Missing statistics are never an
//! error: a rule that lacks the data it needs simply stays quiet. Rules are
//! registered in a [`RuleRegistry`], so new diagnostics plug in without
//! touching the traversal.

use crate::config::AnalyzerConfig;
use crate::filter::{clip, extract_filter_columns};
use crate::messages;
use crate::plan::{NodeId, NodeType, PlanNode, SortSpaceType};
use crate::recommendation::{Recommendation, Severity};
use std::fmt;
use thiserror::Error;

/// Errors a rule may report instead of a recommendation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuleError {
    /// The node carries a value the rule cannot interpret
    #[error("malformed `{field}` on node {node}: {reason}")]
    MalformedNode {
        node: NodeId,
        field: &'static str,
        reason: String,
    },

    /// Any other failure inside a rule
    #[error("{0}")]
    Failed(String),
}

/// Result type for rule checks.
pub type RuleResult = Result<Option<Recommendation>, RuleError>;

/// A single diagnostic over one plan node
pub trait PlanRule: Send + Sync {
    /// Stable rule name; also the prefix of every recommendation id it emits
    fn name(&self) -> &'static str;

    /// Checks one node. Must not look above the node or at its siblings.
    fn check(&self, node: &PlanNode, config: &AnalyzerConfig) -> RuleResult;
}

/// Adapts a plain function or closure into a [`PlanRule`]
pub struct FnRule<F> {
    name: &'static str,
    check: F,
}

impl<F> FnRule<F>
where
    F: Fn(&PlanNode, &AnalyzerConfig) -> RuleResult + Send + Sync,
{
    pub fn new(name: &'static str, check: F) -> Self {
        Self { name, check }
    }
}

impl<F> PlanRule for FnRule<F>
where
    F: Fn(&PlanNode, &AnalyzerConfig) -> RuleResult + Send + Sync,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn check(&self, node: &PlanNode, config: &AnalyzerConfig) -> RuleResult {
        (self.check)(node, config)
    }
}

/// Ordered set of rules applied to every node
pub struct RuleRegistry {
    rules: Vec<Box<dyn PlanRule>>,
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::with_default_rules()
    }
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl RuleRegistry {
    /// A registry with no rules
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// All built-in rules, in evaluation order
    pub fn with_default_rules() -> Self {
        Self::empty()
            .with_rule(SeqScanWithFilter)
            .with_rule(EstimationError)
            .with_rule(NestedLoopInnerSeqScan)
            .with_rule(DiskSort)
            .with_rule(HashBatchSpill)
            .with_rule(LossyBitmap)
    }

    /// Appends a rule; it runs after every rule already registered
    pub fn register(&mut self, rule: impl PlanRule + 'static) {
        self.rules.push(Box::new(rule));
    }

    /// Builder form of [`register`](Self::register)
    pub fn with_rule(mut self, rule: impl PlanRule + 'static) -> Self {
        self.register(rule);
        self
    }

    pub fn rules(&self) -> impl Iterator<Item = &dyn PlanRule> {
        self.rules.iter().map(|rule| rule.as_ref())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Seq Scan that filters a large input; suggests an index on the filtered columns
#[derive(Debug, Clone, Copy, Default)]
pub struct SeqScanWithFilter;

impl PlanRule for SeqScanWithFilter {
    fn name(&self) -> &'static str {
        "seq-scan-with-filter"
    }

    fn check(&self, node: &PlanNode, config: &AnalyzerConfig) -> RuleResult {
        if !node.is(&NodeType::SeqScan) {
            return Ok(None);
        }
        let thresholds = &config.rules;
        let rows = node.effective_rows();
        if rows <= thresholds.seq_scan_rows {
            return Ok(None);
        }
        let Some(filter) = non_empty(node.filter.as_deref()) else {
            return Ok(None);
        };
        if filter.len() > config.max_filter_len {
            tracing::warn!(
                node = %node.id,
                len = filter.len(),
                limit = config.max_filter_len,
                "filter text truncated before column extraction"
            );
        }

        let columns: Vec<String> = extract_filter_columns(filter, config.max_filter_len)
            .into_iter()
            .collect();
        let severity = if rows > thresholds.seq_scan_critical_rows {
            Severity::Critical
        } else {
            Severity::Warning
        };
        let table = non_empty(node.relation_name.as_deref());
        let messages = messages::seq_scan_with_filter(
            table,
            rows,
            clip(filter, config.max_filter_len),
            &columns,
        );

        let mut recommendation = Recommendation::new(self.name(), &node.id, severity, messages);
        if let Some(sql) = table.and_then(|table| create_index_sql(table, &columns)) {
            recommendation = recommendation.with_sql(sql);
        }
        Ok(Some(recommendation))
    }
}

/// Planner row estimate off by more than the configured ratio in either direction
#[derive(Debug, Clone, Copy, Default)]
pub struct EstimationError;

impl PlanRule for EstimationError {
    fn name(&self) -> &'static str {
        "estimation-error"
    }

    fn check(&self, node: &PlanNode, config: &AnalyzerConfig) -> RuleResult {
        let Some(actual) = node.actual_rows else {
            return Ok(None);
        };
        let ratio = row_ratio(actual, node.plan_rows);
        let thresholds = &config.rules;
        if ratio >= thresholds.estimation_ratio_low && ratio <= thresholds.estimation_ratio_high {
            return Ok(None);
        }

        let table = non_empty(node.relation_name.as_deref());
        let sql = match table.and_then(qualified_name) {
            Some(table) => format!("ANALYZE {table};"),
            None => "ANALYZE;".to_string(),
        };
        let messages = messages::estimation_error(table, node.plan_rows, actual, ratio);

        Ok(Some(
            Recommendation::new(self.name(), &node.id, Severity::Warning, messages).with_sql(sql),
        ))
    }
}

/// Nested Loop iterated many times whose inner side is a Seq Scan
#[derive(Debug, Clone, Copy, Default)]
pub struct NestedLoopInnerSeqScan;

impl PlanRule for NestedLoopInnerSeqScan {
    fn name(&self) -> &'static str {
        "nested-loop-inner-seq-scan"
    }

    fn check(&self, node: &PlanNode, config: &AnalyzerConfig) -> RuleResult {
        if !node.is(&NodeType::NestedLoop) {
            return Ok(None);
        }
        let Some(loops) = node.actual_loops else {
            return Ok(None);
        };
        if loops <= config.rules.nested_loop_loops {
            return Ok(None);
        }
        let Some(inner) = node.children.get(1) else {
            return Ok(None);
        };
        if !inner.is(&NodeType::SeqScan) {
            return Ok(None);
        }

        let inner_table = non_empty(inner.relation_name.as_deref());
        let messages = messages::nested_loop_inner_seq_scan(loops, inner_table);
        let mut recommendation =
            Recommendation::new(self.name(), &node.id, Severity::Critical, messages);

        // The join key usually shows up in the inner scan's filter
        let join_columns: Vec<String> = non_empty(inner.filter.as_deref())
            .map(|filter| extract_filter_columns(filter, config.max_filter_len))
            .unwrap_or_default()
            .into_iter()
            .collect();
        if let Some(sql) = inner_table.and_then(|table| create_index_sql(table, &join_columns)) {
            recommendation = recommendation.with_sql(sql);
        }
        Ok(Some(recommendation))
    }
}

/// Sort that spilled to disk
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskSort;

impl PlanRule for DiskSort {
    fn name(&self) -> &'static str {
        "disk-sort"
    }

    fn check(&self, node: &PlanNode, config: &AnalyzerConfig) -> RuleResult {
        if !node.is(&NodeType::Sort) {
            return Ok(None);
        }
        let on_disk = node.sort_space_type == Some(SortSpaceType::Disk);
        let external = node
            .sort_method
            .as_deref()
            .is_some_and(|method| method.to_ascii_lowercase().contains("external"));
        if !on_disk && !external {
            return Ok(None);
        }

        let work_mem = config.rules.suggested_work_mem.trim();
        let messages =
            messages::disk_sort(node.sort_space_used_kb, node.sort_method.as_deref(), work_mem);

        Ok(Some(
            Recommendation::new(self.name(), &node.id, Severity::Warning, messages)
                .with_sql(format!("SET work_mem = '{work_mem}';")),
        ))
    }
}

/// Hash whose table spilled into multiple batches
///
/// Registered so the rule order is fixed; detection needs batch counts that the
/// plan model does not carry yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashBatchSpill;

impl PlanRule for HashBatchSpill {
    fn name(&self) -> &'static str {
        "hash-batch-spill"
    }

    fn check(&self, _node: &PlanNode, _config: &AnalyzerConfig) -> RuleResult {
        Ok(None)
    }
}

/// Bitmap Heap Scan that degraded to lossy pages
///
/// Registered like [`HashBatchSpill`]; needs exact/lossy heap block counts.
#[derive(Debug, Clone, Copy, Default)]
pub struct LossyBitmap;

impl PlanRule for LossyBitmap {
    fn name(&self) -> &'static str {
        "lossy-bitmap"
    }

    fn check(&self, _node: &PlanNode, _config: &AnalyzerConfig) -> RuleResult {
        Ok(None)
    }
}

/// actual / max(planned, 1)
pub(crate) fn row_ratio(actual: u64, planned: u64) -> f64 {
    actual as f64 / planned.max(1) as f64
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Keeps `[A-Za-z0-9_.]` so a relation can be placed in generated SQL
fn qualified_name(table: &str) -> Option<String> {
    let clean: String = table
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.'))
        .collect();
    let clean = clean.trim_matches('.');
    (!clean.is_empty()).then(|| clean.to_string())
}

/// `CREATE INDEX idx_<table>_<cols> ON <table> (<cols>);`
fn create_index_sql(table: &str, columns: &[String]) -> Option<String> {
    if columns.is_empty() {
        return None;
    }
    let table = qualified_name(table)?;
    let table_part: String = table
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    Some(format!(
        "CREATE INDEX idx_{}_{} ON {} ({});",
        table_part,
        columns.join("_"),
        table,
        columns.join(", ")
    ))
}

#[cfg(test)]
mod tests;
