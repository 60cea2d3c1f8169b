//! Plan Model - the execution plan tree consumed by diagnostics
//!
//! Plans are produced upstream from `EXPLAIN (ANALYZE, FORMAT JSON)` output and
//! are treated as read-only here. Every traversal in this crate goes through
//! [`PlanWalker`], which uses an explicit stack so arbitrarily deep plans cannot
//! exhaust the call stack.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a node within one plan tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<usize> for NodeId {
    fn from(id: usize) -> Self {
        Self(id.to_string())
    }
}

/// Represents a complete query execution plan together with its timing trailer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryPlan {
    /// Root node of the plan tree
    pub root: PlanNode,
    /// Planning time in milliseconds (if available)
    pub planning_time_ms: Option<f64>,
    /// Execution time in milliseconds (if available, from EXPLAIN ANALYZE)
    pub execution_time_ms: Option<f64>,
}

impl QueryPlan {
    /// Creates a new query plan with the given root node
    pub fn new(root: PlanNode) -> Self {
        Self {
            root,
            planning_time_ms: None,
            execution_time_ms: None,
        }
    }

    /// Sets the planning time
    pub fn with_planning_time(mut self, ms: f64) -> Self {
        self.planning_time_ms = Some(ms);
        self
    }

    /// Sets the execution time
    pub fn with_execution_time(mut self, ms: f64) -> Self {
        self.execution_time_ms = Some(ms);
        self
    }

    /// Returns an iterator over all nodes in the plan (pre-order, unbounded depth)
    pub fn iter_nodes(&self) -> PlanWalker<'_> {
        PlanWalker::new(&self.root, usize::MAX)
    }
}

/// A single operator in the plan tree
///
/// Children are ordered as the engine executes them; for joins the first child
/// is the outer relation and the second the inner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanNode {
    pub id: NodeId,
    pub node_type: NodeType,
    /// Planner's row estimate
    pub plan_rows: u64,
    /// Rows produced per loop (from EXPLAIN ANALYZE)
    #[serde(default)]
    pub actual_rows: Option<u64>,
    #[serde(default)]
    pub actual_loops: Option<u64>,
    #[serde(default)]
    pub relation_name: Option<String>,
    /// Raw filter expression as printed by the engine
    #[serde(default)]
    pub filter: Option<String>,
    /// Time spent in this node alone, children excluded
    #[serde(default)]
    pub exclusive_time_ms: Option<f64>,
    #[serde(default)]
    pub sort_space_type: Option<SortSpaceType>,
    #[serde(default)]
    pub sort_method: Option<String>,
    #[serde(default)]
    pub sort_space_used_kb: Option<u64>,
    #[serde(default)]
    pub children: Vec<PlanNode>,
}

impl PlanNode {
    /// Creates a new plan node with no statistics and no children
    pub fn new(id: impl Into<NodeId>, node_type: impl Into<NodeType>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            plan_rows: 0,
            actual_rows: None,
            actual_loops: None,
            relation_name: None,
            filter: None,
            exclusive_time_ms: None,
            sort_space_type: None,
            sort_method: None,
            sort_space_used_kb: None,
            children: Vec::new(),
        }
    }

    /// Sets the relation/table name
    pub fn with_relation(mut self, relation: impl Into<String>) -> Self {
        self.relation_name = Some(relation.into());
        self
    }

    /// Sets the estimated rows
    pub fn with_plan_rows(mut self, rows: u64) -> Self {
        self.plan_rows = rows;
        self
    }

    /// Sets the actual rows
    pub fn with_actual_rows(mut self, rows: u64) -> Self {
        self.actual_rows = Some(rows);
        self
    }

    /// Sets the actual loop count
    pub fn with_actual_loops(mut self, loops: u64) -> Self {
        self.actual_loops = Some(loops);
        self
    }

    /// Sets the filter condition
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Sets the exclusive (self) time
    pub fn with_exclusive_time(mut self, ms: f64) -> Self {
        self.exclusive_time_ms = Some(ms);
        self
    }

    pub fn with_sort_space(mut self, space_type: SortSpaceType, used_kb: u64) -> Self {
        self.sort_space_type = Some(space_type);
        self.sort_space_used_kb = Some(used_kb);
        self
    }

    pub fn with_sort_method(mut self, method: impl Into<String>) -> Self {
        self.sort_method = Some(method.into());
        self
    }

    /// Adds a child node
    pub fn with_child(mut self, child: PlanNode) -> Self {
        self.children.push(child);
        self
    }

    /// Actual rows when the plan was executed, otherwise the planner estimate
    pub fn effective_rows(&self) -> u64 {
        self.actual_rows.unwrap_or(self.plan_rows)
    }

    /// Returns true if the node type matches
    pub fn is(&self, node_type: &NodeType) -> bool {
        &self.node_type == node_type
    }

    /// Pre-order traversal that skips anything below `max_depth` (root is depth 1)
    pub fn walk(&self, max_depth: usize) -> PlanWalker<'_> {
        PlanWalker::new(self, max_depth)
    }

    /// Returns the total number of nodes in this subtree (including self)
    pub fn node_count(&self) -> usize {
        self.walk(usize::MAX).count()
    }

    /// Returns the maximum depth of this subtree
    pub fn depth(&self) -> usize {
        let mut walker = self.walk(usize::MAX);
        let mut deepest = 0;
        while let Some((depth, _)) = walker.next_with_depth() {
            deepest = deepest.max(depth);
        }
        deepest
    }

    /// Returns true if this is a leaf node (no children)
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Where a sort kept its working set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortSpaceType {
    Memory,
    Disk,
}

/// Type of operation performed by a plan node
///
/// Well-known PostgreSQL operators get their own variant; anything else is kept
/// verbatim in [`NodeType::Other`], so new engine operators pass through
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeType {
    // Scan operations
    SeqScan,
    IndexScan,
    IndexOnlyScan,
    BitmapIndexScan,
    BitmapHeapScan,
    SubqueryScan,
    FunctionScan,
    CteScan,

    // Join operations
    NestedLoop,
    HashJoin,
    MergeJoin,

    // Aggregation operations
    Aggregate,
    GroupAggregate,
    HashAggregate,

    Sort,
    IncrementalSort,
    Limit,
    Materialize,
    Memoize,
    Hash,
    Unique,
    Append,
    Result,
    Gather,
    GatherMerge,

    /// Any operator without a dedicated variant
    Other(String),
}

impl NodeType {
    /// Parses a node type from PostgreSQL EXPLAIN output
    pub fn from_postgres_str(s: &str) -> Self {
        match s {
            "Seq Scan" => Self::SeqScan,
            "Index Scan" => Self::IndexScan,
            "Index Only Scan" => Self::IndexOnlyScan,
            "Bitmap Index Scan" => Self::BitmapIndexScan,
            "Bitmap Heap Scan" => Self::BitmapHeapScan,
            "Subquery Scan" => Self::SubqueryScan,
            "Function Scan" => Self::FunctionScan,
            "CTE Scan" => Self::CteScan,
            "Nested Loop" => Self::NestedLoop,
            "Hash Join" => Self::HashJoin,
            "Merge Join" => Self::MergeJoin,
            "Aggregate" => Self::Aggregate,
            "GroupAggregate" => Self::GroupAggregate,
            "HashAggregate" => Self::HashAggregate,
            "Sort" => Self::Sort,
            "Incremental Sort" => Self::IncrementalSort,
            "Limit" => Self::Limit,
            "Materialize" => Self::Materialize,
            "Memoize" => Self::Memoize,
            "Hash" => Self::Hash,
            "Unique" => Self::Unique,
            "Append" => Self::Append,
            "Result" => Self::Result,
            "Gather" => Self::Gather,
            "Gather Merge" => Self::GatherMerge,
            other => Self::Other(other.to_string()),
        }
    }

    /// The operator name as the engine prints it
    pub fn as_str(&self) -> &str {
        match self {
            Self::SeqScan => "Seq Scan",
            Self::IndexScan => "Index Scan",
            Self::IndexOnlyScan => "Index Only Scan",
            Self::BitmapIndexScan => "Bitmap Index Scan",
            Self::BitmapHeapScan => "Bitmap Heap Scan",
            Self::SubqueryScan => "Subquery Scan",
            Self::FunctionScan => "Function Scan",
            Self::CteScan => "CTE Scan",
            Self::NestedLoop => "Nested Loop",
            Self::HashJoin => "Hash Join",
            Self::MergeJoin => "Merge Join",
            Self::Aggregate => "Aggregate",
            Self::GroupAggregate => "GroupAggregate",
            Self::HashAggregate => "HashAggregate",
            Self::Sort => "Sort",
            Self::IncrementalSort => "Incremental Sort",
            Self::Limit => "Limit",
            Self::Materialize => "Materialize",
            Self::Memoize => "Memoize",
            Self::Hash => "Hash",
            Self::Unique => "Unique",
            Self::Append => "Append",
            Self::Result => "Result",
            Self::Gather => "Gather",
            Self::GatherMerge => "Gather Merge",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for NodeType {
    fn from(s: &str) -> Self {
        Self::from_postgres_str(s)
    }
}

impl From<String> for NodeType {
    fn from(s: String) -> Self {
        match Self::from_postgres_str(&s) {
            Self::Other(_) => Self::Other(s),
            known => known,
        }
    }
}

impl From<NodeType> for String {
    fn from(node_type: NodeType) -> Self {
        match node_type {
            NodeType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

/// Depth-bounded pre-order iterator over plan nodes
pub struct PlanWalker<'a> {
    stack: Vec<(usize, &'a PlanNode)>,
    max_depth: usize,
    pruned: usize,
}

impl<'a> PlanWalker<'a> {
    fn new(root: &'a PlanNode, max_depth: usize) -> Self {
        Self {
            stack: vec![(1, root)],
            max_depth,
            pruned: 0,
        }
    }

    /// Number of subtrees skipped because they started below the depth limit
    pub fn pruned(&self) -> usize {
        self.pruned
    }

    /// Like `next`, but also reports the depth of the yielded node (root is 1)
    pub fn next_with_depth(&mut self) -> Option<(usize, &'a PlanNode)> {
        loop {
            let (depth, node) = self.stack.pop()?;
            if depth > self.max_depth {
                self.pruned += 1;
                continue;
            }
            // Reverse push keeps children in execution order
            for child in node.children.iter().rev() {
                self.stack.push((depth + 1, child));
            }
            return Some((depth, node));
        }
    }
}

impl<'a> Iterator for PlanWalker<'a> {
    type Item = &'a PlanNode;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_with_depth().map(|(_, node)| node)
    }
}
