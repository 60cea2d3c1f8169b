//! ZQLZ Plan Diagnostics - execution plan anti-pattern detection
//!
//! This crate provides functionality for:
//! - Detecting known performance anti-patterns in executed query plans
//! - Producing ranked, localized recommendations with remediation SQL
//! - Aggregating execution statistics for a plan
//!
//! # Example
//!
//! ```
//! use zqlz_plan_diagnostics::{PlanNode, Severity, analyze};
//!
//! let plan = PlanNode::new("0", "Seq Scan")
//!     .with_relation("orders")
//!     .with_plan_rows(50_000)
//!     .with_actual_rows(49_999)
//!     .with_filter("(user_id = 123)")
//!     .with_exclusive_time(42.0);
//!
//! let result = analyze(&plan, 42.5, Some(0.3));
//! let first = &result.recommendations[0];
//! assert_eq!(first.severity, Severity::Critical);
//! assert_eq!(
//!     first.sql.as_deref(),
//!     Some("CREATE INDEX idx_orders_user_id ON orders (user_id);")
//! );
//! assert!(result.summary.has_seq_scans);
//! ```

pub mod analyzer;
pub mod collector;
pub mod config;
pub mod filter;
pub mod messages;
pub mod plan;
pub mod recommendation;
pub mod rules;
pub mod summary;

pub use analyzer::{AnalysisResult, PlanAnalyzer, analyze};
pub use collector::collect_recommendations;
pub use config::{AnalyzerConfig, ConfigError, RuleThresholds, SummaryThresholds};
pub use filter::extract_filter_columns;
pub use plan::{NodeId, NodeType, PlanNode, PlanWalker, QueryPlan, SortSpaceType};
pub use recommendation::{LocalizedText, MessageBundle, Recommendation, Severity};
pub use rules::{FnRule, PlanRule, RuleError, RuleRegistry, RuleResult};
pub use summary::{OperationStat, PlanSummary, calculate_summary};
