//! Plan Analyzer - entry point tying rules and statistics together
//!
//! Analysis is a pure function of its inputs: the plan is only borrowed, no
//! state survives between calls, and the same inputs always produce the same
//! output in the same order.

use crate::collector::collect_recommendations;
use crate::config::{AnalyzerConfig, ConfigError};
use crate::plan::{PlanNode, QueryPlan};
use crate::recommendation::{Recommendation, Severity};
use crate::rules::RuleRegistry;
use crate::summary::{PlanSummary, calculate_summary};
use serde::{Deserialize, Serialize};

/// Result of analyzing one plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Findings, critical first
    pub recommendations: Vec<Recommendation>,
    pub summary: PlanSummary,
}

impl AnalysisResult {
    /// Returns true if there are critical issues
    pub fn has_critical_issues(&self) -> bool {
        self.recommendations
            .iter()
            .any(|r| r.severity.is_critical())
    }

    /// Returns the number of recommendations with the given severity
    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.recommendations
            .iter()
            .filter(|r| r.severity == severity)
            .count()
    }
}

/// Analyzer holding a configuration and the rules to apply
#[derive(Debug, Default)]
pub struct PlanAnalyzer {
    config: AnalyzerConfig,
    registry: RuleRegistry,
}

impl PlanAnalyzer {
    /// Creates a new analyzer with default config and the built-in rules
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an analyzer with a custom config
    pub fn with_config(config: AnalyzerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            registry: RuleRegistry::default(),
        })
    }

    /// Replaces the rule set
    pub fn with_registry(mut self, registry: RuleRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Returns the analyzer config
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Analyzes a plan tree with the given timings
    pub fn analyze(
        &self,
        root: &PlanNode,
        execution_time_ms: f64,
        planning_time_ms: Option<f64>,
    ) -> AnalysisResult {
        tracing::debug!(
            root = %root.id,
            rules = self.registry.len(),
            execution_time_ms,
            "analyzing plan"
        );

        let recommendations = collect_recommendations(root, &self.registry, &self.config);
        let summary = calculate_summary(root, execution_time_ms, planning_time_ms, &self.config);

        tracing::debug!(
            recommendations = recommendations.len(),
            critical = recommendations.iter().filter(|r| r.severity.is_critical()).count(),
            "plan analysis complete"
        );

        AnalysisResult {
            recommendations,
            summary,
        }
    }

    /// Analyzes a parsed plan; a plan without execution time is treated as 0 ms
    pub fn analyze_plan(&self, plan: &QueryPlan) -> AnalysisResult {
        self.analyze(
            &plan.root,
            plan.execution_time_ms.unwrap_or(0.0),
            plan.planning_time_ms,
        )
    }
}

/// Analyzes a plan with the default configuration and built-in rules
///
/// Nodes deeper than [`AnalyzerConfig::max_depth`] (100 000 by default) are
/// neither checked nor counted in the summary; a warning is logged when that
/// happens. Use [`PlanAnalyzer::with_config`] to change the limit.
pub fn analyze(
    root: &PlanNode,
    execution_time_ms: f64,
    planning_time_ms: Option<f64>,
) -> AnalysisResult {
    PlanAnalyzer::new().analyze(root, execution_time_ms, planning_time_ms)
}
