//! Analyzer configuration
//!
//! Rule thresholds and summary thresholds are kept in separate structs. The
//! estimation bands in particular differ on purpose: rules alert on 10x
//! divergence, while the summary's accuracy gauge counts anything beyond 2x.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when loading or validating an [`AnalyzerConfig`]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse analyzer config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Thresholds used by the recommendation rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleThresholds {
    /// Seq scans reading more rows than this are reported
    pub seq_scan_rows: u64,
    /// Seq scans reading more rows than this are critical
    pub seq_scan_critical_rows: u64,
    /// actual/planned ratio below this is an estimation error
    pub estimation_ratio_low: f64,
    /// actual/planned ratio above this is an estimation error
    pub estimation_ratio_high: f64,
    /// Nested loops iterating more often than this are reported
    pub nested_loop_loops: u64,
    /// Value used in the sample `SET work_mem` statement
    pub suggested_work_mem: String,
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self {
            seq_scan_rows: 1_000,
            seq_scan_critical_rows: 10_000,
            estimation_ratio_low: 0.1,
            estimation_ratio_high: 10.0,
            nested_loop_loops: 1_000,
            suggested_work_mem: "256MB".to_string(),
        }
    }
}

/// Thresholds used by the plan summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryThresholds {
    /// A seq scan above this many rows sets `has_seq_scans`
    pub seq_scan_rows: u64,
    pub accuracy_ratio_low: f64,
    pub accuracy_ratio_high: f64,
    /// Maximum number of entries in `top_operations`
    pub top_operations: usize,
}

impl Default for SummaryThresholds {
    fn default() -> Self {
        Self {
            seq_scan_rows: 1_000,
            accuracy_ratio_low: 0.5,
            accuracy_ratio_high: 2.0,
            top_operations: 5,
        }
    }
}

/// Configuration for the plan analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub rules: RuleThresholds,
    pub summary: SummaryThresholds,
    /// Nodes deeper than this (root is 1) are not visited; rules and summary
    /// both ignore them
    pub max_depth: usize,
    /// Filter text beyond this many bytes is ignored by column extraction
    pub max_filter_len: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            rules: RuleThresholds::default(),
            summary: SummaryThresholds::default(),
            max_depth: 100_000,
            max_filter_len: 4_096,
        }
    }
}

impl AnalyzerConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a config from JSON; omitted fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the rule thresholds
    pub fn with_rules(mut self, rules: RuleThresholds) -> Self {
        self.rules = rules;
        self
    }

    /// Sets the summary thresholds
    pub fn with_summary(mut self, summary: SummaryThresholds) -> Self {
        self.summary = summary;
        self
    }

    /// Sets the traversal depth limit
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Sets the filter length bound
    pub fn with_max_filter_len(mut self, max_filter_len: usize) -> Self {
        self.max_filter_len = max_filter_len;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(invalid("max_depth", "must be at least 1"));
        }
        if self.rules.seq_scan_critical_rows < self.rules.seq_scan_rows {
            return Err(invalid(
                "rules.seq_scan_critical_rows",
                format!(
                    "{} is below rules.seq_scan_rows ({})",
                    self.rules.seq_scan_critical_rows, self.rules.seq_scan_rows
                ),
            ));
        }
        check_band(
            "rules.estimation_ratio_low",
            self.rules.estimation_ratio_low,
            self.rules.estimation_ratio_high,
        )?;
        check_band(
            "summary.accuracy_ratio_low",
            self.summary.accuracy_ratio_low,
            self.summary.accuracy_ratio_high,
        )?;
        let work_mem = self.rules.suggested_work_mem.trim();
        if work_mem.is_empty() || !work_mem.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(invalid(
                "rules.suggested_work_mem",
                format!("{work_mem:?} must be a non-empty [0-9A-Za-z] size such as 256MB"),
            ));
        }
        Ok(())
    }
}

fn check_band(field: &'static str, low: f64, high: f64) -> Result<(), ConfigError> {
    if !(low.is_finite() && high.is_finite()) || low <= 0.0 {
        return Err(invalid(field, "ratios must be finite and positive"));
    }
    if low >= 1.0 || high <= 1.0 {
        return Err(invalid(
            field,
            format!("band {low}..{high} must straddle 1.0"),
        ));
    }
    Ok(())
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}
