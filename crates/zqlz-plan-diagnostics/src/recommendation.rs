//! Recommendations produced by plan rules

use crate::plan::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Locale used when a requested locale has no entry
pub const FALLBACK_LOCALE: &str = "en";

/// Severity level for recommendations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Critical issue that should be addressed immediately
    Critical,
    /// Warning that may impact performance
    Warning,
    /// Informational suggestion for optimization
    Info,
}

impl Severity {
    /// Sort rank, lowest first
    pub fn rank(&self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::Warning => 1,
            Self::Info => 2,
        }
    }

    /// Returns true if this is a critical issue
    pub fn is_critical(&self) -> bool {
        matches!(self, Self::Critical)
    }

    /// Returns true if this is at least a warning
    pub fn is_warning_or_above(&self) -> bool {
        matches!(self, Self::Critical | Self::Warning)
    }

    /// Returns the severity level as a display string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

/// A message keyed by locale code, resolved by the renderer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalizedText(BTreeMap<String, String>);

impl LocalizedText {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the text for a locale
    pub fn with(mut self, locale: impl Into<String>, text: impl Into<String>) -> Self {
        self.0.insert(locale.into(), text.into());
        self
    }

    /// Text for `locale`, or the fallback locale's text if it has none
    pub fn get(&self, locale: &str) -> Option<&str> {
        self.0
            .get(locale)
            .or_else(|| self.0.get(FALLBACK_LOCALE))
            .map(String::as_str)
    }

    pub fn locales(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The user-facing text of one recommendation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBundle {
    pub title: LocalizedText,
    pub issue: LocalizedText,
    pub explanation: LocalizedText,
    pub suggestion: LocalizedText,
}

/// A single actionable finding about one plan node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// `<rule>:<node id>`, stable across runs over the same plan
    pub id: String,
    /// Name of the rule that produced this recommendation
    pub rule: String,
    pub severity: Severity,
    pub messages: MessageBundle,
    /// The node this recommendation is about; lookup only
    pub node_id: NodeId,
    /// Remediation statement for display or copying, never executed
    pub sql: Option<String>,
}

impl Recommendation {
    /// Creates a new recommendation
    pub fn new(
        rule: &str,
        node_id: &NodeId,
        severity: Severity,
        messages: MessageBundle,
    ) -> Self {
        Self {
            id: format!("{rule}:{node_id}"),
            rule: rule.to_string(),
            severity,
            messages,
            node_id: node_id.clone(),
            sql: None,
        }
    }

    /// Sets the remediation SQL
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Some(sql.into());
        self
    }

    /// Title in the given locale
    pub fn title(&self, locale: &str) -> Option<&str> {
        self.messages.title.get(locale)
    }

    /// Suggestion in the given locale
    pub fn suggestion(&self, locale: &str) -> Option<&str> {
        self.messages.suggestion.get(locale)
    }
}

/// Orders recommendations critical first, keeping collection order within a severity
pub fn sort_by_severity(recommendations: &mut [Recommendation]) {
    // slice::sort_by_key is stable
    recommendations.sort_by_key(|r| r.severity.rank());
}
