//! Records flowing through the classification pipeline.
//!
//! A [`LogRecord`] is validated at the transport boundary and never
//! mutated afterwards. Each one produces exactly one
//! [`ClassificationResult`]. [`LabeledExample`] is the unit of training
//! data held by the dataset store.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sentinel label for logs no stage could classify with confidence.
pub const UNCLASSIFIED: &str = "Unclassified";

/// One log line to classify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Originating system (e.g. "ModernCRM", "LegacyCRM").
    pub source: String,

    /// Free-text log message.
    #[serde(rename = "log_message", alias = "message")]
    pub message: String,
}

impl LogRecord {
    /// Create a record from a source and message.
    pub fn new(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
        }
    }
}

/// A labeled training row.
///
/// Rows whose message or label is blank after trimming are dropped by
/// [`LabeledExample::cleaned`] before they reach the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledExample {
    /// Originating system. May be empty.
    pub source: String,

    /// Log message text.
    #[serde(rename = "log_message")]
    pub message: String,

    /// Target category.
    #[serde(rename = "target_label")]
    pub label: String,
}

impl LabeledExample {
    /// Create a labeled example.
    pub fn new(
        source: impl Into<String>,
        message: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
            label: label.into(),
        }
    }

    /// Whether the row survives [`cleaned`](Self::cleaned).
    pub fn is_valid(&self) -> bool {
        !self.message.trim().is_empty() && !self.label.trim().is_empty()
    }

    /// Trim all fields and return `None` when message or label is blank.
    pub fn cleaned(self) -> Option<Self> {
        if !self.is_valid() {
            return None;
        }
        Some(Self {
            source: self.source.trim().to_string(),
            message: self.message.trim().to_string(),
            label: self.label.trim().to_string(),
        })
    }
}

/// Which stage produced a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Deterministic pattern rule.
    Rule,
    /// Encoder plus probabilistic model.
    Embedding,
    /// External language model, used for legacy sources.
    SemanticFallback,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Rule => "rule",
            Strategy::Embedding => "embedding",
            Strategy::SemanticFallback => "semantic_fallback",
        };
        f.write_str(name)
    }
}

/// The outcome of classifying one [`LogRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Source of the classified record.
    pub source: String,

    /// Message of the classified record.
    #[serde(rename = "log_message")]
    pub message: String,

    /// Assigned category, possibly [`UNCLASSIFIED`].
    #[serde(rename = "target_label")]
    pub label: String,

    /// Stage that produced the label (informational).
    pub strategy: Strategy,
}

impl ClassificationResult {
    /// Build a result from the record it was derived from.
    pub fn new(record: LogRecord, label: impl Into<String>, strategy: Strategy) -> Self {
        Self {
            source: record.source,
            message: record.message,
            label: label.into(),
            strategy,
        }
    }

    /// Whether no stage could assign a real category.
    pub fn is_unclassified(&self) -> bool {
        self.label == UNCLASSIFIED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleaned_trims_fields() {
        let ex = LabeledExample::new(" ModernCRM ", "  disk full \n", " Error ")
            .cleaned()
            .unwrap();
        assert_eq!(ex.source, "ModernCRM");
        assert_eq!(ex.message, "disk full");
        assert_eq!(ex.label, "Error");
    }

    #[test]
    fn cleaned_drops_blank_message() {
        assert!(LabeledExample::new("s", "   ", "Error").cleaned().is_none());
    }

    #[test]
    fn cleaned_drops_blank_label() {
        assert!(LabeledExample::new("s", "disk full", "").cleaned().is_none());
    }

    #[test]
    fn cleaned_allows_blank_source() {
        let ex = LabeledExample::new("", "disk full", "Error").cleaned();
        assert!(ex.is_some());
    }

    #[test]
    fn is_valid_agrees_with_cleaned() {
        let rows = [
            LabeledExample::new("s", "disk full", "Error"),
            LabeledExample::new("s", " \t", "Error"),
            LabeledExample::new("s", "disk full", "  "),
            LabeledExample::new("", " disk full ", " Error "),
        ];
        for row in rows {
            assert_eq!(row.is_valid(), row.clone().cleaned().is_some(), "{row:?}");
        }
    }

    #[test]
    fn log_record_uses_wire_field_names() {
        let rec: LogRecord =
            serde_json::from_str(r#"{"source":"ModernCRM","log_message":"hello"}"#).unwrap();
        assert_eq!(rec, LogRecord::new("ModernCRM", "hello"));
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["log_message"], "hello");
    }

    #[test]
    fn result_serializes_target_label() {
        let res = ClassificationResult::new(
            LogRecord::new("ModernCRM", "User User1 logged in."),
            "User Action",
            Strategy::Rule,
        );
        let json = serde_json::to_value(&res).unwrap();
        assert_eq!(json["target_label"], "User Action");
        assert_eq!(json["strategy"], "rule");
        assert!(!res.is_unclassified());
    }

    #[test]
    fn strategy_display() {
        assert_eq!(Strategy::SemanticFallback.to_string(), "semantic_fallback");
        assert_eq!(Strategy::Embedding.to_string(), "embedding");
    }
}
