//! Ordered pattern rules (first stage of the pipeline).
//!
//! Each rule is a case-insensitive regular expression searched anywhere in
//! the message. Rules are checked in declaration order and the first hit
//! wins, so overlapping patterns always resolve to the earlier one.

use regex::{Regex, RegexBuilder};
use tracing::trace;

use logtriage_types::config::{RuleConfig, default_rules};
use logtriage_types::{Result, TriageError};

/// A compiled (pattern, label) pair.
#[derive(Debug, Clone)]
struct Rule {
    pattern: Regex,
    label: String,
}

/// First-match-wins deterministic classifier.
///
/// Stateless after construction and safe to share across tasks.
#[derive(Debug, Clone)]
pub struct RuleMatcher {
    rules: Vec<Rule>,
}

impl RuleMatcher {
    /// Compile rules in the given order.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::ConfigInvalid`] if a pattern does not compile
    /// or a label is blank.
    pub fn new(configs: &[RuleConfig]) -> Result<Self> {
        let mut rules = Vec::with_capacity(configs.len());
        for (idx, cfg) in configs.iter().enumerate() {
            if cfg.label.trim().is_empty() {
                return Err(TriageError::ConfigInvalid {
                    reason: format!("rule {idx} has an empty label"),
                });
            }
            let pattern = RegexBuilder::new(&cfg.pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| TriageError::ConfigInvalid {
                    reason: format!("rule {idx} pattern {:?}: {e}", cfg.pattern),
                })?;
            rules.push(Rule {
                pattern,
                label: cfg.label.clone(),
            });
        }
        Ok(Self { rules })
    }

    /// Compile the built-in rule table.
    pub fn with_defaults() -> Result<Self> {
        Self::new(&default_rules())
    }

    /// Label of the first rule whose pattern occurs in `message`.
    pub fn match_label(&self, message: &str) -> Option<&str> {
        let (idx, rule) = self
            .rules
            .iter()
            .enumerate()
            .find(|(_, rule)| rule.pattern.is_match(message))?;
        trace!(rule = idx, label = %rule.label, "rule matched");
        Some(rule.label.as_str())
    }

    /// Number of compiled rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether there are no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
