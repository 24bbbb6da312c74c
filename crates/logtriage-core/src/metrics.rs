//! Process-wide classification counters.
//!
//! Every counter is an atomic or a sharded map entry, so concurrent
//! classifications never lose increments. Nothing is persisted; counters
//! reset on restart.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;

/// Label histogram, request count, latency total and fallback failures.
#[derive(Debug, Default)]
pub struct Metrics {
    by_label: DashMap<String, u64>,
    total_requests: AtomicU64,
    total_latency_us: AtomicU64,
    fallback_failures: AtomicU64,
    fallback_rejected_replies: AtomicU64,
}

/// Point-in-time copy of [`Metrics`], as served by `/metrics`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub by_label: BTreeMap<String, u64>,
    pub total_requests: u64,
    /// Mean request latency, rounded to 2 decimals. 0 before any request.
    pub avg_latency_ms: f64,
    /// Fallback calls that failed in transport (timeout, rate limit, network).
    pub fallback_failures: u64,
    /// Fallback replies outside the closed category set.
    pub fallback_rejected_replies: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one classification result.
    pub fn record_label(&self, label: &str) {
        *self.by_label.entry(label.to_string()).or_insert(0) += 1;
    }

    /// Count one completed request (a whole batch counts once).
    pub fn record_request(&self, latency: Duration) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_latency_us
            .fetch_add(latency.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_fallback_failure(&self) {
        self.fallback_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback_rejection(&self) {
        self.fallback_rejected_replies
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let by_label = self
            .by_label
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect();
        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let total_latency_us = self.total_latency_us.load(Ordering::Relaxed);
        let avg_latency_ms = if total_requests == 0 {
            0.0
        } else {
            let ms = total_latency_us as f64 / 1000.0 / total_requests as f64;
            (ms * 100.0).round() / 100.0
        };

        MetricsSnapshot {
            by_label,
            total_requests,
            avg_latency_ms,
            fallback_failures: self.fallback_failures.load(Ordering::Relaxed),
            fallback_rejected_replies: self.fallback_rejected_replies.load(Ordering::Relaxed),
        }
    }
}
