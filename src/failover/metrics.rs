use serde::Serialize;
use std::collections::HashMap;

/// Per-provider call outcomes plus the number of times the ring promoted a
/// fallback provider to the front.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    success_counts: HashMap<String, u64>,
    failure_counts: HashMap<String, u64>,
    switches: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStats {
    pub provider: String,
    pub successes: u64,
    pub failures: u64,
    pub success_rate: f32,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, provider_id: &str) {
        *self
            .success_counts
            .entry(provider_id.to_string())
            .or_insert(0) += 1;
    }

    pub fn record_failure(&mut self, provider_id: &str) {
        *self
            .failure_counts
            .entry(provider_id.to_string())
            .or_insert(0) += 1;
    }

    pub fn record_switch(&mut self) {
        self.switches += 1;
    }

    pub fn get_success_count(&self, provider_id: &str) -> u64 {
        *self.success_counts.get(provider_id).unwrap_or(&0)
    }

    pub fn get_failure_count(&self, provider_id: &str) -> u64 {
        *self.failure_counts.get(provider_id).unwrap_or(&0)
    }

    pub fn get_switch_count(&self) -> u64 {
        self.switches
    }

    pub fn get_success_rate(&self, provider_id: &str) -> f32 {
        let success = self.get_success_count(provider_id) as f32;
        let total = success + self.get_failure_count(provider_id) as f32;

        if total == 0.0 {
            0.0
        } else {
            success / total
        }
    }

    pub fn stats_for(&self, provider_id: &str) -> ProviderStats {
        ProviderStats {
            provider: provider_id.to_string(),
            successes: self.get_success_count(provider_id),
            failures: self.get_failure_count(provider_id),
            success_rate: self.get_success_rate(provider_id),
        }
    }
}
