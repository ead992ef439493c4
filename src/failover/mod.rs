use crate::aggregate::Aggregate;
use crate::config::AppConfig;
use crate::llm::{LLMError, ProviderAdapter, QueryAnalysis};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use self::metrics::Metrics;
use self::provider_registry::default_providers_from_config;

pub mod metrics;
pub mod provider_registry;

pub use metrics::ProviderStats;

#[derive(Debug, thiserror::Error)]
pub enum RingError {
    #[error("All AI providers failed: {}", .0.join("; "))]
    AllProvidersFailed(Vec<String>),

    #[error("No AI providers available. Configure at least one of GEMINI_API_KEY, GROQ_API_KEY or OPENROUTER_API_KEY")]
    NoProviderAvailable,
}

#[derive(Clone)]
pub struct RingEntry {
    pub name: String,
    pub adapter: Arc<dyn ProviderAdapter>,
}

impl RingEntry {
    pub fn new(adapter: Arc<dyn ProviderAdapter>) -> Self {
        Self {
            name: adapter.name().to_string(),
            adapter,
        }
    }
}

/// Result of a ring call: the value, who produced it, and which provider it
/// displaced from the front, if any.
#[derive(Debug, Clone)]
pub struct RingOutcome<T> {
    pub value: T,
    pub provider: String,
    pub switched_from: Option<String>,
}

/// Self-reordering provider list. Position 0 is always the provider that
/// last succeeded; membership is fixed at construction.
pub struct FailoverRing {
    entries: Mutex<Vec<RingEntry>>,
    metrics: Mutex<Metrics>,
    call_timeout: Duration,
}

impl FailoverRing {
    pub fn new(entries: Vec<RingEntry>, call_timeout: Duration) -> Result<Self, RingError> {
        if entries.is_empty() {
            return Err(RingError::NoProviderAvailable);
        }

        tracing::info!(
            "Failover ring ready: [{}], primary={}",
            entries
                .iter()
                .map(|e| e.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            entries[0].name
        );

        Ok(Self {
            entries: Mutex::new(entries),
            metrics: Mutex::new(Metrics::new()),
            call_timeout,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, RingError> {
        Self::new(default_providers_from_config(config), config.llm_timeout())
    }

    pub fn current_provider(&self) -> String {
        lock(&self.entries)
            .first()
            .map(|e| e.name.clone())
            .unwrap_or_default()
    }

    pub fn provider_names(&self) -> Vec<String> {
        lock(&self.entries).iter().map(|e| e.name.clone()).collect()
    }

    pub fn provider_stats(&self) -> Vec<ProviderStats> {
        let names = self.provider_names();
        let metrics = lock(&self.metrics);
        names.iter().map(|name| metrics.stats_for(name)).collect()
    }

    pub fn switch_count(&self) -> u64 {
        lock(&self.metrics).get_switch_count()
    }

    pub async fn analyze(&self, query: &str) -> Result<RingOutcome<QueryAnalysis>, RingError> {
        self.call("analyze", |adapter| async move { adapter.analyze(query).await })
            .await
    }

    pub async fn synthesize(
        &self,
        query: &str,
        aggregate: &Aggregate,
    ) -> Result<RingOutcome<String>, RingError> {
        self.call("synthesize", |adapter| async move {
            adapter.synthesize_response(query, aggregate).await
        })
        .await
    }

    pub async fn answer_directly(&self, query: &str) -> Result<RingOutcome<String>, RingError> {
        self.call("answer_directly", |adapter| async move {
            adapter.answer_directly(query).await
        })
        .await
    }

    /// Try each provider in current order; the first success is promoted to
    /// the front. The list lock is never held across a provider call.
    async fn call<T, F, Fut>(&self, capability: &str, op: F) -> Result<RingOutcome<T>, RingError>
    where
        F: Fn(Arc<dyn ProviderAdapter>) -> Fut,
        Fut: Future<Output = Result<T, LLMError>>,
    {
        let snapshot: Vec<RingEntry> = lock(&self.entries).clone();
        if snapshot.is_empty() {
            return Err(RingError::NoProviderAvailable);
        }

        let mut errors = Vec::with_capacity(snapshot.len());

        for (idx, entry) in snapshot.iter().enumerate() {
            tracing::info!("LLM: Trying provider '{}' for {}...", entry.name, capability);

            let attempt = tokio::time::timeout(self.call_timeout, op(entry.adapter.clone()));
            let result = match attempt.await {
                Ok(result) => result,
                Err(_) => Err(LLMError::Timeout),
            };

            match result {
                Ok(value) => {
                    lock(&self.metrics).record_success(&entry.name);

                    let switched_from = self.promote(&entry.name);
                    if let Some(previous) = &switched_from {
                        tracing::warn!(
                            "LLM: Switched to '{}' as primary provider (was '{}')",
                            entry.name,
                            previous
                        );
                    }

                    tracing::info!("LLM: '{}' succeeded on {}", entry.name, capability);
                    return Ok(RingOutcome {
                        value,
                        provider: entry.name.clone(),
                        switched_from,
                    });
                }
                Err(e) => {
                    lock(&self.metrics).record_failure(&entry.name);
                    if idx + 1 < snapshot.len() {
                        tracing::warn!(
                            "LLM: '{}' failed on {}: {}, trying next fallback...",
                            entry.name,
                            capability,
                            e
                        );
                    } else {
                        tracing::warn!("LLM: '{}' failed on {}: {}", entry.name, capability, e);
                    }
                    errors.push(format!("{}: {}", entry.name, e));
                }
            }
        }

        tracing::error!("LLM: All providers failed on {}: {:?}", capability, errors);
        Err(RingError::AllProvidersFailed(errors))
    }

    /// Move `name` to the front of the live list. Returns the provider it
    /// displaced, or `None` when it was already first.
    fn promote(&self, name: &str) -> Option<String> {
        let mut entries = lock(&self.entries);
        let pos = entries.iter().position(|e| e.name == name)?;
        if pos == 0 {
            return None;
        }
        let previous = entries[0].name.clone();
        let entry = entries.remove(pos);
        entries.insert(0, entry);
        drop(entries);
        lock(&self.metrics).record_switch();
        Some(previous)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeAdapter {
        name: String,
        fail: bool,
        delay: Option<Duration>,
        calls: AtomicUsize,
    }

    impl FakeAdapter {
        fn ok(name: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                fail: false,
                delay: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(name: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                fail: true,
                delay: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn slow(name: &str, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                fail: false,
                delay: Some(delay),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProviderAdapter for FakeAdapter {
        fn name(&self) -> &str {
            &self.name
        }

        async fn generate(&self, _prompt: &str) -> Result<String, LLMError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                Err(LLMError::NetworkError(format!("{} unreachable", self.name)))
            } else {
                Ok(format!("answer from {}", self.name))
            }
        }
    }

    fn ring(adapters: &[Arc<FakeAdapter>]) -> FailoverRing {
        let entries = adapters
            .iter()
            .map(|a| RingEntry::new(a.clone() as Arc<dyn ProviderAdapter>))
            .collect();
        FailoverRing::new(entries, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn empty_ring_is_rejected() {
        let err = FailoverRing::new(Vec::new(), Duration::from_secs(1)).err().unwrap();
        assert!(matches!(err, RingError::NoProviderAvailable));
    }

    #[tokio::test]
    async fn primary_success_keeps_order() {
        let (a, b) = (FakeAdapter::ok("A"), FakeAdapter::ok("B"));
        let ring = ring(&[a.clone(), b.clone()]);

        let outcome = ring.answer_directly("hi").await.unwrap();
        assert_eq!(outcome.value, "answer from A");
        assert_eq!(outcome.switched_from, None);
        assert_eq!(ring.provider_names(), vec!["A", "B"]);
        assert_eq!(b.calls(), 0);
    }

    #[tokio::test]
    async fn fallback_success_is_promoted() {
        let (a, b, c) = (
            FakeAdapter::failing("A"),
            FakeAdapter::ok("B"),
            FakeAdapter::ok("C"),
        );
        let ring = ring(&[a.clone(), b.clone(), c.clone()]);

        let outcome = ring.answer_directly("hi").await.unwrap();
        assert_eq!(outcome.provider, "B");
        assert_eq!(outcome.switched_from.as_deref(), Some("A"));
        assert_eq!(ring.provider_names(), vec!["B", "A", "C"]);
        assert_eq!(ring.current_provider(), "B");
        assert_eq!(c.calls(), 0);
        assert_eq!(ring.switch_count(), 1);

        // The promoted provider is tried first next time.
        ring.answer_directly("again").await.unwrap();
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 2);
    }

    #[tokio::test]
    async fn last_provider_promotion_preserves_relative_order() {
        let ring = ring(&[
            FakeAdapter::failing("A"),
            FakeAdapter::failing("B"),
            FakeAdapter::ok("C"),
            FakeAdapter::ok("D"),
        ]);
        ring.answer_directly("hi").await.unwrap();
        assert_eq!(ring.provider_names(), vec!["C", "A", "B", "D"]);
    }

    #[tokio::test]
    async fn all_failures_are_enumerated() {
        let ring = ring(&[
            FakeAdapter::failing("A"),
            FakeAdapter::failing("B"),
            FakeAdapter::failing("C"),
        ]);

        match ring.synthesize("q", &Aggregate::new("q", QueryAnalysis::default())).await {
            Err(RingError::AllProvidersFailed(errors)) => {
                assert_eq!(errors.len(), 3);
                assert!(errors[0].starts_with("A: "));
                assert!(errors[2].contains("C unreachable"));
            }
            other => panic!("expected AllProvidersFailed, got {:?}", other.map(|o| o.value)),
        }
        assert_eq!(ring.provider_names(), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn slow_provider_times_out_and_falls_through() {
        let slow = FakeAdapter::slow("Slow", Duration::from_millis(500));
        let entries = vec![
            RingEntry::new(slow.clone() as Arc<dyn ProviderAdapter>),
            RingEntry::new(FakeAdapter::ok("Fast") as Arc<dyn ProviderAdapter>),
        ];
        let ring = FailoverRing::new(entries, Duration::from_millis(50)).unwrap();

        let outcome = ring.answer_directly("hi").await.unwrap();
        assert_eq!(outcome.provider, "Fast");
        let stats = ring.provider_stats();
        let slow_stats = stats.iter().find(|s| s.provider == "Slow").unwrap();
        assert_eq!(slow_stats.failures, 1);
    }

    #[tokio::test]
    async fn analyze_parse_failure_does_not_fail_over() {
        let (a, b) = (FakeAdapter::ok("A"), FakeAdapter::ok("B"));
        let ring = ring(&[a.clone(), b.clone()]);

        let outcome = ring.analyze("What is the latest on maize prices?").await.unwrap();
        assert_eq!(outcome.provider, "A");
        assert!(outcome.value.needs_web_search);
        assert_eq!(b.calls(), 0);
    }

    #[tokio::test]
    async fn concurrent_promotions_do_not_corrupt_order() {
        let ring = Arc::new(ring(&[
            FakeAdapter::failing("A"),
            FakeAdapter::ok("B"),
            FakeAdapter::ok("C"),
        ]));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let ring = ring.clone();
                tokio::spawn(async move { ring.answer_directly(&format!("q{}", i)).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let mut names = ring.provider_names();
        assert_eq!(names[0], "B");
        names.sort();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(ring.switch_count(), 1);
    }

    /// Fails on prompts containing `FAILME`, stalls on prompts containing
    /// `SLOWQ`, answers everything else.
    struct ScriptedAdapter(&'static str);

    #[async_trait]
    impl ProviderAdapter for ScriptedAdapter {
        fn name(&self) -> &str {
            self.0
        }

        async fn generate(&self, prompt: &str) -> Result<String, LLMError> {
            if prompt.contains("FAILME") {
                return Err(LLMError::NetworkError(format!("{} refused", self.0)));
            }
            if prompt.contains("SLOWQ") {
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            Ok(format!("answer from {}", self.0))
        }
    }

    #[tokio::test]
    async fn late_success_on_stale_front_is_promoted_again() {
        let entries = vec![
            RingEntry::new(Arc::new(ScriptedAdapter("A")) as Arc<dyn ProviderAdapter>),
            RingEntry::new(FakeAdapter::ok("B") as Arc<dyn ProviderAdapter>),
        ];
        let ring = Arc::new(FailoverRing::new(entries, Duration::from_secs(5)).unwrap());

        let slow = {
            let ring = ring.clone();
            tokio::spawn(async move { ring.answer_directly("SLOWQ").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let fast = ring.answer_directly("FAILME").await.unwrap();
        assert_eq!(fast.provider, "B");
        assert_eq!(fast.switched_from.as_deref(), Some("A"));
        assert_eq!(ring.provider_names(), vec!["B", "A"]);

        let slow = slow.await.unwrap().unwrap();
        assert_eq!(slow.provider, "A");
        assert_eq!(slow.switched_from.as_deref(), Some("B"));
        assert_eq!(ring.provider_names(), vec!["A", "B"]);
        assert_eq!(ring.switch_count(), 2);
    }
}
