//! Prometheus metrics for the ingestion and analytics engine (§B.4).
//!
//! One `Metrics` struct, built once at startup and threaded through `Arc`,
//! covering every series §B.4 requires: adapter fetch count/duration/failure
//! by source, rate-limiter wait time by source, catalog size and evictions,
//! cycle duration and outcome, transcript pipeline method outcomes,
//! breakdown/insight extraction duration, and LLM/embedding call and
//! fallback-to-template counts.

use prometheus::{CounterVec, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry};
use std::sync::Arc;

#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,

    /// Adapter fetches, by source and outcome ("ok" | "error").
    pub adapter_fetch_total: CounterVec,
    pub adapter_fetch_duration_seconds: HistogramVec,
    /// Records an adapter contributed to a cycle before dedup, by source.
    pub adapter_records_total: CounterVec,

    /// Time a caller waited inside a `RateLimiter::acquire`, by source.
    pub rate_limiter_wait_seconds: HistogramVec,

    /// Current catalog size and cumulative evictions.
    pub catalog_size: GaugeVec,
    pub catalog_evictions_total: CounterVec,

    /// Ingestion cycle duration and outcome (attempts taken, window used).
    pub cycle_duration_seconds: HistogramVec,
    pub cycle_new_records: HistogramVec,
    pub cycle_attempts: CounterVec,

    /// Transcript pipeline method outcomes, by method and outcome.
    pub transcript_method_total: CounterVec,

    /// Breakdown/insight extraction stage durations, by stage.
    pub breakdown_stage_duration_seconds: HistogramVec,
    /// LLM/embedding call outcomes, by kind ("llm" | "embedding") and outcome.
    pub provider_call_total: CounterVec,
    /// Times a stage fell back to a template/heuristic instead of the LLM.
    pub template_fallback_total: CounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let adapter_fetch_total = CounterVec::new(
            Opts::new(
                "techpulse_adapter_fetch_total",
                "Source adapter fetch attempts",
            ),
            &["source", "outcome"],
        )?;
        let adapter_fetch_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "techpulse_adapter_fetch_duration_seconds",
                "Source adapter fetch duration",
            )
            .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
            &["source"],
        )?;
        let adapter_records_total = CounterVec::new(
            Opts::new(
                "techpulse_adapter_records_total",
                "Records returned by a source adapter before dedup",
            ),
            &["source"],
        )?;

        let rate_limiter_wait_seconds = HistogramVec::new(
            HistogramOpts::new(
                "techpulse_rate_limiter_wait_seconds",
                "Time spent waiting inside RateLimiter::acquire",
            )
            .buckets(vec![0.0, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0]),
            &["source"],
        )?;

        let catalog_size = GaugeVec::new(
            Opts::new("techpulse_catalog_size", "Records currently held in the catalog store"),
            &["record_type"],
        )?;
        let catalog_evictions_total = CounterVec::new(
            Opts::new(
                "techpulse_catalog_evictions_total",
                "Records evicted from the catalog store (oldest published first)",
            ),
            &["record_type"],
        )?;

        let cycle_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "techpulse_cycle_duration_seconds",
                "Ingestion orchestrator cycle duration",
            )
            .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
            &["outcome"],
        )?;
        let cycle_new_records = HistogramVec::new(
            HistogramOpts::new(
                "techpulse_cycle_new_records",
                "Truly-new records committed per cycle attempt",
            )
            .buckets(vec![0.0, 1.0, 5.0, 10.0, 50.0, 100.0, 500.0]),
            &["window_days"],
        )?;
        let cycle_attempts = CounterVec::new(
            Opts::new(
                "techpulse_cycle_attempts_total",
                "Expanding-window attempts taken per cycle",
            ),
            &["window_days"],
        )?;

        let transcript_method_total = CounterVec::new(
            Opts::new(
                "techpulse_transcript_method_total",
                "Transcript pipeline fallback-chain method outcomes",
            ),
            &["method", "outcome"],
        )?;

        let breakdown_stage_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "techpulse_breakdown_stage_duration_seconds",
                "Breakdown extractor stage duration",
            )
            .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
            &["stage"],
        )?;
        let provider_call_total = CounterVec::new(
            Opts::new(
                "techpulse_provider_call_total",
                "LLM/embedding provider call outcomes",
            ),
            &["kind", "outcome"],
        )?;
        let template_fallback_total = CounterVec::new(
            Opts::new(
                "techpulse_template_fallback_total",
                "Times a breakdown stage fell back to a template/heuristic",
            ),
            &["stage"],
        )?;

        macro_rules! register_all {
            ($($m:expr),* $(,)?) => {
                $(registry.register(Box::new($m.clone()))?;)*
            };
        }
        register_all!(
            adapter_fetch_total,
            adapter_fetch_duration_seconds,
            adapter_records_total,
            rate_limiter_wait_seconds,
            catalog_size,
            catalog_evictions_total,
            cycle_duration_seconds,
            cycle_new_records,
            cycle_attempts,
            transcript_method_total,
            breakdown_stage_duration_seconds,
            provider_call_total,
            template_fallback_total,
        );

        Ok(Self {
            registry: Arc::new(registry),
            adapter_fetch_total,
            adapter_fetch_duration_seconds,
            adapter_records_total,
            rate_limiter_wait_seconds,
            catalog_size,
            catalog_evictions_total,
            cycle_duration_seconds,
            cycle_new_records,
            cycle_attempts,
            transcript_method_total,
            breakdown_stage_duration_seconds,
            provider_call_total,
            template_fallback_total,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_adapter_fetch(&self, source: &str, outcome: &str, duration_secs: f64, records: usize) {
        self.adapter_fetch_total.with_label_values(&[source, outcome]).inc();
        self.adapter_fetch_duration_seconds
            .with_label_values(&[source])
            .observe(duration_secs);
        if records > 0 {
            self.adapter_records_total
                .with_label_values(&[source])
                .inc_by(records as f64);
        }
    }

    pub fn record_rate_limiter_wait(&self, source: &str, wait_secs: f64) {
        self.rate_limiter_wait_seconds
            .with_label_values(&[source])
            .observe(wait_secs);
    }

    pub fn set_catalog_size(&self, record_type: &str, size: usize) {
        self.catalog_size.with_label_values(&[record_type]).set(size as f64);
    }

    pub fn record_eviction(&self, record_type: &str) {
        self.catalog_evictions_total.with_label_values(&[record_type]).inc();
    }

    pub fn record_cycle(&self, outcome: &str, duration_secs: f64, window_days: u32, new_records: usize) {
        self.cycle_duration_seconds.with_label_values(&[outcome]).observe(duration_secs);
        let window = window_days.to_string();
        self.cycle_new_records
            .with_label_values(&[&window])
            .observe(new_records as f64);
        self.cycle_attempts.with_label_values(&[&window]).inc();
    }

    pub fn record_transcript_method(&self, method: &str, outcome: &str) {
        self.transcript_method_total.with_label_values(&[method, outcome]).inc();
    }

    pub fn record_breakdown_stage(&self, stage: &str, duration_secs: f64) {
        self.breakdown_stage_duration_seconds
            .with_label_values(&[stage])
            .observe(duration_secs);
    }

    pub fn record_provider_call(&self, kind: &str, outcome: &str) {
        self.provider_call_total.with_label_values(&[kind, outcome]).inc();
    }

    pub fn record_template_fallback(&self, stage: &str) {
        self.template_fallback_total.with_label_values(&[stage]).inc();
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("failed to construct metrics registry")
    }
}
