//! Prometheus metrics for the registry node.
//!
//! The [`NodeMetrics`] struct owns a dedicated [`Registry`] that the HTTP
//! `/metrics` endpoint encodes into the Prometheus text exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Encoder, Histogram, HistogramOpts, IntCounter, IntGauge,
    Opts, Registry, TextEncoder,
};

use crate::NodeError;

/// Central collection of all node-level Prometheus metrics.
pub struct NodeMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Challenge requests served.
    pub challenges_issued: IntCounter,
    pub signatures_accepted: IntCounter,
    pub signatures_rejected: IntCounter,
    pub blocks_appended: IntCounter,
    /// Writes refused for lack of authorization.
    pub writes_rejected: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Height of the last committed block.
    pub chain_height: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Time spent in a gated append, in milliseconds.
    pub append_time_ms: Histogram,
}

impl NodeMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Result<Self, NodeError> {
        let registry = Registry::new();

        // Counters
        let challenges_issued = register_int_counter_with_registry!(
            Opts::new(
                "starreg_challenges_issued_total",
                "Total challenges issued"
            ),
            registry
        )?;

        let signatures_accepted = register_int_counter_with_registry!(
            Opts::new(
                "starreg_signatures_accepted_total",
                "Total signature submissions that authorized a write"
            ),
            registry
        )?;

        let signatures_rejected = register_int_counter_with_registry!(
            Opts::new(
                "starreg_signatures_rejected_total",
                "Total signature submissions recorded as invalid"
            ),
            registry
        )?;

        let blocks_appended = register_int_counter_with_registry!(
            Opts::new(
                "starreg_blocks_appended_total",
                "Total blocks appended to the ledger"
            ),
            registry
        )?;

        let writes_rejected = register_int_counter_with_registry!(
            Opts::new(
                "starreg_writes_rejected_total",
                "Total write attempts refused as not authorized"
            ),
            registry
        )?;

        // Gauges
        let chain_height = register_int_gauge_with_registry!(
            Opts::new("starreg_chain_height", "Height of the last committed block"),
            registry
        )?;

        // Histograms – exponential buckets covering 0.1 ms → ~1.6 s.
        let append_time_ms = register_histogram_with_registry!(
            HistogramOpts::new(
                "starreg_append_time_ms",
                "Gated append time in milliseconds"
            )
            .buckets(prometheus::exponential_buckets(0.1, 2.0, 15)?),
            registry
        )?;

        Ok(Self {
            registry,
            challenges_issued,
            signatures_accepted,
            signatures_rejected,
            blocks_appended,
            writes_rejected,
            chain_height,
            append_time_ms,
        })
    }

    /// Encode every metric in the text exposition format.
    pub fn encode_text(&self) -> Result<String, NodeError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()).into())
    }
}
