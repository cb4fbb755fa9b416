//! Prometheus metrics for expansion and rule evaluation

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    /// Expansions by value set type, source (cache, computed, extensional) and status
    pub static ref EXPANSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "lexicon_expansions_total",
        "Total number of value set expansions",
        &["value_set_type", "source", "status"]
    )
    .expect("Failed to register EXPANSIONS_TOTAL");

    pub static ref EXPANSION_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "lexicon_expansion_duration_seconds",
        "Value set expansion duration in seconds",
        &["source"],
        vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
    )
    .expect("Failed to register EXPANSION_DURATION_SECONDS");

    /// Expansion sizes
    pub static ref EXPANSION_SIZE: HistogramVec = register_histogram_vec!(
        "lexicon_expansion_size",
        "Number of codes in an expansion",
        &["source"],
        vec![0.0, 1.0, 10.0, 100.0, 1_000.0, 10_000.0, 100_000.0, 1_000_000.0]
    )
    .expect("Failed to register EXPANSION_SIZE");

    /// Rule evaluations by terminology family, operation and status
    pub static ref RULE_EVALUATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "lexicon_rule_evaluations_total",
        "Total number of rule evaluations",
        &["terminology", "operation", "status"]
    )
    .expect("Failed to register RULE_EVALUATIONS_TOTAL");

    pub static ref RULE_EVALUATION_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "lexicon_rule_evaluation_duration_seconds",
        "Rule evaluation duration in seconds",
        &["terminology", "operation"],
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0]
    )
    .expect("Failed to register RULE_EVALUATION_DURATION_SECONDS");

    /// External ECL queries by status
    pub static ref ECL_QUERIES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "lexicon_ecl_queries_total",
        "Total number of ECL queries sent to the terminology server",
        &["status"]
    )
    .expect("Failed to register ECL_QUERIES_TOTAL");

    /// Terminology version lookups by cache outcome
    pub static ref LOOKUP_CACHE_TOTAL: IntCounterVec = register_int_counter_vec!(
        "lexicon_lookup_cache_total",
        "Terminology version lookups by cache outcome",
        &["outcome"]
    )
    .expect("Failed to register LOOKUP_CACHE_TOTAL");
}

pub fn record_expansion(value_set_type: &str, source: &str, status: &str, seconds: f64, size: usize) {
    EXPANSIONS_TOTAL
        .with_label_values(&[value_set_type, source, status])
        .inc();
    EXPANSION_DURATION_SECONDS
        .with_label_values(&[source])
        .observe(seconds);
    if status == "success" {
        EXPANSION_SIZE
            .with_label_values(&[source])
            .observe(size as f64);
    }
}

pub fn record_rule_evaluation(terminology: &str, operation: &str, status: &str, seconds: f64) {
    RULE_EVALUATIONS_TOTAL
        .with_label_values(&[terminology, operation, status])
        .inc();
    RULE_EVALUATION_DURATION_SECONDS
        .with_label_values(&[terminology, operation])
        .observe(seconds);
}

/// Render every registered metric in the Prometheus text format.
pub fn gather_text() -> crate::Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| crate::Error::Other(anyhow::anyhow!("Failed to encode metrics: {e}")))?;
    String::from_utf8(buffer)
        .map_err(|e| crate::Error::Other(anyhow::anyhow!("Metrics are not UTF-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_metrics_appear_in_text_output() {
        record_rule_evaluation("icd-10-cm", "descendants", "success", 0.01);
        record_expansion("intensional", "computed", "success", 0.2, 42);

        let text = gather_text().unwrap();
        assert!(text.contains("lexicon_rule_evaluations_total"));
        assert!(text.contains("lexicon_expansions_total"));
    }
}
