use prometheus::{
    register_histogram, register_int_counter_vec, register_int_gauge, Encoder, Histogram,
    IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    pub static ref CPU: IntGauge =
        register_int_gauge!("cpu_usage", "CPU usage in percentage").unwrap();
    pub static ref MEMORY: IntGauge =
        register_int_gauge!("memory_usage", "Memory usage in bytes").unwrap();
    pub static ref VALIDATIONS: IntCounterVec = register_int_counter_vec!(
        "sqlgrade_validations_total",
        "Validation requests by outcome",
        &["outcome"]
    )
    .unwrap();
    pub static ref VALIDATION_SECONDS: Histogram = register_histogram!(
        "sqlgrade_validation_seconds",
        "Wall time of one validation request"
    )
    .unwrap();
    pub static ref EPHEMERAL_DATASETS: IntGauge = register_int_gauge!(
        "sqlgrade_ephemeral_datasets",
        "Private dataset copies currently on disk"
    )
    .unwrap();
}

/// Renders every registered metric in the Prometheus text format.
pub fn render() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        log::warn!("Failed to encode metrics: {e}");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
