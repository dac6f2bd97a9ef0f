//! Metrics sink port for labeled timing samples.

use std::collections::HashMap;
use tracing::debug;

/// Port for emitting labeled metric samples to a monitoring backend.
///
/// Emission is strictly best-effort: implementations must swallow
/// transport failures, which is why the signature is infallible. A
/// failed sample must never affect the provisioning result.
pub trait MetricsSinkPort: Send + Sync {
    /// Send one group of labeled values.
    ///
    /// # Arguments
    ///
    /// * `group` - Metric group name (e.g. the emitting component)
    /// * `instance` - Optional instance label within the group
    /// * `params` - Labeled values of this sample
    fn send_parameters(&self, group: &str, instance: Option<&str>, params: &HashMap<String, String>);
}

/// A metrics sink that discards all samples.
///
/// Useful when no monitoring destination is configured.
#[derive(Debug, Clone, Default)]
pub struct NoopMetricsSink;

impl MetricsSinkPort for NoopMetricsSink {
    fn send_parameters(
        &self,
        group: &str,
        _instance: Option<&str>,
        params: &HashMap<String, String>,
    ) {
        debug!(group = %group, count = %params.len(), "discarding metric sample (no sink configured)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_sink_accepts_any_sample() {
        let sink = NoopMetricsSink;
        let mut params = HashMap::new();
        params.insert("id".to_string(), "T1".to_string());
        sink.send_parameters("receiving_server", None, &params);
    }
}
