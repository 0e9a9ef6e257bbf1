//! Request context: configuration plus the response-header and metrics side
//! channels the proxy reports through.
//!
//! The proxy holds the context by `Arc`, so the request handler that owns
//! the real header map and metrics client keeps its own reference and reads
//! what the proxy published once the cycle ends.

use crate::config::ProxyConfig;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

/// Destination for response headers.
pub trait ResponseHeaders: Send + Sync {
    /// Set `name` to `value`, replacing any earlier value.
    fn set_header(&self, name: &str, value: &str);
}

/// Destination for timing samples.
pub trait MetricsSink: Send + Sync {
    fn timing(&self, name: &str, millis: u64);
}

#[derive(Clone)]
pub struct RequestContext {
    pub config: Arc<ProxyConfig>,
    pub headers: Arc<dyn ResponseHeaders>,
    pub metrics: Arc<dyn MetricsSink>,
}

impl RequestContext {
    pub fn new(
        config: Arc<ProxyConfig>,
        headers: Arc<dyn ResponseHeaders>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            config,
            headers,
            metrics,
        }
    }
}

/// In-memory header map, in insertion order.
#[derive(Debug, Default)]
pub struct RecordedHeaders {
    entries: Mutex<Vec<(String, String)>>,
}

impl RecordedHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.entries()
            .into_iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn entries(&self) -> Vec<(String, String)> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ResponseHeaders for RecordedHeaders {
    fn set_header(&self, name: &str, value: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => entries.push((name.to_string(), value.to_string())),
        }
    }
}

/// One recorded timing sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimingSample {
    pub name: String,
    pub millis: u64,
}

/// In-memory metrics sink.
#[derive(Debug, Default)]
pub struct RecordedMetrics {
    samples: Mutex<Vec<TimingSample>>,
}

impl RecordedMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> Vec<TimingSample> {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl MetricsSink for RecordedMetrics {
    fn timing(&self, name: &str, millis: u64) {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(TimingSample {
                name: name.to_string(),
                millis,
            });
    }
}

/// Emits timing samples as `tracing` events under the `metrics` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMetrics;

impl MetricsSink for TracingMetrics {
    fn timing(&self, name: &str, millis: u64) {
        info!(target: "metrics", metric = name, millis, "timing");
    }
}

/// Forwards every sample to several sinks.
#[derive(Default)]
pub struct FanOutMetrics {
    sinks: Vec<Arc<dyn MetricsSink>>,
}

impl FanOutMetrics {
    pub fn new(sinks: Vec<Arc<dyn MetricsSink>>) -> Self {
        Self { sinks }
    }
}

impl MetricsSink for FanOutMetrics {
    fn timing(&self, name: &str, millis: u64) {
        for sink in &self.sinks {
            sink.timing(name, millis);
        }
    }
}
