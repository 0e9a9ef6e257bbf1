//! Processing-time instrumentation.
//!
//! A cycle is timed from `load` to `read`. The duration is rounded to the
//! nearest whole millisecond, recorded as the timing sample
//! `<metrics.prefix>.<engine>` and echoed in the processing-time header.

use crate::context::RequestContext;
use std::time::{Duration, Instant};
use tracing::info;

/// Source of monotonic timestamps.
pub trait Clock: Send {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Whole milliseconds from `started` to `finished`, rounded to nearest.
///
/// A `finished` earlier than `started` yields zero.
pub fn elapsed_millis(started: Instant, finished: Instant) -> u64 {
    let elapsed = finished
        .checked_duration_since(started)
        .unwrap_or_default();
    round_millis(elapsed)
}

/// `elapsed` in whole milliseconds, halves rounded up, saturating at `u64::MAX`.
pub fn round_millis(elapsed: Duration) -> u64 {
    u64::try_from((elapsed.as_nanos() + 500_000) / 1_000_000).unwrap_or(u64::MAX)
}

/// Publish a finished cycle's duration to the metrics sink and response headers.
pub fn report_processing_time(context: &RequestContext, engine_id: &str, millis: u64) {
    let config = &context.config;
    context
        .metrics
        .timing(&config.metric_name(engine_id), millis);
    context
        .headers
        .set_header(&config.headers.processing_time, &millis.to_string());
    info!(engine = engine_id, millis, "processing cycle finished");
}
