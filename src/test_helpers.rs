//! Shared test utilities for the engine-proxy test suite.
//!
//! Provides in-memory image payloads, a recording request context, and a
//! manually driven clock so timing assertions are exact.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let (context, headers, metrics) = recording_context();
//! let clock = ManualClock::new();
//! let mut proxy = ProxyEngine::new(candidates, context).with_clock(clock.clone());
//!
//! proxy.load(&png_bytes(64, 48), ".png").unwrap();
//! clock.advance(Duration::from_millis(125));
//! proxy.read(None, None).unwrap();
//!
//! assert_eq!(headers.get("ProcessingTime").as_deref(), Some("125"));
//! ```

use crate::config::ProxyConfig;
use crate::context::{RecordedHeaders, RecordedMetrics, RequestContext};
use crate::instrument::Clock;
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, DynamicImage, Frame, ImageFormat, Rgba, RgbImage, RgbaImage};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

// =========================================================================
// Payloads
// =========================================================================

/// An RGB gradient image.
pub fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }))
}

/// A PNG-encoded gradient.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    gradient(width, height)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

/// An animated GIF with `frames` solid-color frames.
pub fn animated_gif(width: u32, height: u32, frames: usize) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut out);
        encoder.set_repeat(Repeat::Infinite).unwrap();
        for i in 0..frames {
            let shade = (i * 60 % 256) as u8;
            let buffer = RgbaImage::from_pixel(width, height, Rgba([shade, 255 - shade, 0, 255]));
            encoder
                .encode_frame(Frame::from_parts(
                    buffer,
                    0,
                    0,
                    Delay::from_numer_denom_ms(100, 1),
                ))
                .unwrap();
        }
    }
    out
}

// =========================================================================
// Context and clock
// =========================================================================

/// A context over the stock config whose headers and metrics are recorded.
pub fn recording_context() -> (RequestContext, Arc<RecordedHeaders>, Arc<RecordedMetrics>) {
    let headers = Arc::new(RecordedHeaders::new());
    let metrics = Arc::new(RecordedMetrics::new());
    let context = RequestContext::new(
        Arc::new(ProxyConfig::default()),
        headers.clone(),
        metrics.clone(),
    );
    (context, headers, metrics)
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        // Start well ahead of the real clock so rewinding stays representable.
        Self {
            now: Arc::new(Mutex::new(Instant::now() + Duration::from_secs(3600))),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }

    pub fn rewind(&self, by: Duration) {
        *self.now.lock().unwrap() -= by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap()
    }
}
