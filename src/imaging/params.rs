//! Parameter types shared by engines.
//!
//! - [`Quality`]: lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`Resampling`]: which filter an engine uses when resizing.

use image::imageops::FilterType;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// The value as the `u8` the encoders take.
    pub fn as_u8(self) -> u8 {
        self.0.clamp(1, 100) as u8
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Resampling strategy used by [`Engine::resize`](super::Engine::resize).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resampling {
    /// Lanczos3: best quality, cost grows with the source size.
    #[default]
    Lanczos3,
    /// Triangle filter, meant for very large sources.
    Fast,
}

impl Resampling {
    pub fn filter(self) -> FilterType {
        match self {
            Resampling::Lanczos3 => FilterType::Lanczos3,
            Resampling::Fast => FilterType::Triangle,
        }
    }
}
