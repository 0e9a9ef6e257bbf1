//! Engine capability interface and shared types.
//!
//! The [`Engine`] trait enumerates every operation an image-processing engine
//! must support: load, read, create an image handle, crop, resize, pixel data
//! access and size. The [`ProxyEngine`](crate::proxy::ProxyEngine) implements
//! the same trait, so callers cannot tell a single engine from the proxy.
//!
//! Whether an engine gates itself on the incoming payload is an explicit,
//! optional capability: [`Engine::applicability`] returns `None` for engines
//! that handle anything (the fallback), or `Some` test otherwise.

use super::params::Quality;
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("unable to find a suitable engine, tried {attempted:?}")]
    SelectionFailed { attempted: Vec<String> },
    #[error("no engine selected: load must be called before any other operation")]
    UninitializedDispatch,
    #[error("no image loaded")]
    NotLoaded,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode {extension} payload: {source}")]
    Decode {
        extension: String,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to encode {format}: {source}")]
    Encode {
        format: String,
        #[source]
        source: image::ImageError,
    },
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("crop ({left}, {top}, {right}, {bottom}) selects nothing within {width}x{height}")]
    InvalidCrop {
        left: u32,
        top: u32,
        right: u32,
        bottom: u32,
        width: u32,
        height: u32,
    },
    #[error("invalid target size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
    #[error("pixel data length mismatch: expected {expected} bytes, got {actual}")]
    PixelDataLength { expected: usize, actual: usize },
}

/// Width and height of the image an engine currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn pixel_count(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Payload check an engine uses to claim a request.
///
/// Takes `&self` and borrowed inputs: a test can inspect but never mutate
/// the payload or the engine.
pub trait ApplicabilityTest {
    fn should_run(&self, extension: &str, buffer: &[u8]) -> bool;
}

/// Trait for image-processing engines.
///
/// Engines are exclusively owned by one proxy and reused across sequential
/// request cycles, so [`load`](Engine::load) must discard any image state
/// left over from the previous cycle.
pub trait Engine: Send {
    /// The engine's applicability test, or `None` if it matches unconditionally.
    fn applicability(&self) -> Option<&dyn ApplicabilityTest> {
        None
    }

    /// Decode `buffer` and make it the current image.
    fn load(&mut self, buffer: &[u8], extension: &str) -> Result<(), EngineError>;

    /// Encode the current image. `None` arguments fall back to the loaded
    /// extension and the engine's configured quality.
    fn read(
        &mut self,
        extension: Option<&str>,
        quality: Option<Quality>,
    ) -> Result<Vec<u8>, EngineError>;

    /// Decode `buffer` into a standalone handle without touching the current image.
    fn create_image(&self, buffer: &[u8]) -> Result<DynamicImage, EngineError>;

    /// Keep the region `[left, right) x [top, bottom)`.
    fn crop(&mut self, left: u32, top: u32, right: u32, bottom: u32)
    -> Result<(), EngineError>;

    /// Resample the current image to exactly `width` x `height`.
    fn resize(&mut self, width: u32, height: u32) -> Result<(), EngineError>;

    /// Raw RGBA8 pixels of the current image, row-major.
    ///
    /// With `update_image`, the current image is normalized to RGBA8 so that
    /// a later [`set_image_data`](Engine::set_image_data) round-trips.
    fn image_data(&mut self, update_image: bool) -> Result<Vec<u8>, EngineError>;

    /// Replace the current image's pixels with RGBA8 `data` of the same size.
    fn set_image_data(&mut self, data: &[u8]) -> Result<(), EngineError>;

    fn size(&self) -> Result<Dimensions, EngineError>;
}
