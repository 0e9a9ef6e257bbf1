//! Engine for very large sources.
//!
//! Claims any payload whose header declares at least `min_pixels` pixels.
//! The check reads dimensions from the container header only, so deciding
//! costs nothing close to a full decode. Processing reuses the
//! [`RasterEngine`] pipeline with [`Resampling::Fast`].

use super::backend::{ApplicabilityTest, Dimensions, Engine, EngineError};
use super::codec;
use super::params::{Quality, Resampling};
use super::raster::RasterEngine;
use image::DynamicImage;

pub struct LargeImageEngine {
    inner: RasterEngine,
    min_pixels: u64,
}

impl LargeImageEngine {
    pub fn new(min_pixels: u64, quality: Quality) -> Self {
        Self {
            inner: RasterEngine::new(quality).with_resampling(Resampling::Fast),
            min_pixels,
        }
    }
}

impl ApplicabilityTest for LargeImageEngine {
    fn should_run(&self, extension: &str, buffer: &[u8]) -> bool {
        codec::header_dimensions(buffer, extension)
            .is_some_and(|dims| dims.pixel_count() >= self.min_pixels)
    }
}

impl Engine for LargeImageEngine {
    fn applicability(&self) -> Option<&dyn ApplicabilityTest> {
        Some(self)
    }

    fn load(&mut self, buffer: &[u8], extension: &str) -> Result<(), EngineError> {
        self.inner.load(buffer, extension)
    }

    fn read(
        &mut self,
        extension: Option<&str>,
        quality: Option<Quality>,
    ) -> Result<Vec<u8>, EngineError> {
        self.inner.read(extension, quality)
    }

    fn create_image(&self, buffer: &[u8]) -> Result<DynamicImage, EngineError> {
        self.inner.create_image(buffer)
    }

    fn crop(
        &mut self,
        left: u32,
        top: u32,
        right: u32,
        bottom: u32,
    ) -> Result<(), EngineError> {
        self.inner.crop(left, top, right, bottom)
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), EngineError> {
        self.inner.resize(width, height)
    }

    fn image_data(&mut self, update_image: bool) -> Result<Vec<u8>, EngineError> {
        self.inner.image_data(update_image)
    }

    fn set_image_data(&mut self, data: &[u8]) -> Result<(), EngineError> {
        self.inner.set_image_data(data)
    }

    fn size(&self) -> Result<Dimensions, EngineError> {
        self.inner.size()
    }
}
