//! General-purpose raster engine built on the `image` crate.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP, GIF) | `image` crate (pure Rust decoders) |
//! | Resize | `DynamicImage::resize_exact` with the configured [`Resampling`] |
//! | Crop | `DynamicImage::crop_imm` |
//! | Pixel data | `DynamicImage::to_rgba8` / `RgbaImage::from_raw` |
//! | Encode | [`codec::encode`](super::codec::encode) |
//!
//! The raster engine has no applicability test: it is the conventional last
//! entry in the engine list and handles whatever the others decline.

use super::backend::{Dimensions, Engine, EngineError};
use super::calculations::{crop_region, rgba_len};
use super::codec;
use super::params::{Quality, Resampling};
use image::{DynamicImage, RgbaImage};

/// Fallback engine using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RasterEngine {
    image: Option<DynamicImage>,
    extension: String,
    quality: Quality,
    resampling: Resampling,
}

impl RasterEngine {
    pub fn new(quality: Quality) -> Self {
        Self {
            image: None,
            extension: String::new(),
            quality,
            resampling: Resampling::default(),
        }
    }

    pub fn with_resampling(mut self, resampling: Resampling) -> Self {
        self.resampling = resampling;
        self
    }

    fn current(&self) -> Result<&DynamicImage, EngineError> {
        self.image.as_ref().ok_or(EngineError::NotLoaded)
    }

    fn current_mut(&mut self) -> Result<&mut DynamicImage, EngineError> {
        self.image.as_mut().ok_or(EngineError::NotLoaded)
    }
}

impl Default for RasterEngine {
    fn default() -> Self {
        Self::new(Quality::default())
    }
}

impl Engine for RasterEngine {
    fn load(&mut self, buffer: &[u8], extension: &str) -> Result<(), EngineError> {
        // Drop the previous cycle's image before decoding, even if decoding fails.
        self.image = None;
        self.extension = extension.to_string();
        self.image = Some(codec::decode(buffer, extension)?);
        Ok(())
    }

    fn read(
        &mut self,
        extension: Option<&str>,
        quality: Option<Quality>,
    ) -> Result<Vec<u8>, EngineError> {
        let image = self.current()?;
        let format = codec::output_format(extension.unwrap_or(&self.extension))?;
        codec::encode(image, format, quality.unwrap_or(self.quality))
    }

    fn create_image(&self, buffer: &[u8]) -> Result<DynamicImage, EngineError> {
        codec::decode(buffer, &self.extension)
    }

    fn crop(
        &mut self,
        left: u32,
        top: u32,
        right: u32,
        bottom: u32,
    ) -> Result<(), EngineError> {
        let image = self.current_mut()?;
        let (width, height) = (image.width(), image.height());
        let (x, y, w, h) = crop_region(left, top, right, bottom, (width, height)).ok_or(
            EngineError::InvalidCrop {
                left,
                top,
                right,
                bottom,
                width,
                height,
            },
        )?;
        *image = image.crop_imm(x, y, w, h);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), EngineError> {
        if width == 0 || height == 0 {
            return Err(EngineError::InvalidSize { width, height });
        }
        let filter = self.resampling.filter();
        let image = self.current_mut()?;
        *image = image.resize_exact(width, height, filter);
        Ok(())
    }

    fn image_data(&mut self, update_image: bool) -> Result<Vec<u8>, EngineError> {
        let image = self.current_mut()?;
        let rgba = image.to_rgba8();
        let data = rgba.as_raw().clone();
        if update_image {
            *image = DynamicImage::ImageRgba8(rgba);
        }
        Ok(data)
    }

    fn set_image_data(&mut self, data: &[u8]) -> Result<(), EngineError> {
        let image = self.current_mut()?;
        let (width, height) = (image.width(), image.height());
        let expected = rgba_len((width, height));
        if data.len() != expected {
            return Err(EngineError::PixelDataLength {
                expected,
                actual: data.len(),
            });
        }
        let rgba = RgbaImage::from_raw(width, height, data.to_vec()).ok_or(
            EngineError::PixelDataLength {
                expected,
                actual: data.len(),
            },
        )?;
        *image = DynamicImage::ImageRgba8(rgba);
        Ok(())
    }

    fn size(&self) -> Result<Dimensions, EngineError> {
        let image = self.current()?;
        Ok(Dimensions {
            width: image.width(),
            height: image.height(),
        })
    }
}
