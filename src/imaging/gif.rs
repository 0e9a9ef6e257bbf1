//! Animated GIF engine.
//!
//! The raster engine would flatten an animation to its first frame. This
//! engine keeps every frame: crop and resize apply to each one and reading
//! back as GIF re-encodes the full animation, looping forever. Reading to any
//! other format encodes the first frame, and pixel access targets the first
//! frame as well.

use super::backend::{ApplicabilityTest, Dimensions, Engine, EngineError};
use super::calculations::{crop_region, normalize_extension, rgba_len};
use super::codec;
use super::params::Quality;
use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::imageops::{self, FilterType};
use image::{AnimationDecoder, DynamicImage, Frame, ImageError, ImageFormat, RgbaImage};
use std::io::Cursor;

pub struct GifEngine {
    frames: Vec<Frame>,
    extension: String,
    quality: Quality,
}

impl GifEngine {
    pub fn new(quality: Quality) -> Self {
        Self {
            frames: Vec::new(),
            extension: String::new(),
            quality,
        }
    }

    fn first(&self) -> Result<&Frame, EngineError> {
        self.frames.first().ok_or(EngineError::NotLoaded)
    }

    fn map_frames(&mut self, f: impl Fn(&RgbaImage) -> RgbaImage) -> Result<(), EngineError> {
        if self.frames.is_empty() {
            return Err(EngineError::NotLoaded);
        }
        for frame in &mut self.frames {
            *frame = Frame::from_parts(f(frame.buffer()), 0, 0, frame.delay());
        }
        Ok(())
    }

    fn encode_animation(&self) -> Result<Vec<u8>, EngineError> {
        let mut out = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut out);
            encoder.set_repeat(Repeat::Infinite).map_err(encode_error)?;
            encoder
                .encode_frames(self.frames.iter().cloned())
                .map_err(encode_error)?;
        }
        Ok(out)
    }
}

impl Default for GifEngine {
    fn default() -> Self {
        Self::new(Quality::default())
    }
}

fn encode_error(source: ImageError) -> EngineError {
    EngineError::Encode {
        format: "Gif".into(),
        source,
    }
}

fn decode_frames(buffer: &[u8], extension: &str) -> Result<Vec<Frame>, EngineError> {
    let decode_error = |source| EngineError::Decode {
        extension: extension.to_string(),
        source,
    };
    let decoder = GifDecoder::new(Cursor::new(buffer)).map_err(decode_error)?;
    let frames = decoder.into_frames().collect_frames().map_err(decode_error)?;
    if frames.is_empty() {
        return Err(EngineError::UnsupportedFormat(format!(
            "{extension} without frames"
        )));
    }
    Ok(frames)
}

impl ApplicabilityTest for GifEngine {
    fn should_run(&self, extension: &str, _buffer: &[u8]) -> bool {
        normalize_extension(extension) == "gif"
    }
}

impl Engine for GifEngine {
    fn applicability(&self) -> Option<&dyn ApplicabilityTest> {
        Some(self)
    }

    fn load(&mut self, buffer: &[u8], extension: &str) -> Result<(), EngineError> {
        self.frames.clear();
        self.extension = extension.to_string();
        self.frames = decode_frames(buffer, extension)?;
        Ok(())
    }

    fn read(
        &mut self,
        extension: Option<&str>,
        quality: Option<Quality>,
    ) -> Result<Vec<u8>, EngineError> {
        let first = self.first()?;
        let format = codec::output_format(extension.unwrap_or(&self.extension))?;
        if format == ImageFormat::Gif {
            return self.encode_animation();
        }
        let still = DynamicImage::ImageRgba8(first.buffer().clone());
        codec::encode(&still, format, quality.unwrap_or(self.quality))
    }

    fn create_image(&self, buffer: &[u8]) -> Result<DynamicImage, EngineError> {
        codec::decode(buffer, ".gif")
    }

    fn crop(
        &mut self,
        left: u32,
        top: u32,
        right: u32,
        bottom: u32,
    ) -> Result<(), EngineError> {
        let (width, height) = self.first()?.buffer().dimensions();
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
        self.map_frames(|buffer| imageops::crop_imm(buffer, x, y, w, h).to_image())
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), EngineError> {
        if width == 0 || height == 0 {
            return Err(EngineError::InvalidSize { width, height });
        }
        self.map_frames(|buffer| imageops::resize(buffer, width, height, FilterType::Lanczos3))
    }

    fn image_data(&mut self, _update_image: bool) -> Result<Vec<u8>, EngineError> {
        // Frames are already RGBA8, so there is nothing to normalize.
        Ok(self.first()?.buffer().as_raw().clone())
    }

    fn set_image_data(&mut self, data: &[u8]) -> Result<(), EngineError> {
        let first = self.first()?;
        let (width, height) = first.buffer().dimensions();
        let delay = first.delay();
        let expected = rgba_len((width, height));
        if data.len() != expected {
            return Err(EngineError::PixelDataLength {
                expected,
                actual: data.len(),
            });
        }
        let buffer = RgbaImage::from_raw(width, height, data.to_vec()).ok_or(
            EngineError::PixelDataLength {
                expected,
                actual: data.len(),
            },
        )?;
        self.frames[0] = Frame::from_parts(buffer, 0, 0, delay);
        Ok(())
    }

    fn size(&self) -> Result<Dimensions, EngineError> {
        let (width, height) = self.first()?.buffer().dimensions();
        Ok(Dimensions { width, height })
    }
}
