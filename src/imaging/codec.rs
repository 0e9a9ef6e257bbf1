//! Decode and encode helpers shared by every engine.
//!
//! | Step | Crate / function |
//! |---|---|
//! | Format from hint | `image::ImageFormat::from_extension` |
//! | Decode | `image::ImageReader` with content sniffing over the hint |
//! | Header dimensions | `ImageReader::into_dimensions` (no pixel decode) |
//! | Encode → JPEG | `JpegEncoder::new_with_quality` |
//! | Encode → AVIF | `AvifEncoder` (rav1e, speed 6) |
//! | Encode → other | `DynamicImage::write_to` |

use super::backend::{Dimensions, EngineError};
use super::calculations::normalize_extension;
use super::params::Quality;
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;

/// Resolve an output format from an extension hint such as `".jpg"`.
pub fn output_format(extension: &str) -> Result<ImageFormat, EngineError> {
    ImageFormat::from_extension(normalize_extension(extension))
        .filter(|format| format.writing_enabled())
        .ok_or_else(|| EngineError::UnsupportedFormat(extension.to_string()))
}

fn reader<'a>(
    buffer: &'a [u8],
    extension: &str,
) -> Result<ImageReader<Cursor<&'a [u8]>>, EngineError> {
    let mut reader = ImageReader::new(Cursor::new(buffer));
    if let Some(format) = ImageFormat::from_extension(normalize_extension(extension)) {
        reader.set_format(format);
    }
    // Content sniffing wins over the hint when the magic bytes are recognized.
    let reader = reader.with_guessed_format()?;
    if reader.format().is_none() {
        return Err(EngineError::UnsupportedFormat(extension.to_string()));
    }
    Ok(reader)
}

/// Decode an encoded payload, using `extension` as a hint.
pub fn decode(buffer: &[u8], extension: &str) -> Result<DynamicImage, EngineError> {
    reader(buffer, extension)?
        .decode()
        .map_err(|source| EngineError::Decode {
            extension: extension.to_string(),
            source,
        })
}

/// Read dimensions from the payload header without decoding pixels.
pub fn header_dimensions(buffer: &[u8], extension: &str) -> Option<Dimensions> {
    let (width, height) = reader(buffer, extension).ok()?.into_dimensions().ok()?;
    Some(Dimensions { width, height })
}

/// Encode `image` as `format`. Quality applies to the lossy encoders only.
pub fn encode(
    image: &DynamicImage,
    format: ImageFormat,
    quality: Quality,
) -> Result<Vec<u8>, EngineError> {
    let mut out = Cursor::new(Vec::new());
    let result = match format {
        ImageFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut out, quality.as_u8());
            DynamicImage::ImageRgb8(image.to_rgb8()).write_with_encoder(encoder)
        }
        ImageFormat::Avif => {
            let encoder = AvifEncoder::new_with_speed_quality(&mut out, 6, quality.as_u8());
            image.write_with_encoder(encoder)
        }
        ImageFormat::WebP | ImageFormat::Gif => {
            DynamicImage::ImageRgba8(image.to_rgba8()).write_to(&mut out, format)
        }
        other => image.write_to(&mut out, other),
    };
    result.map_err(|source| EngineError::Encode {
        format: format!("{format:?}"),
        source,
    })?;
    Ok(out.into_inner())
}
