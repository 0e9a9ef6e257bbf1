//! Image-processing engines and the capability interface they share.
//!
//! | Engine | Claims | Notes |
//! |---|---|---|
//! | [`GifEngine`] (`gif`) | `.gif` hints | keeps every animation frame |
//! | [`LargeImageEngine`] (`large`) | header pixel count ≥ `large.min_pixels` | fast resampling |
//! | [`RasterEngine`] (`raster`) | everything (no test) | Lanczos3, the fallback |
//!
//! The module is split into:
//! - **Backend**: [`Engine`] + [`ApplicabilityTest`] traits, [`EngineError`]
//! - **Calculations**: Pure functions for extension and region math (unit testable)
//! - **Parameters**: [`Quality`] and [`Resampling`]
//! - **Codec**: decode/encode helpers over the `image` crate
//! - **Engines**: one file per engine

pub mod backend;
mod calculations;
pub mod codec;
pub mod gif;
pub mod large;
mod params;
pub mod raster;

pub use backend::{ApplicabilityTest, Dimensions, Engine, EngineError};
pub use calculations::normalize_extension;
pub use gif::GifEngine;
pub use large::LargeImageEngine;
pub use params::{Quality, Resampling};
pub use raster::RasterEngine;
