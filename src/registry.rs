//! Startup-time engine registry.
//!
//! Maps engine identifiers to constructors. The registry is populated once
//! at process start; [`EngineRegistry::instantiate`] then builds the
//! configured engines eagerly, in configured order, for one proxy.

use crate::config::ProxyConfig;
use crate::imaging::{Engine, GifEngine, LargeImageEngine, RasterEngine};
use crate::selection::Candidate;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("unknown engine '{id}', available: {available:?}")]
    UnknownEngine { id: String, available: Vec<String> },
}

/// Builds one engine instance from the proxy config.
pub type EngineFactory = fn(&ProxyConfig) -> Box<dyn Engine>;

#[derive(Default)]
pub struct EngineRegistry {
    factories: BTreeMap<String, EngineFactory>,
}

impl EngineRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in engines: `gif`, `large`, `raster`.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("gif", gif_engine);
        registry.register("large", large_engine);
        registry.register("raster", raster_engine);
        registry
    }

    /// Register `factory` under `id`, replacing any earlier registration.
    pub fn register(&mut self, id: &str, factory: EngineFactory) {
        self.factories.insert(id.to_string(), factory);
    }

    /// Registered identifiers, sorted.
    pub fn ids(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Build every engine named in `config.engines`, preserving order.
    pub fn instantiate(&self, config: &ProxyConfig) -> Result<Vec<Candidate>, RegistryError> {
        config
            .engines
            .iter()
            .map(|id| -> Result<Candidate, RegistryError> {
                let factory = self
                    .factories
                    .get(id)
                    .ok_or_else(|| RegistryError::UnknownEngine {
                        id: id.clone(),
                        available: self.ids(),
                    })?;
                Ok(Candidate::new(id.clone(), factory(config)))
            })
            .collect()
    }
}

fn gif_engine(config: &ProxyConfig) -> Box<dyn Engine> {
    Box::new(GifEngine::new(config.quality()))
}

fn large_engine(config: &ProxyConfig) -> Box<dyn Engine> {
    Box::new(LargeImageEngine::new(
        config.large.min_pixels,
        config.quality(),
    ))
}

fn raster_engine(config: &ProxyConfig) -> Box<dyn Engine> {
    Box::new(RasterEngine::new(config.quality()))
}
