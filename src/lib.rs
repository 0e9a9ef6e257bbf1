//! # engine-proxy
//!
//! A routing layer in front of interchangeable image-processing engines.
//! For each request it decides once which engine handles the payload, then
//! forwards every decode, transform and encode call to that engine while
//! timing the whole cycle.
//!
//! # Request Cycle
//!
//! ```text
//! load(buffer, ext)   select first accepting engine  →  "Engine" header
//!                     forward load
//! crop/resize/...     forward to the selected engine
//! read(ext, quality)  forward read                    →  "ProcessingTime" header
//!                                                     →  engine.process_time.<id>
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | [`Engine`](imaging::Engine) capability trait and the built-in `gif`, `large`, `raster` engines |
//! | [`selection`] | First-match-wins selection over ordered candidates |
//! | [`proxy`] | [`ProxyEngine`](proxy::ProxyEngine): memoized selection plus forwarding |
//! | [`instrument`] | Clock abstraction and processing-time reporting |
//! | [`context`] | Request context: config, response headers, metrics sinks |
//! | [`registry`] | Startup-time map from engine identifier to constructor |
//! | [`config`] | TOML config loading, merging over stock defaults, validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Explicit Capability Trait
//!
//! The proxy forwards through the fully enumerated [`Engine`](imaging::Engine)
//! trait, one delegation per operation. Every engine is checked against the
//! same surface at compile time, and the proxy is itself an `Engine`, so
//! callers never know whether they hold one engine or the proxy.
//!
//! ## Optional Applicability Test
//!
//! An engine either exposes an [`ApplicabilityTest`](imaging::ApplicabilityTest)
//! or it does not. Engines without one match unconditionally and act as the
//! fallback, which is why the `raster` engine is listed last by default.
//!
//! ## Fail Fast, Never Default
//!
//! No match is an error naming every candidate tried. Calling anything but
//! `load` before a selection exists is an error too. Engine errors reach the
//! caller unchanged; the proxy never retries or substitutes another engine.
//!
//! ## Single Owner Per Cycle
//!
//! A [`ProxyEngine`](proxy::ProxyEngine) belongs to one in-flight request.
//! It holds no locks; sequential requests may reuse it because every `load`
//! resets both the selection and the selected engine's image state.

pub mod config;
pub mod context;
pub mod imaging;
pub mod instrument;
pub mod output;
pub mod proxy;
pub mod registry;
pub mod selection;

#[cfg(test)]
pub(crate) mod test_helpers;
