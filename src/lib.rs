//! Themescope - Theme Preview Sampling & Caching Engine
//!
//! Core library providing deterministic card sampling for deck-building
//! themes, an adaptive in-memory preview cache, and a background refresher
//! that keeps hot entries warm.

pub mod config;
pub mod core;

#[cfg(test)]
mod tests;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
