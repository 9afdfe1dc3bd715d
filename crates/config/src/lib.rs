//! Shared configuration for Holoavatar
//!
//! This crate is the single source of truth for the rendering/effect quality
//! tiers used by both the native and the WASM builds:
//! - [`capabilities`] - classify the host device from ambient platform signals
//! - [`quality`] - the five quality presets and the tier recommendation
//! - [`store`] - persistence of the user's chosen tier

pub mod capabilities;
pub mod error;
pub mod quality;
pub mod store;

pub use capabilities::{
    Capabilities, HolographicHints, PlatformSignals, PowerPreference, RendererHints,
};
pub use error::ConfigError;
pub use quality::{HolographicQuality, QualityLevel, QualitySettings};
pub use store::{
    FilePreferenceStore, MemoryPreferenceStore, PreferenceStore, QUALITY_PREFERENCE_KEY,
    QualityStore,
};
