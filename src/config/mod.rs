//! # Configuration Module
//!
//! Settings for the enhancement pipeline and its remote providers, loaded
//! from TOML or built from defaults.

pub mod config;

pub use config::{DeepAiConfig, UpscaleConfig, Waifu2xConfig};
