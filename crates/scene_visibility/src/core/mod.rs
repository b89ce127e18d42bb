//! # Core Module
//!
//! Shared configuration for the scene visibility subsystems.
//!
//! ## Organization
//!
//! - **Config**: `SceneConfig`, the tunables read by `Scene`
//! - **Foundation**: Low-level utilities (math, logging), re-exported

pub mod config;

// Re-export foundation modules for convenience
pub use crate::foundation;

pub use config::SceneConfig;
pub use crate::config::{Config, ConfigError};
