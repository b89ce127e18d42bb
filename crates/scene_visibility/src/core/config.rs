//! # Scene Configuration
//!
//! Tunables for the visibility resolver, the area assignment pass and the
//! dynamic spatial map. Serializable so a level or application can ship
//! them in a `.toml` / `.ron` file next to its area data.

use serde::{Serialize, Deserialize};

use crate::config::{Config, ConfigError};

/// # Scene Configuration
///
/// Behaviour switches and numeric tolerances used by `Scene`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Re-filter accepted objects against a camera box clamped to the
    /// farthest accepted distance when that is tighter than the far plane
    pub far_plane_refinement: bool,
    /// Padding added to a node's extents before the AABB-overlap fallback
    /// of area assignment (used when its reference point is in no area)
    pub area_assignment_padding: f32,
    /// Fattening margin for leaves of the dynamic spatial map
    pub dynamic_map_margin: f32,
    /// Log filter used by applications that call `logging::init_with_level`
    pub log_level: String,
}

impl SceneConfig {
    /// Create a new scene configuration with defaults
    pub fn new() -> Self {
        Self {
            far_plane_refinement: true,
            area_assignment_padding: 0.01,
            dynamic_map_margin: 0.1,
            log_level: "info".to_string(),
        }
    }
    
    /// Enable or disable the far-plane refinement pass
    pub fn with_far_plane_refinement(mut self, enabled: bool) -> Self {
        self.far_plane_refinement = enabled;
        self
    }
    
    /// Set the area assignment padding
    pub fn with_area_assignment_padding(mut self, padding: f32) -> Self {
        self.area_assignment_padding = padding;
        self
    }
    
    /// Set the dynamic spatial map margin
    pub fn with_dynamic_map_margin(mut self, margin: f32) -> Self {
        self.dynamic_map_margin = margin;
        self
    }
    
    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }
    
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.area_assignment_padding >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "area_assignment_padding must be >= 0, got {}",
                self.area_assignment_padding
            )));
        }
        
        if !(self.dynamic_map_margin >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "dynamic_map_margin must be >= 0, got {}",
                self.dynamic_map_margin
            )));
        }
        
        Ok(())
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for SceneConfig {}
