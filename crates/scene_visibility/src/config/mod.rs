//! File-backed settings
//!
//! Scene settings and area partitions are both plain serde types; this
//! module gives them a shared TOML/RON loader keyed on the file extension.

pub use serde::{Serialize, Deserialize};

/// On-disk formats, picked from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Ron,
}

impl Format {
    fn from_path(path: &str) -> Result<Self, ConfigError> {
        if path.ends_with(".toml") {
            Ok(Format::Toml)
        } else if path.ends_with(".ron") {
            Ok(Format::Ron)
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }
}

/// Serde-backed settings that can be read from and written to disk
///
/// Implemented by `SceneConfig` and `AreasData`.
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Read and parse `path`
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::load_from_str(path, &contents)
    }

    /// Parse `contents` in the format named by `path`
    fn load_from_str(path: &str, contents: &str) -> Result<Self, ConfigError> {
        let parsed = match Format::from_path(path)? {
            Format::Toml => toml::from_str(contents).map_err(|e| e.to_string()),
            Format::Ron => ron::from_str(contents).map_err(|e| e.to_string()),
        };
        parsed.map_err(ConfigError::Parse)
    }

    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let text = match Format::from_path(path)? {
            Format::Toml => toml::to_string_pretty(self).map_err(|e| e.to_string()),
            Format::Ron => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| e.to_string()),
        };
        std::fs::write(path, text.map_err(ConfigError::Serialize)?)?;
        Ok(())
    }
}

/// Errors from reading, writing or validating settings files
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Extension other than `.toml` or `.ron`
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Loaded values failed validation
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
