//! Configuration types for the physics runtime

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Errors that can occur while loading settings from disk
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Project-wide physics settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicsSettings {
    /// Downward gravitational acceleration in m/s²
    pub gravity: f32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self { gravity: 9.8 }
    }
}

impl PhysicsSettings {
    /// Create settings with a custom gravity scalar
    pub fn with_gravity(gravity: f32) -> Self {
        Self { gravity }
    }

    /// Load settings from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&content)?;
        debug!(path = ?path, gravity = settings.gravity, "Loaded physics settings");
        Ok(settings)
    }

    /// Save settings to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SettingsError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }
}
