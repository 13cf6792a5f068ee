//! Game settings and preferences
//!
//! Persisted as JSON in the working directory, separately from high
//! scores.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Which capture backend feeds the sensing thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CameraBackend {
    /// Procedural frames; no device needed.
    #[default]
    Synthetic,
    /// No sensing at all; the game runs as a plain runner.
    Disabled,
}

impl CameraBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            CameraBackend::Synthetic => "synthetic",
            CameraBackend::Disabled => "disabled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "synthetic" | "synth" => Some(CameraBackend::Synthetic),
            "disabled" | "none" | "off" => Some(CameraBackend::Disabled),
            _ => None,
        }
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Capture backend selection
    pub camera: CameraBackend,

    // === HUD ===
    /// Show the mirror preview panel
    pub show_preview: bool,
    /// Show tick/FPS counters in the window title
    pub show_fps: bool,

    // === Accessibility ===
    /// Minimize banner flashing
    pub reduced_motion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            camera: CameraBackend::Synthetic,
            show_preview: true,
            show_fps: true,
            reduced_motion: false,
        }
    }
}

impl Settings {
    /// Storage file name
    const STORAGE_FILE: &'static str = "mood_dash_settings.json";

    /// Load settings from disk, falling back to defaults on any failure.
    pub fn load() -> Self {
        Self::load_from(Path::new(Self::STORAGE_FILE))
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    settings
                }
                Err(err) => {
                    log::warn!("Settings file unreadable ({err}); using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("Using default settings");
                Self::default()
            }
        }
    }

    /// Save settings to disk; failures are logged, never fatal.
    pub fn save(&self) {
        self.save_to(Path::new(Self::STORAGE_FILE));
    }

    pub fn save_to(&self, path: &Path) {
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(err) = std::fs::write(path, json) {
                    log::warn!("Could not save settings: {err}");
                } else {
                    log::info!("Settings saved");
                }
            }
            Err(err) => log::warn!("Could not serialize settings: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_json() {
        let path = std::env::temp_dir().join(format!(
            "mood_dash_settings_test_{}.json",
            std::process::id()
        ));
        let mut settings = Settings::default();
        settings.camera = CameraBackend::Disabled;
        settings.show_preview = false;
        settings.save_to(&path);

        let loaded = Settings::load_from(&path);
        assert_eq!(loaded.camera, CameraBackend::Disabled);
        assert!(!loaded.show_preview);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let loaded = Settings::load_from(Path::new("definitely_missing_settings.json"));
        assert_eq!(loaded.camera, CameraBackend::Synthetic);
        assert!(loaded.show_preview);
    }

    #[test]
    fn backend_names_parse_back() {
        for backend in [CameraBackend::Synthetic, CameraBackend::Disabled] {
            assert_eq!(CameraBackend::from_str(backend.as_str()), Some(backend));
        }
        assert_eq!(CameraBackend::from_str("none"), Some(CameraBackend::Disabled));
        assert_eq!(CameraBackend::from_str("webcam"), None);
    }
}
