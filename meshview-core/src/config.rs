//! Viewer configuration.
//!
//! The configuration is a JSON file where every field is optional. It is read
//! once at startup and never written back.

use std::path::{Path, PathBuf};

use glam::{UVec2, Vec4};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed config {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Startup parameters of the viewer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Initial window size in screen coordinates.
    pub viewport: [u32; 2],
    /// Clear color, linear RGB.
    pub background: [f32; 3],
    pub title: String,
    /// Vertex shader loaded instead of the embedded one.
    pub vertex_shader: Option<PathBuf>,
    /// Fragment shader loaded instead of the embedded one.
    pub fragment_shader: Option<PathBuf>,
    /// Block on input instead of polling every frame.
    pub wait_events: bool,
    /// Render the scene into an offscreen target and present it as a quad.
    pub offscreen: bool,
    /// Width of the widget side panel.
    pub widgets_width: f32,
    pub exposure: f32,
    pub gamma: f32,
    /// Light the scene from the camera instead of the scene lights.
    pub eyelight: bool,
    pub near: f32,
    pub far: f32,
    pub double_sided: bool,
    /// One of `error`, `warn`, `info`, `debug` or `trace`.
    pub log_level: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            viewport: [500, 500],
            background: [0.0, 0.0, 0.0],
            title: "mesh viewer".to_string(),
            vertex_shader: None,
            fragment_shader: None,
            wait_events: false,
            offscreen: true,
            widgets_width: 320.0,
            exposure: 0.0,
            gamma: 2.2,
            eyelight: true,
            near: 0.01,
            far: 10000.0,
            double_sided: true,
            log_level: "info".to_string(),
        }
    }
}

impl ViewerConfig {
    /// Reads the configuration at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Location of the per-user configuration file, if the platform has a
    /// config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("meshview").join("config.json"))
    }

    /// Reads the per-user configuration, falling back to defaults when the
    /// file does not exist.
    pub fn load_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) => Self::load_or_default(&path),
            None => Ok(Self::default()),
        }
    }

    /// Like [`ViewerConfig::load`], but a missing file yields defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            log::debug!("no config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn viewport_size(&self) -> UVec2 {
        UVec2::from(self.viewport).max(UVec2::ONE)
    }

    pub fn background_color(&self) -> Vec4 {
        let [r, g, b] = self.background;
        Vec4::new(r, g, b, 1.0)
    }

    /// Parsed `log_level`. Unknown names fall back to `Info`.
    pub fn level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}
