use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewerConfig {
    pub default_zoom: f32,
    pub zoom_step: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub thumbnail_scale: f32,
    pub render_cache_capacity: usize,
    pub ocr_scale: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            default_zoom: 1.0,
            zoom_step: 0.1,
            min_zoom: 0.1,
            max_zoom: 8.0,
            thumbnail_scale: 0.2,
            render_cache_capacity: 10,
            ocr_scale: 1.0,
        }
    }
}

pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("net", "docview", "docview")
}

impl ViewerConfig {
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Reads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {:?}", path))?;
        let config: ViewerConfig = toml::from_str(&raw)
            .with_context(|| format!("failed to decode config file {:?}", path))?;
        config
            .validate()
            .with_context(|| format!("invalid config file {:?}", path))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("default_zoom", self.default_zoom),
            ("zoom_step", self.zoom_step),
            ("min_zoom", self.min_zoom),
            ("max_zoom", self.max_zoom),
            ("thumbnail_scale", self.thumbnail_scale),
            ("ocr_scale", self.ocr_scale),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                bail!("{name} must be a positive number, got {value}");
            }
        }
        if self.min_zoom > self.max_zoom {
            bail!(
                "min_zoom ({}) is larger than max_zoom ({})",
                self.min_zoom,
                self.max_zoom
            );
        }
        Ok(())
    }

    pub fn clamp_zoom(&self, factor: f32) -> f32 {
        if !factor.is_finite() || factor <= 0.0 {
            return self.min_zoom;
        }
        factor.clamp(self.min_zoom, self.max_zoom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = ViewerConfig::load(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, ViewerConfig::default());
    }

    #[test]
    fn partial_file_overrides_only_given_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "default_zoom = 1.5\nthumbnail_scale = 0.25\n").unwrap();
        let config = ViewerConfig::load(&path).unwrap();
        assert_eq!(config.default_zoom, 1.5);
        assert_eq!(config.thumbnail_scale, 0.25);
        assert_eq!(config.max_zoom, 8.0);
    }

    #[test]
    fn unknown_and_invalid_values_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "zoom = 2.0\n").unwrap();
        assert!(ViewerConfig::load(&path).is_err());

        fs::write(&path, "min_zoom = 4.0\nmax_zoom = 2.0\n").unwrap();
        let err = ViewerConfig::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("min_zoom"));
    }

    #[test]
    fn clamp_zoom_floors_degenerate_values() {
        let config = ViewerConfig::default();
        assert_eq!(config.clamp_zoom(0.0), 0.1);
        assert_eq!(config.clamp_zoom(-3.0), 0.1);
        assert_eq!(config.clamp_zoom(f32::NAN), 0.1);
        assert_eq!(config.clamp_zoom(20.0), 8.0);
        assert_eq!(config.clamp_zoom(1.3), 1.3);
    }
}
