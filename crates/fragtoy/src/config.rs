use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use renderer::{Antialiasing, ColorSpaceMode};
use serde::Deserialize;

use crate::cli::{parse_antialias, parse_color_space, parse_surface_size};

/// Optional settings read from `fragtoy.toml`. Every field may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// `WIDTHxHEIGHT`, e.g. `"1280x720"`.
    pub window_size: Option<String>,
    pub screenshot_key: Option<char>,
    pub clear_color: Option<[f64; 3]>,
    pub screenshot_dir: Option<PathBuf>,
    pub antialias: Option<String>,
    pub color_space: Option<String>,
    pub default_shader: Option<PathBuf>,
    pub startup_texture: Option<PathBuf>,
}

impl FileConfig {
    /// Reads a config file that must exist.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file at {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file at {}", path.display()))
    }

    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn surface_size(&self) -> Result<Option<(u32, u32)>> {
        self.window_size
            .as_deref()
            .map(|value| parse_surface_size(value).map_err(|err| anyhow!("window_size: {err}")))
            .transpose()
    }

    pub fn antialiasing(&self) -> Result<Option<Antialiasing>> {
        self.antialias
            .as_deref()
            .map(|value| parse_antialias(value).map_err(|err| anyhow!("antialias: {err}")))
            .transpose()
    }

    pub fn color_space_mode(&self) -> Result<Option<ColorSpaceMode>> {
        self.color_space
            .as_deref()
            .map(|value| parse_color_space(value).map_err(|err| anyhow!("color_space: {err}")))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = FileConfig::load_or_default(&dir.path().join("fragtoy.toml")).unwrap();
        assert_eq!(config, FileConfig::default());
        assert_eq!(config.surface_size().unwrap(), None);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = FileConfig::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read config file"));
    }

    #[test]
    fn parses_every_field() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fragtoy.toml");
        fs::write(
            &path,
            r#"
window_size = "800x600"
screenshot_key = "p"
clear_color = [0.0, 0.1, 0.2]
screenshot_dir = "/tmp/shots"
antialias = "4"
color_space = "linear"
default_shader = "ripple.fs"
startup_texture = "noise.png"
"#,
        )
        .unwrap();

        let config = FileConfig::load(&path).unwrap();

        assert_eq!(config.surface_size().unwrap(), Some((800, 600)));
        assert_eq!(config.screenshot_key, Some('p'));
        assert_eq!(config.clear_color, Some([0.0, 0.1, 0.2]));
        assert_eq!(config.screenshot_dir, Some(PathBuf::from("/tmp/shots")));
        assert_eq!(config.antialiasing().unwrap(), Some(Antialiasing::Samples(4)));
        assert_eq!(config.color_space_mode().unwrap(), Some(ColorSpaceMode::Linear));
        assert_eq!(config.default_shader, Some(PathBuf::from("ripple.fs")));
        assert_eq!(config.startup_texture, Some(PathBuf::from("noise.png")));
    }

    #[test]
    fn rejects_bad_values_and_unknown_keys() {
        let config: FileConfig = toml::from_str(r#"window_size = "huge""#).unwrap();
        assert!(config.surface_size().is_err());

        let config: FileConfig = toml::from_str(r#"antialias = "3""#).unwrap();
        assert!(config.antialiasing().is_err());

        assert!(toml::from_str::<FileConfig>("fullscreen = true").is_err());
    }
}
