use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use renderer::{Renderer, RendererConfig};
use tracing_subscriber::EnvFilter;

use crate::cli::RunArgs;
use crate::config::FileConfig;
use crate::paths::{AppPaths, AssetLocator};

pub const DEFAULT_SHADER_NAME: &str = "default.fs";
pub const STARTUP_TEXTURE_NAME: &str = "startup.jpg";

pub fn run(args: RunArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let file = load_file_config(&args, &paths)?;
    let locator = AssetLocator::new(paths.asset_roots(args.assets.as_deref()));
    tracing::debug!(
        config = %paths.config_dir().display(),
        data = %paths.data_dir().display(),
        roots = ?locator.roots(),
        "resolved fragtoy paths"
    );

    let config = resolve_config(&args, &file, &paths, &locator)?;
    match config.shader_source.as_deref() {
        Some(shader) => tracing::info!(shader = %shader.display(), "starting fragtoy"),
        None => tracing::warn!(
            roots = ?locator.roots(),
            "{DEFAULT_SHADER_NAME} not found in any asset directory"
        ),
    }

    Renderer::new(config).run()
}

pub fn print_where(args: RunArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let file = load_file_config(&args, &paths)?;
    let locator = AssetLocator::new(paths.asset_roots(args.assets.as_deref()));
    let config = resolve_config(&args, &file, &paths, &locator)?;
    let config_file = config_file_path(&args, &paths);

    println!("Config dir: {}", paths.config_dir().display());
    println!("Data dir: {}", paths.data_dir().display());
    println!(
        "Config file: {}{}",
        config_file.display(),
        if config_file.exists() { "" } else { " (not present)" }
    );
    println!("Screenshot dir: {}", config.screenshot_dir.display());
    println!("Asset roots:");
    for root in locator.roots() {
        println!("  {}", root.display());
    }
    println!("Shader: {}", describe(config.shader_source.as_deref()));
    println!("Texture: {}", describe(config.startup_texture.as_deref()));
    Ok(())
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn config_file_path(args: &RunArgs, paths: &AppPaths) -> PathBuf {
    args.config.clone().unwrap_or_else(|| paths.config_file())
}

fn load_file_config(args: &RunArgs, paths: &AppPaths) -> Result<FileConfig> {
    match args.config.as_deref() {
        Some(path) => FileConfig::load(path),
        None => FileConfig::load_or_default(&paths.config_file()),
    }
}

/// Merges CLI flags over the config file over built-in defaults.
pub fn resolve_config(
    args: &RunArgs,
    file: &FileConfig,
    paths: &AppPaths,
    locator: &AssetLocator,
) -> Result<RendererConfig> {
    let defaults = RendererConfig::default();

    let shader_source = match &args.shader {
        Some(path) => Some(path.clone()),
        None => lookup(file.default_shader.as_deref(), DEFAULT_SHADER_NAME, locator),
    };
    let startup_texture = match &args.texture {
        Some(path) => Some(path.clone()),
        None => lookup(file.startup_texture.as_deref(), STARTUP_TEXTURE_NAME, locator),
    };

    let surface_size = match args.size {
        Some(size) => size,
        None => file
            .surface_size()
            .context("invalid config file")?
            .unwrap_or(defaults.surface_size),
    };
    let antialiasing = match args.antialias {
        Some(mode) => mode,
        None => file
            .antialiasing()
            .context("invalid config file")?
            .unwrap_or(defaults.antialiasing),
    };
    let color_space = match args.color_space {
        Some(mode) => mode,
        None => file
            .color_space_mode()
            .context("invalid config file")?
            .unwrap_or(defaults.color_space),
    };
    let screenshot_dir = args
        .screenshot_dir
        .clone()
        .or_else(|| file.screenshot_dir.clone())
        .unwrap_or_else(|| paths.screenshot_dir());

    Ok(RendererConfig {
        surface_size,
        shader_source,
        startup_texture,
        screenshot_dir,
        screenshot_key: file.screenshot_key.unwrap_or(defaults.screenshot_key),
        clear_color: file.clear_color.unwrap_or(defaults.clear_color),
        antialiasing,
        color_space,
        ..defaults
    })
}

/// A configured path is used directly when it names a file, otherwise it is
/// looked up as an asset name. Without one the bundled `fallback` is used.
fn lookup(configured: Option<&Path>, fallback: &str, locator: &AssetLocator) -> Option<PathBuf> {
    match configured {
        Some(path) if path.is_file() => Some(path.to_path_buf()),
        Some(path) => {
            let found = path.to_str().and_then(|name| locator.find(name));
            if found.is_none() {
                tracing::warn!(path = %path.display(), "configured asset not found");
            }
            found
        }
        None => locator.find(fallback),
    }
}

fn describe(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "(none)".to_string())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use clap::Parser;
    use renderer::{Antialiasing, ColorSpaceMode, DEFAULT_CLEAR_COLOR};
    use tempfile::TempDir;

    use super::*;
    use crate::cli::Cli;

    fn args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["fragtoy"];
        argv.extend_from_slice(extra);
        Cli::try_parse_from(argv).unwrap().run
    }

    fn fixture() -> (TempDir, AppPaths, AssetLocator) {
        let root = TempDir::new().unwrap();
        let assets = root.path().join("assets");
        fs::create_dir_all(&assets).unwrap();
        fs::write(assets.join(DEFAULT_SHADER_NAME), "void main() {}").unwrap();
        fs::write(assets.join("ripple.fs"), "void main() {}").unwrap();
        let paths = AppPaths::from_raw(root.path().join("config"), root.path().join("data"));
        let locator = AssetLocator::new(vec![assets]);
        (root, paths, locator)
    }

    #[test]
    fn defaults_come_from_assets_and_data_dir() {
        let (root, paths, locator) = fixture();

        let config = resolve_config(&args(&[]), &FileConfig::default(), &paths, &locator).unwrap();

        assert_eq!(
            config.shader_source,
            Some(root.path().join("assets").join(DEFAULT_SHADER_NAME))
        );
        assert_eq!(config.startup_texture, None);
        assert_eq!(config.screenshot_dir, root.path().join("data/screenshots"));
        assert_eq!(config.surface_size, (1280, 720));
        assert_eq!(config.clear_color, DEFAULT_CLEAR_COLOR);
        assert_eq!(config.screenshot_key, 's');
    }

    #[test]
    fn file_values_apply_and_cli_flags_win() {
        let (root, paths, locator) = fixture();
        let file = FileConfig {
            window_size: Some("640x480".into()),
            screenshot_key: Some('p'),
            antialias: Some("off".into()),
            color_space: Some("linear".into()),
            default_shader: Some(PathBuf::from("ripple.fs")),
            ..FileConfig::default()
        };

        let from_file = resolve_config(&args(&[]), &file, &paths, &locator).unwrap();
        assert_eq!(from_file.surface_size, (640, 480));
        assert_eq!(from_file.screenshot_key, 'p');
        assert_eq!(from_file.antialiasing, Antialiasing::Off);
        assert_eq!(from_file.color_space, ColorSpaceMode::Linear);
        assert_eq!(
            from_file.shader_source,
            Some(root.path().join("assets/ripple.fs"))
        );

        let overridden = resolve_config(
            &args(&["mine.fs", "--size", "320x200", "--antialias", "8", "--screenshot-dir", "shots"]),
            &file,
            &paths,
            &locator,
        )
        .unwrap();
        assert_eq!(overridden.surface_size, (320, 200));
        assert_eq!(overridden.antialiasing, Antialiasing::Samples(8));
        assert_eq!(overridden.shader_source, Some(PathBuf::from("mine.fs")));
        assert_eq!(overridden.screenshot_dir, PathBuf::from("shots"));
    }

    #[test]
    fn invalid_file_values_fail_resolution() {
        let (_root, paths, locator) = fixture();
        let file = FileConfig {
            color_space: Some("hdr".into()),
            ..FileConfig::default()
        };

        let err = resolve_config(&args(&[]), &file, &paths, &locator).unwrap_err();
        assert!(format!("{err:#}").contains("color_space"));
    }

    #[test]
    fn unknown_configured_shader_resolves_to_none() {
        let (_root, paths, locator) = fixture();
        let file = FileConfig {
            default_shader: Some(PathBuf::from("missing.fs")),
            ..FileConfig::default()
        };

        let config = resolve_config(&args(&[]), &file, &paths, &locator).unwrap();
        assert_eq!(config.shader_source, None);
    }
}
