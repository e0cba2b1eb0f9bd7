use std::path::PathBuf;

use clap::{Parser, Subcommand};
use renderer::{Antialiasing, ColorSpaceMode};

use crate::paths::ENV_ASSETS_DIR;

#[derive(Parser, Debug)]
#[command(
    name = "fragtoy",
    author,
    version,
    about = "Fragment shader playground with ShaderToy-style uniforms",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Fragment shader to load at start-up (defaults to `default.fs` from the assets).
    #[arg(value_name = "SHADER")]
    pub shader: Option<PathBuf>,

    /// Directory searched first for `default.fs` and `startup.jpg`.
    #[arg(long, value_name = "DIR", env = ENV_ASSETS_DIR)]
    pub assets: Option<PathBuf>,

    /// Image bound to `iChannel0` (defaults to `startup.jpg` from the assets).
    #[arg(long, value_name = "PATH")]
    pub texture: Option<PathBuf>,

    /// Initial window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_surface_size)]
    pub size: Option<(u32, u32)>,

    /// Anti-aliasing policy: `auto`, `off`, or an explicit MSAA sample count (e.g. `4`).
    #[arg(long, value_name = "MODE", value_parser = parse_antialias)]
    pub antialias: Option<Antialiasing>,

    /// Output color space handling: `auto`, `gamma`, or `linear`.
    #[arg(long, value_name = "MODE", value_parser = parse_color_space)]
    pub color_space: Option<ColorSpaceMode>,

    /// Directory screenshots are written into.
    #[arg(long, value_name = "DIR")]
    pub screenshot_dir: Option<PathBuf>,

    /// Configuration file to use instead of `fragtoy.toml` in the config directory.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print resolved directories, the config file and the start-up assets.
    Where,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_antialias(value: &str) -> Result<Antialiasing, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("anti-alias mode must not be empty".to_string());
    }

    let normalized = trimmed.to_ascii_lowercase();
    match normalized.as_str() {
        "auto" | "max" | "default" => Ok(Antialiasing::Auto),
        "off" | "none" | "disable" | "disabled" => Ok(Antialiasing::Off),
        _ => {
            let samples: u32 = normalized.parse().map_err(|_| {
                format!("invalid anti-alias sample count '{trimmed}'; use auto/off or 2/4/8/16")
            })?;

            match samples {
                0 | 1 => Ok(Antialiasing::Off),
                2 | 4 | 8 | 16 => Ok(Antialiasing::Samples(samples)),
                _ => Err(format!(
                    "unsupported sample count {samples}; supported values are 2, 4, 8, or 16"
                )),
            }
        }
    }
}

pub fn parse_color_space(value: &str) -> Result<ColorSpaceMode, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("color space must not be empty".to_string());
    }

    let normalized = trimmed.to_ascii_lowercase();
    match normalized.as_str() {
        "auto" => Ok(ColorSpaceMode::Auto),
        "gamma" | "srgb-off" | "shadertoy" => Ok(ColorSpaceMode::Gamma),
        "linear" | "srgb" => Ok(ColorSpaceMode::Linear),
        other => Err(format!(
            "unknown color space '{other}'; expected auto, gamma, or linear"
        )),
    }
}

pub fn parse_surface_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT".to_string())?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid width '{}'", w.trim()))?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid height '{}'", h.trim()))?;
    if width == 0 || height == 0 {
        return Err("window dimensions must be positive".to_string());
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_antialias_modes() {
        assert_eq!(parse_antialias("auto").unwrap(), Antialiasing::Auto);
        assert_eq!(parse_antialias(" OFF ").unwrap(), Antialiasing::Off);
        assert_eq!(parse_antialias("1").unwrap(), Antialiasing::Off);
        assert_eq!(parse_antialias("4").unwrap(), Antialiasing::Samples(4));
        assert!(parse_antialias("3").is_err());
        assert!(parse_antialias("lots").is_err());
        assert!(parse_antialias("").is_err());
    }

    #[test]
    fn parses_color_spaces() {
        assert_eq!(parse_color_space("Linear").unwrap(), ColorSpaceMode::Linear);
        assert_eq!(parse_color_space("shadertoy").unwrap(), ColorSpaceMode::Gamma);
        assert!(parse_color_space("hdr").is_err());
    }

    #[test]
    fn parses_surface_sizes() {
        assert_eq!(parse_surface_size("1280x720").unwrap(), (1280, 720));
        assert_eq!(parse_surface_size(" 640 X 480 ").unwrap(), (640, 480));
        assert!(parse_surface_size("0x480").is_err());
        assert!(parse_surface_size("1280").is_err());
        assert!(parse_surface_size("widexhigh").is_err());
    }

    #[test]
    fn positional_shader_and_flags_parse() {
        let cli = Cli::try_parse_from([
            "fragtoy",
            "shaders/ripple.fs",
            "--size",
            "800x600",
            "--antialias",
            "off",
        ])
        .unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.run.shader, Some(PathBuf::from("shaders/ripple.fs")));
        assert_eq!(cli.run.size, Some((800, 600)));
        assert_eq!(cli.run.antialias, Some(Antialiasing::Off));
        assert_eq!(cli.run.color_space, None);
    }

    #[test]
    fn where_is_a_subcommand() {
        let cli = Cli::try_parse_from(["fragtoy", "where"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Where)));
        assert!(cli.run.shader.is_none());
    }
}
