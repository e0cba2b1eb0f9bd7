use std::path::PathBuf;

/// Background colour drawn behind (or instead of) the shader.
pub const DEFAULT_CLEAR_COLOR: [f64; 3] = [0.2, 0.0, 0.0];

/// Key that saves a screenshot; every other key reloads the shader.
pub const DEFAULT_SCREENSHOT_KEY: char = 's';

/// Output color handling for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSpaceMode {
    /// Same as `Gamma`; ShaderToy shaders expect a gamma-encoded swapchain.
    #[default]
    Auto,
    /// Treat shader outputs/textures as gamma-encoded; use non-sRGB surfaces.
    Gamma,
    /// Treat shader outputs as linear and use sRGB swapchains/textures for conversion.
    Linear,
}

/// Anti-aliasing policy for the render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Antialiasing {
    /// Pick the highest sample count supported by the surface format.
    #[default]
    Auto,
    /// Disable MSAA and render directly into the swapchain.
    Off,
    /// Request a specific MSAA sample count (clamped to what the device supports).
    Samples(u32),
}

/// Immutable configuration passed to the renderer at start-up.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Initial inner size of the window in physical pixels.
    pub surface_size: (u32, u32),
    pub title: String,
    /// Fragment shader loaded before the first frame, if any.
    pub shader_source: Option<PathBuf>,
    /// Image bound to `iChannel0`; a placeholder is bound when absent.
    pub startup_texture: Option<PathBuf>,
    /// Directory screenshots are written into; created on first capture.
    pub screenshot_dir: PathBuf,
    pub screenshot_key: char,
    pub clear_color: [f64; 3],
    pub antialiasing: Antialiasing,
    pub color_space: ColorSpaceMode,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            surface_size: (1280, 720),
            title: "fragtoy".to_string(),
            shader_source: None,
            startup_texture: None,
            screenshot_dir: PathBuf::from("."),
            screenshot_key: DEFAULT_SCREENSHOT_KEY,
            clear_color: DEFAULT_CLEAR_COLOR,
            antialiasing: Antialiasing::default(),
            color_space: ColorSpaceMode::default(),
        }
    }
}
