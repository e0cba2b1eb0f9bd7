//! Shader (re)load and uniform-binding lifecycle.
//!
//! `ShaderSession` owns the single live shader program, the path it was loaded
//! from, and the values fed into the ShaderToy uniforms:
//!
//! ```text
//!   load(path) ──▶ read source ──▶ backend.compile(vertex, fragment)
//!                                        │ ok            │ err
//!                                        ▼               ▼
//!                        release old, install new    state untouched,
//!                        push iResolution            ShaderError returned
//! ```
//!
//! Compilation and uniform upload go through [`ShaderBackend`], which keeps the
//! lifecycle independent of the graphics API and lets tests count programs.

use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

/// Texture unit that `iChannel0` samples from.
pub const CHANNEL0_UNIT: u32 = 0;

/// Failures surfaced by [`ShaderSession`].
#[derive(Debug, Error)]
pub enum ShaderError {
    /// The source was read but the compiler rejected it.
    #[error("failed to compile shader {}: {diagnostic}", .path.display())]
    Compile { path: PathBuf, diagnostic: String },
    /// The source could not be read (missing, unreadable, not UTF-8).
    #[error("failed to load shader {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A reload was requested before any shader loaded successfully.
    #[error("no shader has been loaded yet")]
    NotLoaded,
    /// A frame was ticked while no program is installed.
    #[error("no shader program is installed")]
    NotReady,
}

/// Values pushed into a program, named after the ShaderToy convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Uniform {
    GlobalTime(f32),
    Mouse([f32; 4]),
    Resolution([f32; 3]),
    /// Texture unit bound to `iChannel0`.
    Channel(u32),
}

impl Uniform {
    pub fn name(&self) -> &'static str {
        match self {
            Uniform::GlobalTime(_) => "iGlobalTime",
            Uniform::Mouse(_) => "iMouse",
            Uniform::Resolution(_) => "iResolution",
            Uniform::Channel(_) => "iChannel0",
        }
    }
}

/// Last pointer position (`xy`) and last press position (`zw`).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MouseState {
    pub move_x: f32,
    pub move_y: f32,
    pub down_x: f32,
    pub down_y: f32,
}

impl MouseState {
    pub fn as_uniform(&self) -> [f32; 4] {
        [self.move_x, self.move_y, self.down_x, self.down_y]
    }
}

/// Whether a program is currently installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Loaded,
}

/// Compiles shader pairs and feeds uniforms into the resulting programs.
pub trait ShaderBackend {
    /// Opaque handle to a compiled vertex + fragment program.
    type Program;

    /// Compiles the pair, returning the compiler diagnostic on failure.
    fn compile(
        &mut self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Self::Program, String>;

    /// Releases a program that is no longer installed.
    fn release(&mut self, program: Self::Program) {
        drop(program);
    }

    fn set_uniform(&mut self, program: &mut Self::Program, uniform: Uniform);
}

pub struct ShaderSession<B: ShaderBackend> {
    backend: B,
    vertex_source: Cow<'static, str>,
    program: Option<B::Program>,
    current_path: Option<PathBuf>,
    mouse: MouseState,
    resolution: (u32, u32),
    elapsed: f32,
}

impl<B: ShaderBackend> ShaderSession<B> {
    /// Creates an uninitialised session; `vertex_source` is paired with every
    /// fragment shader loaded afterwards.
    pub fn new(
        backend: B,
        vertex_source: impl Into<Cow<'static, str>>,
        resolution: (u32, u32),
    ) -> Self {
        Self {
            backend,
            vertex_source: vertex_source.into(),
            program: None,
            current_path: None,
            mouse: MouseState::default(),
            resolution,
            elapsed: 0.0,
        }
    }

    /// Compiles the fragment shader at `path` and installs it on success.
    ///
    /// The previous program stays installed until the new one compiles, so a
    /// failed load leaves the session exactly as it was.
    pub fn load(&mut self, path: &Path) -> Result<(), ShaderError> {
        let source = fs::read_to_string(path).map_err(|source| ShaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let program = self
            .backend
            .compile(&self.vertex_source, &source)
            .map_err(|diagnostic| ShaderError::Compile {
                path: path.to_path_buf(),
                diagnostic,
            })?;

        if let Some(previous) = self.program.replace(program) {
            self.backend.release(previous);
        }
        self.current_path = Some(path.to_path_buf());

        let resolution = self.resolution_uniform();
        if let Some(program) = self.program.as_mut() {
            self.backend.set_uniform(program, resolution);
        }
        info!(path = %path.display(), "loaded fragment shader");
        Ok(())
    }

    /// Pushes time, mouse and channel uniforms for the next frame.
    pub fn tick(&mut self, elapsed_seconds: f32) -> Result<(), ShaderError> {
        self.elapsed = elapsed_seconds;
        let Some(program) = self.program.as_mut() else {
            return Err(ShaderError::NotReady);
        };
        self.backend
            .set_uniform(program, Uniform::GlobalTime(elapsed_seconds));
        self.backend
            .set_uniform(program, Uniform::Mouse(self.mouse.as_uniform()));
        self.backend
            .set_uniform(program, Uniform::Channel(CHANNEL0_UNIT));
        Ok(())
    }

    /// Records the new surface size and pushes it if a program is installed.
    pub fn on_resize(&mut self, width: u32, height: u32) {
        self.resolution = (width, height);
        let resolution = self.resolution_uniform();
        match self.program.as_mut() {
            Some(program) => self.backend.set_uniform(program, resolution),
            None => debug!(width, height, "resolution recorded until a shader loads"),
        }
    }

    pub fn on_pointer_move(&mut self, x: f32, y: f32) {
        self.mouse.move_x = x;
        self.mouse.move_y = y;
    }

    pub fn on_pointer_down(&mut self, x: f32, y: f32) {
        self.mouse.down_x = x;
        self.mouse.down_y = y;
    }

    /// Reloads the last successfully loaded shader from disk.
    pub fn on_reload_requested(&mut self) -> Result<(), ShaderError> {
        let path = self.current_path.clone().ok_or(ShaderError::NotLoaded)?;
        self.load(&path)
    }

    pub fn state(&self) -> SessionState {
        if self.program.is_some() {
            SessionState::Loaded
        } else {
            SessionState::Uninitialized
        }
    }

    pub fn program(&self) -> Option<&B::Program> {
        self.program.as_ref()
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    pub fn mouse(&self) -> MouseState {
        self.mouse
    }

    pub fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn resolution_uniform(&self) -> Uniform {
        Uniform::Resolution([self.resolution.0 as f32, self.resolution.1 as f32, 0.0])
    }
}

impl<B: ShaderBackend> Drop for ShaderSession<B> {
    fn drop(&mut self) {
        if let Some(program) = self.program.take() {
            self.backend.release(program);
        }
    }
}
