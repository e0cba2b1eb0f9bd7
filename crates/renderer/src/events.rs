//! Explicit dispatch table between window events and the shader session.
//!
//! Handlers are registered once at start-up, keyed by [`EventKind`]. The window
//! layer converts platform events into [`AppEvent`]s (pointer coordinates
//! already flipped to a bottom-left origin) and calls
//! [`EventBindings::dispatch`].

use std::path::PathBuf;

use tracing::{debug, error, info, warn};

use crate::session::{ShaderBackend, ShaderError, ShaderSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    FileDrop,
    PointerMove,
    PointerDown,
    KeyDown,
    Resize,
}

/// Key identity as far as the dispatch table cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPress {
    Character(char),
    /// Any key without a printable character (arrows, modifiers, function keys).
    Other,
}

impl KeyPress {
    pub fn matches(&self, key: char) -> bool {
        matches!(self, KeyPress::Character(c) if c.eq_ignore_ascii_case(&key))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    FileDropped(PathBuf),
    PointerMoved { x: f32, y: f32 },
    PointerPressed { x: f32, y: f32 },
    KeyPressed(KeyPress),
    Resized { width: u32, height: u32 },
}

impl AppEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            AppEvent::FileDropped(_) => EventKind::FileDrop,
            AppEvent::PointerMoved { .. } => EventKind::PointerMove,
            AppEvent::PointerPressed { .. } => EventKind::PointerDown,
            AppEvent::KeyPressed(_) => EventKind::KeyDown,
            AppEvent::Resized { .. } => EventKind::Resize,
        }
    }
}

/// The session plus application-level requests raised by handlers.
pub struct SessionHost<B: ShaderBackend> {
    pub session: ShaderSession<B>,
    screenshot_requested: bool,
}

impl<B: ShaderBackend> SessionHost<B> {
    pub fn new(session: ShaderSession<B>) -> Self {
        Self {
            session,
            screenshot_requested: false,
        }
    }

    pub fn request_screenshot(&mut self) {
        self.screenshot_requested = true;
    }

    pub fn screenshot_requested(&self) -> bool {
        self.screenshot_requested
    }

    /// Returns and clears the pending screenshot request.
    pub fn take_screenshot_request(&mut self) -> bool {
        std::mem::take(&mut self.screenshot_requested)
    }
}

pub type EventHandler<B> = Box<dyn FnMut(&AppEvent, &mut SessionHost<B>)>;

pub struct EventBindings<B: ShaderBackend> {
    handlers: Vec<(EventKind, EventHandler<B>)>,
}

impl<B: ShaderBackend + 'static> EventBindings<B> {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Appends a handler; handlers for the same kind run in registration order.
    pub fn bind<F>(&mut self, kind: EventKind, handler: F) -> &mut Self
    where
        F: FnMut(&AppEvent, &mut SessionHost<B>) + 'static,
    {
        self.handlers.push((kind, Box::new(handler)));
        self
    }

    /// Runs every handler bound to the event's kind and returns how many ran.
    pub fn dispatch(&mut self, event: &AppEvent, host: &mut SessionHost<B>) -> usize {
        let kind = event.kind();
        let mut ran = 0;
        for (bound, handler) in self.handlers.iter_mut() {
            if *bound == kind {
                handler(event, host);
                ran += 1;
            }
        }
        ran
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// The application's default bindings.
    ///
    /// Dropping a regular file loads it, pointer events feed `iMouse`,
    /// `screenshot_key` requests a screenshot and any other key reloads the
    /// current shader from disk.
    pub fn standard(screenshot_key: char) -> Self {
        let mut bindings = Self::new();
        bindings
            .bind(EventKind::FileDrop, |event, host| {
                if let AppEvent::FileDropped(path) = event {
                    if !path.is_file() {
                        warn!(path = %path.display(), "ignoring dropped item that is not a regular file");
                        return;
                    }
                    if let Err(err) = host.session.load(path) {
                        report_shader_error(&err);
                    }
                }
            })
            .bind(EventKind::PointerMove, |event, host| {
                if let AppEvent::PointerMoved { x, y } = *event {
                    host.session.on_pointer_move(x, y);
                }
            })
            .bind(EventKind::PointerDown, |event, host| {
                if let AppEvent::PointerPressed { x, y } = *event {
                    host.session.on_pointer_down(x, y);
                }
            })
            .bind(EventKind::KeyDown, move |event, host| {
                if let AppEvent::KeyPressed(key) = event {
                    if key.matches(screenshot_key) {
                        info!("screenshot requested");
                        host.request_screenshot();
                    } else if let Err(err) = host.session.on_reload_requested() {
                        report_shader_error(&err);
                    }
                }
            })
            .bind(EventKind::Resize, |event, host| {
                if let AppEvent::Resized { width, height } = *event {
                    host.session.on_resize(width, height);
                }
            });
        bindings
    }
}

impl<B: ShaderBackend + 'static> Default for EventBindings<B> {
    fn default() -> Self {
        Self::new()
    }
}

/// Logs a shader failure; none of them stop the application.
pub fn report_shader_error(err: &ShaderError) {
    match err {
        ShaderError::Compile { path, diagnostic } => {
            error!(path = %path.display(), "error compiling shader:\n{diagnostic}");
        }
        ShaderError::Io { path, source } => {
            error!(path = %path.display(), error = %source, "error loading shader");
        }
        ShaderError::NotLoaded => warn!("nothing to reload; no shader has loaded yet"),
        ShaderError::NotReady => debug!("no shader program installed"),
    }
}
