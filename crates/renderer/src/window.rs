use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, error, warn};
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget};
use winit::keyboard::Key;
use winit::window::{Window, WindowBuilder};

use crate::events::{AppEvent, EventBindings, KeyPress};
use crate::gpu::{GpuBackend, GpuState};
use crate::types::RendererConfig;

/// Window, GPU state and the dispatch table for one interactive session.
///
/// `gpu` is declared before `window` so the surface is dropped first.
struct WindowState {
    gpu: GpuState,
    bindings: EventBindings<GpuBackend>,
    cursor: Option<PhysicalPosition<f64>>,
    drops: DropBurst,
    window: Arc<Window>,
}

/// Lets through only the first file of a multi-file drop.
///
/// winit delivers one `DroppedFile` per file, all before the next
/// `AboutToWait`, which ends the burst.
#[derive(Debug, Default)]
struct DropBurst {
    taken: bool,
}

impl DropBurst {
    fn accept(&mut self) -> bool {
        !std::mem::replace(&mut self.taken, true)
    }

    fn end(&mut self) {
        self.taken = false;
    }
}

impl WindowState {
    fn new(window: Arc<Window>, config: &RendererConfig) -> Result<Self> {
        let size = window.inner_size();
        let mut gpu = GpuState::new(window.as_ref(), size, config)?;
        if let Some(path) = config.shader_source.as_deref() {
            gpu.load_initial(path);
        } else {
            warn!("no shader selected; drop a fragment shader onto the window");
        }

        Ok(Self {
            gpu,
            bindings: EventBindings::standard(config.screenshot_key),
            cursor: None,
            drops: DropBurst::default(),
            window,
        })
    }

    fn window(&self) -> &Window {
        self.window.as_ref()
    }

    fn dispatch(&mut self, event: AppEvent) {
        let ran = self.bindings.dispatch(&event, self.gpu.host_mut());
        if ran == 0 {
            debug!(?event, "no handler bound");
        }
    }

    fn handle_window_event(&mut self, event: WindowEvent, elwt: &EventLoopWindowTarget<()>) {
        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => elwt.exit(),
            WindowEvent::DroppedFile(path) => {
                if self.drops.accept() {
                    self.dispatch(AppEvent::FileDropped(path));
                } else {
                    debug!(path = %path.display(), "ignoring additional dropped file");
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Some(position);
                let (x, y) = to_shader_space(position, self.gpu.size());
                self.dispatch(AppEvent::PointerMoved { x, y });
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                if let Some(position) = self.cursor {
                    let (x, y) = to_shader_space(position, self.gpu.size());
                    self.dispatch(AppEvent::PointerPressed { x, y });
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed && !event.repeat {
                    self.dispatch(AppEvent::KeyPressed(key_press(&event.logical_key)));
                }
            }
            WindowEvent::Resized(new_size) => self.resize(new_size),
            WindowEvent::ScaleFactorChanged {
                mut inner_size_writer,
                ..
            } => {
                let _ = inner_size_writer.request_inner_size(self.gpu.size());
            }
            WindowEvent::RedrawRequested => self.redraw(elwt),
            _ => {}
        }
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if self.gpu.resize(new_size) {
            self.dispatch(AppEvent::Resized {
                width: new_size.width,
                height: new_size.height,
            });
        }
    }

    fn redraw(&mut self, elwt: &EventLoopWindowTarget<()>) {
        match self.gpu.render() {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.gpu.reconfigure();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                error!("surface out of memory; exiting");
                elwt.exit();
            }
            Err(wgpu::SurfaceError::Timeout) => {
                debug!("surface timeout; retrying next frame");
            }
            Err(other) => {
                warn!(error = ?other, "surface error; retrying next frame");
            }
        }
    }
}

/// Converts a window position (top-left origin) to shader space
/// (bottom-left origin).
fn to_shader_space(position: PhysicalPosition<f64>, size: PhysicalSize<u32>) -> (f32, f32) {
    let x = position.x as f32;
    let y = size.height as f32 - position.y as f32;
    (x, y)
}

fn key_press(key: &Key) -> KeyPress {
    match key {
        Key::Character(text) => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => KeyPress::Character(c),
                _ => KeyPress::Other,
            }
        }
        _ => KeyPress::Other,
    }
}

/// Opens the window and runs the event loop until it is closed.
pub(crate) fn run(config: &RendererConfig) -> Result<()> {
    let event_loop = EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let (width, height) = config.surface_size;
    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(PhysicalSize::new(width.max(1), height.max(1)))
        .build(&event_loop)
        .context("failed to create window")?;
    let mut state = WindowState::new(Arc::new(window), config)?;
    state.window().request_redraw();

    event_loop
        .run(move |event, elwt| {
            elwt.set_control_flow(ControlFlow::Wait);
            match event {
                Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
                    state.handle_window_event(event, elwt);
                }
                Event::AboutToWait => {
                    state.drops.end();
                    state.window().request_redraw();
                }
                _ => {}
            }
        })
        .map_err(|err| anyhow!("event loop error: {err}"))
}

#[cfg(test)]
mod tests {
    use winit::keyboard::NamedKey;

    use super::*;

    #[test]
    fn pointer_y_is_flipped_to_bottom_left() {
        let size = PhysicalSize::new(800, 600);
        assert_eq!(to_shader_space(PhysicalPosition::new(10.0, 0.0), size), (10.0, 600.0));
        assert_eq!(to_shader_space(PhysicalPosition::new(0.0, 600.0), size), (0.0, 0.0));
        assert_eq!(to_shader_space(PhysicalPosition::new(5.0, 150.0), size), (5.0, 450.0));
    }

    #[test]
    fn only_the_first_file_of_a_drop_is_accepted() {
        let mut drops = DropBurst::default();
        assert!(drops.accept());
        assert!(!drops.accept());
        assert!(!drops.accept());

        drops.end();
        assert!(drops.accept());
    }

    #[test]
    fn single_characters_map_to_character_presses() {
        assert_eq!(key_press(&Key::Character("s".into())), KeyPress::Character('s'));
        assert_eq!(key_press(&Key::Character("é".into())), KeyPress::Character('é'));
        assert_eq!(key_press(&Key::Character("ab".into())), KeyPress::Other);
        assert_eq!(key_press(&Key::Named(NamedKey::Escape)), KeyPress::Other);
    }
}
