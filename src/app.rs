use crate::input::{Key, MouseButtons};
use crate::rendering::{Renderer, Viewport};
use crate::sandbox::{FrameOutcome, Sandbox};
use crate::world::TeardownStage;
use glam::Vec2;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

const TITLE_REFRESH: Duration = Duration::from_secs(1);

pub fn map_key(code: KeyCode) -> Option<Key> {
    let key = match code {
        KeyCode::Escape => Key::Escape,
        KeyCode::KeyQ => Key::Q,
        KeyCode::KeyF => Key::F,
        KeyCode::F3 => Key::F3,
        KeyCode::Space => Key::Space,
        KeyCode::Enter | KeyCode::NumpadEnter => Key::Return,
        KeyCode::ArrowLeft => Key::Left,
        KeyCode::ArrowRight => Key::Right,
        KeyCode::ArrowUp => Key::Up,
        KeyCode::ArrowDown => Key::Down,
        KeyCode::ShiftLeft | KeyCode::ShiftRight => Key::Shift,
        KeyCode::ControlLeft | KeyCode::ControlRight => Key::Control,
        _ => return None,
    };
    Some(key)
}

fn map_button(button: MouseButton) -> Option<MouseButtons> {
    match button {
        MouseButton::Left => Some(MouseButtons::LEFT),
        MouseButton::Right => Some(MouseButtons::RIGHT),
        MouseButton::Middle => Some(MouseButtons::MIDDLE),
        _ => None,
    }
}

pub struct SandboxApp<R: Renderer> {
    sandbox: Sandbox,
    renderer: R,
    window: Option<Arc<Window>>,
    last_title: Instant,
}

impl<R: Renderer> SandboxApp<R> {
    pub fn new(sandbox: Sandbox, renderer: R) -> Self {
        Self {
            sandbox,
            renderer,
            window: None,
            last_title: Instant::now(),
        }
    }

    pub fn into_sandbox(self) -> Sandbox {
        self.sandbox
    }

    fn refresh_title(&mut self) {
        if self.last_title.elapsed() < TITLE_REFRESH {
            return;
        }
        self.last_title = Instant::now();
        if let Some(window) = self.window.as_ref() {
            window.set_title(&format!("{} - {:.0} fps", crate::APP_NAME, self.sandbox.fps()));
        }
    }
}

impl<R: Renderer> ApplicationHandler for SandboxApp<R> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let attributes = Window::default_attributes().with_title(crate::APP_NAME);
        match event_loop.create_window(attributes) {
            Ok(window) => {
                let size = window.inner_size();
                self.renderer.resize(Viewport::new(size.width, size.height));
                self.window = Some(Arc::new(window));
                info!("Window created ({}x{})", size.width, size.height);
            }
            Err(e) => {
                error!("Failed to create window: {}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if !self.window.as_ref().is_some_and(|w| w.id() == window_id) {
            return;
        }
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                self.renderer.resize(Viewport::new(size.width, size.height));
            }
            WindowEvent::Focused(false) => self.sandbox.input_mut().release_all(),
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    if let Some(key) = map_key(code) {
                        match event.state {
                            ElementState::Pressed => self.sandbox.input_mut().key_down(key),
                            ElementState::Released => self.sandbox.input_mut().key_up(key),
                        }
                    }
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if let Some(button) = map_button(button) {
                    self.sandbox.input_mut().mouse_button(button, state == ElementState::Pressed);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.sandbox
                    .input_mut()
                    .mouse_moved(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::RedrawRequested => {
                if self.sandbox.frame(&mut self.renderer) == FrameOutcome::Quit {
                    event_loop.exit();
                    return;
                }
                self.refresh_title();
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }
}

/// Run the sandbox until the window closes or the user quits
pub fn run<R: Renderer>(sandbox: Sandbox, renderer: R) -> anyhow::Result<()> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = SandboxApp::new(sandbox, renderer);
    event_loop.run_app(&mut app)?;

    let report = app.into_sandbox().shutdown();
    info!(
        "Shut down: {} bodies and {} shapes destroyed",
        report.count(TeardownStage::CollisionObjects),
        report.count(TeardownStage::Shapes)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_mapping() {
        assert_eq!(map_key(KeyCode::ArrowUp), Some(Key::Up));
        assert_eq!(map_key(KeyCode::NumpadEnter), Some(Key::Return));
        assert_eq!(map_key(KeyCode::ShiftRight), Some(Key::Shift));
        assert_eq!(map_key(KeyCode::KeyZ), None);
    }
}
