use std::sync::Arc;
use std::time::{Duration, Instant};

use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

use super::{AppError, SceneApp};
use crate::render::Renderer;

struct WindowHost<R> {
    app: SceneApp,
    renderer: R,
    size: (u32, u32),
    window: Option<Arc<Window>>,
    target_frame_duration: Duration,
    next_frame_time: Instant,
    error: Option<AppError>,
}

impl<R: Renderer> WindowHost<R> {
    fn update_target_frame_duration(&mut self, window: &Window) {
        let mut target = Duration::from_millis(16);
        if let Some(monitor) = window.current_monitor() {
            if let Some(millihz) = monitor.refresh_rate_millihertz() {
                let hz = millihz as f32 / 1000.0;
                if hz > 1.0 {
                    target = Duration::from_secs_f32(1.0 / hz);
                }
            }
        }
        self.target_frame_duration = target;
        self.next_frame_time = Instant::now() + self.target_frame_duration;
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: AppError) {
        log::error!("{err}");
        self.error = Some(err);
        event_loop.exit();
    }
}

impl<R: Renderer> ApplicationHandler for WindowHost<R> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let (width, height) = self.size;
        let window_attrs = WindowAttributes::default()
            .with_title(self.app.title())
            .with_inner_size(PhysicalSize::new(width, height))
            .with_resizable(true);

        match event_loop.create_window(window_attrs) {
            Ok(window) => {
                let window = Arc::new(window);
                let size = window.inner_size();
                self.app.resize(size.width, size.height);
                self.update_target_frame_duration(&window);
                self.window = Some(window);
            }
            Err(err) => self.fail(event_loop, AppError::Window(err.to_string())),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput { event, .. } => {
                if event.repeat {
                    return;
                }
                self.app
                    .handle_key(event.physical_key, event.state == ElementState::Pressed);
                if self.app.quit_requested() {
                    event_loop.exit();
                }
            }
            WindowEvent::Resized(new_size) => {
                self.app.resize(new_size.width, new_size.height);
                if let Some(window) = self.window.clone() {
                    self.update_target_frame_duration(&window);
                }
            }
            WindowEvent::RedrawRequested => match self.app.frame(Instant::now(), &mut self.renderer) {
                Ok(true) => {
                    if let Some(window) = &self.window {
                        window.set_title(&self.app.title());
                    }
                }
                Ok(false) => {}
                Err(err) => self.fail(event_loop, err),
            },
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        if now >= self.next_frame_time {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
            self.next_frame_time = now + self.target_frame_duration;
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_frame_time));
    }
}

/// Opens a window and drives frames until it is closed or Escape is pressed.
pub fn run_windowed<R: Renderer>(app: SceneApp, renderer: R, size: (u32, u32)) -> Result<(), AppError> {
    let event_loop = EventLoop::new().map_err(|err| AppError::Window(err.to_string()))?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut host = WindowHost {
        app,
        renderer,
        size,
        window: None,
        target_frame_duration: Duration::from_millis(16),
        next_frame_time: Instant::now(),
        error: None,
    };
    event_loop
        .run_app(&mut host)
        .map_err(|err| AppError::Window(err.to_string()))?;

    match host.error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
