//! Window management and the event loop.

use std::fs;
use std::sync::Arc;

use anyhow::Context;
use glint_render::{Renderer, RendererConfig};
use tracing::{error, info};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::config::AppConfig;

/// Create the event loop and run until the window closes.
pub fn run(config: AppConfig) -> anyhow::Result<()> {
    info!("{} starting...", config.title);

    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App {
        config,
        state: None,
        fatal_error: None,
    };

    event_loop.run_app(&mut app).context("Event loop error")?;

    if let Some(err) = app.fatal_error {
        return Err(err);
    }

    Ok(())
}

struct App {
    config: AppConfig,
    state: Option<AppState>,
    fatal_error: Option<anyhow::Error>,
}

struct AppState {
    window: Arc<Window>,
    renderer: Renderer,
}

impl App {
    fn create_state(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<AppState> {
        let window_attrs = Window::default_attributes()
            .with_title(&self.config.title)
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));

        let window = Arc::new(event_loop.create_window(window_attrs)?);

        let vertex_shader = match &self.config.vertex_shader {
            Some(path) => fs::read(path)
                .with_context(|| format!("Failed to read vertex shader {}", path.display()))?,
            None => glint_shaders::VERTEX_SHADER.to_vec(),
        };
        let fragment_shader = match &self.config.fragment_shader {
            Some(path) => fs::read(path)
                .with_context(|| format!("Failed to read fragment shader {}", path.display()))?,
            None => glint_shaders::FRAGMENT_SHADER.to_vec(),
        };

        let size = window.inner_size();
        let renderer = Renderer::new(
            window.as_ref(),
            &RendererConfig {
                app_name: self.config.title.clone(),
                enable_validation: self.config.validation,
                vertex_shader,
                fragment_shader,
            },
            size.width,
            size.height,
        )?;

        Ok(AppState { window, renderer })
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        match self.create_state(event_loop) {
            Ok(state) => {
                info!("Application ready");
                self.state = Some(state);
            }
            Err(e) => {
                error!("Failed to initialize application: {e:#}");
                self.fatal_error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(state) = &mut self.state else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested");
                state.renderer.destroy();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                state.renderer.request_resize();
                tracing::debug!("Window resized to {}x{}", size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                let size = state.window.inner_size();
                match state.renderer.draw_frame(size.width, size.height) {
                    Ok(_) => state.window.request_redraw(),
                    Err(e) => {
                        error!("Render error: {e}");
                        self.fatal_error = Some(e.into());
                        state.renderer.destroy();
                        event_loop.exit();
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }
}
