//! Window and event loop.
//!
//! [`ArtiomaApp`] waits for winit to resume, opens the window, builds the
//! renderer and the [`Exhibition`], then forwards window events and drives one
//! tick and one render per redraw.

use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::{Window, WindowAttributes, WindowId};

use crate::config::ExhibitConfig;
use crate::exhibition::Exhibition;
use crate::gpu::GpuContext;
use crate::importer::GltfImporter;
use crate::input::Input;
use crate::renderer::{RenderError, WgpuRenderer};
use crate::ui::UiError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("event loop error")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to open the window")]
    Window(#[from] winit::error::OsError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Ui(#[from] UiError),
}

/// Open the exhibition window and run until it is closed.
pub fn run(config: ExhibitConfig) -> Result<(), AppError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = ArtiomaApp::Pending {
        config: Some(config),
        error: None,
    };
    event_loop.run_app(&mut app)?;

    match app {
        ArtiomaApp::Pending { error: Some(err), .. } => Err(err),
        _ => Ok(()),
    }
}

enum ArtiomaApp {
    Pending {
        config: Option<ExhibitConfig>,
        /// Set when startup failed and the loop was asked to exit.
        error: Option<AppError>,
    },
    Running {
        window: Arc<Window>,
        exhibition: Exhibition<WgpuRenderer, GltfImporter>,
        input: Input,
        last_frame: Instant,
    },
}

impl ArtiomaApp {
    fn start(
        event_loop: &ActiveEventLoop,
        config: ExhibitConfig,
    ) -> Result<(Arc<Window>, Exhibition<WgpuRenderer, GltfImporter>), AppError> {
        let window_attrs = WindowAttributes::default()
            .with_title(&config.window.title)
            .with_inner_size(winit::dpi::LogicalSize::new(
                config.window.width,
                config.window.height,
            ));

        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let gpu = GpuContext::new(window.clone())?;
        let renderer = WgpuRenderer::new(gpu, &config);

        let size = window.inner_size();
        let mut exhibition = Exhibition::new(config, renderer, GltfImporter::new())?;
        exhibition.resize(size.width, size.height);

        Ok((window, exhibition))
    }
}

impl ApplicationHandler for ArtiomaApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let ArtiomaApp::Pending { config, error } = self else {
            return;
        };
        let Some(config) = config.take() else {
            return;
        };

        match Self::start(event_loop, config) {
            Ok((window, exhibition)) => {
                window.request_redraw();
                *self = ArtiomaApp::Running {
                    window,
                    exhibition,
                    input: Input::new(),
                    last_frame: Instant::now(),
                };
            }
            Err(err) => {
                tracing::error!("Startup failed: {err}");
                *error = Some(err);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let ArtiomaApp::Running {
            window,
            exhibition,
            input,
            last_frame,
        } = self
        else {
            return;
        };

        input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                tracing::info!("Closing");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                exhibition.resize(size.width, size.height);
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                exhibition.click(input.mouse_position());
            }
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed && !event.repeat =>
            {
                if let PhysicalKey::Code(key) = event.physical_key {
                    exhibition.key_pressed(key, input.modifiers());
                }
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = now.duration_since(*last_frame).as_secs_f32();
                *last_frame = now;

                exhibition.tick(dt, input);
                exhibition.render();

                input.begin_frame();
                window.request_redraw();
            }
            _ => {}
        }
    }
}
