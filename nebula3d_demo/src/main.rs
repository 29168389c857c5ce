//! Nebula3D demo - spins a model in a resizable window
//!
//! Usage: `nebula3d_demo [model.obj]`
//!
//! With a path, the OBJ model (and its MTL textures) is loaded; without one,
//! a checkerboard-textured cube is rendered instead. Close the window for a
//! clean exit; any unrecoverable renderer error prints a diagnostic and
//! exits with status 1.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use nebula_3d_renderer::nebula3d::asset::{ImageData, Mesh, Model};
use nebula_3d_renderer::nebula3d::{Config, Error, Result};
use nebula_3d_renderer::{nebula_error, nebula_info};
use nebula_3d_renderer_vulkan::VulkanRenderer;

struct App {
    config: Config,
    model_path: Option<PathBuf>,

    window: Option<Arc<Window>>,
    renderer: Option<VulkanRenderer>,

    /// True while the window has zero area (minimized); redraws are skipped
    /// until a nonzero resize arrives
    paused: bool,
    /// First unrecoverable error, reported after the event loop exits
    error: Option<Error>,
}

impl App {
    fn new(config: Config, model_path: Option<PathBuf>) -> Self {
        Self {
            config,
            model_path,
            window: None,
            renderer: None,
            paused: false,
            error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attributes = Window::default_attributes()
            .with_title(self.config.app_name.clone())
            .with_inner_size(PhysicalSize::new(
                self.config.window_width,
                self.config.window_height,
            ));
        let window = event_loop.create_window(attributes).map_err(|e| {
            Error::InitializationFailed(format!("Failed to create window: {}", e))
        })?;
        let window = Arc::new(window);

        let mut renderer = VulkanRenderer::new(window.as_ref(), self.config.clone())?;
        let model = self.load_model()?;
        renderer.upload_model(&model)?;

        self.window = Some(window);
        self.renderer = Some(renderer);
        Ok(())
    }

    fn load_model(&self) -> Result<Model> {
        match &self.model_path {
            Some(path) => {
                nebula_info!("nebula3d::demo", "Loading model {}", path.display());
                Model::load(path)
            }
            None => {
                nebula_info!("nebula3d::demo", "No model given, using the fallback cube");
                let mut cube = Mesh::unit_cube();
                cube.set_texture(ImageData::checkerboard(
                    256,
                    32,
                    [235, 235, 235, 255],
                    [40, 40, 40, 255],
                ));
                Ok(Model::from_meshes(vec![cube]))
            }
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: Error) {
        nebula_error!("nebula3d::demo", "Unrecoverable error: {}", error);
        self.error = Some(error);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.init(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                if let Some(renderer) = &self.renderer {
                    renderer.wait_idle().ok();
                }
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                self.paused = size.width == 0 || size.height == 0;
                if let Some(renderer) = &mut self.renderer {
                    renderer.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                if self.paused {
                    return;
                }
                if let Some(renderer) = &mut self.renderer {
                    if let Err(e) = renderer.draw_frame() {
                        self.fail(event_loop, e);
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            if !self.paused {
                window.request_redraw();
            }
        }
    }
}

fn main() -> ExitCode {
    let model_path = std::env::args().nth(1).map(PathBuf::from);
    let config = Config::default();

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            eprintln!("Failed to create event loop: {}", e);
            return ExitCode::FAILURE;
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config, model_path);
    if let Err(e) = event_loop.run_app(&mut app) {
        eprintln!("Event loop error: {}", e);
        return ExitCode::FAILURE;
    }

    if let Some(error) = app.error {
        eprintln!("Renderer terminated: {}", error);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
