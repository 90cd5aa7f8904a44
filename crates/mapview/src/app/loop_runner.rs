use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use maprender::{MapRenderer, MapUpdater, RenderError, NUM_LAYERS};
use pixels::{Pixels, SurfaceTexture};
use tracing::{debug, error, info, warn};
use winit::dpi::LogicalSize;
use winit::event::{ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowBuilder};

use super::bootstrap::{AppError, AppWiring};
use super::demo_world::DemoFeed;

const FRAME_INTERVAL: Duration = Duration::from_millis(16);
const STATS_LOG_INTERVAL: Duration = Duration::from_secs(1);

pub(crate) fn run(app: AppWiring) -> ExitCode {
    match run_viewer(app) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if failed_while_running(&err) {
                error!(error = %err, "viewer_failed");
            } else {
                error!(error = %err, "startup_failed");
            }
            ExitCode::FAILURE
        }
    }
}

/// Errors raised after the event loop took over, as opposed to while building the window.
fn failed_while_running(err: &AppError) -> bool {
    matches!(err, AppError::EventLoopRun(_) | AppError::Present(_))
}

/// Window-side state: the presented surface and what the cursor points at.
struct Screen {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    width: u32,
    height: u32,
    hovered_square: Option<(i32, i32)>,
}

impl Screen {
    fn new(window: Arc<Window>) -> Result<Self, pixels::Error> {
        let size = window.inner_size();
        let (width, height) = (size.width.max(1), size.height.max(1));
        let pixels = build_pixels(Arc::clone(&window), width, height)?;
        Ok(Self {
            window,
            pixels,
            width,
            height,
            hovered_square: None,
        })
    }

    fn resize(
        &mut self,
        width: u32,
        height: u32,
        updater: &MapUpdater,
        renderer: &MapRenderer,
    ) -> Result<(), AppError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = build_pixels(Arc::clone(&self.window), width, height)
            .map_err(AppError::CreatePixels)?;
        self.width = width;
        self.height = height;
        let model = updater.lock_model();
        renderer.resize(&model, width, height)?;
        Ok(())
    }

    fn present(&mut self, updater: &MapUpdater, renderer: &MapRenderer) -> Result<(), AppError> {
        {
            let model = updater.lock_model();
            renderer.paint(&model, self.pixels.frame_mut(), self.width, self.height)?;
        }
        self.pixels.render().map_err(AppError::Present)
    }

    fn hover(&mut self, renderer: &MapRenderer, x: f64, y: f64) {
        let square = renderer.viewport().screen_to_square(x as i32, y as i32);
        if self.hovered_square != Some(square) {
            self.hovered_square = Some(square);
            debug!(x = square.0, y = square.1, "cursor_square");
        }
    }
}

fn build_pixels(window: Arc<Window>, width: u32, height: u32) -> Result<Pixels<'static>, pixels::Error> {
    let surface = SurfaceTexture::new(width, height, window);
    Pixels::new(width, height, surface)
}

fn inspect_square(updater: &MapUpdater, x: i32, y: i32) {
    let model = updater.lock_model();
    let faces: Vec<u32> = (0..NUM_LAYERS)
        .filter_map(|layer| model.face(x, y, layer).map(|face| face.id))
        .collect();
    info!(
        x,
        y,
        darkness = model.darkness(x, y),
        fog_of_war = model.is_fog_of_war(x, y),
        faces = ?faces,
        "square_inspected"
    );
}

fn redraw_everything(updater: &MapUpdater, renderer: &MapRenderer) -> Result<(), RenderError> {
    let model = updater.lock_model();
    renderer.redraw_all(&model)
}

fn run_viewer(app: AppWiring) -> Result<(), AppError> {
    let AppWiring {
        config,
        updater,
        renderer,
        world,
    } = app;

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut screen = Screen::new(Arc::clone(&window)).map_err(AppError::CreatePixels)?;
    {
        let model = updater.lock_model();
        renderer.resize(&model, screen.width, screen.height)?;
    }

    let mut feed = Some(
        DemoFeed::spawn(Arc::clone(&updater), world, config.step_interval())
            .map_err(AppError::SpawnUpdater)?,
    );
    info!(
        width = screen.width,
        height = screen.height,
        step_interval_ms = config.step_interval_ms,
        "viewer_started"
    );

    let mut last_stats_log = Instant::now();

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    if let Err(error) =
                        screen.resize(new_size.width, new_size.height, &updater, &renderer)
                    {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::ScaleFactorChanged { .. } => {
                    let size = window.inner_size();
                    if let Err(error) = screen.resize(size.width, size.height, &updater, &renderer) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::CursorMoved { position, .. } => {
                    screen.hover(&renderer, position.x, position.y);
                }
                WindowEvent::CursorLeft { .. } => {
                    screen.hovered_square = None;
                }
                WindowEvent::MouseInput {
                    state: ElementState::Pressed,
                    button: MouseButton::Left,
                    ..
                } => {
                    if let Some((x, y)) = screen.hovered_square {
                        inspect_square(&updater, x, y);
                    }
                }
                WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                    match event.physical_key {
                        PhysicalKey::Code(KeyCode::Escape) => {
                            info!(reason = "escape_key", "shutdown_requested");
                            window_target.exit();
                        }
                        PhysicalKey::Code(KeyCode::KeyR) => {
                            if let Err(error) = redraw_everything(&updater, &renderer) {
                                warn!(error = %error, "renderer_redraw_failed");
                            }
                        }
                        _ => {}
                    }
                }
                WindowEvent::RedrawRequested => {
                    if let Err(error) = screen.present(&updater, &renderer) {
                        warn!(error = %error, "renderer_draw_failed");
                        window_target.exit();
                    }
                    let now = Instant::now();
                    if now.saturating_duration_since(last_stats_log) >= STATS_LOG_INTERVAL {
                        last_stats_log = now;
                        let stats = renderer.take_stats();
                        info!(
                            fast_copies = stats.fast_copies,
                            full_redraws = stats.full_redraws,
                            squares_composited = stats.squares_composited,
                            "render_stats"
                        );
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
                window_target.set_control_flow(ControlFlow::wait_duration(FRAME_INTERVAL));
            }
            Event::LoopExiting => {
                if let Some(mut feed) = feed.take() {
                    feed.stop();
                }
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}
