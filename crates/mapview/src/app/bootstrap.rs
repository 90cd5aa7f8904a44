use std::io;
use std::sync::Arc;

use maprender::{FaceLoadError, FaceProvider, MapRenderer, MapUpdater, RenderError};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::config::{ConfigError, ViewKind, ViewerConfig};
use super::demo_world::{self, DemoWorld};

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to load face images: {0}")]
    Faces(#[from] FaceLoadError),
    #[error("map renderer failed: {0}")]
    Render(#[from] RenderError),
    #[error("failed to start map updater thread: {0}")]
    SpawnUpdater(#[source] io::Error),
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] winit::error::EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] winit::error::OsError),
    #[error("failed to initialize pixel surface: {0}")]
    CreatePixels(#[source] pixels::Error),
    #[error("failed to present frame: {0}")]
    Present(#[source] pixels::Error),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] winit::error::EventLoopError),
}

pub(crate) struct AppWiring {
    pub(crate) config: ViewerConfig,
    pub(crate) updater: Arc<MapUpdater>,
    pub(crate) renderer: Arc<MapRenderer>,
    pub(crate) world: DemoWorld,
}

pub(crate) fn build_app() -> Result<AppWiring, AppError> {
    init_tracing();
    info!("=== Map View Startup ===");

    let config = ViewerConfig::from_env()?;
    let faces = build_faces(&config)?;
    let world = DemoWorld::new(config.map_width, config.map_height, faces.as_ref());
    let renderer = match config.view {
        ViewKind::Main => MapRenderer::main_view(config.render, faces)?,
        ViewKind::Mini => MapRenderer::mini_map(config.render, faces)?,
    };
    let renderer = Arc::new(renderer);
    let updater = Arc::new(MapUpdater::new(config.map_width, config.map_height));
    updater.lock_model().set_memory_margin(config.memory_margin);
    updater.add_listener(renderer.clone());
    info!(
        view = ?config.view,
        tile_size = config.tile_size,
        map_width = config.map_width,
        map_height = config.map_height,
        avoid_copy_area = config.render.avoid_copy_area,
        memory_margin = ?config.memory_margin,
        "viewer_config"
    );

    Ok(AppWiring {
        config,
        updater,
        renderer,
        world,
    })
}

fn build_faces(config: &ViewerConfig) -> Result<Arc<dyn FaceProvider>, FaceLoadError> {
    match &config.faces_dir {
        Some(dir) => Ok(Arc::new(demo_world::load_face_images(dir, config.tile_size)?)),
        None => Ok(Arc::new(demo_world::procedural_faces(config.tile_size))),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
