mod config;
mod error;
mod face_names;
pub mod faces;
pub mod map;
pub mod rendering;
mod sync;

pub use config::{RenderConfig, AVOID_COPY_AREA_ENV_VAR};
pub use error::RenderError;
pub use face_names::FaceNameError;
pub use faces::{FaceImage, FaceLoadError, FaceProvider, ImageFaceProvider, MemoryFaceProvider};
pub use map::{
    Face, MapListener, MapModel, MapSquare, MapUpdate, MapUpdater, DARKNESS_FULL_BRIGHT,
    NUM_LAYERS,
};
pub use rendering::{
    AnchorMarkerRenderer, MainMapView, MapRenderer, MiniMapView, PaintBuffer, RenderStats,
    SmoothingHook, TileBackgroundRenderer, TileCompositor, Viewport, FOG_OF_WAR_COLOR,
};
