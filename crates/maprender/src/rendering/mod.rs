mod compositor;
mod darkness;
mod geometry;
mod renderer;
mod surface;
mod view;

pub use compositor::TileCompositor;
pub use darkness::{DarknessPalette, FOG_OF_WAR_COLOR, MAX_DARKNESS_ALPHA_TENTHS};
pub use geometry::{
    compute_visible_range, div_round_up, modulo, pixel_to_tile, tile_to_pixel, AxisRange,
    Viewport,
};
pub use renderer::{MapRenderer, RenderStats};
pub use surface::PaintBuffer;
pub use view::{
    AnchorMarkerRenderer, MainMapView, MiniMapView, SmoothingHook, TileBackgroundRenderer,
};
