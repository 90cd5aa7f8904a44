use std::collections::HashMap;
use std::sync::Arc;

use crate::error::RenderError;
use crate::faces::{FaceImage, FaceProvider};
use crate::map::{MapModel, NUM_LAYERS};

use super::darkness::{DarknessPalette, FOG_OF_WAR_COLOR};
use super::geometry::Viewport;
use super::surface::PaintBuffer;
use super::view::{SmoothingHook, TileBackgroundRenderer};

/// Draws single map squares into a [`PaintBuffer`].
pub struct TileCompositor {
    tile_size: i32,
    faces: Arc<dyn FaceProvider>,
    background: Arc<dyn TileBackgroundRenderer>,
    smoothing: Option<Arc<dyn SmoothingHook>>,
    palette: DarknessPalette,
    color_tiles: HashMap<[u8; 4], Vec<u8>>,
}

impl TileCompositor {
    pub fn new(
        tile_size: i32,
        faces: Arc<dyn FaceProvider>,
        background: Arc<dyn TileBackgroundRenderer>,
    ) -> Result<Self, RenderError> {
        if tile_size <= 0 {
            return Err(RenderError::InvalidTileSize { tile_size });
        }
        if faces.tile_size() != tile_size {
            return Err(RenderError::TileSizeMismatch {
                provider: faces.tile_size(),
                renderer: tile_size,
            });
        }
        Ok(Self {
            tile_size,
            faces,
            background,
            smoothing: None,
            palette: DarknessPalette::new(),
            color_tiles: HashMap::new(),
        })
    }

    pub fn with_smoothing(mut self, smoothing: Arc<dyn SmoothingHook>) -> Self {
        self.smoothing = Some(smoothing);
        self
    }

    pub fn tile_size(&self) -> i32 {
        self.tile_size
    }

    /// Redraws square `(x, y)`: faces bottom layer first, then the fog and
    /// darkness overlays.
    pub fn composite_square(
        &mut self,
        buffer: &mut PaintBuffer,
        model: &MapModel,
        viewport: &Viewport,
        x: i32,
        y: i32,
    ) -> Result<(), RenderError> {
        let tile = self.tile_size;
        let (px, py) = viewport.square_origin_px(x, y);
        let square = model.square(x, y);

        let mut has_image = false;
        if let Some(square) = square {
            for layer in 0..NUM_LAYERS {
                if let Some((dx, dy)) = model.visible_head(x, y, layer) {
                    let head = model
                        .face(x + dx, y + dy, layer)
                        .ok_or(RenderError::HeadWithoutFace { x, y, layer })?;
                    let image = self.face_image(head.id)?;
                    if !has_image {
                        self.background
                            .paint_square_background(buffer, px, py, tile, true, Some(square));
                        has_image = true;
                    }
                    paint_image(buffer, &image, px, py, tile, tile * dx, tile * dy);
                }

                if let Some(face) = square.face(layer) {
                    let image = self.face_image(face.id)?;
                    if !has_image {
                        self.background
                            .paint_square_background(buffer, px, py, tile, true, Some(square));
                        has_image = true;
                    }
                    paint_image(buffer, &image, px, py, tile, 0, 0);
                    if let Some(smoothing) = &self.smoothing {
                        smoothing.paint_smoothing(buffer, model, x, y, px, py, layer, tile);
                    }
                }
            }
        }
        if !has_image {
            self.background
                .paint_square_background(buffer, px, py, tile, false, square);
        }

        if !viewport.in_map_bounds(x, y) || model.is_fog_of_war(x, y) {
            self.paint_colored_square(buffer, px, py, FOG_OF_WAR_COLOR);
        }
        if let Some(color) = self.palette.color(model.darkness(x, y)) {
            self.paint_colored_square(buffer, px, py, color);
        }
        Ok(())
    }

    /// Blends a solid tile of `color` at `(px, py)`.
    pub fn paint_colored_square(&mut self, buffer: &mut PaintBuffer, px: i32, py: i32, color: [u8; 4]) {
        let tile = self.tile_size;
        let pixels = self.color_tiles.entry(color).or_insert_with(|| {
            color
                .iter()
                .copied()
                .cycle()
                .take(tile as usize * tile as usize * 4)
                .collect()
        });
        buffer.blend_tile(px, py, tile, pixels);
    }

    pub fn cached_color_tiles(&self) -> usize {
        self.color_tiles.len()
    }

    fn face_image(&self, face_id: u32) -> Result<Arc<FaceImage>, RenderError> {
        self.faces
            .face_image(face_id)
            .ok_or(RenderError::MissingFaceImage { face: face_id })
    }
}

/// Draws the tile of `image` that lies `(offset_x, offset_y)` pixels left of
/// and above its bottom-right tile.
fn paint_image(
    buffer: &mut PaintBuffer,
    image: &FaceImage,
    px: i32,
    py: i32,
    tile: i32,
    offset_x: i32,
    offset_y: i32,
) {
    let sx = image.width() as i32 - offset_x;
    let sy = image.height() as i32 - offset_y;
    buffer.draw_face_region(image, sx - tile, sy - tile, px, py, tile);
}
