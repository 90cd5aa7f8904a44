use crate::map::{MapModel, MapSquare};

use super::surface::PaintBuffer;

/// Paints what lies under a square's faces.
pub trait TileBackgroundRenderer: Send + Sync {
    /// Called once per composite: with `has_image = true` right before the
    /// first face image, or with `has_image = false` when the square shows no
    /// image at all.
    fn paint_square_background(
        &self,
        buffer: &mut PaintBuffer,
        px: i32,
        py: i32,
        tile_size: i32,
        has_image: bool,
        square: Option<&MapSquare>,
    );
}

/// Marks the player position on top of the map.
pub trait AnchorMarkerRenderer: Send + Sync {
    fn mark_anchor(&self, buffer: &mut PaintBuffer, px: i32, py: i32, tile_size: i32);

    /// Whether the marker leaves pixels behind when the map scrolls under it.
    fn leaves_trail(&self) -> bool {
        false
    }
}

/// Draws blended transitions between neighbouring squares after a face.
pub trait SmoothingHook: Send + Sync {
    #[allow(clippy::too_many_arguments)]
    fn paint_smoothing(
        &self,
        buffer: &mut PaintBuffer,
        model: &MapModel,
        x: i32,
        y: i32,
        px: i32,
        py: i32,
        layer: usize,
        tile_size: i32,
    );
}

/// The main map: every square starts from opaque black.
#[derive(Debug, Clone, Copy, Default)]
pub struct MainMapView;

impl TileBackgroundRenderer for MainMapView {
    fn paint_square_background(
        &self,
        buffer: &mut PaintBuffer,
        px: i32,
        py: i32,
        tile_size: i32,
        _has_image: bool,
        _square: Option<&MapSquare>,
    ) {
        buffer.fill_rect(px, py, tile_size, tile_size, [0, 0, 0, 255]);
    }
}

/// The minimap: empty squares get a flat color and the player is a solid tile.
#[derive(Debug, Clone, Copy)]
pub struct MiniMapView {
    pub empty_color: [u8; 4],
    pub marker_color: [u8; 4],
}

impl Default for MiniMapView {
    fn default() -> Self {
        Self {
            empty_color: [0, 0, 0, 255],
            marker_color: [255, 0, 0, 255],
        }
    }
}

impl TileBackgroundRenderer for MiniMapView {
    fn paint_square_background(
        &self,
        buffer: &mut PaintBuffer,
        px: i32,
        py: i32,
        tile_size: i32,
        has_image: bool,
        _square: Option<&MapSquare>,
    ) {
        if !has_image {
            buffer.fill_rect(px, py, tile_size, tile_size, self.empty_color);
        }
    }
}

impl AnchorMarkerRenderer for MiniMapView {
    fn mark_anchor(&self, buffer: &mut PaintBuffer, px: i32, py: i32, tile_size: i32) {
        buffer.fill_rect(px, py, tile_size, tile_size, self.marker_color);
    }

    fn leaves_trail(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn main_view_always_paints_black() {
        let mut buffer = PaintBuffer::new(4, 4);
        buffer.fill([50, 50, 50, 255]);
        MainMapView.paint_square_background(&mut buffer, 0, 0, 2, true, None);
        assert_eq!(buffer.pixel(1, 1), Some([0, 0, 0, 255]));
        assert_eq!(buffer.pixel(2, 2), Some([50, 50, 50, 255]));
    }

    #[test]
    fn mini_view_keeps_pixels_under_images() {
        let view = MiniMapView {
            empty_color: [10, 20, 30, 255],
            ..MiniMapView::default()
        };
        let mut buffer = PaintBuffer::new(2, 2);
        buffer.fill([50, 50, 50, 255]);
        view.paint_square_background(&mut buffer, 0, 0, 2, true, None);
        assert_eq!(buffer.pixel(0, 0), Some([50, 50, 50, 255]));
        view.paint_square_background(&mut buffer, 0, 0, 2, false, None);
        assert_eq!(buffer.pixel(0, 0), Some([10, 20, 30, 255]));
    }

    #[test]
    fn mini_view_marker_is_red_and_leaves_trail() {
        let view = MiniMapView::default();
        let mut buffer = PaintBuffer::new(4, 4);
        view.mark_anchor(&mut buffer, 1, 1, 2);
        assert_eq!(buffer.pixel(2, 2), Some([255, 0, 0, 255]));
        assert_eq!(buffer.pixel(0, 0), Some([0, 0, 0, 255]));
        assert!(view.leaves_trail());
    }
}
