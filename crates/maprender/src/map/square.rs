/// Number of face layers per map square.
pub const NUM_LAYERS: usize = 10;

/// Darkness value meaning "no darkness overlay".
pub const DARKNESS_FULL_BRIGHT: u16 = 255;

/// A face reference: the image id plus how many tiles the image spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Face {
    pub id: u32,
    tile_width: u32,
    tile_height: u32,
}

impl Face {
    pub fn new(id: u32) -> Self {
        Self::with_span(id, 1, 1)
    }

    /// Spans below one tile are treated as one tile.
    pub fn with_span(id: u32, tile_width: u32, tile_height: u32) -> Self {
        Self {
            id,
            tile_width: tile_width.max(1),
            tile_height: tile_height.max(1),
        }
    }

    pub fn tile_width(&self) -> u32 {
        self.tile_width
    }

    pub fn tile_height(&self) -> u32 {
        self.tile_height
    }

    pub fn is_multi_tile(&self) -> bool {
        self.tile_width > 1 || self.tile_height > 1
    }

    /// Tile offsets `(dx, dy)` of every covered square except the head itself.
    pub(crate) fn covered_offsets(&self) -> impl Iterator<Item = (i32, i32)> {
        let width = self.tile_width as i32;
        let height = self.tile_height as i32;
        (0..width)
            .flat_map(move |dx| (0..height).map(move |dy| (dx, dy)))
            .filter(|&(dx, dy)| dx > 0 || dy > 0)
    }
}

/// One cell of the map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapSquare {
    pub(crate) faces: [Option<Face>; NUM_LAYERS],
    pub(crate) heads: [Option<(i32, i32)>; NUM_LAYERS],
    pub(crate) darkness: u16,
    pub(crate) fog_of_war: bool,
}

impl Default for MapSquare {
    fn default() -> Self {
        Self {
            faces: [None; NUM_LAYERS],
            heads: [None; NUM_LAYERS],
            darkness: DARKNESS_FULL_BRIGHT,
            fog_of_war: false,
        }
    }
}

impl MapSquare {
    pub fn face(&self, layer: usize) -> Option<Face> {
        self.faces.get(layer).copied().flatten()
    }

    /// Offset from this square to the square holding the multi-tile face
    /// that covers it on `layer`, before fog suppression.
    pub fn head_offset(&self, layer: usize) -> Option<(i32, i32)> {
        self.heads.get(layer).copied().flatten()
    }

    pub fn darkness(&self) -> u16 {
        self.darkness
    }

    pub fn is_fog_of_war(&self) -> bool {
        self.fog_of_war
    }

    /// True when nothing distinguishes the square from a fresh one, so a
    /// clear has nothing to remember.
    pub(crate) fn is_blank(&self) -> bool {
        self.darkness == DARKNESS_FULL_BRIGHT
            && self.faces.iter().all(Option::is_none)
            && self.heads.iter().all(Option::is_none)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_is_at_least_one_tile() {
        let face = Face::with_span(7, 0, 3);
        assert_eq!((face.tile_width(), face.tile_height()), (1, 3));
        assert!(face.is_multi_tile());
        assert!(!Face::new(1).is_multi_tile());
    }

    #[test]
    fn covered_offsets_skip_head() {
        let offsets: Vec<_> = Face::with_span(1, 2, 2).covered_offsets().collect();
        assert_eq!(offsets, vec![(0, 1), (1, 0), (1, 1)]);
    }

    #[test]
    fn default_square_is_blank_and_bright() {
        let square = MapSquare::default();
        assert!(square.is_blank());
        assert_eq!(square.darkness(), DARKNESS_FULL_BRIGHT);
        assert_eq!(square.face(NUM_LAYERS), None);
    }
}
