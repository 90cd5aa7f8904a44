/// Visible tile window along one axis.
///
/// Tiles `min_tile..max_tile` cover the component; the first one starts
/// `min_offset` pixels before the component edge (`-tile_size < min_offset <= 0`)
/// and the last one reaches `max_offset` pixels past the far edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AxisRange {
    pub min_tile: i32,
    pub max_tile: i32,
    pub min_offset: i32,
    pub max_offset: i32,
}

impl AxisRange {
    pub fn tile_count(&self) -> i32 {
        self.max_tile - self.min_tile
    }

    pub fn contains(&self, tile: i32) -> bool {
        self.min_tile <= tile && tile < self.max_tile
    }

    /// Pixel position of map coordinate 0 along this axis.
    pub fn origin_px(&self, tile_size: i32) -> i32 {
        self.min_offset - self.min_tile * tile_size
    }
}

/// Geometry of the map view for one component size and map size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub tile_size: i32,
    pub width: i32,
    pub height: i32,
    pub map_width: i32,
    pub map_height: i32,
    pub player_x: i32,
    pub player_y: i32,
    pub x: AxisRange,
    pub y: AxisRange,
}

impl Viewport {
    /// Lays out the view; the anchor tile is drawn centered in the component.
    pub fn compute(tile_size: i32, width: i32, height: i32, map_width: i32, map_height: i32) -> Self {
        let player_x = width / 2 - tile_size / 2;
        let player_y = height / 2 - tile_size / 2;
        Self {
            tile_size,
            width,
            height,
            map_width,
            map_height,
            player_x,
            player_y,
            x: compute_visible_range(width, tile_size, player_x, map_width),
            y: compute_visible_range(height, tile_size, player_y, map_height),
        }
    }

    pub fn offset_x(&self) -> i32 {
        self.x.origin_px(self.tile_size)
    }

    pub fn offset_y(&self) -> i32 {
        self.y.origin_px(self.tile_size)
    }

    pub fn square_origin_px(&self, x: i32, y: i32) -> (i32, i32) {
        (
            tile_to_pixel(x, self.tile_size, self.offset_x()),
            tile_to_pixel(y, self.tile_size, self.offset_y()),
        )
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.x.contains(x) && self.y.contains(y)
    }

    pub fn in_map_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.map_width && y < self.map_height
    }

    /// Map coordinate of the square the player marker sits on.
    pub fn anchor_tile(&self) -> (i32, i32) {
        (anchor_tile(self.map_width), anchor_tile(self.map_height))
    }

    pub fn screen_to_square(&self, screen_x: i32, screen_y: i32) -> (i32, i32) {
        (
            pixel_to_tile(screen_x, self.tile_size, self.offset_x()),
            pixel_to_tile(screen_y, self.tile_size, self.offset_y()),
        )
    }
}

pub fn tile_to_pixel(tile_index: i32, tile_size: i32, pixel_offset: i32) -> i32 {
    pixel_offset + tile_index * tile_size
}

pub fn pixel_to_tile(pixel: i32, tile_size: i32, pixel_offset: i32) -> i32 {
    (pixel - pixel_offset).div_euclid(tile_size)
}

/// Computes the visible tile window for one axis.
///
/// `player_px` is where the anchor tile `(map_size - 1) / 2` is drawn. The
/// covered span is at least `component_size` and less than
/// `component_size + 2 * tile_size`.
pub fn compute_visible_range(
    component_size: i32,
    tile_size: i32,
    player_px: i32,
    map_size: i32,
) -> AxisRange {
    let tiles_before_player = div_round_up(player_px, tile_size);
    let min_offset = player_px - tiles_before_player * tile_size;
    let min_tile = anchor_tile(map_size) - tiles_before_player;
    let tiles = div_round_up(component_size - min_offset, tile_size);
    AxisRange {
        min_tile,
        max_tile: min_tile + tiles,
        min_offset,
        max_offset: modulo(min_offset - component_size, tile_size),
    }
}

fn anchor_tile(map_size: i32) -> i32 {
    (map_size - 1).max(0) / 2
}

/// Ceiling division for any sign of `numerator`; `denominator` must be positive.
pub fn div_round_up(numerator: i32, denominator: i32) -> i32 {
    let quotient = numerator.div_euclid(denominator);
    if numerator.rem_euclid(denominator) == 0 {
        quotient
    } else {
        quotient + 1
    }
}

/// Remainder in `0..divisor`.
pub fn modulo(value: i32, divisor: i32) -> i32 {
    value.rem_euclid(divisor)
}
