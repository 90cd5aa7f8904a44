use crate::faces::FaceImage;

/// Off-screen RGBA8 pixel surface the map is composited into.
///
/// The buffer is always at least 1x1 and every pixel stays opaque: overlays are
/// blended source-over onto what is already there.
#[derive(Debug, Clone)]
pub struct PaintBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl PaintBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let mut pixels = vec![0u8; width as usize * height as usize * 4];
        for pixel in pixels.chunks_exact_mut(4) {
            pixel[3] = 255;
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<[u8; 4]> {
        let offset = self.byte_offset(x, y)?;
        let mut color = [0u8; 4];
        color.copy_from_slice(&self.pixels[offset..offset + 4]);
        Some(color)
    }

    pub fn fill(&mut self, color: [u8; 4]) {
        let color = opaque(color);
        for pixel in self.pixels.chunks_exact_mut(4) {
            pixel.copy_from_slice(&color);
        }
    }

    /// Fills black and blends the fog color over it.
    pub fn clear_to(&mut self, overlay: [u8; 4]) {
        self.fill([0, 0, 0, 255]);
        let (width, height) = (self.width as i32, self.height as i32);
        self.blend_rect(0, 0, width, height, overlay);
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, width: i32, height: i32, color: [u8; 4]) {
        let color = opaque(color);
        let Some((x0, y0, x1, y1)) = self.clip(x, y, width, height) else {
            return;
        };
        let stride = self.width as usize * 4;
        for row in y0..y1 {
            let start = row * stride + x0 * 4;
            let end = row * stride + x1 * 4;
            for pixel in self.pixels[start..end].chunks_exact_mut(4) {
                pixel.copy_from_slice(&color);
            }
        }
    }

    /// Source-over blend of a solid color over a clipped rectangle.
    pub fn blend_rect(&mut self, x: i32, y: i32, width: i32, height: i32, color: [u8; 4]) {
        if color[3] == 0 {
            return;
        }
        if color[3] == 255 {
            self.fill_rect(x, y, width, height, color);
            return;
        }
        let Some((x0, y0, x1, y1)) = self.clip(x, y, width, height) else {
            return;
        };
        let stride = self.width as usize * 4;
        for row in y0..y1 {
            let start = row * stride + x0 * 4;
            let end = row * stride + x1 * 4;
            for pixel in self.pixels[start..end].chunks_exact_mut(4) {
                blend_pixel(pixel, color);
            }
        }
    }

    /// Blends a prepared `size`x`size` RGBA tile at `(x, y)`.
    pub fn blend_tile(&mut self, x: i32, y: i32, size: i32, tile: &[u8]) {
        let size = size.max(0) as usize;
        if tile.len() < size * size * 4 {
            return;
        }
        for ty in 0..size {
            for tx in 0..size {
                let offset = (ty * size + tx) * 4;
                let mut color = [0u8; 4];
                color.copy_from_slice(&tile[offset..offset + 4]);
                self.blend_pixel_at(x + tx as i32, y + ty as i32, color);
            }
        }
    }

    /// Draws the `size`x`size` block of `image` whose top-left corner is
    /// `(src_x, src_y)` at `(x, y)`. Source pixels outside the image and
    /// destination pixels outside the buffer are skipped.
    pub fn draw_face_region(
        &mut self,
        image: &FaceImage,
        src_x: i32,
        src_y: i32,
        x: i32,
        y: i32,
        size: i32,
    ) {
        for dy in 0..size {
            for dx in 0..size {
                let Some(color) = image.pixel(src_x + dx, src_y + dy) else {
                    continue;
                };
                self.blend_pixel_at(x + dx, y + dy, color);
            }
        }
    }

    /// Moves the `width`x`height` block at `(x, y)` by `(dx, dy)`; overlapping
    /// source and destination are handled.
    pub fn copy_area(&mut self, x: i32, y: i32, width: i32, height: i32, dx: i32, dy: i32) {
        let Some((sx0, sy0, sx1, sy1)) = self.clip(x, y, width, height) else {
            return;
        };
        let Some((tx0, ty0, tx1, ty1)) = self.clip(
            sx0 as i32 + dx,
            sy0 as i32 + dy,
            (sx1 - sx0) as i32,
            (sy1 - sy0) as i32,
        ) else {
            return;
        };
        // Source shrinks to whatever part of the destination survived clipping.
        let src_x0 = (tx0 as i32 - dx) as usize;
        let src_y0 = (ty0 as i32 - dy) as usize;
        let row_bytes = (tx1 - tx0) * 4;
        let rows = ty1 - ty0;
        let stride = self.width as usize * 4;
        let mut copy_row = |index: usize| {
            let src = (src_y0 + index) * stride + src_x0 * 4;
            let dst = (ty0 + index) * stride + tx0 * 4;
            self.pixels.copy_within(src..src + row_bytes, dst);
        };
        if dy > 0 {
            (0..rows).rev().for_each(&mut copy_row);
        } else {
            (0..rows).for_each(&mut copy_row);
        }
    }

    /// Copies the overlapping area into a `target_width`x`target_height` RGBA frame.
    pub fn blit_to(&self, target: &mut [u8], target_width: u32, target_height: u32) {
        let width = self.width.min(target_width) as usize;
        let height = self.height.min(target_height) as usize;
        let src_stride = self.width as usize * 4;
        let dst_stride = target_width as usize * 4;
        for row in 0..height {
            let src = row * src_stride;
            let dst = row * dst_stride;
            let Some(dst_row) = target.get_mut(dst..dst + width * 4) else {
                return;
            };
            dst_row.copy_from_slice(&self.pixels[src..src + width * 4]);
        }
    }

    fn blend_pixel_at(&mut self, x: i32, y: i32, color: [u8; 4]) {
        if color[3] == 0 {
            return;
        }
        let Some(offset) = self.byte_offset(x, y) else {
            return;
        };
        blend_pixel(&mut self.pixels[offset..offset + 4], color);
    }

    fn byte_offset(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        let pixel_offset = (y as usize).checked_mul(self.width as usize)?.checked_add(x as usize)?;
        pixel_offset.checked_mul(4)
    }

    fn clip(&self, x: i32, y: i32, width: i32, height: i32) -> Option<(usize, usize, usize, usize)> {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = x.saturating_add(width).min(self.width as i32);
        let y1 = y.saturating_add(height).min(self.height as i32);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some((x0 as usize, y0 as usize, x1 as usize, y1 as usize))
    }
}

fn opaque(color: [u8; 4]) -> [u8; 4] {
    [color[0], color[1], color[2], 255]
}

fn blend_pixel(dst: &mut [u8], src: [u8; 4]) {
    let alpha = u32::from(src[3]);
    let inverse = 255 - alpha;
    for channel in 0..3 {
        let value = u32::from(src[channel]) * alpha + u32::from(dst[channel]) * inverse;
        dst[channel] = ((value + 127) / 255) as u8;
    }
    dst[3] = 255;
}
