use std::collections::HashMap;
use std::sync::Arc;

/// Decoded RGBA8 face image. Multi-tile faces are anchored at their
/// bottom-right tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceImage {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl FaceImage {
    /// Returns `None` when `rgba` does not hold exactly `width * height` pixels.
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        let expected = (width as usize).checked_mul(height as usize)?.checked_mul(4)?;
        if rgba.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn solid(width: u32, height: u32, color: [u8; 4]) -> Self {
        let rgba = color
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            rgba,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<[u8; 4]> {
        let offset = self.offset(x, y)?;
        let mut color = [0u8; 4];
        color.copy_from_slice(&self.rgba[offset..offset + 4]);
        Some(color)
    }

    pub fn set_pixel(&mut self, x: i32, y: i32, color: [u8; 4]) {
        if let Some(offset) = self.offset(x, y) {
            self.rgba[offset..offset + 4].copy_from_slice(&color);
        }
    }

    /// Number of tiles the image covers horizontally and vertically.
    pub fn tile_span(&self, tile_size: i32) -> (u32, u32) {
        let tile = tile_size.max(1) as u32;
        (
            self.width.div_ceil(tile).max(1),
            self.height.div_ceil(tile).max(1),
        )
    }

    fn offset(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * 4)
    }
}

/// Resolves face ids to images.
pub trait FaceProvider: Send + Sync {
    /// Edge length of one map tile in pixels.
    fn tile_size(&self) -> i32;

    fn face_image(&self, face_id: u32) -> Option<Arc<FaceImage>>;
}

/// Faces kept in memory, e.g. generated at startup.
#[derive(Debug, Clone)]
pub struct MemoryFaceProvider {
    tile_size: i32,
    images: HashMap<u32, Arc<FaceImage>>,
}

impl MemoryFaceProvider {
    pub fn new(tile_size: i32) -> Self {
        Self {
            tile_size,
            images: HashMap::new(),
        }
    }

    pub fn insert(&mut self, face_id: u32, image: FaceImage) -> Option<Arc<FaceImage>> {
        self.images.insert(face_id, Arc::new(image))
    }

    /// Registers a single-tile face filled with `color`.
    pub fn insert_solid(&mut self, face_id: u32, color: [u8; 4]) {
        let size = self.tile_size.max(1) as u32;
        self.insert(face_id, FaceImage::solid(size, size, color));
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

impl FaceProvider for MemoryFaceProvider {
    fn tile_size(&self) -> i32 {
        self.tile_size
    }

    fn face_image(&self, face_id: u32) -> Option<Arc<FaceImage>> {
        self.images.get(&face_id).cloned()
    }
}
