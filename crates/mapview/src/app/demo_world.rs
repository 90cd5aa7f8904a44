use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use maprender::{
    Face, FaceImage, FaceLoadError, FaceProvider, ImageFaceProvider, MapUpdate, MapUpdater,
    MemoryFaceProvider, RenderError, DARKNESS_FULL_BRIGHT,
};
use tracing::{debug, error, info};

pub(crate) const GRASS: u32 = 1;
pub(crate) const WATER: u32 = 2;
pub(crate) const ROCK: u32 = 3;
pub(crate) const TREE: u32 = 4;
pub(crate) const PLAYER: u32 = 5;
pub(crate) const TOWER: u32 = 6;

const FACE_NAMES: [(u32, &str); 6] = [
    (GRASS, "grass"),
    (WATER, "water"),
    (ROCK, "rock"),
    (TREE, "tree"),
    (PLAYER, "player"),
    (TOWER, "tower"),
];

const GROUND_LAYER: usize = 0;
const OBJECT_LAYER: usize = 3;
const PLAYER_LAYER: usize = 6;

/// Steps taken along each side of the square patrol route.
const PATROL_LEG: u64 = 12;
const DAY_LENGTH_STEPS: u64 = 96;

/// Loads `<faces_dir>/<name>.png` for every demo face.
pub(crate) fn load_face_images(
    faces_dir: &Path,
    tile_size: i32,
) -> Result<ImageFaceProvider, FaceLoadError> {
    let mut provider = ImageFaceProvider::new(faces_dir, tile_size);
    provider.register_all(FACE_NAMES)?;
    Ok(provider)
}

/// Procedural stand-ins for the demo faces.
pub(crate) fn procedural_faces(tile_size: i32) -> MemoryFaceProvider {
    let tile = tile_size.max(1) as u32;
    let mut provider = MemoryFaceProvider::new(tile_size);
    provider.insert(GRASS, speckled(tile, [46, 120, 40, 255], [70, 150, 55, 255], 7));
    provider.insert(WATER, speckled(tile, [30, 70, 160, 255], [60, 110, 200, 255], 5));
    provider.insert(ROCK, speckled(tile, [110, 105, 100, 255], [80, 76, 72, 255], 3));
    provider.insert(TREE, disc(tile, tile, [20, 80, 25, 255]));
    provider.insert(PLAYER, disc(tile, tile, [230, 200, 60, 255]));

    let mut tower = FaceImage::solid(2 * tile, 2 * tile, [0, 0, 0, 0]);
    let wall = [150, 140, 120, 255];
    let border = (tile / 4).max(1) as i32;
    for y in border..2 * tile as i32 {
        for x in border..2 * tile as i32 - border {
            tower.set_pixel(x, y, wall);
        }
    }
    provider.insert(TOWER, tower);
    provider
}

fn speckled(tile: u32, base: [u8; 4], speck: [u8; 4], every: u32) -> FaceImage {
    let mut image = FaceImage::solid(tile, tile, base);
    for y in 0..tile {
        for x in 0..tile {
            if (x * 7 + y * 13) % every.max(1) == 0 {
                image.set_pixel(x as i32, y as i32, speck);
            }
        }
    }
    image
}

fn disc(width: u32, height: u32, color: [u8; 4]) -> FaceImage {
    let mut image = FaceImage::solid(width, height, [0, 0, 0, 0]);
    let radius = width.min(height) as i32 / 2 - 1;
    let (cx, cy) = (width as i32 / 2, height as i32 / 2);
    for y in 0..height as i32 {
        for x in 0..width as i32 {
            if (x - cx).pow(2) + (y - cy).pow(2) <= radius.pow(2) {
                image.set_pixel(x, y, color);
            }
        }
    }
    image
}

/// Deterministic world content at absolute position `(wx, wy)`.
fn ground_at(wx: i32, wy: i32) -> u32 {
    match cell_hash(wx.div_euclid(3), wy.div_euclid(3)) % 10 {
        0 | 1 => WATER,
        2 => ROCK,
        _ => GRASS,
    }
}


fn cell_hash(x: i32, y: i32) -> u32 {
    let mut h = (x as u32).wrapping_mul(0x9E37_79B1) ^ (y as u32).wrapping_mul(0x85EB_CA77);
    h ^= h >> 15;
    h = h.wrapping_mul(0x2C1B_3C6D);
    h ^ (h >> 12)
}

/// Walks the player around a square route and streams the map around them
/// into the updater, the way a game server would.
pub(crate) struct DemoWorld {
    map_width: i32,
    map_height: i32,
    tower: Face,
    player_x: i32,
    player_y: i32,
    step: u64,
}

impl DemoWorld {
    /// The tower spans as many tiles as its image in `faces` covers.
    pub(crate) fn new(map_width: i32, map_height: i32, faces: &dyn FaceProvider) -> Self {
        let (tiles_x, tiles_y) = faces
            .face_image(TOWER)
            .map_or((1, 1), |image| image.tile_span(faces.tile_size()));
        Self {
            map_width,
            map_height,
            tower: Face::with_span(TOWER, tiles_x, tiles_y),
            player_x: 0,
            player_y: 0,
            step: 0,
        }
    }

    fn object_at(&self, wx: i32, wy: i32) -> Option<Face> {
        if wx.rem_euclid(11) == 5 && wy.rem_euclid(9) == 4 {
            return Some(self.tower);
        }
        (ground_at(wx, wy) == GRASS && cell_hash(wx, wy) % 7 == 0).then(|| Face::new(TREE))
    }

    fn anchor(&self) -> (i32, i32) {
        ((self.map_width - 1) / 2, (self.map_height - 1) / 2)
    }

    fn vision_radius(&self) -> i32 {
        (self.map_width.min(self.map_height) / 2 - 1).max(1)
    }

    pub(crate) fn direction(step: u64) -> (i32, i32) {
        match (step / PATROL_LEG) % 4 {
            0 => (1, 0),
            1 => (0, 1),
            2 => (-1, 0),
            _ => (0, -1),
        }
    }

    fn ambient_darkness(&self) -> u16 {
        let phase = self.step % DAY_LENGTH_STEPS;
        let half = DAY_LENGTH_STEPS / 2;
        let distance_from_noon = phase.abs_diff(half);
        let light = DARKNESS_FULL_BRIGHT as u64 - distance_from_noon * 160 / half;
        light as u16
    }

    /// Sends the first full view of the map.
    pub(crate) fn start(&self, updater: &MapUpdater) -> Result<(), RenderError> {
        updater.new_map(self.map_width, self.map_height)?;
        let mut update = updater.begin();
        self.refresh_view(&mut update);
        update.end()
    }

    /// Moves the player one square and sends what changed.
    pub(crate) fn advance(&mut self, updater: &MapUpdater) -> Result<(), RenderError> {
        let (dx, dy) = Self::direction(self.step);
        self.step += 1;
        self.player_x += dx;
        self.player_y += dy;

        let (ax, ay) = self.anchor();
        let mut update = updater.begin();
        update.scroll(dx, dy);
        update.face(ax - dx, ay - dy, PLAYER_LAYER, None);
        self.refresh_view(&mut update);
        debug!(
            player_x = self.player_x,
            player_y = self.player_y,
            step = self.step,
            "demo_player_moved"
        );
        update.end()
    }

    fn refresh_view(&self, update: &mut MapUpdate<'_>) {
        let (ax, ay) = self.anchor();
        let radius = self.vision_radius();
        let ambient = self.ambient_darkness();
        for y in 0..self.map_height {
            for x in 0..self.map_width {
                let distance = (x - ax).abs().max((y - ay).abs());
                if distance > radius {
                    update.clear(x, y);
                    continue;
                }
                let (wx, wy) = (self.player_x + x - ax, self.player_y + y - ay);
                let falloff = (distance * 12) as u16;
                update.darkness(x, y, ambient.saturating_sub(falloff));
                update.face(x, y, GROUND_LAYER, Some(Face::new(ground_at(wx, wy))));
                update.face(x, y, OBJECT_LAYER, self.object_at(wx, wy));
            }
        }
        update.face(ax, ay, PLAYER_LAYER, Some(Face::new(PLAYER)));
    }
}

/// Background thread feeding the updater until stopped.
pub(crate) struct DemoFeed {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl DemoFeed {
    pub(crate) fn spawn(
        updater: Arc<MapUpdater>,
        mut world: DemoWorld,
        interval: Duration,
    ) -> io::Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let handle = thread::Builder::new()
            .name("map_updater".to_string())
            .spawn(move || {
                if let Err(err) = world.start(&updater) {
                    error!(error = %err, "demo_map_start_failed");
                    return;
                }
                info!(
                    map_width = world.map_width,
                    map_height = world.map_height,
                    "demo_map_started"
                );
                while flag.load(Ordering::Relaxed) {
                    thread::sleep(interval);
                    if let Err(err) = world.advance(&updater) {
                        error!(error = %err, step = world.step, "demo_map_update_failed");
                        return;
                    }
                }
            })?;
        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    pub(crate) fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("demo_map_thread_panicked");
            }
        }
    }
}

impl Drop for DemoFeed {
    fn drop(&mut self) {
        self.stop();
    }
}
