use std::collections::HashMap;

use super::*;
use crate::faces::{FaceImage, MemoryFaceProvider};
use crate::map::{Face, MapSquare, MapUpdater};
use crate::rendering::view::TileBackgroundRenderer;

const TILE: i32 = 32;
const TRANSLUCENT_FACE: u32 = 6;
const BIG_FACE: u32 = 9;

/// Paints black like the main view and counts composites per square origin.
#[derive(Default)]
struct CountingBackground {
    counts: Mutex<HashMap<(i32, i32), u32>>,
}

impl CountingBackground {
    fn take(&self) -> HashMap<(i32, i32), u32> {
        mem::take(&mut *self.counts.lock().expect("counts lock"))
    }
}

impl TileBackgroundRenderer for CountingBackground {
    fn paint_square_background(
        &self,
        buffer: &mut PaintBuffer,
        px: i32,
        py: i32,
        tile_size: i32,
        _has_image: bool,
        _square: Option<&MapSquare>,
    ) {
        *self
            .counts
            .lock()
            .expect("counts lock")
            .entry((px, py))
            .or_default() += 1;
        buffer.fill_rect(px, py, tile_size, tile_size, [0, 0, 0, 255]);
    }
}

fn face_provider() -> MemoryFaceProvider {
    let mut provider = MemoryFaceProvider::new(TILE);
    for id in 1..=5u32 {
        provider.insert_solid(id, [(id * 40) as u8, (id * 20) as u8, 255 - (id * 30) as u8, 255]);
    }
    provider.insert(
        TRANSLUCENT_FACE,
        FaceImage::solid(TILE as u32, TILE as u32, [250, 250, 0, 128]),
    );
    let mut big = FaceImage::solid(2 * TILE as u32, 2 * TILE as u32, [0, 0, 0, 255]);
    for y in 0..2 * TILE {
        for x in 0..2 * TILE {
            big.set_pixel(x, y, [x as u8 * 3, y as u8 * 3, 128, 255]);
        }
    }
    provider.insert(BIG_FACE, big);
    provider
}

fn counting_renderer(config: RenderConfig) -> (MapRenderer, Arc<CountingBackground>) {
    let background = Arc::new(CountingBackground::default());
    let compositor = TileCompositor::new(TILE, Arc::new(face_provider()), background.clone())
        .expect("compositor");
    (MapRenderer::new(config, compositor), background)
}

fn main_renderer() -> MapRenderer {
    MapRenderer::main_view(RenderConfig::default(), Arc::new(face_provider())).expect("renderer")
}

fn mini_renderer() -> MapRenderer {
    MapRenderer::mini_map(RenderConfig::default(), Arc::new(face_provider())).expect("renderer")
}

fn squares_of(viewport: &Viewport, counts: &HashMap<(i32, i32), u32>) -> Vec<(i32, i32)> {
    let mut squares: Vec<_> = counts
        .keys()
        .map(|&(px, py)| viewport.screen_to_square(px, py))
        .collect();
    squares.sort_unstable();
    squares
}

/// Faces, darkness, fog and a multi-tile face spread over the map.
fn terrain(width: i32, height: i32) -> MapModel {
    let mut model = MapModel::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let id = 1 + ((x * 7 + y * 3) % 5) as u32;
            model.set_face(x, y, 0, Some(Face::new(id)));
            if (x + y) % 4 == 0 {
                model.set_face(x, y, 1, Some(Face::new(TRANSLUCENT_FACE)));
            }
            if (x * y) % 6 == 1 {
                model.set_darkness(x, y, ((x * 31 + y * 17) % 255) as u16);
            }
        }
    }
    model.set_face(width / 2 + 1, height / 2 + 1, 2, Some(Face::with_span(BIG_FACE, 2, 2)));
    model.clear_square(width / 2 - 2, height / 2);
    model.take_dirty_squares();
    model
}

fn load_terrain(updater: &MapUpdater, width: i32, height: i32) {
    let source = terrain(width, height);
    let mut update = updater.begin();
    for y in 0..height {
        for x in 0..width {
            let square = source.square(x, y).cloned().unwrap_or_default();
            for layer in 0..crate::map::NUM_LAYERS {
                if let Some(face) = square.face(layer) {
                    update.face(x, y, layer, Some(face));
                }
            }
            update.darkness(x, y, square.darkness());
        }
    }
    update.clear(width / 2 - 2, height / 2);
    update.end().expect("load terrain");
}

#[test]
fn centered_320x240_view_composites_every_visible_square_once() {
    let (renderer, background) = counting_renderer(RenderConfig::default());
    let model = MapModel::new(50, 50);
    renderer.resize(&model, 320, 240).expect("resize");

    let viewport = renderer.viewport();
    assert_eq!(viewport.x.tile_count(), 11);
    assert_eq!(viewport.y.tile_count(), 9);
    let counts = background.take();
    assert_eq!(counts.len(), 99);
    assert!(counts.values().all(|&count| count == 1));
    assert_eq!(renderer.take_stats().squares_composited, 99);
}

#[test]
fn scroll_by_three_copies_and_redraws_four_columns() {
    let (renderer, background) = counting_renderer(RenderConfig::default());
    let model = MapModel::new(50, 50);
    renderer.resize(&model, 320, 240).expect("resize");
    renderer.take_stats();
    background.take();

    renderer.on_map_scrolled(3, 0);
    renderer.on_map_changed(&model, &[]).expect("changed");

    let stats = renderer.take_stats();
    assert_eq!(stats.fast_copies, 1);
    assert_eq!(stats.full_redraws, 0);
    assert_eq!(stats.squares_composited, 36);

    let viewport = renderer.viewport();
    let squares = squares_of(&viewport, &background.take());
    assert_eq!(squares.len(), 36);
    assert!(squares
        .iter()
        .all(|&(x, _)| (viewport.x.max_tile - 4..viewport.x.max_tile).contains(&x)));
}

#[test]
fn scroll_by_twenty_recomposites_everything() {
    let (renderer, background) = counting_renderer(RenderConfig::default());
    let model = MapModel::new(50, 50);
    renderer.resize(&model, 320, 240).expect("resize");
    renderer.take_stats();
    background.take();

    renderer.on_map_scrolled(20, 0);
    renderer.on_map_changed(&model, &[]).expect("changed");

    let stats = renderer.take_stats();
    assert_eq!(stats.fast_copies, 0);
    assert_eq!(stats.full_redraws, 1);
    assert_eq!(stats.squares_composited, 99);
    assert!(background.take().values().all(|&count| count == 1));
}

#[test]
fn fast_copy_needs_one_surviving_tile_column() {
    let model = MapModel::new(50, 50);

    let renderer = main_renderer();
    renderer.resize(&model, 320, 240).expect("resize");
    renderer.take_stats();
    renderer.on_map_scrolled(10, 0);
    renderer.on_map_changed(&model, &[]).expect("changed");
    let stats = renderer.take_stats();
    assert_eq!((stats.fast_copies, stats.full_redraws), (0, 1));

    renderer.resize(&model, 321, 240).expect("resize");
    renderer.take_stats();
    renderer.on_map_scrolled(10, 0);
    renderer.on_map_changed(&model, &[]).expect("changed");
    let stats = renderer.take_stats();
    assert_eq!((stats.fast_copies, stats.full_redraws), (1, 0));
}

#[test]
fn vertical_scroll_as_tall_as_buffer_redraws() {
    let model = MapModel::new(50, 50);
    let renderer = main_renderer();
    renderer.resize(&model, 320, 240).expect("resize");
    renderer.take_stats();
    renderer.on_map_scrolled(0, -8);
    renderer.on_map_changed(&model, &[]).expect("changed");
    assert_eq!(renderer.take_stats().full_redraws, 1);
}

#[test]
fn avoid_copy_area_always_redraws() {
    let (renderer, _background) = counting_renderer(RenderConfig {
        avoid_copy_area: true,
    });
    let model = MapModel::new(50, 50);
    renderer.resize(&model, 320, 240).expect("resize");
    renderer.take_stats();

    renderer.on_map_scrolled(1, 0);
    renderer.on_map_changed(&model, &[]).expect("changed");
    let stats = renderer.take_stats();
    assert_eq!((stats.fast_copies, stats.full_redraws), (0, 1));
}

#[test]
fn changed_squares_in_exposed_strip_are_drawn_once() {
    let (renderer, background) = counting_renderer(RenderConfig::default());
    let model = MapModel::new(50, 50);
    renderer.resize(&model, 320, 240).expect("resize");
    background.take();

    let viewport = renderer.viewport();
    let edge = (viewport.x.max_tile - 1, viewport.y.min_tile + 2);
    let middle = viewport.anchor_tile();
    renderer.on_map_scrolled(2, 0);
    renderer.on_map_changed(&model, &[edge, middle]).expect("changed");

    let counts = background.take();
    assert!(counts.values().all(|&count| count == 1));
    let squares = squares_of(&viewport, &counts);
    assert!(squares.contains(&edge));
    assert!(squares.contains(&middle));
}

#[test]
fn changed_squares_outside_the_view_are_skipped() {
    let (renderer, background) = counting_renderer(RenderConfig::default());
    let model = MapModel::new(50, 50);
    renderer.resize(&model, 320, 240).expect("resize");
    background.take();

    renderer.on_map_changed(&model, &[(0, 0), (49, 49)]).expect("changed");
    assert!(background.take().is_empty());
}

fn run_incremental_scenario(
    renderer: Arc<MapRenderer>,
    fresh: MapRenderer,
    map_size: i32,
    overlay_face: u32,
) {
    let updater = MapUpdater::new(map_size, map_size);
    updater.add_listener(renderer.clone());
    renderer
        .resize(&updater.lock_model(), 320, 240)
        .expect("resize");
    load_terrain(&updater, map_size, map_size);

    let batches: [&[(i32, i32)]; 6] = [
        &[(1, 0)],
        &[(0, -1)],
        &[(2, 1)],
        &[(1, 0), (1, 0)],
        &[(-3, 0), (0, 2)],
        &[(0, 0)],
    ];
    let anchor = map_size / 2;
    for (step, scrolls) in batches.iter().enumerate() {
        let step = step as i32;
        let mut update = updater.begin();
        for &(dx, dy) in scrolls.iter() {
            update.scroll(dx, dy);
        }
        update.face(anchor + step - 2, anchor - 1, 1, Some(Face::new(overlay_face)));
        update.darkness(anchor - 1, anchor + 1, (60 + step * 10) as u16);
        if step == 2 {
            update.clear(anchor + 1, anchor + 1);
        }
        update.end().expect("batch");
    }

    let model = updater.lock_model();
    fresh.resize(&model, 320, 240).expect("fresh resize");
    let incremental = renderer.buffer_snapshot();
    let full = fresh.buffer_snapshot();
    assert_eq!(incremental.width(), full.width());
    for y in 0..full.height() as i32 {
        for x in 0..full.width() as i32 {
            assert_eq!(incremental.pixel(x, y), full.pixel(x, y), "pixel ({x}, {y})");
        }
    }
}

#[test]
fn incremental_updates_match_full_redraw() {
    run_incremental_scenario(Arc::new(main_renderer()), main_renderer(), 25, TRANSLUCENT_FACE);
}

#[test]
fn incremental_updates_match_full_redraw_when_view_exceeds_map() {
    run_incremental_scenario(Arc::new(main_renderer()), main_renderer(), 7, TRANSLUCENT_FACE);
}

#[test]
fn minimap_trail_is_cleaned_up_incrementally() {
    // The minimap keeps pixels under translucent faces, so use an opaque one.
    run_incremental_scenario(Arc::new(mini_renderer()), mini_renderer(), 25, 2);
}

#[test]
fn no_square_is_composited_twice_per_cycle() {
    let background = Arc::new(CountingBackground::default());
    let compositor = TileCompositor::new(TILE, Arc::new(face_provider()), background.clone())
        .expect("compositor");
    let renderer = Arc::new(MapRenderer::new(RenderConfig::default(), compositor));
    let updater = MapUpdater::new(25, 25);
    updater.add_listener(renderer.clone());
    renderer
        .resize(&updater.lock_model(), 320, 240)
        .expect("resize");
    load_terrain(&updater, 25, 25);

    for scrolls in [vec![(1, 1)], vec![(-1, 0), (-1, 0)], vec![(0, 3), (2, -1)]] {
        background.take();
        let mut update = updater.begin();
        for (dx, dy) in scrolls {
            update.scroll(dx, dy);
        }
        update.face(12, 12, 3, Some(Face::new(2)));
        update.end().expect("batch");
        let counts = background.take();
        assert!(!counts.is_empty());
        assert!(
            counts.values().all(|&count| count == 1),
            "counts={counts:?}"
        );
    }
}

#[test]
fn map_size_change_and_resize_commute() {
    let model = terrain(25, 25);

    let size_first = main_renderer();
    size_first.on_map_size_changed(&model).expect("size");
    size_first.resize(&model, 320, 240).expect("resize");

    let resize_first = main_renderer();
    resize_first.resize(&model, 320, 240).expect("resize");
    resize_first.on_map_size_changed(&model).expect("size");

    assert_eq!(size_first.viewport(), resize_first.viewport());
    assert_eq!(
        size_first.buffer_snapshot().pixels(),
        resize_first.buffer_snapshot().pixels()
    );
}

#[test]
fn new_map_fogs_everything_and_drops_queued_scrolls() {
    let model = terrain(25, 25);
    let renderer = main_renderer();
    renderer.resize(&model, 64, 48).expect("resize");
    renderer.take_stats();

    renderer.on_map_scrolled(1, 0);
    renderer.on_new_map();
    let mut frame = vec![0u8; 64 * 48 * 4];
    renderer.paint(&model, &mut frame, 64, 48).expect("paint");

    assert_eq!(renderer.take_stats(), RenderStats::default());
    assert!(frame.chunks_exact(4).all(|pixel| pixel == [0, 0, 64, 255]));
}

#[test]
fn blit_does_not_apply_queued_scrolls() {
    let model = MapModel::new(50, 50);
    let renderer = main_renderer();
    renderer.resize(&model, 320, 240).expect("resize");
    renderer.take_stats();

    renderer.on_map_scrolled(1, 0);
    let mut frame = vec![0u8; 320 * 240 * 4];
    renderer.blit_to_screen(&mut frame, 320, 240);
    assert_eq!(renderer.take_stats(), RenderStats::default());

    renderer.paint(&model, &mut frame, 320, 240).expect("paint");
    assert_eq!(renderer.take_stats().fast_copies, 1);
}

#[test]
fn minimap_marks_player_and_leaves_no_trail() {
    let model = MapModel::new(50, 50);
    let renderer = mini_renderer();
    renderer.resize(&model, 320, 240).expect("resize");
    let viewport = renderer.viewport();
    let snapshot = renderer.buffer_snapshot();
    assert_eq!(
        snapshot.pixel(viewport.player_x, viewport.player_y),
        Some([255, 0, 0, 255])
    );

    renderer.on_map_scrolled(1, 0);
    renderer.on_map_changed(&model, &[]).expect("changed");
    let snapshot = renderer.buffer_snapshot();
    assert_eq!(
        snapshot.pixel(viewport.player_x, viewport.player_y),
        Some([255, 0, 0, 255])
    );
    assert_eq!(
        snapshot.pixel(viewport.player_x - TILE, viewport.player_y),
        Some([0, 0, 0, 255])
    );
}

#[test]
fn resize_to_zero_keeps_a_one_pixel_buffer() {
    let model = MapModel::new(11, 11);
    let renderer = main_renderer();
    renderer.resize(&model, 0, 0).expect("resize");
    let snapshot = renderer.buffer_snapshot();
    assert_eq!((snapshot.width(), snapshot.height()), (1, 1));
}

#[test]
fn missing_face_fails_the_update() {
    let updater = MapUpdater::new(11, 11);
    let renderer = Arc::new(main_renderer());
    updater.add_listener(renderer.clone());
    renderer
        .resize(&updater.lock_model(), 320, 240)
        .expect("resize");

    let mut update = updater.begin();
    update.face(5, 5, 0, Some(Face::new(404)));
    let error = update.end().expect_err("unknown face");
    assert_eq!(error, RenderError::MissingFaceImage { face: 404 });
}
