use std::collections::{HashSet, VecDeque};
use std::mem;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, trace};

use crate::config::RenderConfig;
use crate::error::RenderError;
use crate::faces::FaceProvider;
use crate::map::{MapListener, MapModel};
use crate::sync::lock_recovering;

use super::compositor::TileCompositor;
use super::darkness::FOG_OF_WAR_COLOR;
use super::geometry::Viewport;
use super::surface::PaintBuffer;
use super::view::{AnchorMarkerRenderer, MainMapView, MiniMapView};

static RENDER_STATE_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

/// Work done since the last [`MapRenderer::take_stats`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub fast_copies: u32,
    pub full_redraws: u32,
    pub squares_composited: u32,
}

struct RenderState {
    buffer: PaintBuffer,
    viewport: Viewport,
    clear_pending: bool,
    scroll_pending: VecDeque<(i32, i32)>,
    compositor: TileCompositor,
    stats: RenderStats,
}

impl RenderState {
    fn relayout(&mut self, model: &MapModel) {
        self.viewport = Viewport::compute(
            self.compositor.tile_size(),
            self.buffer.width() as i32,
            self.buffer.height() as i32,
            model.width(),
            model.height(),
        );
    }

    fn composite(&mut self, model: &MapModel, x: i32, y: i32) -> Result<(), RenderError> {
        self.compositor
            .composite_square(&mut self.buffer, model, &self.viewport, x, y)?;
        self.stats.squares_composited += 1;
        Ok(())
    }

    /// Recomposites every visible square; queued scrolls and a pending clear
    /// are obsolete afterwards.
    fn redraw_all(&mut self, model: &MapModel) -> Result<(), RenderError> {
        self.clear_pending = false;
        self.scroll_pending.clear();
        for (x, y) in visible_squares(self.viewport) {
            self.composite(model, x, y)?;
        }
        Ok(())
    }
}

/// Keeps an off-screen image of the map current with as little compositing as
/// possible.
///
/// Map notifications arrive on the updater thread with the model lock held;
/// painting happens on the window thread, which must take the model lock
/// before calling in here.
pub struct MapRenderer {
    config: RenderConfig,
    tile_size: i32,
    marker: Option<Arc<dyn AnchorMarkerRenderer>>,
    state: Mutex<RenderState>,
}

impl MapRenderer {
    pub fn new(config: RenderConfig, compositor: TileCompositor) -> Self {
        let tile_size = compositor.tile_size();
        let buffer = PaintBuffer::new(1, 1);
        let viewport = Viewport::compute(tile_size, 1, 1, 0, 0);
        Self {
            config,
            tile_size,
            marker: None,
            state: Mutex::new(RenderState {
                buffer,
                viewport,
                clear_pending: false,
                scroll_pending: VecDeque::new(),
                compositor,
                stats: RenderStats::default(),
            }),
        }
    }

    pub fn with_marker(mut self, marker: Arc<dyn AnchorMarkerRenderer>) -> Self {
        self.marker = Some(marker);
        self
    }

    /// Renderer for the main map view.
    pub fn main_view(
        config: RenderConfig,
        faces: Arc<dyn FaceProvider>,
    ) -> Result<Self, RenderError> {
        let compositor = TileCompositor::new(faces.tile_size(), faces, Arc::new(MainMapView))?;
        Ok(Self::new(config, compositor))
    }

    /// Renderer for the minimap, with the player drawn as a red tile.
    pub fn mini_map(
        config: RenderConfig,
        faces: Arc<dyn FaceProvider>,
    ) -> Result<Self, RenderError> {
        let view = Arc::new(MiniMapView::default());
        let compositor = TileCompositor::new(faces.tile_size(), faces, view.clone())?;
        Ok(Self::new(config, compositor).with_marker(view))
    }

    pub fn config(&self) -> RenderConfig {
        self.config
    }

    pub fn viewport(&self) -> Viewport {
        self.lock_state().viewport
    }

    pub fn take_stats(&self) -> RenderStats {
        mem::take(&mut self.lock_state().stats)
    }

    /// Copy of the off-screen buffer as it is right now.
    pub fn buffer_snapshot(&self) -> PaintBuffer {
        self.lock_state().buffer.clone()
    }

    /// Reallocates the buffer for a new component size and redraws it.
    pub fn resize(&self, model: &MapModel, width: u32, height: u32) -> Result<(), RenderError> {
        let mut state = self.lock_state();
        state.buffer = PaintBuffer::new(width, height);
        state.relayout(model);
        debug!(
            width = state.buffer.width(),
            height = state.buffer.height(),
            tiles_x = state.viewport.x.tile_count(),
            tiles_y = state.viewport.y.tile_count(),
            "renderer_resized"
        );
        state.redraw_all(model)?;
        self.finish_cycle(&mut state);
        Ok(())
    }

    pub fn redraw_all(&self, model: &MapModel) -> Result<(), RenderError> {
        let mut state = self.lock_state();
        state.redraw_all(model)?;
        self.finish_cycle(&mut state);
        Ok(())
    }

    /// Everything shown belongs to the previous map; fog it on the next cycle.
    pub fn on_new_map(&self) {
        let mut state = self.lock_state();
        state.clear_pending = true;
        state.scroll_pending.clear();
    }

    pub fn on_map_scrolled(&self, dx: i32, dy: i32) {
        self.lock_state().scroll_pending.push_back((dx, dy));
    }

    pub fn on_map_size_changed(&self, model: &MapModel) -> Result<(), RenderError> {
        let mut state = self.lock_state();
        state.relayout(model);
        debug!(
            map_width = model.width(),
            map_height = model.height(),
            "renderer_map_size_changed"
        );
        state.redraw_all(model)?;
        self.finish_cycle(&mut state);
        Ok(())
    }

    /// Applies queued work, then recomposites the changed squares once each.
    pub fn on_map_changed(&self, model: &MapModel, changed: &[(i32, i32)]) -> Result<(), RenderError> {
        let mut state = self.lock_state();
        let changed: HashSet<(i32, i32)> = changed.iter().copied().collect();
        self.process_pending(&mut state, model, &changed)?;

        let viewport = state.viewport;
        let mut visible: Vec<_> = changed
            .into_iter()
            .filter(|&(x, y)| viewport.contains(x, y))
            .collect();
        visible.sort_unstable();
        for (x, y) in visible {
            state.composite(model, x, y)?;
        }
        self.finish_cycle(&mut state);
        Ok(())
    }

    /// Brings the buffer up to date and copies it into `target`.
    pub fn paint(
        &self,
        model: &MapModel,
        target: &mut [u8],
        target_width: u32,
        target_height: u32,
    ) -> Result<(), RenderError> {
        let mut state = self.lock_state();
        self.process_pending(&mut state, model, &HashSet::new())?;
        self.finish_cycle(&mut state);
        state.buffer.blit_to(target, target_width, target_height);
        Ok(())
    }

    /// Copies the buffer as is; pending work stays queued.
    pub fn blit_to_screen(&self, target: &mut [u8], target_width: u32, target_height: u32) {
        self.lock_state()
            .buffer
            .blit_to(target, target_width, target_height);
    }

    fn lock_state(&self) -> MutexGuard<'_, RenderState> {
        lock_recovering(&self.state, "render_state", &RENDER_STATE_LOCK_POISON_WARNED)
    }

    fn process_pending(
        &self,
        state: &mut RenderState,
        model: &MapModel,
        changed: &HashSet<(i32, i32)>,
    ) -> Result<(), RenderError> {
        if state.clear_pending {
            state.buffer.clear_to(FOG_OF_WAR_COLOR);
            state.scroll_pending.clear();
            state.clear_pending = false;
        }
        if state.scroll_pending.is_empty() {
            return Ok(());
        }

        let tile = self.tile_size;
        let viewport = state.viewport;
        let width = state.buffer.width() as i32;
        let height = state.buffer.height() as i32;
        let trail = self.marker.as_ref().is_some_and(|marker| marker.leaves_trail());

        // Stale squares are tracked in current coordinates and recomposited
        // after the whole queue is applied, so each is drawn once.
        let mut full_redraw = false;
        let mut stale: HashSet<(i32, i32)> = HashSet::new();
        while let Some((dx, dy)) = state.scroll_pending.pop_front() {
            if full_redraw {
                continue;
            }
            if self.config.avoid_copy_area || dx.abs() * tile >= width || dy.abs() * tile >= height {
                trace!(dx, dy, "renderer_scroll_full_redraw");
                full_redraw = true;
                state.stats.full_redraws += 1;
                continue;
            }

            state.buffer.copy_area(
                dx.max(0) * tile,
                dy.max(0) * tile,
                width - dx.abs() * tile,
                height - dy.abs() * tile,
                -dx * tile,
                -dy * tile,
            );
            state.stats.fast_copies += 1;
            stale = stale
                .into_iter()
                .map(|(x, y)| (x - dx, y - dy))
                .filter(|&(x, y)| viewport.contains(x, y))
                .collect();
            stale.extend(exposed_squares(&viewport, dx, dy));
            // Copied pixels carry the out-of-map fog of their old position.
            stale.extend(visible_squares(viewport).filter(|&(x, y)| {
                viewport.in_map_bounds(x, y) != viewport.in_map_bounds(x + dx, y + dy)
            }));
            if trail && (dx != 0 || dy != 0) {
                let (ax, ay) = viewport.anchor_tile();
                stale.insert((ax - dx, ay - dy));
            }
        }

        let mut squares: Vec<(i32, i32)> = if full_redraw {
            visible_squares(viewport).collect()
        } else {
            stale.into_iter().collect()
        };
        squares.sort_unstable();
        for (x, y) in squares {
            if !viewport.contains(x, y) || changed.contains(&(x, y)) || model.is_dirty(x, y) {
                continue;
            }
            state.composite(model, x, y)?;
        }
        Ok(())
    }

    fn finish_cycle(&self, state: &mut RenderState) {
        if let Some(marker) = &self.marker {
            let viewport = state.viewport;
            marker.mark_anchor(
                &mut state.buffer,
                viewport.player_x,
                viewport.player_y,
                self.tile_size,
            );
        }
        trace!(
            fast_copies = state.stats.fast_copies,
            full_redraws = state.stats.full_redraws,
            squares_composited = state.stats.squares_composited,
            "renderer_cycle_done"
        );
    }
}

impl MapListener for MapRenderer {
    fn map_changed(&self, model: &MapModel, changed: &[(i32, i32)]) -> Result<(), RenderError> {
        self.on_map_changed(model, changed)
    }

    fn new_map(&self) {
        self.on_new_map();
    }

    fn map_scrolled(&self, dx: i32, dy: i32) {
        self.on_map_scrolled(dx, dy);
    }

    fn map_size_changed(
        &self,
        model: &MapModel,
        _width: i32,
        _height: i32,
    ) -> Result<(), RenderError> {
        self.on_map_size_changed(model)
    }
}

fn visible_squares(viewport: Viewport) -> impl Iterator<Item = (i32, i32)> {
    (viewport.y.min_tile..viewport.y.max_tile)
        .flat_map(move |y| (viewport.x.min_tile..viewport.x.max_tile).map(move |x| (x, y)))
}

/// Squares whose pixels were not covered by the copied block after a scroll
/// by `(dx, dy)`. A partially visible edge tile adds one column or row.
fn exposed_squares(viewport: &Viewport, dx: i32, dy: i32) -> Vec<(i32, i32)> {
    let x = viewport.x;
    let y = viewport.y;
    let columns = if dx > 0 {
        let count = dx + i32::from(x.max_offset != 0);
        (x.max_tile - count).max(x.min_tile)..x.max_tile
    } else if dx < 0 {
        let count = -dx + i32::from(x.min_offset != 0);
        x.min_tile..(x.min_tile + count).min(x.max_tile)
    } else {
        0..0
    };
    let rows = if dy > 0 {
        let count = dy + i32::from(y.max_offset != 0);
        (y.max_tile - count).max(y.min_tile)..y.max_tile
    } else if dy < 0 {
        let count = -dy + i32::from(y.min_offset != 0);
        y.min_tile..(y.min_tile + count).min(y.max_tile)
    } else {
        0..0
    };

    let mut squares = Vec::new();
    for column in columns {
        squares.extend((y.min_tile..y.max_tile).map(|row| (column, row)));
    }
    for row in rows {
        squares.extend((x.min_tile..x.max_tile).map(|column| (column, row)));
    }
    squares
}
