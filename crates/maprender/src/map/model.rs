use std::collections::{HashMap, HashSet};

use tracing::{trace, warn};

use super::square::{Face, MapSquare, DARKNESS_FULL_BRIGHT, NUM_LAYERS};

/// In-memory map state as reported by the server.
///
/// All public coordinates are relative to the current view; squares are stored
/// under absolute coordinates so remembered content follows the map when it
/// scrolls (`relative = absolute + offset`).
#[derive(Debug, Default)]
pub struct MapModel {
    width: i32,
    height: i32,
    offset_x: i32,
    offset_y: i32,
    squares: HashMap<(i32, i32), MapSquare>,
    dirty: HashSet<(i32, i32)>,
    memory_margin: Option<i32>,
}

impl MapModel {
    pub fn new(width: i32, height: i32) -> Self {
        let mut model = Self::default();
        model.reset(width, height);
        model
    }

    /// Forgets every square and sets the visible map size.
    pub fn reset(&mut self, width: i32, height: i32) {
        self.width = width.max(0);
        self.height = height.max(0);
        self.offset_x = 0;
        self.offset_y = 0;
        self.squares.clear();
        self.dirty.clear();
    }

    /// Squares more than `margin` tiles outside the visible map are forgotten
    /// whenever the map scrolls. `None` remembers every square ever seen.
    pub fn set_memory_margin(&mut self, margin: Option<i32>) {
        self.memory_margin = margin.map(|margin| margin.max(0));
    }

    pub fn memory_margin(&self) -> Option<i32> {
        self.memory_margin
    }

    pub fn remembered_squares(&self) -> usize {
        self.squares.len()
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn offset(&self) -> (i32, i32) {
        (self.offset_x, self.offset_y)
    }

    pub fn square(&self, x: i32, y: i32) -> Option<&MapSquare> {
        self.squares.get(&self.absolute(x, y))
    }

    pub fn face(&self, x: i32, y: i32, layer: usize) -> Option<Face> {
        self.square(x, y).and_then(|square| square.face(layer))
    }

    pub fn darkness(&self, x: i32, y: i32) -> u16 {
        self.square(x, y)
            .map_or(DARKNESS_FULL_BRIGHT, MapSquare::darkness)
    }

    pub fn is_fog_of_war(&self, x: i32, y: i32) -> bool {
        self.square(x, y).is_some_and(MapSquare::is_fog_of_war)
    }

    /// Offset to the head square of the multi-tile face covering `(x, y)` on
    /// `layer`. A fog-of-war head is hidden from squares that are not fog.
    pub fn visible_head(&self, x: i32, y: i32, layer: usize) -> Option<(i32, i32)> {
        let square = self.square(x, y)?;
        let (dx, dy) = square.head_offset(layer)?;
        if !square.is_fog_of_war() && self.is_fog_of_war(x + dx, y + dy) {
            return None;
        }
        Some((dx, dy))
    }

    pub fn is_dirty(&self, x: i32, y: i32) -> bool {
        self.dirty.contains(&self.absolute(x, y))
    }

    pub fn mark_dirty(&mut self, x: i32, y: i32) {
        let key = self.absolute(x, y);
        self.dirty.insert(key);
    }

    /// Returns the squares modified since the last call, sorted, and forgets them.
    pub fn take_dirty_squares(&mut self) -> Vec<(i32, i32)> {
        let mut squares: Vec<_> = self
            .dirty
            .drain()
            .map(|(ax, ay)| (ax + self.offset_x, ay + self.offset_y))
            .collect();
        squares.sort_unstable();
        squares
    }

    /// Marks every visible square showing `face_id` on any layer dirty.
    pub fn mark_face_dirty(&mut self, face_id: u32) -> usize {
        let mut marked = 0;
        for y in 0..self.height {
            for x in 0..self.width {
                let uses_face = self.square(x, y).is_some_and(|square| {
                    square.faces.iter().flatten().any(|face| face.id == face_id)
                });
                if uses_face {
                    self.mark_dirty(x, y);
                    marked += 1;
                }
            }
        }
        marked
    }

    pub fn set_face(&mut self, x: i32, y: i32, layer: usize, face: Option<Face>) {
        if layer >= NUM_LAYERS {
            warn!(x, y, layer, "map_face_layer_out_of_range");
            return;
        }
        if self.reset_fog_of_war(x, y) {
            self.set_darkness(x, y, DARKNESS_FULL_BRIGHT);
            for other in 0..NUM_LAYERS {
                let replacement = if other == layer { face } else { None };
                self.set_face_internal(x, y, other, replacement);
            }
            self.mark_dirty(x, y);
        } else {
            self.set_face_internal(x, y, layer, face);
        }
    }

    /// Sets the darkness level; levels above full bright are clamped. A
    /// fog-of-war square becomes live again and loses its remembered faces.
    pub fn set_darkness(&mut self, x: i32, y: i32, level: u16) {
        let level = level.min(DARKNESS_FULL_BRIGHT);
        let square = self.square_mut(x, y);
        let was_fog = square.fog_of_war;
        let changed = was_fog || square.darkness != level;
        square.fog_of_war = false;
        square.darkness = level;
        if changed {
            self.mark_dirty(x, y);
        }
        if was_fog {
            for layer in 0..NUM_LAYERS {
                self.set_face_internal(x, y, layer, None);
            }
        }
    }

    /// Turns a square the server no longer reports into fog of war. Its faces
    /// are kept and drawn under the fog overlay.
    pub fn clear_square(&mut self, x: i32, y: i32) {
        let key = self.absolute(x, y);
        let Some(square) = self.squares.get_mut(&key) else {
            return;
        };
        if !square.fog_of_war && !square.is_blank() {
            square.fog_of_war = true;
            self.dirty.insert(key);
        }
        let faces = square.faces;
        for (layer, face) in faces.iter().enumerate() {
            if let Some(face) = face {
                self.dirty_face(x, y, layer, *face);
            }
        }
    }

    /// Moves the view by `(dx, dy)` tiles. Returns `true` when the scroll was
    /// at least as large as the map and every visible square became fog.
    pub fn scroll(&mut self, dx: i32, dy: i32) -> bool {
        let (width, height) = (self.width, self.height);
        if dx.abs() >= width || dy.abs() >= height {
            self.shift_origin(-dx, -dy);
            for y in 0..height {
                for x in 0..width {
                    self.clear_square(x, y);
                }
            }
            self.forget_distant_squares();
            return true;
        }

        for _ in 0..dx.max(0) {
            self.shift_origin(-1, 0);
            for y in 0..height {
                self.clear_square(-1, y);
                self.clear_square(width - 1, y);
            }
        }
        for _ in 0..(-dx).max(0) {
            self.shift_origin(1, 0);
            for y in 0..height {
                self.clear_square(0, y);
                self.clear_square(width, y);
            }
        }
        for _ in 0..dy.max(0) {
            self.shift_origin(0, -1);
            for x in 0..width {
                self.clear_square(x, -1);
                self.clear_square(x, height - 1);
            }
        }
        for _ in 0..(-dy).max(0) {
            self.shift_origin(0, 1);
            for x in 0..width {
                self.clear_square(x, 0);
                self.clear_square(x, height);
            }
        }
        self.forget_distant_squares();
        false
    }

    /// Drops squares beyond the memory margin. They are reported dirty so a
    /// view that still shows them redraws them blank, and head references
    /// into them are removed.
    fn forget_distant_squares(&mut self) {
        let Some(margin) = self.memory_margin else {
            return;
        };
        let (offset_x, offset_y) = (self.offset_x, self.offset_y);
        let (width, height) = (self.width, self.height);
        let forgotten: Vec<(i32, i32)> = self
            .squares
            .keys()
            .copied()
            .filter(|&(ax, ay)| {
                let (x, y) = (ax + offset_x, ay + offset_y);
                x < -margin || y < -margin || x >= width + margin || y >= height + margin
            })
            .collect();
        if forgotten.is_empty() {
            return;
        }
        for key in &forgotten {
            self.squares.remove(key);
            self.dirty.insert(*key);
        }

        let mut orphaned = Vec::new();
        for (&(ax, ay), square) in &self.squares {
            for (layer, head) in square.heads.iter().enumerate() {
                if let Some((dx, dy)) = head {
                    if !self.squares.contains_key(&(ax + dx, ay + dy)) {
                        orphaned.push(((ax, ay), layer));
                    }
                }
            }
        }
        for (key, layer) in orphaned {
            if let Some(square) = self.squares.get_mut(&key) {
                square.heads[layer] = None;
            }
            self.dirty.insert(key);
        }
        trace!(squares = forgotten.len(), "map_squares_forgotten");
    }

    fn absolute(&self, x: i32, y: i32) -> (i32, i32) {
        (x - self.offset_x, y - self.offset_y)
    }

    fn square_mut(&mut self, x: i32, y: i32) -> &mut MapSquare {
        let key = self.absolute(x, y);
        self.squares.entry(key).or_default()
    }

    fn shift_origin(&mut self, dx: i32, dy: i32) {
        self.offset_x += dx;
        self.offset_y += dy;
    }

    fn reset_fog_of_war(&mut self, x: i32, y: i32) -> bool {
        let square = self.square_mut(x, y);
        if !square.fog_of_war {
            return false;
        }
        square.fog_of_war = false;
        self.mark_dirty(x, y);
        true
    }

    fn set_face_internal(&mut self, x: i32, y: i32, layer: usize, face: Option<Face>) {
        if let Some(old) = self.face(x, y, layer) {
            self.expand_face(x, y, layer, old, false);
        }
        let square = self.square_mut(x, y);
        if square.faces[layer] != face {
            square.faces[layer] = face;
            self.mark_dirty(x, y);
        }
        if let Some(face) = face {
            self.expand_face(x, y, layer, face, true);
        }
    }

    /// Points (or unpoints) the squares a multi-tile face covers at its head.
    fn expand_face(&mut self, x: i32, y: i32, layer: usize, face: Face, attach: bool) {
        for (dx, dy) in face.covered_offsets() {
            let (tx, ty) = (x - dx, y - dy);
            if attach {
                self.set_head(tx, ty, layer, Some((dx, dy)), true);
            } else if self.visible_head(tx, ty, layer) == Some((dx, dy)) {
                self.set_head(tx, ty, layer, None, true);
            }
        }
    }

    fn dirty_face(&mut self, x: i32, y: i32, layer: usize, face: Face) {
        for (dx, dy) in face.covered_offsets() {
            let (tx, ty) = (x - dx, y - dy);
            if self.is_fog_of_war(tx, ty) {
                self.mark_dirty(tx, ty);
            } else {
                self.set_head(tx, ty, layer, None, false);
            }
        }
    }

    /// Without `always`, an existing head is only replaced when it is fog of war.
    fn set_head(&mut self, x: i32, y: i32, layer: usize, head: Option<(i32, i32)>, always: bool) {
        let current = self.square(x, y).and_then(|square| square.head_offset(layer));
        if current == head {
            return;
        }
        let current_is_fog =
            current.is_some_and(|(dx, dy)| self.is_fog_of_war(x + dx, y + dy));
        if !(always || current.is_none() || current_is_fog) {
            return;
        }
        self.square_mut(x, y).heads[layer] = head;
        self.mark_dirty(x, y);
    }
}
