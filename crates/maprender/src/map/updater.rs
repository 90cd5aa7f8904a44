use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, trace, warn};

use super::model::MapModel;
use super::square::Face;
use crate::error::RenderError;
use crate::sync::lock_recovering;

static MODEL_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);
static LISTENERS_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

/// Receives map notifications. Every call is made with the model lock held,
/// so implementations must not call back into the updater.
pub trait MapListener: Send + Sync {
    /// A batch of updates ended; `changed` holds the modified squares in
    /// relative coordinates.
    fn map_changed(&self, model: &MapModel, changed: &[(i32, i32)]) -> Result<(), RenderError>;

    /// The server started a new map; everything shown so far is stale.
    fn new_map(&self);

    fn map_scrolled(&self, dx: i32, dy: i32);

    fn map_size_changed(
        &self,
        model: &MapModel,
        width: i32,
        height: i32,
    ) -> Result<(), RenderError>;
}

/// Owns the map model and fans out change notifications.
pub struct MapUpdater {
    model: Mutex<MapModel>,
    listeners: Mutex<Vec<Arc<dyn MapListener>>>,
}

impl Default for MapUpdater {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl MapUpdater {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            model: Mutex::new(MapModel::new(width, height)),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn add_listener(&self, listener: Arc<dyn MapListener>) {
        self.lock_listeners().push(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn MapListener>) -> bool {
        let mut listeners = self.lock_listeners();
        let before = listeners.len();
        listeners.retain(|candidate| !Arc::ptr_eq(candidate, listener));
        listeners.len() != before
    }

    /// Read access for painting and resizing. Take this before any renderer lock.
    pub fn lock_model(&self) -> MutexGuard<'_, MapModel> {
        lock_recovering(&self.model, "map_model", &MODEL_LOCK_POISON_WARNED)
    }

    /// Starts a new map of the given size.
    pub fn new_map(&self, width: i32, height: i32) -> Result<(), RenderError> {
        let mut model = self.lock_model();
        let size_changed = model.width() != width || model.height() != height;
        model.reset(width, height);
        debug!(width, height, size_changed, "map_new");

        let listeners = self.listeners();
        let mut result = Ok(());
        if size_changed {
            for listener in &listeners {
                keep_first_error(
                    &mut result,
                    listener.map_size_changed(&model, model.width(), model.height()),
                );
            }
        }
        for listener in &listeners {
            listener.new_map();
        }
        result
    }

    /// Starts a batch of updates. Listeners hear about the changes when the
    /// batch ends.
    pub fn begin(&self) -> MapUpdate<'_> {
        MapUpdate {
            model: self.lock_model(),
            listeners: self.listeners(),
        }
    }

    /// A face image became available; redraws every visible square using it.
    pub fn face_updated(&self, face_id: u32) -> Result<(), RenderError> {
        let mut update = self.begin();
        let marked = update.model.mark_face_dirty(face_id);
        trace!(face = face_id, squares = marked, "map_face_updated");
        update.end()
    }

    fn lock_listeners(&self) -> MutexGuard<'_, Vec<Arc<dyn MapListener>>> {
        lock_recovering(
            &self.listeners,
            "map_listeners",
            &LISTENERS_LOCK_POISON_WARNED,
        )
    }

    fn listeners(&self) -> Vec<Arc<dyn MapListener>> {
        self.lock_listeners().clone()
    }
}

/// One server map update, holding the model lock until [`MapUpdate::end`].
pub struct MapUpdate<'a> {
    model: MutexGuard<'a, MapModel>,
    listeners: Vec<Arc<dyn MapListener>>,
}

impl MapUpdate<'_> {
    pub fn model(&self) -> &MapModel {
        &self.model
    }

    pub fn face(&mut self, x: i32, y: i32, layer: usize, face: Option<Face>) {
        self.model.set_face(x, y, layer, face);
    }

    pub fn clear(&mut self, x: i32, y: i32) {
        self.model.clear_square(x, y);
    }

    pub fn darkness(&mut self, x: i32, y: i32, level: u16) {
        self.model.set_darkness(x, y, level);
    }

    /// Scrolls the model, then tells listeners. Returns `true` if the scroll
    /// fogged the whole map.
    pub fn scroll(&mut self, dx: i32, dy: i32) -> bool {
        let full = self.model.scroll(dx, dy);
        trace!(dx, dy, full, "map_scrolled");
        for listener in &self.listeners {
            listener.map_scrolled(dx, dy);
        }
        full
    }

    /// Ends the batch and reports the dirty squares.
    pub fn end(mut self) -> Result<(), RenderError> {
        let changed = self.model.take_dirty_squares();
        trace!(squares = changed.len(), "map_update_end");
        let mut result = Ok(());
        for listener in &self.listeners {
            keep_first_error(&mut result, listener.map_changed(&self.model, &changed));
        }
        result
    }
}

/// Every listener hears about every batch; the first failure is reported
/// once all of them have run.
fn keep_first_error(result: &mut Result<(), RenderError>, outcome: Result<(), RenderError>) {
    if let Err(err) = outcome {
        warn!(error = %err, "map_listener_failed");
        if result.is_ok() {
            *result = Err(err);
        }
    }
}
