mod model;
mod square;
mod updater;

pub use model::MapModel;
pub use square::{Face, MapSquare, DARKNESS_FULL_BRIGHT, NUM_LAYERS};
pub use updater::{MapListener, MapUpdate, MapUpdater};
