mod image_provider;
mod provider;

pub use image_provider::{FaceLoadError, ImageFaceProvider};
pub use provider::{FaceImage, FaceProvider, MemoryFaceProvider};
