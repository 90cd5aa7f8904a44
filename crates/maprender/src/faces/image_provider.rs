use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::ImageReader;
use thiserror::Error;
use tracing::{debug, info};

use super::provider::{FaceImage, FaceProvider};
use crate::face_names::{validate_face_name, FaceNameError};

#[derive(Debug, Error)]
pub enum FaceLoadError {
    #[error("invalid face name '{name}': {source}")]
    InvalidName {
        name: String,
        #[source]
        source: FaceNameError,
    },
    #[error("failed to open face image {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode face image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("decoded face image {path} has inconsistent pixel data")]
    PixelData { path: PathBuf },
    #[error("face {face_id} registered twice ('{existing}' and '{name}')")]
    DuplicateId {
        face_id: u32,
        existing: String,
        name: String,
    },
}

/// Faces decoded from `<root>/<name>.png` files at registration time.
#[derive(Debug)]
pub struct ImageFaceProvider {
    root: PathBuf,
    tile_size: i32,
    names: HashMap<u32, String>,
    images: HashMap<u32, Arc<FaceImage>>,
}

impl ImageFaceProvider {
    pub fn new(root: impl Into<PathBuf>, tile_size: i32) -> Self {
        Self {
            root: root.into(),
            tile_size,
            names: HashMap::new(),
            images: HashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Loads the image for `name` and makes it available as `face_id`.
    pub fn register(&mut self, face_id: u32, name: &str) -> Result<Arc<FaceImage>, FaceLoadError> {
        validate_face_name(name).map_err(|source| FaceLoadError::InvalidName {
            name: name.to_string(),
            source,
        })?;
        if let Some(existing) = self.names.get(&face_id) {
            return Err(FaceLoadError::DuplicateId {
                face_id,
                existing: existing.clone(),
                name: name.to_string(),
            });
        }

        let path = self.root.join(format!("{name}.png"));
        let image = Arc::new(load_face_rgba(&path)?);
        let (tiles_x, tiles_y) = image.tile_span(self.tile_size);
        debug!(
            face = face_id,
            name,
            width = image.width(),
            height = image.height(),
            tiles_x,
            tiles_y,
            "face_loaded"
        );
        self.names.insert(face_id, name.to_string());
        self.images.insert(face_id, Arc::clone(&image));
        Ok(image)
    }

    /// Registers every `(id, name)` pair, stopping at the first failure.
    pub fn register_all<'a>(
        &mut self,
        faces: impl IntoIterator<Item = (u32, &'a str)>,
    ) -> Result<usize, FaceLoadError> {
        let mut loaded = 0usize;
        for (face_id, name) in faces {
            self.register(face_id, name)?;
            loaded += 1;
        }
        info!(root = %self.root.display(), faces = loaded, "faces_registered");
        Ok(loaded)
    }

    pub fn name(&self, face_id: u32) -> Option<&str> {
        self.names.get(&face_id).map(String::as_str)
    }
}

impl FaceProvider for ImageFaceProvider {
    fn tile_size(&self) -> i32 {
        self.tile_size
    }

    fn face_image(&self, face_id: u32) -> Option<Arc<FaceImage>> {
        self.images.get(&face_id).cloned()
    }
}

fn load_face_rgba(path: &Path) -> Result<FaceImage, FaceLoadError> {
    let reader = ImageReader::open(path).map_err(|source| FaceLoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let decoded = reader.decode().map_err(|source| FaceLoadError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    let image = decoded.to_rgba8();
    let (width, height) = image.dimensions();
    FaceImage::from_rgba(width, height, image.into_raw()).ok_or_else(|| {
        FaceLoadError::PixelData {
            path: path.to_path_buf(),
        }
    })
}
