use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("tile size must be positive, got {tile_size}")]
    InvalidTileSize { tile_size: i32 },
    #[error("face provider tile size {provider} does not match renderer tile size {renderer}")]
    TileSizeMismatch { provider: i32, renderer: i32 },
    #[error("no image available for face {face}")]
    MissingFaceImage { face: u32 },
    #[error("square ({x}, {y}) layer {layer} references a head square without a face")]
    HeadWithoutFace { x: i32, y: i32, layer: usize },
}
