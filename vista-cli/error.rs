use std::path::PathBuf;

use thiserror::Error;
use vista_brief::BriefError;
use vista_chess::ChessError;
use vista_core::GeometryError;
use vista_fast::FastError;

use crate::rectify::Quadrant;

#[derive(Debug, Error)]
pub enum VistaError {
    #[error("failed to load image {}: {source}", path.display())]
    ImageLoad {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("failed to write image {}: {source}", path.display())]
    ImageSave {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid TOML config: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("failed to serialize config as TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("keypoint detection failed: {0}")]
    Fast(#[from] FastError),
    #[error("descriptor extraction failed: {0}")]
    Brief(#[from] BriefError),
    #[error("chessboard finder setup failed: {0}")]
    ChessSetup(#[from] ChessError),
    #[error("chessboard search failed in quadrant {quadrant}: {source}")]
    Chess { quadrant: Quadrant, source: ChessError },
    #[error("pattern not found in quadrant {quadrant}")]
    PatternNotFound { quadrant: Quadrant },
    #[error("perspective transform failed: {0}")]
    Geometry(#[from] GeometryError),
    #[error("failed to compose match image: {0}")]
    Render(#[source] image::ImageError),
}

pub type VistaResult<T> = Result<T, VistaError>;
