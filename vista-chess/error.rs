use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChessError {
    #[error("Image data length mismatch: expected {expected_len}, got {actual_len}")]
    InvalidImageData { expected_len: usize, actual_len: usize },
    #[error("Row stride {stride} shorter than width {width}")]
    InvalidStride { stride: usize, width: usize },
    #[error("Image {width}x{height} too small (minimum {min_size}x{min_size})")]
    ImageTooSmall { width: usize, height: usize, min_size: usize },
    #[error("Invalid pattern size {cols}x{rows} (need at least 2x2 inner corners)")]
    InvalidPatternSize { cols: usize, rows: usize },
    #[error("Chessboard pattern not found ({candidates} corner candidates)")]
    PatternNotFound { candidates: usize },
    #[error("Anchor index {index} out of range for {count} corners")]
    AnchorOutOfRange { index: usize, count: usize },
}

pub type ChessResult<T> = Result<T, ChessError>;
