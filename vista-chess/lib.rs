//! Chessboard inner-corner finder.
//!
//! X-junctions are scored with the ChESS operator, thinned to sub-pixel
//! candidates and assembled into the complete `cols x rows` lattice of
//! inner corners. Corners come back row-major, so the anchor index of a
//! 3x3 pattern (4) is its centre corner.

pub mod detect;
pub mod error;
pub mod grid;
pub mod response;

pub use detect::{CornerCandidate, ChessParams};
pub use error::{ChessError, ChessResult};
pub use grid::ChessboardCorners;

use vista_core::{Image, Point2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Inner-corner count of a chessboard (squares minus one per axis)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PatternSize {
    pub cols: usize,
    pub rows: usize,
}

impl Default for PatternSize {
    fn default() -> Self {
        Self { cols: 3, rows: 3 }
    }
}

pub struct ChessboardFinder {
    pattern: PatternSize,
    params: ChessParams,
}

impl ChessboardFinder {
    pub fn new(pattern: PatternSize, params: ChessParams) -> ChessResult<Self> {
        if pattern.cols < 2 || pattern.rows < 2 {
            return Err(ChessError::InvalidPatternSize {
                cols: pattern.cols,
                rows: pattern.rows,
            });
        }
        Ok(Self { pattern, params })
    }

    pub fn pattern(&self) -> PatternSize {
        self.pattern
    }

    /// Locate every inner corner of the pattern in a row-major grayscale image
    pub fn find_corners(&self, img: &Image, width: usize, height: usize) -> ChessResult<ChessboardCorners> {
        let expected_len = width * height;
        if img.len() != expected_len {
            return Err(ChessError::InvalidImageData {
                expected_len,
                actual_len: img.len(),
            });
        }
        self.find_corners_view(img, width, height, width)
    }

    /// Same search over a `width x height` window of a larger buffer.
    ///
    /// `img` starts at the window's top-left pixel and consecutive rows
    /// are `stride` bytes apart, so a sub-region is searched in place.
    /// Returned points are window-local.
    pub fn find_corners_view(
        &self,
        img: &[u8],
        width: usize,
        height: usize,
        stride: usize,
    ) -> ChessResult<ChessboardCorners> {
        if stride < width {
            return Err(ChessError::InvalidStride { stride, width });
        }
        let min_size = 2 * response::RING_RADIUS + 3;
        if width < min_size || height < min_size {
            return Err(ChessError::ImageTooSmall {
                width,
                height,
                min_size,
            });
        }
        let expected_len = (height - 1) * stride + width;
        if img.len() < expected_len {
            return Err(ChessError::InvalidImageData {
                expected_len,
                actual_len: img.len(),
            });
        }

        let resp = response::chess_response(img, width, height, stride);
        let candidates = detect::detect_candidates(&resp, width, height, &self.params);
        log::debug!(
            "{} X-junction candidates in {}x{} region",
            candidates.len(),
            width,
            height
        );

        grid::assemble(&candidates, self.pattern.cols, self.pattern.rows).ok_or(
            ChessError::PatternNotFound {
                candidates: candidates.len(),
            },
        )
    }

    /// The `index`-th corner in row-major detection order
    pub fn find_anchor(&self, img: &Image, width: usize, height: usize, index: usize) -> ChessResult<Point2> {
        let board = self.find_corners(img, width, height)?;
        anchor(&board, index)
    }

    /// [`find_anchor`](Self::find_anchor) over a strided window
    pub fn find_anchor_view(
        &self,
        img: &[u8],
        width: usize,
        height: usize,
        stride: usize,
        index: usize,
    ) -> ChessResult<Point2> {
        let board = self.find_corners_view(img, width, height, stride)?;
        anchor(&board, index)
    }
}

fn anchor(board: &ChessboardCorners, index: usize) -> ChessResult<Point2> {
    board.points.get(index).copied().ok_or(ChessError::AnchorOutOfRange {
        index,
        count: board.points.len(),
    })
}
