//! FAST-9 keypoint detection.
//!
//! Candidates pass the segment test on the radius-3 Bresenham circle, are
//! thinned by windowed non-maximum suppression, ranked by corner score and
//! given an intensity-centroid orientation for steered descriptors.

pub mod detector;
pub mod error;
pub mod refinement;
pub mod types;
pub mod utils;

pub use detector::FastDetector;
pub use error::{FastError, FastResult};
pub use refinement::KeypointRefinement;
pub use types::Candidate;
