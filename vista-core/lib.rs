pub mod geometry;

pub use geometry::{GeometryError, PerspectiveTransform, Point2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Row-major 8-bit grayscale image
pub type Image = Vec<u8>;

/// Key-point ≙ FAST corner + orientation (radians) + corner response
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub response: f32,
}

impl Keypoint {
    pub fn position(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }
}

/// 256-bit binary descriptor = 32 bytes
pub type Descriptor = [u8; 32];

/// Best correspondence for one query descriptor.
///
/// `query_idx` indexes the keypoints of image A, `train_idx` those of
/// image B. `distance` is the Hamming distance between the descriptors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    pub query_idx: usize,
    pub train_idx: usize,
    pub distance: f32,
}

/// Detector and descriptor settings shared by the feature stages
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FeatureConfig {
    /// FAST intensity threshold; lower values yield more keypoints
    pub threshold: u8,
    /// Side of the square patch used for orientation and BRIEF tests (odd)
    pub patch_size: usize,
    pub n_threads: usize,
    /// Radius of the non-maximum suppression window in pixels
    pub nms_radius: usize,
    /// Keep at most this many keypoints, strongest first (0 = unlimited)
    pub max_keypoints: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            threshold: 20,
            patch_size: 31,
            n_threads: num_cpus::get().max(1),
            nms_radius: 3,
            max_keypoints: 2000,
        }
    }
}

/// Initialize Rayon thread pool with the specified number of threads
pub fn init_thread_pool(n_threads: usize) -> Result<(), rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build_global()
}
