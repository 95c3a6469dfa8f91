//! Feature-match visualisation and chessboard rectification.
//!
//! [`FeatureMatcher`] renders filtered FAST/BRIEF matches between two
//! images; [`Rectifier`] warps a four-board image onto a fixed canvas.
//! [`pipeline::run`] drives both over a materials directory.

pub mod config;
pub mod error;
pub mod feature_matcher;
pub mod pipeline;
pub mod rectify;
pub mod render;

pub use config::{RectifyConfig, RectifyJob, VistaConfig};
pub use error::{VistaError, VistaResult};
pub use feature_matcher::{FeatureMatcher, ImageFeatures, PairMatches};
pub use pipeline::{RunReport, run};
pub use rectify::{Quadrant, Rectification, Rectifier, Region};

pub use vista_core::{self, Descriptor, FeatureConfig, Keypoint, Match, init_thread_pool};
