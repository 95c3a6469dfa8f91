//! Descriptor matching and match filtering.

pub mod filter;
pub mod matcher;

pub use filter::{DistanceBounds, FilterPolicy};
pub use matcher::{BruteForceMatcher, hamming_distance};
