use rayon::prelude::*;
use vista_core::{Descriptor, Match};

/// Number of differing bits between two binary descriptors
#[inline]
pub fn hamming_distance(a: &Descriptor, b: &Descriptor) -> u32 {
    a.chunks_exact(8)
        .zip(b.chunks_exact(8))
        .map(|(x, y)| {
            let mut xa = [0u8; 8];
            let mut ya = [0u8; 8];
            xa.copy_from_slice(x);
            ya.copy_from_slice(y);
            (u64::from_le_bytes(xa) ^ u64::from_le_bytes(ya)).count_ones()
        })
        .sum()
}

/// Exhaustive nearest-neighbour search under Hamming distance.
///
/// Directional: every query descriptor gets exactly one match (its closest
/// train descriptor, lowest index on ties) unless the train set is empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct BruteForceMatcher;

impl BruteForceMatcher {
    pub fn new() -> Self {
        Self
    }

    pub fn match_descriptors(&self, query: &[Descriptor], train: &[Descriptor]) -> Vec<Match> {
        if query.is_empty() || train.is_empty() {
            return Vec::new();
        }

        let matches: Vec<Match> = query
            .par_iter()
            .enumerate()
            .map(|(query_idx, q)| {
                let mut best_idx = 0;
                let mut best = u32::MAX;
                for (train_idx, t) in train.iter().enumerate() {
                    let d = hamming_distance(q, t);
                    if d < best {
                        best = d;
                        best_idx = train_idx;
                        if d == 0 {
                            break;
                        }
                    }
                }
                Match {
                    query_idx,
                    train_idx: best_idx,
                    distance: best as f32,
                }
            })
            .collect();

        log::debug!("matched {} query descriptors against {}", query.len(), train.len());
        matches
    }
}
