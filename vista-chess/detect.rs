use rayon::prelude::*;
use vista_core::Point2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::response::RING_RADIUS;

/// Candidate X-junction with sub-pixel position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CornerCandidate {
    pub position: Point2,
    pub response: f32,
}

/// Thresholding and suppression settings for candidate extraction
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ChessParams {
    /// Candidates must exceed this fraction of the strongest response
    pub threshold_rel: f32,
    pub nms_radius: usize,
    /// Strongest candidates kept for lattice assembly
    pub max_candidates: usize,
}

impl Default for ChessParams {
    fn default() -> Self {
        Self {
            threshold_rel: 0.2,
            nms_radius: 3,
            max_candidates: 64,
        }
    }
}

/// Extract thresholded local maxima from a response map, strongest first
pub fn detect_candidates(
    response: &[f32],
    width: usize,
    height: usize,
    params: &ChessParams,
) -> Vec<CornerCandidate> {
    let max = response.iter().copied().fold(0.0f32, f32::max);
    if max <= 0.0 || height <= 2 * RING_RADIUS || width <= 2 * RING_RADIUS {
        return Vec::new();
    }
    let threshold = max * params.threshold_rel;
    let radius = params.nms_radius;

    let mut candidates: Vec<CornerCandidate> = (RING_RADIUS..height - RING_RADIUS)
        .into_par_iter()
        .flat_map_iter(|y| {
            let mut row = Vec::new();
            for x in RING_RADIUS..width - RING_RADIUS {
                let r = response[y * width + x];
                if r > threshold && is_local_max(response, width, height, x, y, radius) {
                    row.push(CornerCandidate {
                        position: refine_subpixel(response, width, x, y),
                        response: r,
                    });
                }
            }
            row
        })
        .collect();

    candidates.sort_by(|a, b| b.response.total_cmp(&a.response));
    candidates.truncate(params.max_candidates);
    candidates
}

/// Strict maximum in the window; plateau ties go to the raster-first pixel
fn is_local_max(response: &[f32], width: usize, height: usize, x: usize, y: usize, radius: usize) -> bool {
    let idx = y * width + x;
    let r = response[idx];
    for yy in y.saturating_sub(radius)..=(y + radius).min(height - 1) {
        for xx in x.saturating_sub(radius)..=(x + radius).min(width - 1) {
            let other = yy * width + xx;
            if other == idx {
                continue;
            }
            let o = response[other];
            if o > r || (o == r && other < idx) {
                return false;
            }
        }
    }
    true
}

/// Quadratic surface fit on the 3x3 neighbourhood of a response peak.
///
/// Offsets are clamped to half a pixel; a flat Hessian keeps the integer
/// position.
pub fn refine_subpixel(response: &[f32], width: usize, x: usize, y: usize) -> Point2 {
    let s = |dx: i32, dy: i32| -> f32 {
        response[(y as i32 + dy) as usize * width + (x as i32 + dx) as usize]
    };

    let dx = (s(1, 0) - s(-1, 0)) / 2.0;
    let dy = (s(0, 1) - s(0, -1)) / 2.0;
    let dxx = s(1, 0) - 2.0 * s(0, 0) + s(-1, 0);
    let dyy = s(0, 1) - 2.0 * s(0, 0) + s(0, -1);
    let dxy = (s(1, 1) - s(-1, 1) - s(1, -1) + s(-1, -1)) / 4.0;

    let det = dxx * dyy - dxy * dxy;
    if det.abs() < 1e-6 {
        return Point2::new(x as f32, y as f32);
    }

    let off_x = (-(dyy * dx - dxy * dy) / det).clamp(-0.5, 0.5);
    let off_y = (-(dxx * dy - dxy * dx) / det).clamp(-0.5, 0.5);
    Point2::new(x as f32 + off_x, y as f32 + off_y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn paraboloid(w: usize, h: usize, cx: f32, cy: f32) -> Vec<f32> {
        (0..h)
            .flat_map(|y| {
                (0..w).map(move |x| {
                    let dx = x as f32 - cx;
                    let dy = y as f32 - cy;
                    100.0 - dx * dx - dy * dy
                })
            })
            .collect()
    }

    #[test]
    fn test_refine_recovers_offset() {
        let resp = paraboloid(21, 21, 10.3, 9.8);
        let p = refine_subpixel(&resp, 21, 10, 10);
        assert_abs_diff_eq!(p.x, 10.3, epsilon = 1e-3);
        assert_abs_diff_eq!(p.y, 9.8, epsilon = 1e-3);
    }

    #[test]
    fn test_single_peak_detected() {
        let resp = paraboloid(21, 21, 10.0, 10.0);
        let cands = detect_candidates(&resp, 21, 21, &ChessParams::default());
        assert_eq!(cands.len(), 1);
        assert_eq!(cands[0].position, Point2::new(10.0, 10.0));
    }

    #[test]
    fn test_non_positive_map_has_no_candidates() {
        let resp = vec![-3.0f32; 400];
        assert!(detect_candidates(&resp, 20, 20, &ChessParams::default()).is_empty());
    }

    #[test]
    fn test_plateau_yields_one_candidate() {
        let mut resp = vec![0.0f32; 30 * 30];
        for y in 14..=15 {
            for x in 14..=15 {
                resp[y * 30 + x] = 50.0;
            }
        }
        let cands = detect_candidates(&resp, 30, 30, &ChessParams::default());
        assert_eq!(cands.len(), 1);
    }
}
