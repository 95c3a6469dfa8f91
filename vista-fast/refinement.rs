use crate::types::Candidate;
use rayon::prelude::*;
use vista_core::Image;

/// Non-maximum suppression and orientation assignment
pub struct KeypointRefinement;

impl KeypointRefinement {
    /// Keep candidates that are the strongest within a `(2r+1)²` window.
    ///
    /// Ties on a plateau go to the candidate that comes first in raster
    /// order, so exactly one survives per plateau.
    pub fn non_maximum_suppression(
        candidates: &[Candidate],
        width: usize,
        height: usize,
        radius: usize,
    ) -> Vec<Candidate> {
        if candidates.is_empty() || radius == 0 {
            return candidates.to_vec();
        }

        let mut response = vec![0.0f32; width * height];
        for c in candidates {
            response[c.y * width + c.x] = c.response;
        }

        candidates
            .par_iter()
            .filter(|c| {
                let idx = c.y * width + c.x;
                let y0 = c.y.saturating_sub(radius);
                let y1 = (c.y + radius).min(height - 1);
                let x0 = c.x.saturating_sub(radius);
                let x1 = (c.x + radius).min(width - 1);
                for yy in y0..=y1 {
                    for xx in x0..=x1 {
                        let other = yy * width + xx;
                        if other == idx {
                            continue;
                        }
                        let r = response[other];
                        if r > c.response || (r == c.response && other < idx) {
                            return false;
                        }
                    }
                }
                true
            })
            .copied()
            .collect()
    }

    /// Orientation by the intensity centroid of a square patch.
    ///
    /// Patches that would leave the image get angle 0.
    pub fn compute_orientation(
        img: &Image,
        width: usize,
        height: usize,
        x: usize,
        y: usize,
        patch_size: usize,
    ) -> f32 {
        let half = (patch_size / 2) as i64;
        let (cx, cy) = (x as i64, y as i64);

        if cx - half < 0 || cy - half < 0 || cx + half >= width as i64 || cy + half >= height as i64 {
            return 0.0;
        }

        let mut m10 = 0i64;
        let mut m01 = 0i64;
        for dy in -half..=half {
            let row = ((cy + dy) as usize) * width;
            for dx in -half..=half {
                let val = img[row + (cx + dx) as usize] as i64;
                m10 += dx * val;
                m01 += dy * val;
            }
        }

        if m10 == 0 && m01 == 0 {
            0.0
        } else {
            (m01 as f32).atan2(m10 as f32)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nms_keeps_strongest() {
        let cands = vec![
            Candidate { x: 10, y: 10, response: 5.0 },
            Candidate { x: 11, y: 10, response: 9.0 },
            Candidate { x: 30, y: 30, response: 1.0 },
        ];
        let kept = KeypointRefinement::non_maximum_suppression(&cands, 50, 50, 3);
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().any(|c| c.x == 11 && c.y == 10));
        assert!(kept.iter().any(|c| c.x == 30 && c.y == 30));
    }

    #[test]
    fn test_nms_plateau_single_survivor() {
        let cands = vec![
            Candidate { x: 20, y: 20, response: 4.0 },
            Candidate { x: 21, y: 20, response: 4.0 },
            Candidate { x: 20, y: 21, response: 4.0 },
        ];
        let kept = KeypointRefinement::non_maximum_suppression(&cands, 40, 40, 2);
        assert_eq!(kept, vec![Candidate { x: 20, y: 20, response: 4.0 }]);
    }

    #[test]
    fn test_orientation_points_to_bright_side() {
        let (w, h) = (21, 21);
        let mut img = vec![0u8; w * h];
        for y in 0..h {
            for x in 11..w {
                img[y * w + x] = 200;
            }
        }
        let angle = KeypointRefinement::compute_orientation(&img, w, h, 10, 10, 15);
        assert!(angle.abs() < 1e-3, "expected ~0 rad, got {}", angle);
    }

    #[test]
    fn test_orientation_near_border_is_zero() {
        let img = vec![100u8; 20 * 20];
        assert_eq!(KeypointRefinement::compute_orientation(&img, 20, 20, 2, 2, 15), 0.0);
    }
}
