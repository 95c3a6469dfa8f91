use crate::error::{FastError, FastResult};
use crate::refinement::KeypointRefinement;
use crate::types::{Candidate, CornerType};
use crate::utils::has_consecutive_bits;
use rayon::prelude::*;
use vista_core::{FeatureConfig, Image, Keypoint};

/// Minimum arc length for the segment test (FAST-9)
const ARC_LENGTH: usize = 9;

/// FAST keypoint detector with non-maximum suppression and orientation
#[derive(Debug, Clone)]
pub struct FastDetector {
    cfg: FeatureConfig,
    w: usize,
    h: usize,
}

impl FastDetector {
    /// Bresenham circle of radius 3, clockwise from 12 o'clock
    pub const FAST_OFFSETS: [(i32, i32); 16] = [
        (0, -3), (1, -3), (2, -2), (3, -1),
        (3, 0), (3, 1), (2, 2), (1, 3),
        (0, 3), (-1, 3), (-2, 2), (-3, 1),
        (-3, 0), (-3, -1), (-2, -2), (-1, -3),
    ];

    /// Creates a new FAST detector with validation
    pub fn new(cfg: FeatureConfig, width: usize, height: usize) -> FastResult<Self> {
        if width == 0 || height == 0 {
            return Err(FastError::InvalidImageSize { width, height });
        }

        // 3-pixel ring on each side of the center pixel
        const MIN_SIZE: usize = 7;
        if width < MIN_SIZE || height < MIN_SIZE {
            return Err(FastError::ImageTooSmall {
                width,
                height,
                min_size: MIN_SIZE,
            });
        }

        if cfg.threshold == 0 || cfg.threshold > 127 {
            return Err(FastError::InvalidThreshold(cfg.threshold));
        }

        let min_dim = width.min(height);
        if cfg.patch_size % 2 == 0 || cfg.patch_size >= min_dim {
            return Err(FastError::InvalidPatchSize {
                patch_size: cfg.patch_size,
                min_image_dim: min_dim,
            });
        }

        Ok(Self {
            cfg,
            w: width,
            h: height,
        })
    }

    fn validate_image(&self, img: &Image) -> FastResult<()> {
        let expected_len = self.w * self.h;
        if img.len() != expected_len {
            return Err(FastError::InvalidImageData {
                expected_len,
                actual_len: img.len(),
            });
        }
        Ok(())
    }

    /// Detect keypoints: segment test, suppression, ranking, orientation.
    ///
    /// The result is sorted by descending response and capped at
    /// `max_keypoints` when that is non-zero.
    pub fn detect_keypoints(&self, img: &Image) -> FastResult<Vec<Keypoint>> {
        let candidates = self.detect_candidates(img)?;
        let mut kept = KeypointRefinement::non_maximum_suppression(
            &candidates,
            self.w,
            self.h,
            self.cfg.nms_radius,
        );

        kept.sort_by(|a, b| {
            b.response
                .total_cmp(&a.response)
                .then((a.y, a.x).cmp(&(b.y, b.x)))
        });
        if self.cfg.max_keypoints > 0 {
            kept.truncate(self.cfg.max_keypoints);
        }

        let keypoints: Vec<Keypoint> = kept
            .par_iter()
            .map(|c| Keypoint {
                x: c.x as f32,
                y: c.y as f32,
                angle: KeypointRefinement::compute_orientation(
                    img,
                    self.w,
                    self.h,
                    c.x,
                    c.y,
                    self.cfg.patch_size,
                ),
                response: c.response,
            })
            .collect();

        log::debug!(
            "FAST: {} candidates, {} after suppression, {} kept",
            candidates.len(),
            kept.len(),
            keypoints.len()
        );
        Ok(keypoints)
    }

    /// All pixels passing the segment test, with their corner score
    pub fn detect_candidates(&self, img: &Image) -> FastResult<Vec<Candidate>> {
        self.validate_image(img)?;

        let t = self.cfg.threshold;
        let candidates = (3..self.h - 3)
            .into_par_iter()
            .flat_map_iter(|y| {
                let mut row = Vec::new();
                for x in 3..self.w - 3 {
                    let p = img[y * self.w + x];
                    let mut ring = [0u8; 16];
                    for (slot, &(dx, dy)) in ring.iter_mut().zip(Self::FAST_OFFSETS.iter()) {
                        let xx = (x as i32 + dx) as usize;
                        let yy = (y as i32 + dy) as usize;
                        *slot = img[yy * self.w + xx];
                    }

                    match Self::classify(p, &ring, t) {
                        CornerType::None => {}
                        kind => row.push(Candidate {
                            x,
                            y,
                            response: Self::score(p, &ring, t, kind),
                        }),
                    }
                }
                row
            })
            .collect();

        Ok(candidates)
    }

    fn classify(p: u8, ring: &[u8; 16], t: u8) -> CornerType {
        let (p, t) = (p as i16, t as i16);
        let mut bright = 0u16;
        let mut dark = 0u16;
        for (i, &q) in ring.iter().enumerate() {
            let q = q as i16;
            if q >= p + t {
                bright |= 1 << i;
            } else if q <= p - t {
                dark |= 1 << i;
            }
        }

        if has_consecutive_bits(bright, ARC_LENGTH) {
            CornerType::Bright
        } else if has_consecutive_bits(dark, ARC_LENGTH) {
            CornerType::Dark
        } else {
            CornerType::None
        }
    }

    /// Sum of absolute differences beyond the threshold on the winning side
    fn score(p: u8, ring: &[u8; 16], t: u8, kind: CornerType) -> f32 {
        let p = p as i32;
        let t = t as i32;
        ring.iter()
            .map(|&q| {
                let d = q as i32 - p;
                match kind {
                    CornerType::Bright if d >= t => d - t,
                    CornerType::Dark if -d >= t => -d - t,
                    _ => 0,
                }
            })
            .sum::<i32>() as f32
            + 1.0
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.cfg
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.w, self.h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> FeatureConfig {
        FeatureConfig {
            threshold: 20,
            patch_size: 15,
            n_threads: 1,
            nms_radius: 3,
            max_keypoints: 0,
        }
    }

    fn create_small_test_config() -> FeatureConfig {
        FeatureConfig {
            patch_size: 5,
            ..create_test_config()
        }
    }

    fn create_corner_image(width: usize, height: usize) -> Image {
        let mut img = vec![50; width * height];
        let cx = width / 2;
        let cy = height / 2;
        for dy in -2i32..=2 {
            for dx in -2i32..=2 {
                let x = (cx as i32 + dx) as usize;
                let y = (cy as i32 + dy) as usize;
                img[y * width + x] = 255;
            }
        }
        img
    }

    fn create_multiple_corners_image(width: usize, height: usize) -> Image {
        let mut img = vec![50; width * height];
        let corners = [(width / 4, height / 4), (3 * width / 4, height / 4), (width / 2, 3 * height / 4)];
        for &(cx, cy) in &corners {
            for y in cy - 4..=cy + 4 {
                for x in cx - 4..=cx + 4 {
                    img[y * width + x] = 230;
                }
            }
        }
        img
    }

    #[test]
    fn test_valid_constructor() {
        assert!(FastDetector::new(create_test_config(), 100, 100).is_ok());
    }

    #[test]
    fn test_invalid_dimensions() {
        let result = FastDetector::new(create_test_config(), 0, 100);
        assert!(matches!(result, Err(FastError::InvalidImageSize { .. })));

        let result = FastDetector::new(create_test_config(), 100, 0);
        assert!(matches!(result, Err(FastError::InvalidImageSize { .. })));
    }

    #[test]
    fn test_too_small_image() {
        let result = FastDetector::new(create_test_config(), 6, 6);
        assert!(matches!(result, Err(FastError::ImageTooSmall { .. })));
    }

    #[test]
    fn test_invalid_threshold() {
        let mut cfg = create_test_config();

        cfg.threshold = 0;
        let result = FastDetector::new(cfg.clone(), 100, 100);
        assert!(matches!(result, Err(FastError::InvalidThreshold(0))));

        cfg.threshold = 200;
        let result = FastDetector::new(cfg, 100, 100);
        assert!(matches!(result, Err(FastError::InvalidThreshold(200))));
    }

    #[test]
    fn test_invalid_patch_size() {
        let mut cfg = create_test_config();

        cfg.patch_size = 16;
        let result = FastDetector::new(cfg.clone(), 100, 100);
        assert!(matches!(result, Err(FastError::InvalidPatchSize { .. })));

        cfg.patch_size = 101;
        let result = FastDetector::new(cfg, 100, 100);
        assert!(matches!(result, Err(FastError::InvalidPatchSize { .. })));
    }

    #[test]
    fn test_invalid_image_data() {
        let detector = FastDetector::new(create_small_test_config(), 10, 10).unwrap();
        let result = detector.detect_keypoints(&vec![0; 50]);
        assert!(matches!(
            result,
            Err(FastError::InvalidImageData { expected_len: 100, actual_len: 50 })
        ));
    }

    #[test]
    fn test_uniform_image_has_no_keypoints() {
        let detector = FastDetector::new(create_small_test_config(), 10, 10).unwrap();
        let keypoints = detector.detect_keypoints(&vec![128; 100]).unwrap();
        assert!(keypoints.is_empty());
    }

    #[test]
    fn test_minimum_size_image() {
        let detector = FastDetector::new(create_small_test_config(), 7, 7).unwrap();
        assert!(detector.detect_keypoints(&vec![128; 49]).is_ok());
    }

    #[test]
    fn test_corner_detection() {
        let detector = FastDetector::new(create_small_test_config(), 20, 20).unwrap();
        let keypoints = detector.detect_keypoints(&create_corner_image(20, 20)).unwrap();
        assert!(!keypoints.is_empty());
        for kp in &keypoints {
            assert!(kp.response > 0.0);
            assert!(kp.angle.is_finite());
        }
    }

    #[test]
    fn test_keypoints_sorted_and_capped() {
        let mut cfg = create_test_config();
        cfg.max_keypoints = 4;
        let detector = FastDetector::new(cfg, 64, 64).unwrap();
        let keypoints = detector
            .detect_keypoints(&create_multiple_corners_image(64, 64))
            .unwrap();
        assert!(!keypoints.is_empty());
        assert!(keypoints.len() <= 4);
        for pair in keypoints.windows(2) {
            assert!(pair[0].response >= pair[1].response);
        }
    }

    #[test]
    fn test_suppression_spacing() {
        let detector = FastDetector::new(create_test_config(), 64, 64).unwrap();
        let keypoints = detector
            .detect_keypoints(&create_multiple_corners_image(64, 64))
            .unwrap();
        for i in 0..keypoints.len() {
            for j in (i + 1)..keypoints.len() {
                let dx = (keypoints[i].x - keypoints[j].x).abs();
                let dy = (keypoints[i].y - keypoints[j].y).abs();
                assert!(dx > 3.0 || dy > 3.0, "keypoints {} and {} share a window", i, j);
            }
        }
    }

    #[test]
    fn test_configuration_access() {
        let cfg = create_test_config();
        let detector = FastDetector::new(cfg.clone(), 20, 20).unwrap();
        assert_eq!(detector.config(), &cfg);
        assert_eq!(detector.dimensions(), (20, 20));
    }

    #[test]
    fn test_repeated_detection_is_deterministic() {
        let detector = FastDetector::new(create_test_config(), 64, 64).unwrap();
        let img = create_multiple_corners_image(64, 64);
        let first = detector.detect_keypoints(&img).unwrap();
        for _ in 0..5 {
            assert_eq!(detector.detect_keypoints(&img).unwrap(), first);
        }
    }
}
