use image::{GrayImage, RgbImage};
use vista_brief::BriefGenerator;
use vista_core::{Descriptor, FeatureConfig, Keypoint, Match};
use vista_fast::FastDetector;
use vista_match::{BruteForceMatcher, FilterPolicy};

use crate::error::VistaResult;
use crate::render;

/// Smallest side the FAST ring fits in
const MIN_DETECTABLE_SIDE: usize = 7;

/// Keypoints of one image with their descriptors, index-aligned
#[derive(Debug, Clone, Default)]
pub struct ImageFeatures {
    pub keypoints: Vec<Keypoint>,
    pub descriptors: Vec<Descriptor>,
}

/// Everything computed for one image pair
#[derive(Debug, Clone)]
pub struct PairMatches {
    pub features_a: ImageFeatures,
    pub features_b: ImageFeatures,
    /// Best match for every keypoint of image A
    pub raw: Vec<Match>,
    /// Subset of `raw` passing the distance filter, in `raw` order
    pub good: Vec<Match>,
}

/// Detect, describe, match, filter and render an image pair.
///
/// Holds configuration only; every call is computed from scratch.
pub struct FeatureMatcher {
    cfg: FeatureConfig,
    policy: FilterPolicy,
    blur_sigma: f32,
    matcher: BruteForceMatcher,
}

impl FeatureMatcher {
    pub fn new(cfg: FeatureConfig, policy: FilterPolicy, blur_sigma: f32) -> Self {
        Self {
            cfg,
            policy,
            blur_sigma,
            matcher: BruteForceMatcher::new(),
        }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.cfg
    }

    /// FAST keypoints on the luma channel, BRIEF descriptors on its blurred copy
    pub fn extract(&self, img: &RgbImage) -> VistaResult<ImageFeatures> {
        let gray: GrayImage = image::imageops::grayscale(img);
        let (w, h) = (gray.width() as usize, gray.height() as usize);

        // No patch fits: nothing is detectable, which is not an error
        if w.min(h) <= self.cfg.patch_size || w.min(h) < MIN_DETECTABLE_SIDE {
            log::debug!("{}x{} image smaller than patch {}, no keypoints", w, h, self.cfg.patch_size);
            return Ok(ImageFeatures::default());
        }

        let detector = FastDetector::new(self.cfg.clone(), w, h)?;
        let keypoints = detector.detect_keypoints(gray.as_raw())?;

        // Non-positive sigma disables smoothing
        let smoothed = if self.blur_sigma > 0.0 {
            imageproc::filter::gaussian_blur_f32(&gray, self.blur_sigma)
        } else {
            gray.clone()
        };
        let brief = BriefGenerator::new(w, h, self.cfg.patch_size)?;
        let descriptors = brief.generate_descriptors(smoothed.as_raw(), &keypoints)?;

        Ok(ImageFeatures {
            keypoints,
            descriptors,
        })
    }

    pub fn match_pair(&self, a: &RgbImage, b: &RgbImage) -> VistaResult<PairMatches> {
        let features_a = self.extract(a)?;
        let features_b = self.extract(b)?;
        let raw = self
            .matcher
            .match_descriptors(&features_a.descriptors, &features_b.descriptors);
        let good = self.policy.apply(&raw);
        log::debug!(
            "{} / {} keypoints, {} raw matches, {} kept",
            features_a.keypoints.len(),
            features_b.keypoints.len(),
            raw.len(),
            good.len()
        );
        Ok(PairMatches {
            features_a,
            features_b,
            raw,
            good,
        })
    }

    /// Composite of `a` and `b` with the filtered matches drawn in
    pub fn display_matches(&self, a: &RgbImage, b: &RgbImage) -> VistaResult<RgbImage> {
        let pair = self.match_pair(a, b)?;
        render::draw_matches(
            a,
            &pair.features_a.keypoints,
            b,
            &pair.features_b.keypoints,
            &pair.good,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    /// Random 8x8 blocks; plenty of FAST corners at block junctions
    fn blocks(w: u32, h: u32, seed: u32) -> RgbImage {
        let mut state = seed.max(1);
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state
        };
        let (bw, bh) = (w.div_ceil(8), h.div_ceil(8));
        let shades: Vec<u8> = (0..bw * bh).map(|_| (next() % 256) as u8).collect();
        RgbImage::from_fn(w, h, |x, y| {
            let v = shades[((y / 8) * bw + x / 8) as usize];
            Rgb([v, v, v])
        })
    }

    fn matcher() -> FeatureMatcher {
        FeatureMatcher::new(FeatureConfig::default(), FilterPolicy::default(), 2.0)
    }

    #[test]
    fn test_extract_aligns_descriptors_with_keypoints() {
        let f = matcher().extract(&blocks(128, 96, 7)).unwrap();
        assert!(!f.keypoints.is_empty());
        assert_eq!(f.keypoints.len(), f.descriptors.len());
    }

    #[test]
    fn test_self_match_keeps_perfect_matches() {
        let img = blocks(128, 96, 11);
        let pair = matcher().match_pair(&img, &img).unwrap();
        assert_eq!(pair.raw.len(), pair.features_a.keypoints.len());
        assert!(!pair.good.is_empty());
        // Identical inputs: the minimum distance is 0, so only exact
        // descriptor matches pass the floor
        assert!(pair.good.iter().all(|m| m.distance == 0.0));
    }

    #[test]
    fn test_featureless_pair_still_renders() {
        let flat = RgbImage::from_pixel(64, 48, Rgb([90, 90, 90]));
        let textured = blocks(80, 64, 3);
        let pair = matcher().match_pair(&flat, &textured).unwrap();
        assert!(pair.features_a.keypoints.is_empty());
        assert!(pair.raw.is_empty());
        assert!(pair.good.is_empty());

        let out = matcher().display_matches(&flat, &textured).unwrap();
        assert_eq!(out.dimensions(), (64 + 80, 64));
    }

    #[test]
    fn test_composite_dimensions() {
        let a = blocks(96, 72, 5);
        let b = blocks(64, 88, 9);
        let out = matcher().display_matches(&a, &b).unwrap();
        assert_eq!(out.dimensions(), (160, 88));
    }

    #[test]
    fn test_image_smaller_than_patch_has_no_keypoints() {
        let tiny = RgbImage::new(20, 20);
        let f = matcher().extract(&tiny).unwrap();
        assert!(f.keypoints.is_empty());
        assert!(f.descriptors.is_empty());

        // Smaller side equal to the patch size is still too small
        let edge = blocks(31, 64, 4);
        assert!(matcher().extract(&edge).unwrap().keypoints.is_empty());
    }

    #[test]
    fn test_small_image_still_composited() {
        let small = RgbImage::from_pixel(24, 24, Rgb([40, 40, 40]));
        let large = RgbImage::from_pixel(120, 90, Rgb([200, 200, 200]));
        let out = matcher().display_matches(&small, &large).unwrap();
        assert_eq!(out.dimensions(), (24 + 120, 90));
    }
}
