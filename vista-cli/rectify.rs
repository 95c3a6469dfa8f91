//! Four-quadrant chessboard rectification.
//!
//! The source image holds one chessboard per quadrant. The anchor corner of
//! each board, mapped back to full-image coordinates, becomes one corner of
//! the source quadrilateral, which is warped onto the full output canvas.

use std::fmt;

use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::draw_filled_circle_mut;
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use rayon::prelude::*;
use vista_chess::{ChessError, ChessboardFinder};
use vista_core::{GeometryError, PerspectiveTransform, Point2};

use crate::config::RectifyConfig;
use crate::error::{VistaError, VistaResult};

const MARKER_COLOR: Rgb<u8> = Rgb([0, 0, 255]);

/// Quadrants in source-point order: the output corners (0, 0), (W, 0),
/// (0, H), (W, H) take their points from these in turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quadrant {
    UpperLeft,
    UpperRight,
    LowerLeft,
    LowerRight,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [
        Quadrant::UpperLeft,
        Quadrant::UpperRight,
        Quadrant::LowerLeft,
        Quadrant::LowerRight,
    ];

    /// 1-based position in `ALL`
    pub fn number(self) -> usize {
        self as usize + 1
    }

    pub fn name(self) -> &'static str {
        match self {
            Quadrant::UpperLeft => "upper-left",
            Quadrant::UpperRight => "upper-right",
            Quadrant::LowerLeft => "lower-left",
            Quadrant::LowerRight => "lower-right",
        }
    }

    /// Region of a `width x height` image covered by this quadrant.
    ///
    /// Every quadrant is `width / 2 x height / 2`; with odd dimensions the
    /// last row and column belong to no quadrant.
    pub fn region(self, width: u32, height: u32) -> Region {
        let (w, h) = (width / 2, height / 2);
        let (x, y) = match self {
            Quadrant::UpperLeft => (0, 0),
            Quadrant::UpperRight => (w, 0),
            Quadrant::LowerLeft => (0, h),
            Quadrant::LowerRight => (w, h),
        };
        Region {
            x,
            y,
            width: w,
            height: h,
        }
    }
}

impl fmt::Display for Quadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.number(), self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    /// Quadrant-local point in full-image coordinates
    pub fn to_global(&self, p: Point2) -> Point2 {
        p.offset(self.x as f32, self.y as f32)
    }
}

/// Result of one rectification
#[derive(Debug, Clone)]
pub struct Rectification {
    /// Anchor corners in full-image coordinates, in `Quadrant::ALL` order
    pub corners: [Point2; 4],
    pub transform: PerspectiveTransform,
    /// Source image with a marker drawn at every anchor corner
    pub annotated: RgbImage,
    pub rectified: RgbImage,
}

pub struct Rectifier {
    finder: ChessboardFinder,
    cfg: RectifyConfig,
}

impl Rectifier {
    pub fn new(cfg: &RectifyConfig) -> VistaResult<Self> {
        let finder = ChessboardFinder::new(cfg.pattern, cfg.chess.clone())?;
        Ok(Self {
            finder,
            cfg: cfg.clone(),
        })
    }

    /// Output corners (0, 0), (W, 0), (0, H), (W, H)
    pub fn destination(&self) -> [Point2; 4] {
        let (w, h) = (self.cfg.width as f32, self.cfg.height as f32);
        [
            Point2::new(0.0, 0.0),
            Point2::new(w, 0.0),
            Point2::new(0.0, h),
            Point2::new(w, h),
        ]
    }

    /// Anchor corner of the board in `quadrant`, in full-image coordinates
    pub fn find_anchor(&self, gray: &GrayImage, quadrant: Quadrant) -> VistaResult<Point2> {
        let region = quadrant.region(gray.width(), gray.height());
        // Quadrant searched in place: window starts at its top-left pixel
        let stride = gray.width() as usize;
        let start = region.y as usize * stride + region.x as usize;
        let window = gray.as_raw().get(start..).unwrap_or(&[]);

        let local = self
            .finder
            .find_anchor_view(
                window,
                region.width as usize,
                region.height as usize,
                stride,
                self.cfg.anchor_index,
            )
            .map_err(|source| match source {
                ChessError::PatternNotFound { .. } => VistaError::PatternNotFound { quadrant },
                source => VistaError::Chess { quadrant, source },
            })?;

        let global = region.to_global(local);
        log::debug!(
            "quadrant {}: anchor at ({:.2}, {:.2})",
            quadrant,
            global.x,
            global.y
        );
        Ok(global)
    }

    /// Anchor corners of all four quadrants; the first failing quadrant
    /// in `Quadrant::ALL` order is reported.
    pub fn find_corners(&self, img: &RgbImage) -> VistaResult<[Point2; 4]> {
        let gray = image::imageops::grayscale(img);
        let results: Vec<VistaResult<Point2>> = Quadrant::ALL
            .par_iter()
            .map(|&q| self.find_anchor(&gray, q))
            .collect();
        let found = results.into_iter().collect::<VistaResult<Vec<_>>>()?;
        Ok([found[0], found[1], found[2], found[3]])
    }

    pub fn rectify(&self, img: &RgbImage) -> VistaResult<Rectification> {
        let corners = self.find_corners(img)?;

        let mut annotated = img.clone();
        for p in &corners {
            draw_filled_circle_mut(
                &mut annotated,
                (p.x.round() as i32, p.y.round() as i32),
                self.cfg.marker_radius,
                MARKER_COLOR,
            );
        }

        let transform = PerspectiveTransform::from_points(&corners, &self.destination())?;
        let projection = Projection::from_matrix(transform.to_row_major_f32())
            .ok_or(GeometryError::Degenerate("perspective transform is not invertible"))?;

        // The markers are part of the warped source
        let mut rectified = RgbImage::new(self.cfg.width, self.cfg.height);
        warp_into(
            &annotated,
            &projection,
            Interpolation::Bilinear,
            Rgb([0, 0, 0]),
            &mut rectified,
        );

        Ok(Rectification {
            corners,
            transform,
            annotated,
            rectified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// 4x4 squares of 20 px with the top-left square dark, drawn at `(ox, oy)`.
    /// Its centre inner corner sits at `(ox + 39.5, oy + 39.5)`.
    fn draw_board(img: &mut RgbImage, ox: u32, oy: u32) {
        for y in 0..80 {
            for x in 0..80 {
                if ((x / 20) + (y / 20)) % 2 == 0 {
                    img.put_pixel(ox + x, oy + y, Rgb([20, 20, 20]));
                }
            }
        }
    }

    /// 320x280 image with one board per 160x140 quadrant
    fn four_boards() -> RgbImage {
        let mut img = RgbImage::from_pixel(320, 280, Rgb([255, 255, 255]));
        draw_board(&mut img, 30, 25);
        draw_board(&mut img, 200, 35);
        draw_board(&mut img, 40, 170);
        draw_board(&mut img, 190, 180);
        img
    }

    #[test]
    fn test_quadrant_regions() {
        let r = Quadrant::LowerRight.region(1000, 800);
        assert_eq!(r, Region { x: 500, y: 400, width: 500, height: 400 });
        assert_eq!(r.to_global(Point2::new(10.0, 20.0)), Point2::new(510.0, 420.0));

        for q in Quadrant::ALL {
            let r = q.region(1000, 800);
            assert_eq!((r.width, r.height), (500, 400));
        }

        // Odd sizes drop the last row and column
        let r = Quadrant::LowerRight.region(1001, 801);
        assert_eq!(r, Region { x: 500, y: 400, width: 500, height: 400 });
    }

    #[test]
    fn test_quadrant_display() {
        assert_eq!(Quadrant::UpperLeft.to_string(), "1 (upper-left)");
        assert_eq!(Quadrant::LowerLeft.to_string(), "3 (lower-left)");
    }

    #[test]
    fn test_corners_in_global_coordinates() {
        let rect = Rectifier::new(&RectifyConfig::default()).unwrap();
        let corners = rect.find_corners(&four_boards()).unwrap();
        let expected = [(69.5, 64.5), (239.5, 74.5), (79.5, 209.5), (229.5, 219.5)];
        for (p, (ex, ey)) in corners.iter().zip(expected) {
            assert!(p.distance(Point2::new(ex, ey)) < 1.0, "corner {:?}, expected ({}, {})", p, ex, ey);
        }
    }

    #[test]
    fn test_odd_width_rows_read_with_full_stride() {
        // One extra column and row: quadrant rows no longer pack evenly
        let boards = four_boards();
        let mut img = RgbImage::from_pixel(321, 281, Rgb([255, 255, 255]));
        for (x, y, p) in boards.enumerate_pixels() {
            img.put_pixel(x, y, *p);
        }
        let rect = Rectifier::new(&RectifyConfig::default()).unwrap();
        let padded = rect.find_corners(&img).unwrap();
        let packed = rect.find_corners(&boards).unwrap();
        assert_eq!(padded, packed);
    }

    #[test]
    fn test_rectify_maps_corners_to_canvas() {
        let rect = Rectifier::new(&RectifyConfig::default()).unwrap();
        let out = rect.rectify(&four_boards()).unwrap();
        assert_eq!(out.rectified.dimensions(), (960, 540));
        assert_eq!(out.annotated.dimensions(), (320, 280));

        for (src, dst) in out.corners.iter().zip(rect.destination()) {
            let mapped = out.transform.apply(*src);
            assert_abs_diff_eq!(mapped.x, dst.x, epsilon = 1e-2);
            assert_abs_diff_eq!(mapped.y, dst.y, epsilon = 1e-2);
        }

        // Markers land on the annotated copy only
        let c = out.corners[0];
        let (mx, my) = (c.x.round() as u32, c.y.round() as u32);
        assert_eq!(*out.annotated.get_pixel(mx, my), MARKER_COLOR);
    }

    #[test]
    fn test_missing_board_names_quadrant() {
        let mut img = four_boards();
        for y in 140..280 {
            for x in 160..320 {
                img.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        let rect = Rectifier::new(&RectifyConfig::default()).unwrap();
        let err = rect.rectify(&img).unwrap_err();
        assert!(matches!(
            err,
            VistaError::PatternNotFound {
                quadrant: Quadrant::LowerRight
            }
        ));
        assert_eq!(err.to_string(), "pattern not found in quadrant 4 (lower-right)");
    }

    #[test]
    fn test_tiny_image_reports_chess_error() {
        let img = RgbImage::new(16, 16);
        let rect = Rectifier::new(&RectifyConfig::default()).unwrap();
        assert!(matches!(
            rect.find_corners(&img),
            Err(VistaError::Chess {
                quadrant: Quadrant::UpperLeft,
                ..
            })
        ));
    }
}
