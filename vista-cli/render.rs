//! Side-by-side match visualisation.

use image::{GenericImage, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_line_segment_mut};
use vista_core::{Keypoint, Match};

use crate::error::{VistaError, VistaResult};

const KEYPOINT_RADIUS: i32 = 3;

/// Colour for the `i`-th drawn match; golden-ratio hue steps keep
/// neighbouring matches apart while staying reproducible across runs.
pub fn match_color(i: usize) -> Rgb<u8> {
    let hue = (i as f32 * 0.618_034).fract() * 6.0;
    let sector = hue.floor();
    let f = hue - sector;
    let (hi, lo) = (255u8, 40u8);
    let up = (lo as f32 + f * (hi - lo) as f32) as u8;
    let down = (hi as f32 - f * (hi - lo) as f32) as u8;
    let rgb = match sector as u32 {
        0 => [hi, up, lo],
        1 => [down, hi, lo],
        2 => [lo, hi, up],
        3 => [lo, down, hi],
        4 => [up, lo, hi],
        _ => [hi, lo, down],
    };
    Rgb(rgb)
}

/// Place `a` and `b` side by side and connect every match.
///
/// The canvas is `(wa + wb) x max(ha, hb)`; uncovered area stays black.
/// Each match gets a circle at both endpoints and a line between them, with
/// the second endpoint shifted right by `wa`. Unmatched keypoints are not
/// drawn; matches whose indices fall outside the keypoint lists are skipped.
pub fn draw_matches(
    a: &RgbImage,
    kps_a: &[Keypoint],
    b: &RgbImage,
    kps_b: &[Keypoint],
    matches: &[Match],
) -> VistaResult<RgbImage> {
    let (wa, ha) = a.dimensions();
    let (wb, hb) = b.dimensions();
    let mut canvas = RgbImage::new(wa + wb, ha.max(hb));
    canvas.copy_from(a, 0, 0).map_err(VistaError::Render)?;
    canvas.copy_from(b, wa, 0).map_err(VistaError::Render)?;

    let shift = wa as f32;
    for (i, m) in matches.iter().enumerate() {
        let (Some(p), Some(q)) = (kps_a.get(m.query_idx), kps_b.get(m.train_idx)) else {
            continue;
        };
        let color = match_color(i);
        let start = (p.x, p.y);
        let end = (q.x + shift, q.y);
        draw_hollow_circle_mut(&mut canvas, (start.0.round() as i32, start.1.round() as i32), KEYPOINT_RADIUS, color);
        draw_hollow_circle_mut(&mut canvas, (end.0.round() as i32, end.1.round() as i32), KEYPOINT_RADIUS, color);
        draw_line_segment_mut(&mut canvas, start, end, color);
    }
    Ok(canvas)
}
