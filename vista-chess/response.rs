//! Dense ChESS response.
//!
//! For the 16 ring samples `I[n]` at radius 5:
//! `R = SR - DR - 16 * MR` with
//! `SR = Σ_{n<4} |I[n] + I[n+8] - I[n+4] - I[n+12]|`,
//! `DR = Σ_{n<8} |I[n] - I[n+8]|` and `MR` the difference between the ring
//! mean and the mean of the centre pixel and its 4-neighbours.
//! Chessboard X-junctions score strongly positive, edges and L-corners
//! score at or below zero.

use rayon::prelude::*;

pub const RING_RADIUS: usize = 5;

/// Radius-5 sampling ring, counter-clockwise from 3 o'clock
pub const RING: [(i32, i32); 16] = [
    (5, 0), (5, 2), (4, 4), (2, 5),
    (0, 5), (-2, 5), (-4, 4), (-5, 2),
    (-5, 0), (-5, -2), (-4, -4), (-2, -5),
    (0, -5), (2, -5), (4, -4), (5, -2),
];

/// Response map of a `width x height` window whose rows start `stride`
/// bytes apart in `img`. The map is packed (`width` per row) and its
/// 5-pixel border is zero.
pub fn chess_response(img: &[u8], width: usize, height: usize, stride: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; width * height];
    if width <= 2 * RING_RADIUS || height <= 2 * RING_RADIUS {
        return out;
    }

    out.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        if y < RING_RADIUS || y >= height - RING_RADIUS {
            return;
        }
        for (x, slot) in row
            .iter_mut()
            .enumerate()
            .take(width - RING_RADIUS)
            .skip(RING_RADIUS)
        {
            *slot = response_at(img, stride, x, y);
        }
    });
    out
}

/// Response at one pixel at least `RING_RADIUS` away from every edge
pub fn response_at(img: &[u8], stride: usize, x: usize, y: usize) -> f32 {
    let at = |dx: i32, dy: i32| -> i32 {
        let xx = (x as i32 + dx) as usize;
        let yy = (y as i32 + dy) as usize;
        img[yy * stride + xx] as i32
    };

    let mut ring = [0i32; 16];
    for (slot, &(dx, dy)) in ring.iter_mut().zip(RING.iter()) {
        *slot = at(dx, dy);
    }

    let sr: i32 = (0..4)
        .map(|n| (ring[n] + ring[n + 8] - ring[n + 4] - ring[n + 12]).abs())
        .sum();
    let dr: i32 = (0..8).map(|n| (ring[n] - ring[n + 8]).abs()).sum();

    let ring_mean = ring.iter().sum::<i32>() as f32 / 16.0;
    let local_mean = (at(0, 0) + at(1, 0) + at(-1, 0) + at(0, 1) + at(0, -1)) as f32 / 5.0;
    let mr = (ring_mean - local_mean).abs();

    (sr - dr) as f32 - 16.0 * mr
}
