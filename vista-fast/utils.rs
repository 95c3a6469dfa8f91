//! Segment-test helpers over the 16-pixel Bresenham circle

/// Pack a circle classification into a 16-bit mask (bit i = circle pixel i)
pub fn circle_mask(pixels: &[bool; 16]) -> u16 {
    pixels
        .iter()
        .enumerate()
        .fold(0u16, |mask, (i, &set)| if set { mask | (1 << i) } else { mask })
}

/// Check for a run of at least `min_count` set bits in the circular mask.
///
/// AND-ing the mask with its rotations leaves a bit set only where a run of
/// the required length starts.
pub fn has_consecutive_bits(mask: u16, min_count: usize) -> bool {
    if min_count == 0 || min_count > 16 {
        return false;
    }
    if mask == u16::MAX {
        return true;
    }

    let mut run = mask;
    for i in 1..min_count as u32 {
        run &= mask.rotate_right(i);
        if run == 0 {
            return false;
        }
    }
    run != 0
}

pub fn has_consecutive_pixels(pixels: &[bool; 16], min_count: usize) -> bool {
    has_consecutive_bits(circle_mask(pixels), min_count)
}
