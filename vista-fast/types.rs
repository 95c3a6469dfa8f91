/// Segment-test outcome for a candidate pixel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CornerType {
    Bright,
    Dark,
    None,
}

/// FAST candidate on the integer pixel grid, before suppression
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub x: usize,
    pub y: usize,
    pub response: f32,
}
