//! Planar points and 3x3 projective transforms.

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("degenerate point correspondence: {0}")]
    Degenerate(&'static str),
}

/// 2D point in pixel coordinates (pixel centers at integer positions)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Translate by `(dx, dy)`
    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn distance(self, other: Point2) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Projective mapping `dst ~ H * src` in homogeneous coordinates.
///
/// `H` is stored row-major and normalized so that `H[2][2] == 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveTransform {
    h: [[f64; 3]; 3],
}

impl PerspectiveTransform {
    pub fn identity() -> Self {
        Self {
            h: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    /// Build from a row-major matrix; fails when `H[2][2]` is zero.
    pub fn from_matrix(h: [[f64; 3]; 3]) -> Result<Self, GeometryError> {
        let s = h[2][2];
        if s.abs() < 1e-12 {
            return Err(GeometryError::Degenerate("H[2][2] is zero"));
        }
        let mut n = h;
        for row in n.iter_mut() {
            for v in row.iter_mut() {
                *v /= s;
            }
        }
        Ok(Self { h: n })
    }

    /// Solve for the transform taking each `src[i]` onto `dst[i]`.
    ///
    /// Eight unknowns (h22 fixed to 1) from four correspondences, solved
    /// with Gaussian elimination and partial pivoting. Fails when three
    /// or more points on either side are collinear.
    pub fn from_points(src: &[Point2; 4], dst: &[Point2; 4]) -> Result<Self, GeometryError> {
        let mut a = [[0.0f64; 9]; 8];
        for i in 0..4 {
            let (x, y) = (src[i].x as f64, src[i].y as f64);
            let (u, v) = (dst[i].x as f64, dst[i].y as f64);
            a[2 * i] = [x, y, 1.0, 0.0, 0.0, 0.0, -x * u, -y * u, u];
            a[2 * i + 1] = [0.0, 0.0, 0.0, x, y, 1.0, -x * v, -y * v, v];
        }

        let sol = solve_augmented(&mut a)?;
        let t = Self {
            h: [
                [sol[0], sol[1], sol[2]],
                [sol[3], sol[4], sol[5]],
                [sol[6], sol[7], 1.0],
            ],
        };

        // Elimination can succeed on nearly collinear input and still
        // collapse a point onto the line at infinity.
        for p in src {
            if t.denominator(*p).abs() < 1e-12 {
                return Err(GeometryError::Degenerate("source point maps to infinity"));
            }
        }
        Ok(t)
    }

    fn denominator(&self, p: Point2) -> f64 {
        self.h[2][0] * p.x as f64 + self.h[2][1] * p.y as f64 + self.h[2][2]
    }

    /// Map a point through the transform
    pub fn apply(&self, p: Point2) -> Point2 {
        let (x, y) = (p.x as f64, p.y as f64);
        let w = self.denominator(p);
        let u = (self.h[0][0] * x + self.h[0][1] * y + self.h[0][2]) / w;
        let v = (self.h[1][0] * x + self.h[1][1] * y + self.h[1][2]) / w;
        Point2::new(u as f32, v as f32)
    }

    pub fn inverse(&self) -> Result<Self, GeometryError> {
        let m = &self.h;
        let c00 = m[1][1] * m[2][2] - m[1][2] * m[2][1];
        let c01 = m[1][2] * m[2][0] - m[1][0] * m[2][2];
        let c02 = m[1][0] * m[2][1] - m[1][1] * m[2][0];
        let det = m[0][0] * c00 + m[0][1] * c01 + m[0][2] * c02;
        if det.abs() < 1e-12 {
            return Err(GeometryError::Degenerate("singular transform"));
        }
        let adj = [
            [
                c00,
                m[0][2] * m[2][1] - m[0][1] * m[2][2],
                m[0][1] * m[1][2] - m[0][2] * m[1][1],
            ],
            [
                c01,
                m[0][0] * m[2][2] - m[0][2] * m[2][0],
                m[0][2] * m[1][0] - m[0][0] * m[1][2],
            ],
            [
                c02,
                m[0][1] * m[2][0] - m[0][0] * m[2][1],
                m[0][0] * m[1][1] - m[0][1] * m[1][0],
            ],
        ];
        let mut inv = [[0.0; 3]; 3];
        for r in 0..3 {
            for c in 0..3 {
                inv[r][c] = adj[r][c] / det;
            }
        }
        Self::from_matrix(inv)
    }

    pub fn matrix(&self) -> [[f64; 3]; 3] {
        self.h
    }

    /// Row-major single precision copy, the layout image warpers expect
    pub fn to_row_major_f32(&self) -> [f32; 9] {
        let m = &self.h;
        [
            m[0][0] as f32, m[0][1] as f32, m[0][2] as f32,
            m[1][0] as f32, m[1][1] as f32, m[1][2] as f32,
            m[2][0] as f32, m[2][1] as f32, m[2][2] as f32,
        ]
    }
}

/// Solve an 8x8 system given as augmented rows `[A | b]`.
fn solve_augmented(a: &mut [[f64; 9]; 8]) -> Result<[f64; 8], GeometryError> {
    const N: usize = 8;
    for col in 0..N {
        let pivot = (col..N)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        if a[pivot][col].abs() < 1e-10 {
            return Err(GeometryError::Degenerate("singular correspondence system"));
        }
        a.swap(col, pivot);

        let p = a[col][col];
        for k in col..=N {
            a[col][k] /= p;
        }
        for row in 0..N {
            if row == col {
                continue;
            }
            let f = a[row][col];
            if f != 0.0 {
                for k in col..=N {
                    a[row][k] -= f * a[col][k];
                }
            }
        }
    }

    let mut x = [0.0; N];
    for (i, v) in x.iter_mut().enumerate() {
        *v = a[i][N];
    }
    Ok(x)
}
