//! Lattice assembly: pick the complete `cols x rows` grid of candidates
//! with the highest total response.

use std::collections::BTreeMap;

use vista_core::Point2;

use crate::detect::CornerCandidate;

/// Nearest neighbours considered when seeding a lattice
const SEED_NEIGHBOURS: usize = 6;
/// Predicted positions accept candidates within this fraction of a step
const STEP_TOLERANCE: f32 = 0.3;
/// Seed basis vectors must be within 60..120 degrees of each other
const MAX_BASIS_COS: f32 = 0.5;
const MIN_STEP: f32 = 4.0;

type Cell = (i32, i32);

/// Inner corners in row-major order: top row first, left to right
#[derive(Debug, Clone, PartialEq)]
pub struct ChessboardCorners {
    pub cols: usize,
    pub rows: usize,
    pub points: Vec<Point2>,
}

impl ChessboardCorners {
    pub fn get(&self, col: usize, row: usize) -> Option<Point2> {
        if col >= self.cols || row >= self.rows {
            return None;
        }
        self.points.get(row * self.cols + col).copied()
    }

    /// Corner closest to the middle of the board (the exact centre for odd sizes)
    pub fn center(&self) -> Option<Point2> {
        self.get(self.cols / 2, self.rows / 2)
    }
}

/// Find the best complete lattice among the candidates
pub fn assemble(candidates: &[CornerCandidate], cols: usize, rows: usize) -> Option<ChessboardCorners> {
    let mut best: Option<(f32, BTreeMap<Cell, usize>)> = None;

    for seed in 0..candidates.len() {
        let neighbours = nearest(candidates, seed, SEED_NEIGHBOURS);
        for (k, &a) in neighbours.iter().enumerate() {
            for &b in &neighbours[k + 1..] {
                let origin = candidates[seed].position;
                let u = sub(candidates[a].position, origin);
                let v = sub(candidates[b].position, origin);
                if !is_basis(u, v) {
                    continue;
                }
                let Some(cells) = grow(candidates, seed, a, b, cols, rows) else {
                    continue;
                };
                let score: f32 = cells.values().map(|&i| candidates[i].response).sum();
                if best.as_ref().map_or(true, |(s, _)| score > *s) {
                    best = Some((score, cells));
                }
            }
        }
    }

    best.map(|(_, cells)| order(candidates, &cells))
}

fn sub(a: Point2, b: Point2) -> Point2 {
    Point2::new(a.x - b.x, a.y - b.y)
}

fn norm(p: Point2) -> f32 {
    (p.x * p.x + p.y * p.y).sqrt()
}

fn is_basis(u: Point2, v: Point2) -> bool {
    let (lu, lv) = (norm(u), norm(v));
    if lu < MIN_STEP || lv < MIN_STEP {
        return false;
    }
    let ratio = lu / lv;
    if !(0.5..=2.0).contains(&ratio) {
        return false;
    }
    let cos = (u.x * v.x + u.y * v.y) / (lu * lv);
    cos.abs() < MAX_BASIS_COS
}

fn nearest(candidates: &[CornerCandidate], from: usize, k: usize) -> Vec<usize> {
    let origin = candidates[from].position;
    let mut others: Vec<(f32, usize)> = candidates
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != from)
        .map(|(i, c)| (origin.distance(c.position), i))
        .collect();
    others.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    others.into_iter().take(k).map(|(_, i)| i).collect()
}

fn fits(cells: &BTreeMap<Cell, usize>, extra: Cell, cols: usize, rows: usize) -> bool {
    let (mut i0, mut i1, mut j0, mut j1) = (extra.0, extra.0, extra.1, extra.1);
    for &(i, j) in cells.keys() {
        i0 = i0.min(i);
        i1 = i1.max(i);
        j0 = j0.min(j);
        j1 = j1.max(j);
    }
    let (si, sj) = ((i1 - i0 + 1) as usize, (j1 - j0 + 1) as usize);
    (si <= cols && sj <= rows) || (si <= rows && sj <= cols)
}

/// Breadth-first growth from a seed and two basis neighbours.
///
/// Each step predicts the next corner from the local spacing along the same
/// lattice direction, falling back to the seed basis at the frontier.
fn grow(
    candidates: &[CornerCandidate],
    seed: usize,
    a: usize,
    b: usize,
    cols: usize,
    rows: usize,
) -> Option<BTreeMap<Cell, usize>> {
    let origin = candidates[seed].position;
    let u = sub(candidates[a].position, origin);
    let v = sub(candidates[b].position, origin);

    let mut cells = BTreeMap::new();
    let mut used = vec![false; candidates.len()];
    for (cell, idx) in [((0, 0), seed), ((1, 0), a), ((0, 1), b)] {
        cells.insert(cell, idx);
        used[idx] = true;
    }
    if !fits(&cells, (0, 0), cols, rows) {
        return None;
    }

    const DIRS: [Cell; 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
    loop {
        let mut added = false;
        let known: Vec<(Cell, usize)> = cells.iter().map(|(&c, &i)| (c, i)).collect();
        for ((i, j), idx) in known {
            for (di, dj) in DIRS {
                let target = (i + di, j + dj);
                if cells.contains_key(&target) || !fits(&cells, target, cols, rows) {
                    continue;
                }
                let here = candidates[idx].position;
                let step = match cells.get(&(i - di, j - dj)) {
                    Some(&prev) => sub(here, candidates[prev].position),
                    None => {
                        let base = if di != 0 { u } else { v };
                        let sign = (di + dj) as f32;
                        Point2::new(base.x * sign, base.y * sign)
                    }
                };
                let predicted = here.offset(step.x, step.y);
                let tolerance = STEP_TOLERANCE * norm(step);

                let hit = candidates
                    .iter()
                    .enumerate()
                    .filter(|&(k, _)| !used[k])
                    .map(|(k, c)| (c.position.distance(predicted), k))
                    .filter(|&(d, _)| d < tolerance)
                    .min_by(|x, y| x.0.total_cmp(&y.0));
                if let Some((_, k)) = hit {
                    cells.insert(target, k);
                    used[k] = true;
                    added = true;
                }
            }
        }
        if !added {
            break;
        }
    }

    (cells.len() == cols * rows).then_some(cells)
}

/// Re-index a complete lattice so columns run left to right and rows top
/// to bottom, then flatten row-major.
fn order(candidates: &[CornerCandidate], cells: &BTreeMap<Cell, usize>) -> ChessboardCorners {
    let at = |c: &Cell| candidates[cells[c]].position;

    let mean_step = |d: Cell| -> Point2 {
        let (mut sx, mut sy, mut n) = (0.0f32, 0.0f32, 0usize);
        for c in cells.keys() {
            let next = (c.0 + d.0, c.1 + d.1);
            if cells.contains_key(&next) {
                let s = sub(at(&next), at(c));
                sx += s.x;
                sy += s.y;
                n += 1;
            }
        }
        let n = n.max(1) as f32;
        Point2::new(sx / n, sy / n)
    };
    let du = mean_step((1, 0));
    let dv = mean_step((0, 1));

    let i0 = cells.keys().map(|c| c.0).min().unwrap_or(0);
    let i1 = cells.keys().map(|c| c.0).max().unwrap_or(0);
    let j0 = cells.keys().map(|c| c.1).min().unwrap_or(0);
    let j1 = cells.keys().map(|c| c.1).max().unwrap_or(0);
    let (ni, nj) = ((i1 - i0 + 1) as usize, (j1 - j0 + 1) as usize);

    // i runs along columns when its step is the more horizontal one
    let i_is_col = du.x.abs() >= dv.x.abs();
    let (col_step, row_step) = if i_is_col { (du, dv) } else { (dv, du) };
    let (cols, rows) = if i_is_col { (ni, nj) } else { (nj, ni) };
    let flip_col = col_step.x < 0.0;
    let flip_row = row_step.y < 0.0;

    let mut points = Vec::with_capacity(cols * rows);
    for r in 0..rows {
        for c in 0..cols {
            let c = (if flip_col { cols - 1 - c } else { c }) as i32;
            let r = (if flip_row { rows - 1 - r } else { r }) as i32;
            let cell = if i_is_col { (i0 + c, j0 + r) } else { (i0 + r, j0 + c) };
            points.push(at(&cell));
        }
    }

    ChessboardCorners { cols, rows, points }
}
