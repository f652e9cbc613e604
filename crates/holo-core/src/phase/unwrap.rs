//! Quality-guided 2D phase unwrapping.
//!
//! Pixels are unwrapped in order of decreasing reliability, where reliability
//! is the inverse of the wrapped second-difference magnitude. Noisy or
//! isolated pixels score low and are reached last, so their errors cannot
//! propagate through the rest of the map.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ndarray::Array2;

use super::wrap_phase;
use crate::frame::Frame;

#[derive(Clone, Copy)]
struct Candidate {
    quality: f64,
    row: usize,
    col: usize,
    from_row: usize,
    from_col: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.quality
            .total_cmp(&other.quality)
            .then_with(|| other.row.cmp(&self.row))
            .then_with(|| other.col.cmp(&self.col))
    }
}

/// Reliability of every pixel: `1 / (1 + D)` with `D` the root-sum-square of
/// wrapped second differences along rows, columns and both diagonals.
pub fn reliability(phase: &Array2<f64>) -> Array2<f64> {
    let (h, w) = phase.dim();
    Array2::from_shape_fn((h, w), |(r, c)| {
        let at = |rr: isize, cc: isize| -> Option<f64> {
            if rr >= 0 && cc >= 0 && (rr as usize) < h && (cc as usize) < w {
                Some(phase[[rr as usize, cc as usize]])
            } else {
                None
            }
        };
        let (r, c) = (r as isize, c as isize);
        let centre = phase[[r as usize, c as usize]];
        let mut sum = 0.0;
        let mut terms = 0;
        for (dr, dc) in [(0isize, 1isize), (1, 0), (1, 1), (1, -1)] {
            if let (Some(a), Some(b)) = (at(r - dr, c - dc), at(r + dr, c + dc)) {
                let d = wrap_phase(a - centre) - wrap_phase(centre - b);
                sum += d * d;
                terms += 1;
            }
        }
        if terms == 0 {
            0.0
        } else {
            // Edge pixels have fewer terms; scale so they compare fairly.
            1.0 / (1.0 + (sum * 4.0 / terms as f64).sqrt())
        }
    })
}

/// Unwrap a wrapped phase map. The result differs from the true phase by a
/// constant multiple of 2 pi wherever the local gradient stays below pi per
/// pixel.
pub fn unwrap_phase(phase: &Frame) -> Frame {
    let (h, w) = phase.dim();
    if h == 0 || w == 0 {
        return phase.clone();
    }
    let wrapped = phase.data.mapv(|v| v as f64);
    let quality = reliability(&wrapped);

    let mut unwrapped = Array2::<f64>::zeros((h, w));
    let mut done = Array2::<bool>::from_elem((h, w), false);
    let mut heap = BinaryHeap::new();

    let (mut seed_r, mut seed_c, mut seed_q) = (0, 0, f64::NEG_INFINITY);
    for ((r, c), &q) in quality.indexed_iter() {
        if q > seed_q {
            (seed_r, seed_c, seed_q) = (r, c, q);
        }
    }

    unwrapped[[seed_r, seed_c]] = wrapped[[seed_r, seed_c]];
    done[[seed_r, seed_c]] = true;
    push_neighbours(&mut heap, &quality, &done, seed_r, seed_c);

    while let Some(next) = heap.pop() {
        if done[[next.row, next.col]] {
            continue;
        }
        let base = unwrapped[[next.from_row, next.from_col]];
        let step = wrap_phase(wrapped[[next.row, next.col]] - wrapped[[next.from_row, next.from_col]]);
        unwrapped[[next.row, next.col]] = base + step;
        done[[next.row, next.col]] = true;
        push_neighbours(&mut heap, &quality, &done, next.row, next.col);
    }

    Frame::new(unwrapped.mapv(|v| v as f32))
}

fn push_neighbours(
    heap: &mut BinaryHeap<Candidate>,
    quality: &Array2<f64>,
    done: &Array2<bool>,
    row: usize,
    col: usize,
) {
    let (h, w) = quality.dim();
    let mut push = |r: usize, c: usize| {
        if !done[[r, c]] {
            heap.push(Candidate {
                quality: quality[[r, c]],
                row: r,
                col: c,
                from_row: row,
                from_col: col,
            });
        }
    };
    if row > 0 {
        push(row - 1, col);
    }
    if row + 1 < h {
        push(row + 1, col);
    }
    if col > 0 {
        push(row, col - 1);
    }
    if col + 1 < w {
        push(row, col + 1);
    }
}
