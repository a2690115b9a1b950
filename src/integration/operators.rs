//! Mask-aware one-sided finite-difference operators.
//!
//! For every valid pixel `p` and each of the four directions, the operator
//! row `p` holds `-1/step` and `+1/step` on the two endpoints of the edge
//! joining `p` to its neighbor in that direction; the row is empty when the
//! neighbor is missing. Forward operators read `(p, next)`, backward ones
//! read `(previous, p)`, which gives two independent estimators per axis.
//!
//! Axes follow the pixel convention of the solver: `u` points up the image
//! (towards row `y - 1`), `v` points right (towards column `x + 1`).
use super::indexing::PixelIndex;
use super::linalg::collect_indexed;
use sprs::{CsMat, TriMat};

/// The four directional derivative operators, each `N × N`.
#[derive(Clone, Debug)]
pub struct DifferenceOperators {
    /// Forward difference along `u`: `(z[up] - z[p]) / step`.
    pub u_pos: CsMat<f64>,
    /// Backward difference along `u`: `(z[p] - z[down]) / step`.
    pub u_neg: CsMat<f64>,
    /// Forward difference along `v`: `(z[right] - z[p]) / step`.
    pub v_pos: CsMat<f64>,
    /// Backward difference along `v`: `(z[p] - z[left]) / step`.
    pub v_neg: CsMat<f64>,
}

/// Neighbor indices of one pixel, in `[up, down, right, left]` order.
type Neighbors = [Option<usize>; 4];

impl DifferenceOperators {
    pub fn build(index: &PixelIndex, step_size: f64) -> Self {
        let n = index.len();
        let neighbors: Vec<Neighbors> = collect_indexed(n, |i| {
            let (x, y) = index.pixel(i);
            [
                index.neighbor(x, y, 0, -1),
                index.neighbor(x, y, 0, 1),
                index.neighbor(x, y, 1, 0),
                index.neighbor(x, y, -1, 0),
            ]
        });
        let inv = 1.0 / step_size;
        Self {
            u_pos: one_sided(&neighbors, 0, true, inv),
            u_neg: one_sided(&neighbors, 1, false, inv),
            v_pos: one_sided(&neighbors, 2, true, inv),
            v_neg: one_sided(&neighbors, 3, false, inv),
        }
    }

    /// Number of valid pixels the operators act on.
    pub fn dim(&self) -> usize {
        self.u_pos.rows()
    }

    /// Count of connected edges per operator, `[u+, u-, v+, v-]`.
    pub fn edge_counts(&self) -> [usize; 4] {
        [
            self.u_pos.nnz() / 2,
            self.u_neg.nnz() / 2,
            self.v_pos.nnz() / 2,
            self.v_neg.nnz() / 2,
        ]
    }
}

fn one_sided(neighbors: &[Neighbors], slot: usize, forward: bool, inv_step: f64) -> CsMat<f64> {
    let n = neighbors.len();
    let mut tri = TriMat::with_capacity((n, n), 2 * n);
    for (p, nb) in neighbors.iter().enumerate() {
        let Some(q) = nb[slot] else { continue };
        // forward: (z[q] - z[p]); backward: (z[p] - z[q])
        let (minus, plus) = if forward { (p, q) } else { (q, p) };
        tri.add_triplet(p, minus, -inv_step);
        tri.add_triplet(p, plus, inv_step);
    }
    tri.to_csr()
}
