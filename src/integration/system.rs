//! Stacked residual system `A z ≈ b` and its weighted normal equations.
//!
//! `A` stacks four coefficient-weighted operators, each `N × N`:
//!
//! ```text
//! A = [ Nu·Du+ ]    b = [ -nx ]
//!     [ Nu·Du- ]        [ -nx ]
//!     [ Nv·Dv+ ]        [ -ny ]
//!     [ Nv·Dv- ]        [ -ny ]
//! ```
//!
//! Weight vectors use the same block layout.
use super::coefficients::CoefficientField;
use super::linalg::{collect_indexed, spmv, weighted_sq_norm};
use super::operators::DifferenceOperators;
use sprs::{CsMat, TriMat};

/// Block position inside the stacked system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Block {
    UForward = 0,
    UBackward = 1,
    VForward = 2,
    VBackward = 3,
}

impl Block {
    pub const ALL: [Block; 4] = [
        Block::UForward,
        Block::UBackward,
        Block::VForward,
        Block::VBackward,
    ];

    /// Row range of this block in a stacked vector of `4 * n` entries.
    #[inline]
    pub fn range(self, n: usize) -> std::ops::Range<usize> {
        let k = self as usize;
        k * n..(k + 1) * n
    }
}

/// Optional diagonal regularizer `λ·diag(m)` with target `z_prior`.
#[derive(Clone, Copy, Debug)]
pub struct PriorTerm<'a> {
    pub lambda: f64,
    pub mask: &'a [bool],
    pub target: &'a [f64],
}

#[derive(Clone, Debug)]
pub struct StackedSystem {
    /// `4N × N` stacked operator (CSR).
    pub a: CsMat<f64>,
    /// Right-hand side, length `4N`.
    pub b: Vec<f64>,
    n: usize,
}

impl StackedSystem {
    pub fn assemble(ops: &DifferenceOperators, coeffs: &CoefficientField) -> Self {
        let n = ops.dim();
        let blocks = [
            (&ops.u_pos, &coeffs.nu),
            (&ops.u_neg, &coeffs.nu),
            (&ops.v_pos, &coeffs.nv),
            (&ops.v_neg, &coeffs.nv),
        ];
        let nnz: usize = blocks.iter().map(|(d, _)| d.nnz()).sum();
        let mut tri = TriMat::with_capacity((4 * n, n), nnz);
        for (block, (d, scale)) in Block::ALL.iter().zip(blocks) {
            let offset = block.range(n).start;
            for (r, row) in d.outer_iterator().enumerate() {
                for (c, &v) in row.iter() {
                    tri.add_triplet(offset + r, c, scale[r] * v);
                }
            }
        }

        let mut b = Vec::with_capacity(4 * n);
        b.extend(coeffs.nx.iter().map(|v| -v));
        b.extend(coeffs.nx.iter().map(|v| -v));
        b.extend(coeffs.ny.iter().map(|v| -v));
        b.extend(coeffs.ny.iter().map(|v| -v));

        Self {
            a: tri.to_csr(),
            b,
            n,
        }
    }

    /// Number of unknowns `N`.
    #[inline]
    pub fn dim(&self) -> usize {
        self.n
    }

    /// `A z`, length `4N`.
    pub fn apply(&self, z: &[f64]) -> Vec<f64> {
        spmv(&self.a, z)
    }

    /// `A z - b`, length `4N`.
    pub fn residual(&self, z: &[f64]) -> Vec<f64> {
        let mut r = self.apply(z);
        for (ri, bi) in r.iter_mut().zip(&self.b) {
            *ri -= bi;
        }
        r
    }

    /// Quadratic energy `(Az - b)ᵀ W (Az - b)`.
    pub fn energy(&self, z: &[f64], weights: &[f64]) -> f64 {
        weighted_sq_norm(weights, &self.residual(z))
    }

    /// Assemble `M = AᵀWA (+ λ·diag(m))` and `rhs = AᵀWb (+ λ·diag(m)·z_prior)`.
    ///
    /// Per-row outer products are computed in parallel; merging them into
    /// triplets is sequential, and duplicates are summed during the CSR
    /// conversion.
    pub fn normal_equations(
        &self,
        weights: &[f64],
        prior: Option<PriorTerm<'_>>,
    ) -> (CsMat<f64>, Vec<f64>) {
        debug_assert_eq!(weights.len(), self.a.rows());
        let n = self.n;
        let terms: Vec<RowTerms> = collect_indexed(self.a.rows(), |r| {
            RowTerms::weighted(&self.a, r, weights[r], self.b[r])
        });
        let mut tri = TriMat::with_capacity((n, n), 2 * self.a.nnz() + n);
        let mut rhs = vec![0.0; n];
        for t in &terms {
            for a in 0..t.len {
                rhs[t.cols[a]] += t.rhs[a];
                for b in 0..t.len {
                    tri.add_triplet(t.cols[a], t.cols[b], t.outer[a][b]);
                }
            }
        }
        if let Some(prior) = prior {
            for i in 0..n {
                if prior.mask[i] {
                    tri.add_triplet(i, i, prior.lambda);
                    rhs[i] += prior.lambda * prior.target[i];
                }
            }
        }
        (tri.to_csr(), rhs)
    }
}

/// Contribution of one stacked row to the normal equations. Every row of
/// `A` joins at most two pixels.
#[derive(Clone, Copy, Default)]
struct RowTerms {
    len: usize,
    cols: [usize; 2],
    /// `w · a_j · a_k`
    outer: [[f64; 2]; 2],
    /// `w · a_j · b`
    rhs: [f64; 2],
}

impl RowTerms {
    fn weighted(a: &CsMat<f64>, r: usize, w: f64, b: f64) -> Self {
        let mut t = Self::default();
        if w == 0.0 {
            return t;
        }
        if let Some(row) = a.outer_view(r) {
            debug_assert!(row.nnz() <= 2);
            let mut vals = [0.0; 2];
            for (c, &v) in row.iter().take(2) {
                t.cols[t.len] = c;
                vals[t.len] = v;
                t.rhs[t.len] = w * v * b;
                t.len += 1;
            }
            for j in 0..t.len {
                for k in 0..t.len {
                    t.outer[j][k] = w * vals[j] * vals[k];
                }
            }
        }
        t
    }
}
