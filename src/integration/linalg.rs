//! Row-parallel kernels shared by the assembler, the CG solver and the
//! reweighting step.
//!
//! With the `parallel` feature the kernels run on rayon. Reductions then use
//! rayon's tree-shaped `sum`, so the summation order follows the work split
//! and results are not bit-reproducible across thread counts. Without the
//! feature every reduction is a left-to-right fold.
use sprs::CsMat;

/// Evaluate `f(i)` for `i in 0..n` and collect the results in order.
#[cfg(feature = "parallel")]
pub(crate) fn collect_indexed<T, F>(n: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    use rayon::prelude::*;
    (0..n).into_par_iter().map(f).collect()
}

#[cfg(not(feature = "parallel"))]
pub(crate) fn collect_indexed<T, F>(n: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    (0..n).map(f).collect()
}

#[cfg(feature = "parallel")]
pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    use rayon::prelude::*;
    a.par_iter().zip(b.par_iter()).map(|(x, y)| x * y).sum()
}

#[cfg(not(feature = "parallel"))]
pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Weighted squared norm `Σ w_i r_i²`.
pub(crate) fn weighted_sq_norm(w: &[f64], r: &[f64]) -> f64 {
    let wr = collect_indexed(r.len(), |i| w[i] * r[i]);
    dot(&wr, r)
}

/// `y = A x` for a CSR matrix, one task per row.
pub(crate) fn spmv(a: &CsMat<f64>, x: &[f64]) -> Vec<f64> {
    debug_assert_eq!(a.cols(), x.len());
    collect_indexed(a.rows(), |r| row_dot(a, r, x))
}

#[inline]
pub(crate) fn row_dot(a: &CsMat<f64>, r: usize, x: &[f64]) -> f64 {
    a.outer_view(r)
        .map(|row| row.iter().map(|(c, &v)| v * x[c]).sum())
        .unwrap_or(0.0)
}

/// Diagonal entries of a square CSR matrix (missing entries read as 0).
pub(crate) fn diagonal(a: &CsMat<f64>) -> Vec<f64> {
    collect_indexed(a.rows(), |r| {
        a.outer_view(r)
            .and_then(|row| row.iter().find(|(c, _)| *c == r).map(|(_, &v)| v))
            .unwrap_or(0.0)
    })
}
