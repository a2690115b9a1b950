//! Projection models: orthographic or pinhole perspective.
//!
//! Intrinsics are expressed in camera coordinates where `x` runs up the image
//! (`u = H-1-row`) and `y` runs right (`v = col`):
//!
//! ```text
//! K = [[fx, 0,  cx],
//!      [0,  fy, cy],
//!      [0,  0,  1 ]]
//! ```
use crate::error::{IntegrationError, Result};
use nalgebra::{Matrix3, Vector3};

const TRIANGULAR_EPS: f64 = 1e-12;

/// Validated pinhole intrinsics with a cached inverse.
#[derive(Clone, Debug, PartialEq)]
pub struct Intrinsics {
    k: Matrix3<f64>,
    k_inv: Matrix3<f64>,
}

impl Intrinsics {
    /// Validate an upper-triangular camera matrix and precompute its inverse.
    pub fn new(k: Matrix3<f64>) -> Result<Self> {
        if k.iter().any(|v| !v.is_finite()) {
            return Err(IntegrationError::invalid(
                "intrinsic matrix contains non-finite entries",
            ));
        }
        let lower = [k[(1, 0)], k[(2, 0)], k[(2, 1)]];
        if lower.iter().any(|v| v.abs() > TRIANGULAR_EPS) {
            return Err(IntegrationError::invalid(format!(
                "intrinsic matrix must be upper-triangular, got lower entries {lower:?}"
            )));
        }
        let k_inv = k
            .try_inverse()
            .ok_or_else(|| IntegrationError::invalid("intrinsic matrix is not invertible"))?;
        Ok(Self { k, k_inv })
    }

    /// Convenience constructor from focal lengths and principal point.
    pub fn from_focal(fx: f64, fy: f64, cx: f64, cy: f64) -> Result<Self> {
        Self::new(Matrix3::new(fx, 0.0, cx, 0.0, fy, cy, 0.0, 0.0, 1.0))
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.k
    }

    #[inline]
    pub fn fx(&self) -> f64 {
        self.k[(0, 0)]
    }
    #[inline]
    pub fn fy(&self) -> f64 {
        self.k[(1, 1)]
    }
    #[inline]
    pub fn cx(&self) -> f64 {
        self.k[(0, 2)]
    }
    #[inline]
    pub fn cy(&self) -> f64 {
        self.k[(1, 2)]
    }

    /// Back-project pixel-axis coordinates `(u, v)` at the given depth.
    #[inline]
    pub fn unproject(&self, u: f64, v: f64, depth: f64) -> Vector3<f64> {
        self.k_inv * Vector3::new(u, v, 1.0) * depth
    }
}

/// Camera model used to couple normals and depth derivatives.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Projection {
    /// Parallel projection; the unknown is raw depth.
    #[default]
    Orthographic,
    /// Pinhole projection; the unknown is log-depth.
    Perspective(Intrinsics),
}

impl Projection {
    /// Build a perspective projection from a raw 3×3 matrix.
    pub fn perspective(k: Matrix3<f64>) -> Result<Self> {
        Intrinsics::new(k).map(Self::Perspective)
    }

    pub fn is_perspective(&self) -> bool {
        matches!(self, Self::Perspective(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Orthographic => "orthographic",
            Self::Perspective(_) => "perspective",
        }
    }
}
