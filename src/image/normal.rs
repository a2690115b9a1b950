//! Normal-map container and the normal-coordinate ↔ camera-coordinate swap.
//!
//! Normal coordinates follow the usual normal-map image convention: a pixel
//! `(n0, n1, n2)` stores the right, up and towards-viewer components. The
//! solver works in camera coordinates (`x` up, `y` right, `+z` the viewing
//! direction), which gives `nx = n1`, `ny = n0`, `nz = -n2`.
use super::traits::ImageView;
use crate::error::{IntegrationError, Result};
use nalgebra::Vector3;

/// Convert a normal-map pixel into camera-coordinate components.
#[inline]
pub fn normal_to_camera(n: [f64; 3]) -> Vector3<f64> {
    Vector3::new(n[1], n[0], -n[2])
}

/// Inverse of [`normal_to_camera`].
#[inline]
pub fn camera_to_normal_coords(c: &Vector3<f64>) -> [f64; 3] {
    [c[1], c[0], -c[2]]
}

#[derive(Clone, Debug)]
pub struct NormalMap {
    pub w: usize,
    pub h: usize,
    pub data: Vec<[f64; 3]>,
}

impl NormalMap {
    /// Wrap row-major normal vectors; `data.len()` must equal `w * h`.
    pub fn new(w: usize, h: usize, data: Vec<[f64; 3]>) -> Result<Self> {
        if data.len() != w * h {
            return Err(IntegrationError::invalid(format!(
                "normal buffer holds {} vectors, expected {}x{}={}",
                data.len(),
                w,
                h,
                w * h
            )));
        }
        Ok(Self { w, h, data })
    }

    pub fn filled(w: usize, h: usize, n: [f64; 3]) -> Self {
        Self {
            w,
            h,
            data: vec![n; w * h],
        }
    }

    pub fn from_fn(w: usize, h: usize, mut f: impl FnMut(usize, usize) -> [f64; 3]) -> Self {
        let mut data = Vec::with_capacity(w * h);
        for y in 0..h {
            for x in 0..w {
                data.push(f(x, y));
            }
        }
        Self { w, h, data }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> [f64; 3] {
        self.data[y * self.w + x]
    }

    /// Camera-coordinate normal at (x, y).
    #[inline]
    pub fn camera(&self, x: usize, y: usize) -> Vector3<f64> {
        normal_to_camera(self.get(x, y))
    }

    /// Mean of channel `c` over every pixel, background included (0 when
    /// the map is empty).
    pub fn channel_mean(&self, c: usize) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().map(|v| v[c]).sum::<f64>() / self.data.len() as f64
    }
}

impl ImageView for NormalMap {
    type Pixel = [f64; 3];

    #[inline]
    fn width(&self) -> usize {
        self.w
    }
    #[inline]
    fn height(&self) -> usize {
        self.h
    }
    #[inline]
    fn row(&self, y: usize) -> &[[f64; 3]] {
        let start = y * self.w;
        &self.data[start..start + self.w]
    }
}
