//! Per-pixel coefficients coupling normal components to depth derivatives.
//!
//! Orthographic: `Nu = Nv = nz`, the unknown is depth.
//! Perspective: with `uu = u - cx`, `vv = v - cy` (pixel axes, `u` up),
//! `Nu = uu·nx + vv·ny + fx·nz` and `Nv = uu·nx + vv·ny + fy·nz`; the unknown
//! is log-depth, which makes the relation linear.
use super::camera::Projection;
use super::indexing::PixelIndex;
use super::linalg::collect_indexed;
use crate::image::NormalMap;

/// Camera-coordinate normal components and coupling coefficients, one entry
/// per valid pixel.
#[derive(Clone, Debug)]
pub struct CoefficientField {
    pub nx: Vec<f64>,
    pub ny: Vec<f64>,
    pub nz: Vec<f64>,
    pub nu: Vec<f64>,
    pub nv: Vec<f64>,
}

impl CoefficientField {
    pub fn build(normals: &NormalMap, index: &PixelIndex, projection: &Projection) -> Self {
        let n = index.len();
        let h = index.height();
        let camera: Vec<[f64; 3]> = collect_indexed(n, |i| {
            let (x, y) = index.pixel(i);
            let c = normals.camera(x, y);
            [c[0], c[1], c[2]]
        });
        let nx: Vec<f64> = camera.iter().map(|c| c[0]).collect();
        let ny: Vec<f64> = camera.iter().map(|c| c[1]).collect();
        let nz: Vec<f64> = camera.iter().map(|c| c[2]).collect();

        let (nu, nv) = match projection {
            Projection::Orthographic => (nz.clone(), nz.clone()),
            Projection::Perspective(cam) => {
                let (fx, fy, cx, cy) = (cam.fx(), cam.fy(), cam.cx(), cam.cy());
                let pairs: Vec<(f64, f64)> = collect_indexed(n, |i| {
                    let (x, y) = index.pixel(i);
                    let uu = (h - 1 - y) as f64 - cx;
                    let vv = x as f64 - cy;
                    let shared = uu * nx[i] + vv * ny[i];
                    (shared + fx * nz[i], shared + fy * nz[i])
                });
                pairs.into_iter().unzip()
            }
        };

        Self { nx, ny, nz, nu, nv }
    }

    pub fn len(&self) -> usize {
        self.nx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nx.is_empty()
    }
}
