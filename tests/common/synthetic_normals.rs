use bini::image::{camera_to_normal_coords, NormalMap};
use nalgebra::Vector3;

/// Normal map of the orthographic plane `z = a·u + b·v`, with `u = h-1-y`
/// and `v = x` in pixel units.
pub fn plane_normals(w: usize, h: usize, a: f64, b: f64) -> NormalMap {
    let n = Vector3::new(a, b, -1.0).normalize();
    NormalMap::filled(w, h, camera_to_normal_coords(&n))
}

/// Ground-truth depth of [`plane_normals`] sampled on the grid.
pub fn plane_depth(w: usize, h: usize, a: f64, b: f64, step: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(w * h);
    for y in 0..h {
        for x in 0..w {
            let u = (h - 1 - y) as f64 * step;
            let v = x as f64 * step;
            out.push(a * u + b * v);
        }
    }
    out
}

/// Camera-space plane `n · P = c` seen through a pinhole with focal length
/// `f` and principal point `(cx, cy)`; returns the normal map and per-pixel
/// depth.
pub fn perspective_plane(
    w: usize,
    h: usize,
    f: f64,
    cx: f64,
    cy: f64,
    normal: Vector3<f64>,
    depth_at_center: f64,
) -> (NormalMap, Vec<f64>) {
    let n = normal.normalize();
    let c = n.z * depth_at_center;
    let normals = NormalMap::filled(w, h, camera_to_normal_coords(&n));
    let mut depth = Vec::with_capacity(w * h);
    for y in 0..h {
        for x in 0..w {
            let u = (h - 1 - y) as f64;
            let v = x as f64;
            let ray = Vector3::new((u - cx) / f, (v - cy) / f, 1.0);
            depth.push(c / n.dot(&ray));
        }
    }
    (normals, depth)
}

/// Subtract the mean of `values`.
pub fn centered(values: &[f64]) -> Vec<f64> {
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| v - mean).collect()
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
