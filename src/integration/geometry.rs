//! Map the solved unknowns back to image space: dense depth, vertices, quads
//! and discontinuity-weight maps.
use super::camera::Projection;
use super::indexing::PixelIndex;
use super::linalg::collect_indexed;
use super::system::Block;
use crate::image::{ImageF64, NormalMap};
use crate::mesh::Mesh;

/// `exp` clamped to the positive finite range.
#[inline]
pub(crate) fn saturating_exp(z: f64) -> f64 {
    if z.is_nan() {
        return z;
    }
    z.exp().clamp(f64::MIN_POSITIVE, f64::MAX)
}

/// Depth per valid pixel: `z` itself, or `exp(z)` under perspective.
pub(crate) fn depth_values(z: &[f64], projection: &Projection) -> Vec<f64> {
    match projection {
        Projection::Orthographic => z.to_vec(),
        Projection::Perspective(_) => collect_indexed(z.len(), |i| saturating_exp(z[i])),
    }
}

pub(crate) fn depth_map(index: &PixelIndex, depth: &[f64]) -> ImageF64 {
    let data = index.scatter(depth, f64::NAN);
    ImageF64 {
        w: index.width(),
        h: index.height(),
        stride: index.width(),
        data,
    }
}

/// One 3D point per valid pixel, in index order.
pub(crate) fn vertices(
    index: &PixelIndex,
    depth: &[f64],
    projection: &Projection,
    step_size: f64,
) -> Vec<[f64; 3]> {
    let h = index.height();
    collect_indexed(index.len(), |i| {
        let (x, y) = index.pixel(i);
        let u = (h - 1 - y) as f64;
        let v = x as f64;
        match projection {
            Projection::Orthographic => [u * step_size, v * step_size, depth[i]],
            Projection::Perspective(cam) => {
                let p = cam.unproject(u, v, depth[i]);
                [p[0], p[1], p[2]]
            }
        }
    })
}

/// Quads over every 2×2 block of valid pixels, top-left corners scanned
/// row-major.
///
/// Default order is `[(r,c), (r+1,c), (r+1,c+1), (r,c+1)]`; `flip` reverses
/// the winding to `[(r,c), (r,c+1), (r+1,c+1), (r+1,c)]`.
pub(crate) fn facets(index: &PixelIndex, flip: bool) -> Vec<[usize; 4]> {
    let mut out = Vec::new();
    for (tl, &(x, y)) in index.pixels().iter().enumerate() {
        let corners = (
            index.neighbor(x, y, 1, 0),
            index.neighbor(x, y, 0, 1),
            index.neighbor(x, y, 1, 1),
        );
        if let (Some(tr), Some(bl), Some(br)) = corners {
            out.push(if flip {
                [tl, tr, br, bl]
            } else {
                [tl, bl, br, tr]
            });
        }
    }
    out
}

/// Winding flips when the mean normal-map `n2` over the whole image is
/// negative. Masked-out background counts too.
pub(crate) fn flip_winding(normals: &NormalMap) -> bool {
    normals.channel_mean(2) < 0.0
}

/// `(wu_map, wv_map)` from the stacked weights.
///
/// `wu_map` carries the forward weights of the `v` axis and `wv_map` those of
/// the `u` axis.
pub(crate) fn weight_maps(index: &PixelIndex, weights: &[f64]) -> (ImageF64, ImageF64) {
    let n = index.len();
    let scatter = |block: Block| depth_map(index, &weights[block.range(n)]);
    (scatter(Block::VForward), scatter(Block::UForward))
}

/// Vertex array and quads of the reconstructed surface.
pub(crate) fn build_mesh(
    index: &PixelIndex,
    depth: &[f64],
    projection: &Projection,
    step_size: f64,
    flip: bool,
) -> Mesh {
    Mesh {
        vertices: vertices(index, depth, projection, step_size),
        facets: facets(index, flip),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Mask;
    use crate::integration::camera::Intrinsics;

    #[test]
    fn full_rectangle_yields_all_quads() {
        let (w, h) = (5usize, 4usize);
        let index = PixelIndex::build(&Mask::full(w, h)).unwrap();
        let quads = facets(&index, false);
        assert_eq!(quads.len(), (w - 1) * (h - 1));
        assert!(quads.iter().flatten().all(|&i| i < index.len()));
        assert_eq!(quads[0], [0, w, w + 1, 1]);
        assert_eq!(facets(&index, true)[0], [0, 1, w + 1, w]);
    }

    #[test]
    fn holes_remove_touching_quads() {
        let mask = Mask::from_fn(3, 3, |x, y| !(x == 1 && y == 1));
        let index = PixelIndex::build(&mask).unwrap();
        assert!(facets(&index, false).is_empty());

        let mask = Mask::from_fn(3, 3, |x, y| !(x == 2 && y == 2));
        let index = PixelIndex::build(&mask).unwrap();
        assert_eq!(facets(&index, false).len(), 3);
    }

    #[test]
    fn depth_map_is_nan_outside_mask() {
        let mask = Mask::from_fn(3, 2, |x, _| x != 1);
        let index = PixelIndex::build(&mask).unwrap();
        let map = depth_map(&index, &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(map.get(0, 0), 1.0);
        assert!(map.get(1, 0).is_nan());
        assert_eq!(map.get(2, 1), 4.0);
    }

    #[test]
    fn dark_background_flips_winding() {
        // Viewer-facing 2x2 patch on a black (-1, -1, -1) background.
        let normals = NormalMap::from_fn(4, 4, |x, y| {
            if (1..3).contains(&x) && (1..3).contains(&y) {
                [0.0, 0.0, 1.0]
            } else {
                [-1.0, -1.0, -1.0]
            }
        });
        assert!(flip_winding(&normals));
        assert!(!flip_winding(&NormalMap::filled(4, 4, [0.0, 0.0, 1.0])));
    }

    #[test]
    fn exponentiation_saturates() {
        assert_eq!(saturating_exp(1e6), f64::MAX);
        assert_eq!(saturating_exp(-1e6), f64::MIN_POSITIVE);
        assert!((saturating_exp(0.0) - 1.0).abs() < 1e-15);
    }

    #[test]
    fn orthographic_vertices_use_upward_rows() {
        let index = PixelIndex::build(&Mask::full(2, 3)).unwrap();
        let verts = vertices(&index, &[7.0; 6], &Projection::Orthographic, 0.5);
        assert_eq!(verts[0], [1.0, 0.0, 7.0]);
        assert_eq!(verts[5], [0.0, 0.5, 7.0]);
    }

    #[test]
    fn perspective_vertices_scale_with_depth() {
        let cam = Intrinsics::from_focal(10.0, 10.0, 1.0, 0.5).unwrap();
        let projection = Projection::Perspective(cam);
        let index = PixelIndex::build(&Mask::full(2, 2)).unwrap();
        let verts = vertices(&index, &[2.0, 2.0, 4.0, 4.0], &projection, 1.0);
        // (x=0, y=1): u = 0, v = 0.
        assert!((verts[2][0] - (0.0 - 1.0) / 10.0 * 4.0).abs() < 1e-12);
        assert!((verts[2][1] - (0.0 - 0.5) / 10.0 * 4.0).abs() < 1e-12);
        assert!((verts[2][2] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn weight_maps_swap_axis_labels() {
        let index = PixelIndex::build(&Mask::full(2, 1)).unwrap();
        let weights = [0.1, 0.2, 0.9, 0.8, 0.3, 0.4, 0.7, 0.6];
        let (wu, wv) = weight_maps(&index, &weights);
        assert_eq!(wu.data, vec![0.3, 0.4]);
        assert_eq!(wv.data, vec![0.1, 0.2]);
    }
}
