//! Quad mesh produced from the reconstructed depth.
//!
//! One vertex per valid pixel, in the row-major order of the pixel index, and
//! one quad per fully valid 2×2 pixel block.

mod ply;

pub use ply::write_ply;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<[f64; 3]>,
    /// Vertex indices of each quad, in winding order.
    pub facets: Vec<[usize; 4]>,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn facet_count(&self) -> usize {
        self.facets.len()
    }

    /// Axis-aligned bounds over finite vertices, `None` if there are none.
    pub fn bounds(&self) -> Option<([f64; 3], [f64; 3])> {
        let mut it = self
            .vertices
            .iter()
            .filter(|v| v.iter().all(|c| c.is_finite()));
        let first = *it.next()?;
        Some(it.fold((first, first), |(mut lo, mut hi), v| {
            for k in 0..3 {
                lo[k] = lo[k].min(v[k]);
                hi[k] = hi[k].max(v[k]);
            }
            (lo, hi)
        }))
    }

    /// Write the mesh as ASCII PLY; see [`write_ply`].
    pub fn save_ply(&self, path: &std::path::Path) -> crate::Result<()> {
        write_ply(self, path)
    }
}
