use super::Mesh;
use crate::error::{IntegrationError, Result};
use crate::image::io::ensure_parent_dir;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write `mesh` as an ASCII PLY file with `vertex` and quad `face` elements.
pub fn write_ply(mesh: &Mesh, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    let io_err = |source| IntegrationError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_err)?;
    let mut out = BufWriter::new(file);
    write_ply_to(mesh, &mut out).map_err(io_err)?;
    out.flush().map_err(io_err)
}

fn write_ply_to<W: Write>(mesh: &Mesh, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "ply")?;
    writeln!(out, "format ascii 1.0")?;
    writeln!(out, "element vertex {}", mesh.vertices.len())?;
    writeln!(out, "property double x")?;
    writeln!(out, "property double y")?;
    writeln!(out, "property double z")?;
    writeln!(out, "element face {}", mesh.facets.len())?;
    writeln!(out, "property list uchar int vertex_indices")?;
    writeln!(out, "end_header")?;
    for [x, y, z] in &mesh.vertices {
        writeln!(out, "{x} {y} {z}")?;
    }
    for [a, b, c, d] in &mesh.facets {
        writeln!(out, "4 {a} {b} {c} {d}")?;
    }
    Ok(())
}
