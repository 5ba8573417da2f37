//! Wavefront OBJ export

use crate::buffers::MeshBuffers;
use crate::error::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write the written part of `buffers` as OBJ text
pub fn write_obj<W: Write>(buffers: &MeshBuffers, writer: W) -> Result<()> {
    let mut writer = BufWriter::new(writer);

    writeln!(writer, "# Isoforge OBJ Export")?;
    writeln!(writer, "# Vertices: {}", buffers.vertex_count())?;
    writeln!(writer, "# Triangles: {}", buffers.triangle_count())?;
    writeln!(writer)?;

    for p in buffers.positions() {
        writeln!(writer, "v {} {} {}", p[0], p[1], p[2])?;
    }
    writeln!(writer)?;

    for n in buffers.normals() {
        writeln!(writer, "vn {} {} {}", n[0], n[1], n[2])?;
    }
    writeln!(writer)?;

    // OBJ indices are 1-based
    for tri in buffers.indices().chunks_exact(3) {
        let (a, b, c) = (tri[0] + 1, tri[1] + 1, tri[2] + 1);
        writeln!(writer, "f {a}//{a} {b}//{b} {c}//{c}")?;
    }

    writer.flush()?;
    Ok(())
}

/// Export to an OBJ file
pub fn export_obj(buffers: &MeshBuffers, path: impl AsRef<Path>) -> Result<()> {
    let file = File::create(path.as_ref())?;
    write_obj(buffers, file)?;
    tracing::info!("Exported {} triangles to {}", buffers.triangle_count(), path.as_ref().display());
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::buffers::MeshCapacity;
    use glam::Vec3;

    #[test]
    fn test_write_obj() {
        let mut buffers = MeshBuffers::with_capacity(MeshCapacity {
            vertices: 4,
            indices: 6,
        });
        buffers.push_vertex(Vec3::ZERO, Vec3::Z);
        buffers.push_vertex(Vec3::X, Vec3::Z);
        buffers.push_vertex(Vec3::Y, Vec3::Z);
        buffers.push_triangle(0, 1, 2);

        let mut out = Vec::new();
        write_obj(&buffers, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(text.lines().filter(|l| l.starts_with("v ")).count(), 3);
        assert_eq!(text.lines().filter(|l| l.starts_with("vn ")).count(), 3);
        assert!(text.contains("f 1//1 2//2 3//3"));
        assert!(text.contains("v 1 0 0"));
    }
}
