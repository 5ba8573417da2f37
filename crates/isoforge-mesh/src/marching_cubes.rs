//! Marching Cubes surface extraction
//!
//! Every triangle gets three fresh vertices sharing its face normal. Corner `i`
//! sets bit `i` of the case index when its density is below the iso level, so
//! positive density is solid and normals point toward lower density.

use crate::buffers::{MeshBuffers, MeshCapacity};
use crate::error::Result;
use crate::grid::DensityGrid;
use crate::sampler::voxel_size;
use crate::tables::{CORNER_OFFSETS, EDGE_CONNECTIONS, EDGE_DIRECTIONS, EDGE_TABLE, TRI_TABLE};
use glam::{IVec3, Vec3};

/// Largest number of triangles one cell can produce
pub const MAX_TRIANGLES_PER_CELL: usize = 5;

/// Worst-case buffer sizes for a region of `voxel_side` cells per axis
pub fn capacity(voxel_side: u32) -> MeshCapacity {
    let cells = (voxel_side as usize).pow(3);
    let indices = cells * MAX_TRIANGLES_PER_CELL * 3;
    MeshCapacity {
        vertices: indices,
        indices,
    }
}

/// Case index of a cell from its corner densities
#[inline]
pub fn case_index(corners: &[f32; 8], iso_level: f32) -> usize {
    corners
        .iter()
        .enumerate()
        .filter(|(_, d)| **d < iso_level)
        .fold(0, |case, (i, _)| case | (1 << i))
}

/// Fraction along an edge where the density crosses `iso_level`
#[inline]
pub(crate) fn crossing(d0: f32, d1: f32, iso_level: f32) -> f32 {
    if (d1 - d0).abs() > 0.00001 {
        (iso_level - d0) / (d1 - d0)
    } else {
        0.5
    }
}

/// Polygonize `grid` into `buffers`
///
/// Positions are region-local: lattice point `c` sits at `c * scale / voxel_side`.
/// The buffers are cleared first and must hold [`capacity`] of the grid's voxel side.
pub fn extract(grid: &DensityGrid, iso_level: f32, scale: f32, buffers: &mut MeshBuffers) -> Result<()> {
    let voxel_side = grid.layout().voxel_side();
    crate::error::check_capacity(buffers.capacity(), capacity(voxel_side))?;
    buffers.reset(buffers.capacity());

    let delta = voxel_size(scale, voxel_side);
    let n = voxel_side as i32;

    for y in 0..n {
        for z in 0..n {
            for x in 0..n {
                polygonize_cell(grid, IVec3::new(x, y, z), iso_level, delta, buffers);
            }
        }
    }

    Ok(())
}

fn polygonize_cell(grid: &DensityGrid, cell: IVec3, iso_level: f32, delta: f32, buffers: &mut MeshBuffers) {
    let corners = grid.corner_densities(cell);
    let case = case_index(&corners, iso_level);

    let edge_flags = EDGE_TABLE[case];
    if edge_flags == 0 {
        return;
    }

    let mut edge_points = [Vec3::ZERO; 12];
    for (edge, &(a, b)) in EDGE_CONNECTIONS.iter().enumerate() {
        if edge_flags & (1 << edge) != 0 {
            let t = crossing(corners[a], corners[b], iso_level);
            let start = (cell + CORNER_OFFSETS[a]).as_vec3();
            edge_points[edge] = (start + EDGE_DIRECTIONS[edge] * t) * delta;
        }
    }

    // The corner relabelling mirrors the tables, so the second and third
    // vertices are swapped to keep faces pointing out of the solid
    for triangle in TRI_TABLE[case].chunks_exact(3).take_while(|t| t[0] != -1) {
        let p0 = edge_points[triangle[0] as usize];
        let p1 = edge_points[triangle[2] as usize];
        let p2 = edge_points[triangle[1] as usize];

        let normal = (p1 - p0).cross(p2 - p0).normalize_or_zero();
        let a = buffers.push_vertex(p0, normal);
        let b = buffers.push_vertex(p1, normal);
        let c = buffers.push_vertex(p2, normal);
        buffers.push_triangle(a, b, c);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::grid::{GridLayout, Padding};

    fn grid_from(voxel_side: u32, f: impl Fn(IVec3) -> f32) -> DensityGrid {
        let layout = GridLayout::new(voxel_side, Padding::None);
        let mut grid = DensityGrid::new(layout);
        for (i, value) in grid.values_mut().iter_mut().enumerate() {
            *value = f(layout.index_to_coords(i));
        }
        grid
    }

    fn run(grid: &DensityGrid) -> MeshBuffers {
        let mut buffers = MeshBuffers::with_capacity(capacity(grid.layout().voxel_side()));
        extract(grid, 0.0, grid.layout().voxel_side() as f32, &mut buffers).unwrap();
        buffers
    }

    #[test]
    fn test_uniform_cells_are_empty() {
        assert!(run(&grid_from(3, |_| 1.0)).is_empty());
        assert!(run(&grid_from(3, |_| -1.0)).is_empty());
    }

    #[test]
    fn test_single_corner_inside() {
        // Only the origin is solid
        let grid = grid_from(1, |c| if c == IVec3::ZERO { 1.0 } else { -1.0 });
        let buffers = run(&grid);

        assert_eq!(buffers.triangle_count(), 1);
        for p in buffers.positions() {
            let p = Vec3::from_array(*p);
            assert!((p.x + p.y + p.z - 0.5).abs() < 1e-6, "{:?}", p);
        }
        // Facing away from the solid corner
        let n = Vec3::from_array(buffers.normals()[0]);
        assert!(n.dot(Vec3::ONE) > 0.0);
    }

    #[test]
    fn test_plane_normals_face_up() {
        // Solid below y = 1.5
        let grid = grid_from(3, |c| 1.5 - c.y as f32);
        let buffers = run(&grid);

        assert_eq!(buffers.triangle_count(), 9 * 2);
        for (p, n) in buffers.positions().iter().zip(buffers.normals()) {
            assert!((p[1] - 1.5).abs() < 1e-6);
            assert_eq!(*n, [0.0, 1.0, 0.0]);
        }
    }

    #[test]
    fn test_rejects_small_buffers() {
        let grid = grid_from(2, |_| 0.0);
        let mut buffers = MeshBuffers::with_capacity(capacity(1));
        assert!(extract(&grid, 0.0, 1.0, &mut buffers).is_err());
    }

    #[test]
    fn test_case_index_bits() {
        let mut corners = [1.0; 8];
        corners[2] = -1.0;
        corners[7] = -1.0;
        assert_eq!(case_index(&corners, 0.0), 0b1000_0100);
    }
}
