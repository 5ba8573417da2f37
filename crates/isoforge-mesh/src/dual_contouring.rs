//! Dual Contouring surface extraction
//!
//! One vertex per lattice point, shared by every quad that touches it. Each
//! lattice point is classified by the four far corners of the cube it anchors,
//! which decide whether a quad crosses each of the three edges meeting at the
//! far corner (corner 6). Classification is parallel; vertex creation walks
//! cells in a fixed order so indices are deterministic.

use crate::buffers::{MeshBuffers, MeshCapacity};
use crate::error::{Error, Result};
use crate::grid::{DensityGrid, GridLayout, Padding};
use crate::marching_cubes::{case_index, crossing};
use crate::request::{Algorithm, MeshRequest};
use crate::sampler::{normal_at, voxel_size};
use crate::tables::{CORNER_OFFSETS, EDGE_CONNECTIONS, EDGE_DIRECTIONS, EDGE_TABLE};
use glam::{IVec3, Vec3};
use isoforge_formula::{EvalState, Program};
use rayon::prelude::*;

/// Four corner labels of a cell, walked around a quad
pub type Quad = [usize; 4];

/// Crosses the z-directed edge between corners 5 and 6
const Z_QUAD: Quad = [0, 1, 5, 4];
/// Crosses the y-directed edge between corners 2 and 6
const Y_QUAD: Quad = [0, 3, 2, 1];
/// Crosses the x-directed edge between corners 7 and 6
const X_QUAD: Quad = [0, 4, 7, 3];

/// Quads emitted for one lattice point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeCase {
    pub quads: &'static [Quad],
    /// Reverse the winding; set for complements of cases 0..8
    pub flipped: bool,
}

const fn case(quads: &'static [Quad], flipped: bool) -> EdgeCase {
    EdgeCase { quads, flipped }
}

/// Indexed by the 4-bit classification of [`classify`]
pub const EDGE_CASES: [EdgeCase; 16] = [
    case(&[], false),
    case(&[Z_QUAD], false),
    case(&[Y_QUAD], false),
    case(&[Z_QUAD, Y_QUAD], false),
    case(&[X_QUAD], false),
    case(&[Z_QUAD, X_QUAD], false),
    case(&[Y_QUAD, X_QUAD], false),
    case(&[Z_QUAD, Y_QUAD, X_QUAD], false),
    case(&[Z_QUAD, Y_QUAD, X_QUAD], true),
    case(&[Y_QUAD, X_QUAD], true),
    case(&[Z_QUAD, X_QUAD], true),
    case(&[X_QUAD], true),
    case(&[Z_QUAD, Y_QUAD], true),
    case(&[Y_QUAD], true),
    case(&[Z_QUAD], true),
    case(&[], true),
];

/// Worst-case buffer sizes for a region of `voxel_side` cells per axis
pub fn capacity(voxel_side: u32) -> MeshCapacity {
    let points = (voxel_side as usize + 1).pow(3);
    MeshCapacity {
        vertices: points * 7,
        indices: points * 6 * 3,
    }
}

/// 4-bit edge case of the lattice point `point`
///
/// Bits 0..4 are set when corners 5, 2, 7 and 6 of the cube anchored at
/// `point` are below the iso level.
#[inline]
pub fn classify(grid: &DensityGrid, point: IVec3, iso_level: f32) -> u8 {
    [5, 2, 7, 6]
        .iter()
        .enumerate()
        .filter(|&(_, &corner)| grid.density(point + CORNER_OFFSETS[corner]) < iso_level)
        .fold(0, |case, (bit, _)| case | (1 << bit))
}

/// Polygonize `grid` into `buffers`
///
/// `grid` must be gradient padded; `program` is the one that sampled it and is
/// re-evaluated for vertex normals at `request.origin + position`.
pub fn extract(
    grid: &DensityGrid,
    program: &Program,
    request: &MeshRequest,
    buffers: &mut MeshBuffers,
) -> Result<()> {
    if grid.layout().padding() != Padding::Gradient {
        return Err(Error::PaddingRequired {
            algorithm: Algorithm::DualContouring,
        });
    }
    let voxel_side = grid.layout().voxel_side();
    crate::error::check_capacity(buffers.capacity(), capacity(voxel_side))?;
    buffers.reset(buffers.capacity());

    let lattice = GridLayout::new(voxel_side, Padding::None);
    let cases: Vec<u8> = (0..lattice.volume())
        .into_par_iter()
        .map(|i| classify(grid, lattice.index_to_coords(i), request.iso_level))
        .collect();

    let mut emitter = Emitter {
        program,
        state: EvalState::new(),
        lattice,
        vertex_slots: vec![0; lattice.volume()],
        origin: request.origin,
        delta: voxel_size(request.scale, voxel_side),
        normal_epsilon: request.normal_epsilon,
        buffers,
    };

    let n = voxel_side as i32;
    for y in 0..n {
        for z in 0..n {
            for x in 0..n {
                let cell = IVec3::new(x, y, z);
                let edge_case = EDGE_CASES[cases[lattice.coords_to_index(cell)] as usize];
                for quad in edge_case.quads {
                    emitter.emit_quad(cell, *quad, edge_case.flipped);
                }
            }
        }
    }

    if request.smooth {
        emitter.smooth(grid, request.iso_level);
    }

    Ok(())
}

struct Emitter<'a> {
    program: &'a Program,
    state: EvalState,
    lattice: GridLayout,
    /// Output index + 1 per lattice point, 0 until first referenced
    vertex_slots: Vec<u32>,
    origin: Vec3,
    delta: f32,
    normal_epsilon: f32,
    buffers: &'a mut MeshBuffers,
}

impl Emitter<'_> {
    fn emit_quad(&mut self, cell: IVec3, quad: Quad, flipped: bool) {
        let [v0, v1, v2, v3] = quad.map(|corner| self.vertex(cell + CORNER_OFFSETS[corner]));
        if flipped {
            self.buffers.push_triangle(v0, v1, v2);
            self.buffers.push_triangle(v0, v2, v3);
        } else {
            self.buffers.push_triangle(v0, v2, v1);
            self.buffers.push_triangle(v0, v3, v2);
        }
    }

    /// Output index of a lattice point's vertex, created on first use
    fn vertex(&mut self, point: IVec3) -> u32 {
        let slot = self.lattice.coords_to_index(point);
        if self.vertex_slots[slot] == 0 {
            let position = (point.as_vec3() + Vec3::splat(0.5)) * self.delta;
            let normal = self.normal(position);
            let index = self.buffers.push_vertex(position, normal);
            self.vertex_slots[slot] = index + 1;
        }
        self.vertex_slots[slot] - 1
    }

    fn normal(&mut self, position: Vec3) -> Vec3 {
        normal_at(
            self.program,
            &mut self.state,
            self.origin + position,
            self.normal_epsilon,
        )
    }

    /// Move each surface vertex to the mean iso crossing of its cube's edges
    fn smooth(&mut self, grid: &DensityGrid, iso_level: f32) {
        let mut moved = 0usize;

        for slot in 0..self.lattice.volume() {
            let point = self.lattice.index_to_coords(slot);
            let corners = grid.corner_densities(point);
            let edge_flags = EDGE_TABLE[case_index(&corners, iso_level)];
            if edge_flags == 0 {
                continue;
            }

            if self.vertex_slots[slot] == 0 {
                tracing::trace!("No vertex at lattice point {}, skipping smoothing", point);
                continue;
            }
            let index = self.vertex_slots[slot] - 1;

            let mut sum = Vec3::ZERO;
            for (edge, &(a, b)) in EDGE_CONNECTIONS.iter().enumerate() {
                if edge_flags & (1 << edge) != 0 {
                    let t = crossing(corners[a], corners[b], iso_level);
                    let p = CORNER_OFFSETS[a].as_vec3() + EDGE_DIRECTIONS[edge] * t;
                    sum += p.clamp(Vec3::ZERO, Vec3::ONE);
                }
            }
            let mean = sum / edge_flags.count_ones() as f32;

            let position = (point.as_vec3() + mean) * self.delta;
            let normal = self.normal(position);
            self.buffers.set_vertex(index, position, normal);
            moved += 1;
        }

        tracing::trace!("Smoothed {} vertices", moved);
    }
}
