//! Parallel density sampling
//!
//! Every lattice point is independent, so the grid is filled with a rayon
//! parallel iterator. Each worker keeps its own [`EvalState`].

use crate::grid::{DensityGrid, GridLayout};
use glam::Vec3;
use isoforge_formula::{EvalState, Program};
use rayon::prelude::*;

/// Sample `program` over a fresh grid
pub fn sample(program: &Program, origin: Vec3, scale: f32, layout: GridLayout) -> DensityGrid {
    let mut grid = DensityGrid::new(layout);
    sample_into(program, origin, scale, &mut grid);
    grid
}

/// Sample `program` into an existing grid, overwriting every value
///
/// Lattice point `c` is evaluated at `origin + c * scale / voxel_side` and the
/// x component of the result is stored.
///
/// # Panics
///
/// Panics if `program` reads more than one parameter.
pub fn sample_into(program: &Program, origin: Vec3, scale: f32, grid: &mut DensityGrid) {
    let layout = grid.layout();
    let delta = voxel_size(scale, layout.voxel_side());

    grid.values_mut()
        .par_iter_mut()
        .enumerate()
        .for_each_init(EvalState::new, |state, (index, value)| {
            let local = layout.index_to_coords(index);
            debug_assert_eq!(layout.coords_to_index(local), index);
            let position = origin + local.as_vec3() * delta;
            *value = state.run(program, &[position]).x;
        });
}

/// Edge length of one voxel in world units
#[inline]
pub(crate) fn voxel_size(scale: f32, voxel_side: u32) -> f32 {
    scale / voxel_side as f32
}

/// Central-difference gradient of the density, pointing toward lower density
///
/// For a field that is positive inside the surface this is the outward normal.
pub(crate) fn normal_at(
    program: &Program,
    state: &mut EvalState,
    position: Vec3,
    epsilon: f32,
) -> Vec3 {
    let mut density = |p: Vec3| state.run(program, &[p]).x;
    let n = Vec3::new(
        density(position - Vec3::X * epsilon) - density(position + Vec3::X * epsilon),
        density(position - Vec3::Y * epsilon) - density(position + Vec3::Y * epsilon),
        density(position - Vec3::Z * epsilon) - density(position + Vec3::Z * epsilon),
    );
    (n / epsilon).normalize_or_zero()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::grid::Padding;
    use approx::assert_relative_eq;
    use glam::IVec3;
    use isoforge_formula::{Formula, FunctionRegistry};

    fn compile(source: &str) -> Program {
        Formula::new(source)
            .with_parameters(["coords"])
            .compile(&FunctionRegistry::builtin())
            .unwrap()
            .program
    }

    #[test]
    fn test_samples_world_positions() {
        let program = compile("x(coords) + 10 * y(coords) + 100 * z(coords)");
        let origin = Vec3::new(1.0, 2.0, 3.0);
        let grid = sample(&program, origin, 4.0, GridLayout::new(2, Padding::Gradient));

        for (index, &value) in grid.values().iter().enumerate() {
            let p = origin + grid.layout().index_to_coords(index).as_vec3() * 2.0;
            assert_relative_eq!(value, p.x + 10.0 * p.y + 100.0 * p.z, max_relative = 1e-6);
        }
        assert_relative_eq!(grid.density(IVec3::splat(-1)), -1.0 + 0.0 + 100.0);
    }

    #[test]
    fn test_constant_program() {
        let grid = sample(&Program::constant(Vec3::splat(2.5)), Vec3::ZERO, 1.0, GridLayout::new(3, Padding::None));
        assert!(grid.values().iter().all(|&v| v == 2.5));
    }

    #[test]
    fn test_normal_points_away_from_solid() {
        // Solid below the plane y = 0
        let program = compile("-y(coords)");
        let mut state = EvalState::new();
        let n = normal_at(&program, &mut state, Vec3::new(0.3, 0.0, -0.2), 0.01);
        assert!((n - Vec3::Y).length() < 1e-5, "normal {} should point up", n);
    }
}
