//! Sample → extract pipeline for one region at a time
//!
//! Both stages read the same program snapshot, so a recompile landing
//! mid-request never mixes two formulas in one mesh. Independent regions share
//! nothing but that read-only program and can be generated in parallel.

use crate::buffers::MeshBuffers;
use crate::error::{Error, Result};
use crate::grid::{DensityGrid, GridLayout};
use crate::request::{Algorithm, MeshRequest};
use crate::{dual_contouring, marching_cubes, sampler};
use isoforge_formula::{Formula, LiveProgram, Program, Recompiled};
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;

/// Buffers produced for one request
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedMesh {
    pub buffers: MeshBuffers,
    /// Generation of the program that produced the buffers
    pub generation: u64,
}

/// Sample `program` for `request` and extract into `buffers`
///
/// `grid` is reshaped to the request's layout, keeping its allocation when the
/// size is unchanged.
pub fn generate_into(
    program: &Program,
    request: &MeshRequest,
    grid: &mut DensityGrid,
    buffers: &mut MeshBuffers,
) -> Result<()> {
    request.validate()?;
    if program.parameter_count() > 1 {
        return Err(Error::UnsupportedParameters(program.parameter_count()));
    }

    let layout = GridLayout::new(request.voxel_side, request.algorithm.padding());
    if grid.reshape(layout) {
        tracing::trace!("Reusing density grid of {} points", layout.volume());
    }

    let start = Instant::now();
    sampler::sample_into(program, request.origin, request.scale, grid);
    let sampled = start.elapsed();

    match request.algorithm {
        Algorithm::MarchingCubes => marching_cubes::extract(grid, request.iso_level, request.scale, buffers)?,
        Algorithm::DualContouring => dual_contouring::extract(grid, program, request, buffers)?,
    }

    tracing::debug!(
        "{:?} at {} voxels: {} vertices, {} triangles (sample {:?}, total {:?})",
        request.algorithm,
        request.voxel_side,
        buffers.vertex_count(),
        buffers.triangle_count(),
        sampled,
        start.elapsed()
    );
    Ok(())
}

/// Meshes regions against a hot-swappable program
#[derive(Clone)]
pub struct MeshGenerator {
    live: Arc<LiveProgram>,
}

impl MeshGenerator {
    pub fn new(live: Arc<LiveProgram>) -> Self {
        Self { live }
    }

    /// Generator over a fixed program
    pub fn from_program(program: Program) -> Self {
        Self::new(Arc::new(LiveProgram::new(program)))
    }

    /// Compile `formula` and build a generator over it
    pub fn from_formula(formula: &mut Formula) -> Result<Self> {
        Ok(Self::new(Arc::new(LiveProgram::compile(formula)?)))
    }

    pub fn live(&self) -> &Arc<LiveProgram> {
        &self.live
    }

    /// Recompile after an edit; on failure the previous program keeps serving requests
    pub fn recompile(&self, formula: &mut Formula) -> Result<Recompiled> {
        Ok(self.live.recompile(formula)?)
    }

    pub fn generate(&self, request: &MeshRequest) -> Result<GeneratedMesh> {
        let layout = GridLayout::new(request.voxel_side, request.algorithm.padding());
        let mut grid = DensityGrid::new(layout);
        self.generate_with_grid(request, &mut grid)
    }

    /// Like [`generate`](Self::generate), reusing a caller-held density grid
    pub fn generate_with_grid(&self, request: &MeshRequest, grid: &mut DensityGrid) -> Result<GeneratedMesh> {
        request.validate()?;
        let (program, generation) = self.live.snapshot();
        let mut buffers = MeshBuffers::with_capacity(request.capacity());
        generate_into(&program, request, grid, &mut buffers)?;
        Ok(GeneratedMesh { buffers, generation })
    }

    /// Generate independent regions in parallel, one result per request
    pub fn generate_batch(&self, requests: &[MeshRequest]) -> Vec<Result<GeneratedMesh>> {
        let start = Instant::now();
        let results: Vec<_> = requests.par_iter().map(|r| self.generate(r)).collect();
        tracing::debug!("Generated {} regions in {:?}", requests.len(), start.elapsed());
        results
    }
}
