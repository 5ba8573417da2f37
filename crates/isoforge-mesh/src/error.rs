//! Error types for mesh generation

use crate::buffers::MeshCapacity;
use crate::request::Algorithm;
use thiserror::Error;

/// Result type alias using the mesh crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while generating meshes
#[derive(Error, Debug)]
pub enum Error {
    /// Voxel resolution outside the supported range
    #[error("Invalid voxel side {0} (expected 1..={max})", max = crate::request::MAX_VOXEL_SIDE)]
    InvalidVoxelSide(u32),

    /// Region scale must be positive and finite
    #[error("Invalid grid scale {0}")]
    InvalidScale(f32),

    /// The extractor needs a border the grid was not sampled with
    #[error("{algorithm:?} needs a gradient-padded density grid")]
    PaddingRequired { algorithm: Algorithm },

    /// Caller-provided buffers cannot hold the worst case for this request
    #[error("Mesh buffers too small: need {needed_vertices} vertices / {needed_indices} indices, have {vertices} / {indices}")]
    BufferTooSmall {
        needed_vertices: usize,
        needed_indices: usize,
        vertices: usize,
        indices: usize,
    },

    /// Density grid and request disagree on resolution
    #[error("Density grid was sampled at voxel side {grid}, request expects {request}")]
    GridMismatch { grid: u32, request: u32 },

    /// Sampled programs take the lattice position as their only parameter
    #[error("Density program reads {0} parameters, at most 1 (the sample position) is supported")]
    UnsupportedParameters(usize),

    /// Formula compilation failed
    #[error("Formula error: {0}")]
    Formula(#[from] isoforge_formula::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub(crate) fn check_capacity(have: MeshCapacity, need: MeshCapacity) -> Result<()> {
    if have.vertices < need.vertices || have.indices < need.indices {
        return Err(Error::BufferTooSmall {
            needed_vertices: need.vertices,
            needed_indices: need.indices,
            vertices: have.vertices,
            indices: have.indices,
        });
    }
    Ok(())
}
