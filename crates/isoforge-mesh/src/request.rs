//! Mesh generation requests

use crate::buffers::MeshCapacity;
use crate::error::{Error, Result};
use crate::grid::Padding;
use crate::{dual_contouring, marching_cubes};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Largest accepted voxel resolution per axis
pub const MAX_VOXEL_SIDE: u32 = 256;

/// Surface extraction algorithm
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// Unshared, flat-shaded triangles per cell
    #[default]
    MarchingCubes,
    /// Shared vertices per lattice point, normals from the density gradient
    DualContouring,
}

impl Algorithm {
    /// Grid border the algorithm reads beyond the region's lattice
    pub fn padding(self) -> Padding {
        match self {
            Self::MarchingCubes => Padding::None,
            Self::DualContouring => Padding::Gradient,
        }
    }
}

/// One region to mesh
///
/// ```json
/// { "origin": [0.0, -8.0, 0.0], "scale": 16.0, "voxel_side": 32, "algorithm": "dual_contouring", "smooth": true }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshRequest {
    /// World position of the region's minimum corner
    pub origin: Vec3,
    /// World size of the region along each axis
    pub scale: f32,
    /// Cells per axis
    pub voxel_side: u32,
    pub algorithm: Algorithm,
    pub iso_level: f32,
    /// Dual Contouring only: move vertices onto the surface
    pub smooth: bool,
    /// Step for central-difference normals
    pub normal_epsilon: f32,
}

impl Default for MeshRequest {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            scale: 1.0,
            voxel_side: 16,
            algorithm: Algorithm::MarchingCubes,
            iso_level: 0.0,
            smooth: false,
            normal_epsilon: 0.01,
        }
    }
}

impl MeshRequest {
    pub fn new(origin: Vec3, scale: f32, voxel_side: u32) -> Self {
        Self {
            origin,
            scale,
            voxel_side,
            ..Self::default()
        }
    }

    pub fn with_origin(mut self, origin: Vec3) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_voxel_side(mut self, voxel_side: u32) -> Self {
        self.voxel_side = voxel_side;
        self
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_iso_level(mut self, iso_level: f32) -> Self {
        self.iso_level = iso_level;
        self
    }

    pub fn with_smoothing(mut self, smooth: bool) -> Self {
        self.smooth = smooth;
        self
    }

    pub fn with_normal_epsilon(mut self, normal_epsilon: f32) -> Self {
        self.normal_epsilon = normal_epsilon;
        self
    }

    /// Worst-case output sizes for this request's algorithm and resolution
    pub fn capacity(&self) -> MeshCapacity {
        match self.algorithm {
            Algorithm::MarchingCubes => marching_cubes::capacity(self.voxel_side),
            Algorithm::DualContouring => dual_contouring::capacity(self.voxel_side),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.voxel_side == 0 || self.voxel_side > MAX_VOXEL_SIDE {
            return Err(Error::InvalidVoxelSide(self.voxel_side));
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(Error::InvalidScale(self.scale));
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
