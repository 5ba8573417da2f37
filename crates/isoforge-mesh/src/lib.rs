//! # Isoforge Mesh
//!
//! Turns a compiled density [`Program`](isoforge_formula::Program) into
//! triangle meshes, one region at a time.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use isoforge_mesh::prelude::*;
//!
//! let mut formula = Formula::new("8 - dist(coords, v3(8, 8, 8))").with_parameters(["coords"]);
//! let generator = MeshGenerator::from_formula(&mut formula)?;
//!
//! let request = MeshRequest::new(Vec3::ZERO, 16.0, 32).with_algorithm(Algorithm::DualContouring);
//! let mesh = generator.generate(&request)?;
//! export_obj(&mesh.buffers, "sphere.obj")?;
//! ```
//!
//! Positive density is solid. Normals point out of the solid, toward lower
//! density, and positions are relative to the request origin.

pub mod buffers;
pub mod dual_contouring;
pub mod export;
pub mod generator;
pub mod grid;
pub mod marching_cubes;
pub mod request;
pub mod sampler;
pub mod tables;

mod error;

pub use buffers::{MeshBuffers, MeshCapacity};
pub use error::{Error, Result};
pub use export::{export_obj, write_obj};
pub use generator::{GeneratedMesh, MeshGenerator, generate_into};
pub use grid::{DensityGrid, GridLayout, Padding};
pub use request::{Algorithm, MeshRequest};
pub use sampler::{sample, sample_into};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Algorithm, DensityGrid, GeneratedMesh, MeshBuffers, MeshGenerator, MeshRequest, export_obj,
    };
    pub use isoforge_formula::{Formula, FormulaVariable, LiveProgram, LiveStatus, Program};

    // Math (re-export glam)
    pub use glam::Vec3;

    // Error handling
    pub use crate::{Error, Result};
}
