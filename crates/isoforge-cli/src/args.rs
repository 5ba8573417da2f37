//! Shared argument types

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use glam::Vec3;
use isoforge_mesh::{Algorithm, MeshRequest};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AlgorithmArg {
    /// Marching Cubes
    Mc,
    /// Dual Contouring
    Dc,
}

impl From<AlgorithmArg> for Algorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Mc => Algorithm::MarchingCubes,
            AlgorithmArg::Dc => Algorithm::DualContouring,
        }
    }
}

/// Region settings; flags override values loaded with `--request`
#[derive(Debug, Args)]
pub struct MeshArgs {
    /// Mesh request JSON file
    #[arg(long)]
    pub request: Option<PathBuf>,

    /// Region minimum corner as x,y,z
    #[arg(long, value_parser = parse_vec3)]
    pub origin: Option<Vec3>,

    /// Region size in world units
    #[arg(long)]
    pub scale: Option<f32>,

    /// Cells per axis
    #[arg(short, long)]
    pub voxels: Option<u32>,

    /// Surface extraction algorithm
    #[arg(short, long, value_enum)]
    pub algorithm: Option<AlgorithmArg>,

    /// Density threshold of the surface
    #[arg(long)]
    pub iso: Option<f32>,

    /// Move Dual Contouring vertices onto the surface
    #[arg(long)]
    pub smooth: bool,
}

impl MeshArgs {
    pub fn request(&self) -> Result<MeshRequest> {
        let mut request = match &self.request {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read request {}", path.display()))?;
                MeshRequest::from_json(&json)
                    .with_context(|| format!("Invalid request {}", path.display()))?
            }
            None => MeshRequest::default(),
        };

        if let Some(origin) = self.origin {
            request.origin = origin;
        }
        if let Some(scale) = self.scale {
            request.scale = scale;
        }
        if let Some(voxels) = self.voxels {
            request.voxel_side = voxels;
        }
        if let Some(algorithm) = self.algorithm {
            request.algorithm = algorithm.into();
        }
        if let Some(iso) = self.iso {
            request.iso_level = iso;
        }
        if self.smooth {
            request.smooth = true;
        }

        request.validate()?;
        Ok(request)
    }
}

/// `x,y,z`, or a single value for all three components
pub fn parse_vec3(s: &str) -> std::result::Result<Vec3, String> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<f32>().map_err(|e| format!("'{}': {}", p.trim(), e)))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    match parts.as_slice() {
        [s] => Ok(Vec3::splat(*s)),
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => Err(format!("expected 1 or 3 components, got {}", parts.len())),
    }
}

/// `name=x,y,z`
pub fn parse_param(s: &str) -> std::result::Result<(String, Vec3), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("parameter name is empty".into());
    }
    Ok((name.to_string(), parse_vec3(value)?))
}
