//! Fixed-capacity mesh output
//!
//! Buffers are sized for the worst case of a request up front and filled
//! front to back. Entries past the written counts are always zero, so a
//! consumer may upload the whole allocation.

use glam::Vec3;

/// Worst-case sizes for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshCapacity {
    pub vertices: usize,
    pub indices: usize,
}

/// Positions, normals and triangle indices for one region
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshBuffers {
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    indices: Vec<u32>,
    vertex_count: usize,
    index_count: usize,
}

impl MeshBuffers {
    /// Zero-filled buffers of the given capacity
    pub fn with_capacity(capacity: MeshCapacity) -> Self {
        Self {
            positions: vec![[0.0; 3]; capacity.vertices],
            normals: vec![[0.0; 3]; capacity.vertices],
            indices: vec![0; capacity.indices],
            vertex_count: 0,
            index_count: 0,
        }
    }

    pub fn capacity(&self) -> MeshCapacity {
        MeshCapacity {
            vertices: self.positions.len(),
            indices: self.indices.len(),
        }
    }

    /// Forget written data and zero the storage, growing it if needed
    pub fn reset(&mut self, capacity: MeshCapacity) {
        self.positions.clear();
        self.positions.resize(capacity.vertices, [0.0; 3]);
        self.normals.clear();
        self.normals.resize(capacity.vertices, [0.0; 3]);
        self.indices.clear();
        self.indices.resize(capacity.indices, 0);
        self.vertex_count = 0;
        self.index_count = 0;
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn index_count(&self) -> usize {
        self.index_count
    }

    pub fn triangle_count(&self) -> usize {
        self.index_count / 3
    }

    pub fn is_empty(&self) -> bool {
        self.index_count == 0
    }

    /// Written positions
    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions[..self.vertex_count]
    }

    /// Written normals, parallel to [`positions`](Self::positions)
    pub fn normals(&self) -> &[[f32; 3]] {
        &self.normals[..self.vertex_count]
    }

    /// Written triangle indices
    pub fn indices(&self) -> &[u32] {
        &self.indices[..self.index_count]
    }

    /// Whole position allocation as bytes, for fixed-size GPU buffers
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    pub fn normal_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.normals)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Append a vertex and return its index
    ///
    /// # Panics
    ///
    /// Panics if the vertex capacity is exhausted; capacities come from the
    /// extractor's worst case so this indicates a sizing bug.
    #[inline]
    pub(crate) fn push_vertex(&mut self, position: Vec3, normal: Vec3) -> u32 {
        let index = self.vertex_count;
        assert!(index < self.positions.len(), "vertex capacity {} exceeded", self.positions.len());
        self.positions[index] = position.to_array();
        self.normals[index] = normal.to_array();
        self.vertex_count += 1;
        index as u32
    }

    /// # Panics
    ///
    /// Panics if the index capacity is exhausted.
    #[inline]
    pub(crate) fn push_triangle(&mut self, a: u32, b: u32, c: u32) {
        let at = self.index_count;
        assert!(at + 3 <= self.indices.len(), "index capacity {} exceeded", self.indices.len());
        self.indices[at..at + 3].copy_from_slice(&[a, b, c]);
        self.index_count += 3;
    }

    /// Move an existing vertex
    pub(crate) fn set_vertex(&mut self, index: u32, position: Vec3, normal: Vec3) {
        let index = index as usize;
        debug_assert!(index < self.vertex_count);
        self.positions[index] = position.to_array();
        self.normals[index] = normal.to_array();
    }
}
