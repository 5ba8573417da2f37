//! Sampling lattice layout and the density volume
//!
//! A region of `voxel_side` cells per axis has `voxel_side + 1` lattice points
//! per axis. Extractors that estimate gradients need one extra lattice point on
//! every side, so a [`Padding::Gradient`] grid covers lattice coordinates
//! `-1..=voxel_side + 1`.
//!
//! Points are stored x fastest, then z, then y.

use crate::tables::CORNER_OFFSETS;
use glam::IVec3;

/// Border sampled around the region's own lattice points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Padding {
    /// Only the region's lattice points
    None,
    /// One extra lattice point on every side for central differences
    Gradient,
}

impl Padding {
    /// Extra lattice points on each side of an axis
    pub fn border(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Gradient => 1,
        }
    }

    /// Extra lattice points per axis in total
    pub fn extra(self) -> u32 {
        self.border() as u32 * 2
    }
}

/// Mapping between lattice coordinates and flat storage indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    voxel_side: u32,
    padding: Padding,
    side: usize,
}

impl GridLayout {
    pub fn new(voxel_side: u32, padding: Padding) -> Self {
        Self {
            voxel_side,
            padding,
            side: (voxel_side + 1 + padding.extra()) as usize,
        }
    }

    pub fn voxel_side(&self) -> u32 {
        self.voxel_side
    }

    pub fn padding(&self) -> Padding {
        self.padding
    }

    /// Stored points per axis, border included
    pub fn side(&self) -> usize {
        self.side
    }

    /// Total stored points
    pub fn volume(&self) -> usize {
        self.side * self.side * self.side
    }

    /// Whether a lattice coordinate is stored by this layout
    pub fn contains(&self, coords: IVec3) -> bool {
        let border = self.padding.border();
        let max = self.voxel_side as i32 + border;
        coords.cmpge(IVec3::splat(-border)).all() && coords.cmple(IVec3::splat(max)).all()
    }

    /// Flat index of a lattice coordinate
    ///
    /// # Panics
    ///
    /// Panics in debug builds if `coords` lies outside the layout.
    #[inline]
    pub fn coords_to_index(&self, coords: IVec3) -> usize {
        debug_assert!(self.contains(coords), "{} outside grid of side {}", coords, self.side);
        let c = (coords + IVec3::splat(self.padding.border())).as_uvec3();
        c.x as usize + c.z as usize * self.side + c.y as usize * self.side * self.side
    }

    /// Lattice coordinate of a flat index
    #[inline]
    pub fn index_to_coords(&self, index: usize) -> IVec3 {
        let x = index % self.side;
        let z = (index / self.side) % self.side;
        let y = index / (self.side * self.side);
        IVec3::new(x as i32, y as i32, z as i32) - IVec3::splat(self.padding.border())
    }

    /// Check that the index mapping is a two-sided inverse over the whole layout
    ///
    /// # Panics
    ///
    /// Panics on the first index or coordinate that does not map back to itself.
    pub fn assert_bijection(&self) {
        for index in 0..self.volume() {
            let coords = self.index_to_coords(index);
            assert!(self.contains(coords), "index {} maps outside the grid", index);
            assert_eq!(
                self.coords_to_index(coords),
                index,
                "index {} does not round trip through {}",
                index,
                coords
            );
        }

        let border = self.padding.border();
        let max = self.voxel_side as i32 + border;
        for y in -border..=max {
            for z in -border..=max {
                for x in -border..=max {
                    let coords = IVec3::new(x, y, z);
                    assert_eq!(self.index_to_coords(self.coords_to_index(coords)), coords);
                }
            }
        }
    }
}

/// Sampled densities for one region
#[derive(Debug, Clone, PartialEq)]
pub struct DensityGrid {
    layout: GridLayout,
    values: Vec<f32>,
}

impl DensityGrid {
    /// A zero-filled grid
    pub fn new(layout: GridLayout) -> Self {
        Self {
            layout,
            values: vec![0.0; layout.volume()],
        }
    }

    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub(crate) fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }

    /// Switch to another layout, keeping the allocation when the volume matches
    ///
    /// Returns `true` when the existing storage was reused.
    pub fn reshape(&mut self, layout: GridLayout) -> bool {
        let reused = layout.volume() == self.values.len();
        if !reused {
            self.values.clear();
            self.values.resize(layout.volume(), 0.0);
        }
        self.layout = layout;
        reused
    }

    #[inline]
    pub fn density(&self, coords: IVec3) -> f32 {
        self.values[self.layout.coords_to_index(coords)]
    }

    /// Densities at the 8 corners of the cell whose minimum corner is `cell`
    #[inline]
    pub fn corner_densities(&self, cell: IVec3) -> [f32; 8] {
        CORNER_OFFSETS.map(|offset| self.density(cell + offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sides() {
        assert_eq!(GridLayout::new(4, Padding::None).side(), 5);
        assert_eq!(GridLayout::new(4, Padding::Gradient).side(), 7);
        assert_eq!(GridLayout::new(4, Padding::Gradient).volume(), 343);
    }

    #[test]
    fn test_bijection() {
        for side in [1, 2, 5] {
            GridLayout::new(side, Padding::None).assert_bijection();
            GridLayout::new(side, Padding::Gradient).assert_bijection();
        }
    }

    #[test]
    fn test_storage_order() {
        let layout = GridLayout::new(2, Padding::None);
        assert_eq!(layout.coords_to_index(IVec3::new(1, 0, 0)), 1);
        assert_eq!(layout.coords_to_index(IVec3::new(0, 0, 1)), 3);
        assert_eq!(layout.coords_to_index(IVec3::new(0, 1, 0)), 9);
    }

    #[test]
    fn test_gradient_border() {
        let layout = GridLayout::new(3, Padding::Gradient);
        assert_eq!(layout.index_to_coords(0), IVec3::splat(-1));
        assert_eq!(layout.coords_to_index(IVec3::ZERO), 1 + 6 + 36);
        assert!(layout.contains(IVec3::splat(4)));
        assert!(!layout.contains(IVec3::new(5, 0, 0)));
    }

    #[test]
    fn test_reshape_reuses_storage() {
        let mut grid = DensityGrid::new(GridLayout::new(4, Padding::None));
        assert!(grid.reshape(GridLayout::new(4, Padding::None)));
        assert!(!grid.reshape(GridLayout::new(4, Padding::Gradient)));
        assert_eq!(grid.values().len(), 343);
    }

    #[test]
    fn test_corner_densities() {
        let layout = GridLayout::new(1, Padding::None);
        let mut grid = DensityGrid::new(layout);
        for (i, value) in grid.values_mut().iter_mut().enumerate() {
            *value = i as f32;
        }
        // (1,0,1) is index 1 + 2 = 3; (0,1,1) is 2 + 4 = 6
        let corners = grid.corner_densities(IVec3::ZERO);
        assert_eq!(corners, [0.0, 1.0, 3.0, 2.0, 4.0, 5.0, 7.0, 6.0]);
    }
}
