//! Grid guard: spatial occupancy without physics queries.
//!
//! Placement reserves a run of discretized cells along the candidate's
//! forward axis; any collision with an already-reserved cell fails the whole
//! reservation atomically. Cells are plain membership, no payload.

use glam::{IVec3, Vec3};
use runner_core::Pose;
use std::collections::HashSet;

/// Set of occupied cells at a fixed cell size.
#[derive(Debug)]
pub struct OccupancyGrid {
    cell_size: f32,
    /// Sample spacing as a fraction of the cell size. Slightly under 1 keeps
    /// samples off cell boundaries where rounding flaps.
    spacing_scale: f32,
    occupied: HashSet<IVec3>,
}

impl OccupancyGrid {
    pub fn new(cell_size: f32, spacing_scale: f32) -> Self {
        Self {
            cell_size: cell_size.max(f32::EPSILON),
            spacing_scale: spacing_scale.clamp(0.1, 1.0),
            occupied: HashSet::new(),
        }
    }

    /// Cell containing a world position: nearest-integer per axis.
    pub fn cell_of(&self, world: Vec3) -> IVec3 {
        IVec3::new(
            (world.x / self.cell_size).round() as i32,
            (world.y / self.cell_size).round() as i32,
            (world.z / self.cell_size).round() as i32,
        )
    }

    /// Reserve `steps` cells along `pose.forward()` starting at the pose
    /// position. Returns the reserved cells, or `None` with nothing
    /// committed if any sample is already occupied.
    pub fn try_reserve(&mut self, pose: &Pose, steps: usize) -> Option<Vec<IVec3>> {
        let forward = pose.forward().normalize_or_zero();
        let spacing = self.cell_size * self.spacing_scale;

        let steps = steps.max(1);
        let mut cells = Vec::with_capacity(steps);
        for i in 0..steps {
            let sample = pose.position + forward * (i as f32 * spacing);
            let cell = self.cell_of(sample);
            if self.occupied.contains(&cell) {
                return None;
            }
            cells.push(cell);
        }
        // Sub-cell spacing can land consecutive samples in one cell.
        cells.dedup();

        for &cell in &cells {
            self.occupied.insert(cell);
        }
        Some(cells)
    }

    /// Release previously reserved cells.
    pub fn release(&mut self, cells: &[IVec3]) {
        for cell in cells {
            self.occupied.remove(cell);
        }
    }

    /// Shift every occupied cell by an integer cell delta. Used when the
    /// track origin is re-based; the world offset must be a whole number of
    /// cells so membership stays exact.
    pub fn translate(&mut self, delta: IVec3) {
        if delta == IVec3::ZERO {
            return;
        }
        self.occupied = self.occupied.iter().map(|&c| c + delta).collect();
    }

    pub fn is_occupied(&self, cell: IVec3) -> bool {
        self.occupied.contains(&cell)
    }

    pub fn occupied_count(&self) -> usize {
        self.occupied.len()
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn clear(&mut self) {
        self.occupied.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_reserve_at_origin_takes_origin_cell() {
        let mut grid = OccupancyGrid::new(10.0, 1.0);
        let cells = grid.try_reserve(&Pose::IDENTITY, 1).unwrap();
        assert_eq!(cells, vec![IVec3::ZERO]);
        assert!(grid.is_occupied(IVec3::ZERO));
    }

    #[test]
    fn second_reserve_at_same_pose_fails_until_released() {
        let mut grid = OccupancyGrid::new(10.0, 1.0);
        let cells = grid.try_reserve(&Pose::IDENTITY, 1).unwrap();
        assert!(grid.try_reserve(&Pose::IDENTITY, 1).is_none());
        grid.release(&cells);
        assert!(grid.try_reserve(&Pose::IDENTITY, 1).is_some());
    }

    /// A failed multi-cell reservation must not leave partial cells behind.
    #[test]
    fn failed_reservation_is_atomic() {
        let mut grid = OccupancyGrid::new(10.0, 1.0);
        // Occupy the cell two steps ahead.
        let ahead = Pose::from_position(Vec3::new(0.0, 0.0, 20.0));
        grid.try_reserve(&ahead, 1).unwrap();
        assert_eq!(grid.occupied_count(), 1);

        // A 3-step run from the origin collides on its last sample.
        assert!(grid.try_reserve(&Pose::IDENTITY, 3).is_none());
        assert_eq!(grid.occupied_count(), 1);
        assert!(!grid.is_occupied(IVec3::ZERO));
    }

    #[test]
    fn translate_shifts_membership() {
        let mut grid = OccupancyGrid::new(10.0, 1.0);
        grid.try_reserve(&Pose::from_position(Vec3::new(0.0, 0.0, 30.0)), 1)
            .unwrap();
        grid.translate(IVec3::new(0, 0, -3));
        assert!(grid.is_occupied(IVec3::ZERO));
        assert!(!grid.is_occupied(IVec3::new(0, 0, 3)));
    }

    #[test]
    fn rotated_pose_samples_along_its_forward() {
        let mut grid = OccupancyGrid::new(10.0, 1.0);
        let pose = Pose::from_position_yaw(Vec3::ZERO, std::f32::consts::FRAC_PI_2);
        let cells = grid.try_reserve(&pose, 2).unwrap();
        // Facing +X: second sample lands one cell along x.
        assert_eq!(cells, vec![IVec3::ZERO, IVec3::new(1, 0, 0)]);
    }
}
