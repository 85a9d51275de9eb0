//! Ordered chain of placed segments and the gluing anchor.
//!
//! Segments enter at the frontier end and leave from the trailing end only,
//! so chain order is always distance-from-start order. The anchor is the
//! pose the next segment's entry socket must coincide with.

use glam::{IVec3, Vec3};
use runner_core::Pose;
use std::collections::VecDeque;

use crate::segment::{PlacedSegment, SegmentId};

#[derive(Debug)]
pub struct SegmentChain {
    segments: VecDeque<PlacedSegment>,
    anchor: Pose,
    next_id: u64,
    next_sequence: u64,
}

impl Default for SegmentChain {
    fn default() -> Self {
        Self::new(Pose::IDENTITY)
    }
}

impl SegmentChain {
    pub fn new(anchor: Pose) -> Self {
        Self {
            segments: VecDeque::new(),
            anchor,
            next_id: 0,
            next_sequence: 0,
        }
    }

    pub fn anchor(&self) -> Pose {
        self.anchor
    }

    pub fn set_anchor(&mut self, anchor: Pose) {
        self.anchor = anchor;
    }

    /// Hand out the next stable segment id.
    pub fn allocate_id(&mut self) -> SegmentId {
        let id = SegmentId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Append at the frontier, stamping the sequence number.
    pub fn push(&mut self, mut segment: PlacedSegment) {
        segment.sequence = self.next_sequence;
        self.next_sequence += 1;
        self.segments.push_back(segment);
    }

    /// Remove and return the trailing-most segment.
    pub fn pop_oldest(&mut self) -> Option<PlacedSegment> {
        self.segments.pop_front()
    }

    pub fn oldest(&self) -> Option<&PlacedSegment> {
        self.segments.front()
    }

    pub fn newest(&self) -> Option<&PlacedSegment> {
        self.segments.back()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlacedSegment> {
        self.segments.iter()
    }

    pub fn find(&self, id: SegmentId) -> Option<&PlacedSegment> {
        self.segments.iter().find(|s| s.id == id)
    }

    /// Shift the whole chain toward the origin when the anchor has drifted
    /// too far out, countering float precision loss on very long tracks.
    ///
    /// The offset is snapped to whole grid cells so occupancy membership
    /// survives an exact `OccupancyGrid::translate`. Returns the applied
    /// world offset (and the matching cell delta) or `None` when under the
    /// threshold.
    pub fn rebase(&mut self, threshold: f32, cell_size: f32) -> Option<(Vec3, IVec3)> {
        if threshold <= 0.0 || self.anchor.position.length() < threshold {
            return None;
        }

        let cells = (self.anchor.position / cell_size).round().as_ivec3();
        let cell_delta = -cells;
        let offset = cell_delta.as_vec3() * cell_size;
        if cell_delta == IVec3::ZERO {
            return None;
        }

        self.anchor.position += offset;
        for segment in &mut self.segments {
            segment.pose.position += offset;
            for cell in &mut segment.cells {
                *cell += cell_delta;
            }
        }
        Some((offset, cell_delta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::PlacedSegment;

    fn placed(chain: &mut SegmentChain, z: f32) -> PlacedSegment {
        PlacedSegment {
            id: chain.allocate_id(),
            descriptor: 0,
            pose: Pose::from_position(Vec3::new(0.0, 0.0, z)),
            cells: vec![IVec3::new(0, 0, (z / 10.0).round() as i32)],
            sequence: 0,
        }
    }

    #[test]
    fn push_pop_preserves_frontier_order() {
        let mut chain = SegmentChain::default();
        for z in [0.0, 10.0, 20.0] {
            let seg = placed(&mut chain, z);
            chain.push(seg);
        }
        assert_eq!(chain.len(), 3);
        assert_eq!(chain.pop_oldest().unwrap().pose.position.z, 0.0);
        assert_eq!(chain.pop_oldest().unwrap().pose.position.z, 10.0);
    }

    #[test]
    fn sequence_numbers_increase_across_recycles() {
        let mut chain = SegmentChain::default();
        let seg = placed(&mut chain, 0.0);
        chain.push(seg);
        let recycled = chain.pop_oldest().unwrap();
        chain.push(recycled);
        assert_eq!(chain.newest().unwrap().sequence, 1);
    }

    #[test]
    fn rebase_under_threshold_is_a_no_op() {
        let mut chain = SegmentChain::default();
        chain.set_anchor(Pose::from_position(Vec3::new(0.0, 0.0, 100.0)));
        assert!(chain.rebase(1000.0, 10.0).is_none());
    }

    #[test]
    fn rebase_shifts_anchor_segments_and_cells_together() {
        let mut chain = SegmentChain::default();
        let seg = placed(&mut chain, 990.0);
        chain.push(seg);
        chain.set_anchor(Pose::from_position(Vec3::new(0.0, 0.0, 1000.0)));

        let (offset, cell_delta) = chain.rebase(500.0, 10.0).unwrap();
        assert_eq!(offset, Vec3::new(0.0, 0.0, -1000.0));
        assert_eq!(cell_delta, IVec3::new(0, 0, -100));
        assert_eq!(chain.anchor().position.z, 0.0);
        let seg = chain.oldest().unwrap();
        assert_eq!(seg.pose.position.z, -10.0);
        assert_eq!(seg.cells[0], IVec3::new(0, 0, -1));
    }
}
