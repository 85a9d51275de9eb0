//! Segment descriptors and placed-segment instances.
//!
//! A descriptor is an immutable template authored once at startup: socket
//! poses relative to the segment origin, a turn classification, an
//! approximate length for the socketless fallback, and a selection weight.
//! The geometry behind the `name` handle is opaque to the track core.

use glam::IVec3;
use runner_core::Pose;

use crate::error::TrackError;

/// Turn classification of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnKind {
    Straight,
    Left90,
    Right90,
    /// Forks into a left and a right exit; the anchor waits for an external
    /// choice before advancing.
    SplitLr,
}

impl TurnKind {
    /// True for the single-exit turn kinds (not straight, not split).
    pub fn is_turn(&self) -> bool {
        matches!(self, TurnKind::Left90 | TurnKind::Right90)
    }
}

/// Immutable template for one placeable track segment.
#[derive(Debug, Clone)]
pub struct SegmentDescriptor {
    /// Opaque prefab/template handle.
    pub name: String,
    pub turn_kind: TurnKind,
    /// Entry socket pose relative to the segment origin.
    pub entry: Option<Pose>,
    /// Exit socket for straight/turn kinds.
    pub exit: Option<Pose>,
    /// Exit sockets for the split kind.
    pub exit_left: Option<Pose>,
    pub exit_right: Option<Pose>,
    /// Length along the forward axis, used when sockets are missing and for
    /// recycle distance thresholds.
    pub approx_length: f32,
    /// Non-negative selection weight; 1.0 when unspecified.
    pub weight: f32,
    /// Local lane anchor poses handed to the content-population hook.
    pub lane_points: Vec<Pose>,
}

impl SegmentDescriptor {
    /// A straight run of `length` with entry at the origin and exit `length`
    /// ahead. The common case; turns and splits set sockets explicitly.
    pub fn straight(name: impl Into<String>, length: f32) -> Self {
        Self {
            name: name.into(),
            turn_kind: TurnKind::Straight,
            entry: Some(Pose::IDENTITY),
            exit: Some(Pose::from_position(glam::Vec3::new(0.0, 0.0, length))),
            exit_left: None,
            exit_right: None,
            approx_length: length,
            weight: 1.0,
            lane_points: Vec::new(),
        }
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight.max(0.0);
        self
    }

    pub fn with_lane_points(mut self, lanes: Vec<Pose>) -> Self {
        self.lane_points = lanes;
        self
    }

    /// Entry + single exit present, for the non-split kinds.
    pub fn has_sockets_straight(&self) -> bool {
        self.turn_kind != TurnKind::SplitLr && self.entry.is_some() && self.exit.is_some()
    }

    /// Entry + both side exits present, for the split kind.
    pub fn has_sockets_split(&self) -> bool {
        self.turn_kind == TurnKind::SplitLr
            && self.entry.is_some()
            && self.exit_left.is_some()
            && self.exit_right.is_some()
    }

    /// Whether placement can use socket alignment at all.
    pub fn has_sockets(&self) -> bool {
        self.has_sockets_straight() || self.has_sockets_split()
    }

    /// The exit socket to follow. `choose_left` picks a side on splits and is
    /// ignored otherwise; a split with no choice yet has no exit.
    pub fn exit_socket(&self, choose_left: Option<bool>) -> Option<&Pose> {
        if self.turn_kind == TurnKind::SplitLr {
            match choose_left {
                Some(true) => self.exit_left.as_ref(),
                Some(false) => self.exit_right.as_ref(),
                None => None,
            }
        } else {
            self.exit.as_ref()
        }
    }
}

/// Validated collection of descriptors, built once at startup.
#[derive(Debug)]
pub struct SegmentLibrary {
    descriptors: Vec<SegmentDescriptor>,
    turn_indices: Vec<usize>,
    straight_indices: Vec<usize>,
    any_sockets: bool,
}

impl SegmentLibrary {
    /// Validate and index a descriptor list.
    ///
    /// Missing sockets are a warning, not a rejection: such a descriptor
    /// still places via the offset fallback (advance by `approx_length`).
    /// An empty list is unusable and errors out.
    pub fn new(descriptors: Vec<SegmentDescriptor>) -> Result<Self, TrackError> {
        if descriptors.is_empty() {
            return Err(TrackError::EmptyLibrary);
        }

        for d in &descriptors {
            match d.turn_kind {
                TurnKind::SplitLr => {
                    if !d.has_sockets_split() {
                        log::warn!(
                            "segment '{}' is SplitLr but lacks entry/exitLeft/exitRight sockets; \
                             falling back to offset placement",
                            d.name
                        );
                    }
                }
                _ => {
                    if !d.has_sockets_straight() {
                        log::warn!(
                            "segment '{}' lacks entry/exit sockets; falling back to offset placement",
                            d.name
                        );
                    }
                }
            }
            if d.approx_length <= 0.0 {
                log::warn!("segment '{}' has non-positive approx_length", d.name);
            }
        }

        let turn_indices = descriptors
            .iter()
            .enumerate()
            .filter(|(_, d)| d.turn_kind.is_turn())
            .map(|(i, _)| i)
            .collect();
        let straight_indices = descriptors
            .iter()
            .enumerate()
            .filter(|(_, d)| d.turn_kind == TurnKind::Straight)
            .map(|(i, _)| i)
            .collect();
        let any_sockets = descriptors.iter().any(|d| d.has_sockets());

        Ok(Self {
            descriptors,
            turn_indices,
            straight_indices,
            any_sockets,
        })
    }

    pub fn get(&self, index: usize) -> &SegmentDescriptor {
        &self.descriptors[index]
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Indices of Left90/Right90 descriptors.
    pub fn turn_indices(&self) -> &[usize] {
        &self.turn_indices
    }

    /// Indices of Straight descriptors.
    pub fn straight_indices(&self) -> &[usize] {
        &self.straight_indices
    }

    pub fn all_indices(&self) -> Vec<usize> {
        (0..self.descriptors.len()).collect()
    }

    /// Selection weights aligned with descriptor indices.
    pub fn weights(&self) -> Vec<f32> {
        self.descriptors.iter().map(|d| d.weight).collect()
    }

    /// True when at least one descriptor can be socket-aligned. Drives the
    /// generator's choice between rotated-socket and flat-extension chaining.
    pub fn any_sockets(&self) -> bool {
        self.any_sockets
    }
}

/// Stable identity of a placed segment, used by the split-choice event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentId(pub u64);

/// A live segment instance. Owned exclusively by the chain.
#[derive(Debug, Clone)]
pub struct PlacedSegment {
    pub id: SegmentId,
    /// Index into the library this instance was placed from.
    pub descriptor: usize,
    /// World pose of the segment origin.
    pub pose: Pose,
    /// Occupancy cells reserved for this instance; empty when the guard is
    /// off or the terminal piece bypassed it.
    pub cells: Vec<IVec3>,
    /// Position in frontier order; recycling re-stamps it.
    pub sequence: u64,
}

impl PlacedSegment {
    /// World pose of the entry socket, reconstructed from the placement.
    pub fn entry_world(&self, library: &SegmentLibrary) -> Pose {
        match library.get(self.descriptor).entry {
            Some(entry) => self.pose.transform_pose(entry),
            None => self.pose,
        }
    }

    /// World poses of the descriptor's lane anchors.
    pub fn lane_world(&self, library: &SegmentLibrary) -> Vec<Pose> {
        library
            .get(self.descriptor)
            .lane_points
            .iter()
            .map(|lane| self.pose.transform_pose(*lane))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use std::f32::consts::FRAC_PI_2;

    fn split_descriptor() -> SegmentDescriptor {
        SegmentDescriptor {
            name: "split".into(),
            turn_kind: TurnKind::SplitLr,
            entry: Some(Pose::IDENTITY),
            exit: None,
            exit_left: Some(Pose::from_position_yaw(Vec3::new(-5.0, 0.0, 5.0), -FRAC_PI_2)),
            exit_right: Some(Pose::from_position_yaw(Vec3::new(5.0, 0.0, 5.0), FRAC_PI_2)),
            approx_length: 10.0,
            weight: 1.0,
            lane_points: Vec::new(),
        }
    }

    #[test]
    fn empty_library_is_an_error() {
        assert!(matches!(
            SegmentLibrary::new(Vec::new()),
            Err(TrackError::EmptyLibrary)
        ));
    }

    #[test]
    fn library_indexes_by_kind() {
        let lib = SegmentLibrary::new(vec![
            SegmentDescriptor::straight("a", 10.0),
            SegmentDescriptor {
                turn_kind: TurnKind::Left90,
                exit: Some(Pose::from_position_yaw(Vec3::new(-5.0, 0.0, 5.0), -FRAC_PI_2)),
                ..SegmentDescriptor::straight("left", 10.0)
            },
            split_descriptor(),
        ])
        .unwrap();
        assert_eq!(lib.straight_indices(), &[0]);
        assert_eq!(lib.turn_indices(), &[1]);
        assert!(lib.any_sockets());
    }

    #[test]
    fn split_exit_requires_a_choice() {
        let d = split_descriptor();
        assert!(d.exit_socket(None).is_none());
        assert!(d.exit_socket(Some(true)).unwrap().position.x < 0.0);
        assert!(d.exit_socket(Some(false)).unwrap().position.x > 0.0);
    }

    #[test]
    fn missing_sockets_still_builds() {
        let d = SegmentDescriptor {
            entry: None,
            exit: None,
            ..SegmentDescriptor::straight("bare", 8.0)
        };
        let lib = SegmentLibrary::new(vec![d]).unwrap();
        assert!(!lib.get(0).has_sockets());
        assert!(!lib.any_sockets());
    }
}
