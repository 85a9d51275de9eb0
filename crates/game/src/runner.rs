//! Headless auto-runner: the reference position that drives generation.
//!
//! Stands in for the player. It runs along the heading of the nearest placed
//! segment and, on entering a split piece, picks a side at random — the
//! gameplay trigger that normally supplies the split choice.

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use track::{SegmentId, TrackGenerator, TurnKind};

pub struct AutoRunner {
    pub position: Vec3,
    pub speed: f32,
    /// Splits already decided, so each fires exactly once.
    chosen: HashSet<SegmentId>,
    rng: StdRng,
}

impl AutoRunner {
    pub fn new(speed: f32, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            position: Vec3::ZERO,
            speed,
            chosen: HashSet::new(),
            rng,
        }
    }

    /// Move along the track for one tick. Returns a split decision when the
    /// runner has just committed to a fork.
    pub fn advance(&mut self, generator: &TrackGenerator, dt: f32) -> Option<(SegmentId, bool)> {
        let chain = generator.chain();
        let nearest = chain
            .iter()
            .map(|s| (s, s.pose.position.distance(self.position)))
            .min_by(|a, b| a.1.total_cmp(&b.1));
        let (segment, _) = nearest?;

        self.position += segment.pose.forward() * self.speed * dt;

        // Forget decisions for segments that have been recycled away.
        self.chosen.retain(|id| chain.find(*id).is_some());

        let descriptor = generator.library().get(segment.descriptor);
        if descriptor.turn_kind == TurnKind::SplitLr
            && !self.chosen.contains(&segment.id)
            && self.position.distance(segment.pose.position) < descriptor.approx_length * 0.5
        {
            self.chosen.insert(segment.id);
            let choose_left = self.rng.gen::<bool>();
            log::debug!(
                "runner entered fork {:?}, going {}",
                segment.id,
                if choose_left { "left" } else { "right" }
            );
            return Some((segment.id, choose_left));
        }
        None
    }

    pub fn apply_offset(&mut self, offset: Vec3) {
        self.position += offset;
    }
}
