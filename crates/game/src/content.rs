//! Segment content population: obstacles and coins on lane anchors.
//!
//! The track core asks for content at segment activation; what actually gets
//! spawned is decided here, outside the core.

use hecs::{Entity, World};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use runner_core::Pose;
use std::collections::HashMap;
use track::{ContentSpawner, PlacedSegment, SegmentId};

/// Tag component for obstacle entities.
#[derive(Debug, Clone, Copy)]
pub struct Obstacle;

/// Tag component for coin pickups.
#[derive(Debug, Clone, Copy)]
pub struct Coin;

/// Chance-rolled lane content, tracked per segment so a recycled segment's
/// contents can be dropped before it moves.
pub struct LaneContent {
    pub obstacle_chance: f32,
    pub coin_chance: f32,
    rng: StdRng,
    spawned: HashMap<SegmentId, Vec<Entity>>,
}

impl LaneContent {
    pub fn new(obstacle_chance: f32, coin_chance: f32, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            obstacle_chance,
            coin_chance,
            rng,
            spawned: HashMap::new(),
        }
    }

    pub fn tracked_segments(&self) -> usize {
        self.spawned.len()
    }
}

/// Per-tick binding of the content policy to the world it spawns into.
pub struct WorldContent<'a> {
    pub content: &'a mut LaneContent,
    pub world: &'a mut World,
}

impl ContentSpawner for WorldContent<'_> {
    fn populate(&mut self, segment: &PlacedSegment, lanes: &[Pose], safe: bool) {
        if safe || lanes.is_empty() {
            return;
        }
        let mut spawned = Vec::new();

        if self.content.rng.gen::<f32>() < self.content.obstacle_chance {
            let lane = lanes[self.content.rng.gen_range(0..lanes.len())];
            spawned.push(self.world.spawn((lane, Obstacle)));
        }
        if self.content.rng.gen::<f32>() < self.content.coin_chance {
            let mut lane = lanes[self.content.rng.gen_range(0..lanes.len())];
            lane.position.y += 0.5;
            spawned.push(self.world.spawn((lane, Coin)));
        }

        if !spawned.is_empty() {
            self.content.spawned.insert(segment.id, spawned);
        }
    }

    fn clear(&mut self, segment: SegmentId) {
        if let Some(entities) = self.content.spawned.remove(&segment) {
            for entity in entities {
                let _ = self.world.despawn(entity);
            }
        }
    }
}
