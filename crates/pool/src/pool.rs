//! The pool manager: acquire, release, time-gated replacement spawning.

use glam::Vec3;
use hecs::{Entity, World};
use rand::rngs::StdRng;
use rand::SeedableRng;
use runner_core::Pose;
use std::collections::{HashMap, VecDeque};
use track::WeightedSelector;

use crate::agent::{ForwardMover, PoolAgent, PooledIdentity};

/// Opaque actor prefab descriptor: what to build when a bucket runs dry.
#[derive(Debug, Clone)]
pub struct ActorTemplate {
    pub name: String,
    pub speed: f32,
}

/// One named group of interchangeable templates.
#[derive(Debug, Clone)]
pub struct BucketConfig {
    pub id: String,
    pub templates: Vec<ActorTemplate>,
    /// Instances created up-front per template (0 = lazy).
    pub preload_each: usize,
}

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub buckets: Vec<BucketConfig>,
    pub avoid_immediate_repeat: bool,
    /// No template repeats within the last N dispenses (0 = off).
    pub no_repeat_window: usize,
    pub normal_bucket: String,
    pub special_bucket: String,
    /// After this much elapsed time, `spawn_next` switches to the special
    /// bucket.
    pub special_after_seconds: f32,
    pub normal_spawn: Pose,
    pub special_spawn: Pose,
    /// Destination shared by every dispensed actor.
    pub end_point: Vec3,
    pub reach_threshold: f32,
    pub seed: Option<u64>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            buckets: Vec::new(),
            avoid_immediate_repeat: true,
            no_repeat_window: 0,
            normal_bucket: "normal".into(),
            special_bucket: "special".into(),
            special_after_seconds: 30.0,
            normal_spawn: Pose::IDENTITY,
            special_spawn: Pose::IDENTITY,
            end_point: Vec3::ZERO,
            reach_threshold: 0.5,
            seed: None,
        }
    }
}

#[derive(Debug)]
struct Bucket {
    config: BucketConfig,
    /// One inactive-instance queue per template.
    queues: Vec<VecDeque<Entity>>,
    selector: WeightedSelector,
    instantiated: usize,
}

impl Bucket {
    fn instantiate(
        &mut self,
        world: &mut World,
        bucket_id: &str,
        template: usize,
        end_point: Vec3,
        reach_threshold: f32,
    ) -> Entity {
        let t = &self.config.templates[template];
        let entity = world.spawn((
            Pose::IDENTITY,
            PooledIdentity {
                bucket: bucket_id.to_string(),
                template,
            },
            PoolAgent {
                end_point,
                active: false,
            },
            ForwardMover {
                speed: t.speed,
                reach_threshold,
            },
        ));
        log::debug!("pool '{}': instantiated '{}'", bucket_id, t.name);
        self.instantiated += 1;
        entity
    }

    fn queued(&self) -> usize {
        self.queues.iter().map(|q| q.len()).sum()
    }
}

/// Named-bucket pool of reusable actors.
pub struct ActorPool {
    buckets: HashMap<String, Bucket>,
    normal_bucket: String,
    special_bucket: String,
    special_after_seconds: f32,
    normal_spawn: Pose,
    special_spawn: Pose,
    end_point: Vec3,
    reach_threshold: f32,
    elapsed: f32,
    rng: StdRng,
}

impl ActorPool {
    /// Build buckets and preload instances. Buckets with an empty id or no
    /// templates are skipped with a warning.
    pub fn new(world: &mut World, config: PoolConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut pool = Self {
            buckets: HashMap::new(),
            normal_bucket: config.normal_bucket,
            special_bucket: config.special_bucket,
            special_after_seconds: config.special_after_seconds,
            normal_spawn: config.normal_spawn,
            special_spawn: config.special_spawn,
            end_point: config.end_point,
            reach_threshold: config.reach_threshold,
            elapsed: 0.0,
            rng,
        };

        for bucket_config in config.buckets {
            if bucket_config.id.is_empty() || bucket_config.templates.is_empty() {
                log::warn!("skipping pool bucket with empty id or template list");
                continue;
            }
            let template_count = bucket_config.templates.len();
            let preload = bucket_config.preload_each;
            let id = bucket_config.id.clone();
            let mut bucket = Bucket {
                config: bucket_config,
                queues: vec![VecDeque::new(); template_count],
                selector: WeightedSelector::new(
                    config.avoid_immediate_repeat,
                    config.no_repeat_window,
                ),
                instantiated: 0,
            };
            for template in 0..template_count {
                for _ in 0..preload {
                    let entity = bucket.instantiate(
                        world,
                        &id,
                        template,
                        pool.end_point,
                        pool.reach_threshold,
                    );
                    bucket.queues[template].push_back(entity);
                }
            }
            pool.buckets.insert(id, bucket);
        }
        pool
    }

    pub fn has_bucket(&self, id: &str) -> bool {
        self.buckets.contains_key(id)
    }

    /// Instances created so far for a bucket (reuse does not count).
    pub fn instantiated(&self, bucket: &str) -> usize {
        self.buckets.get(bucket).map_or(0, |b| b.instantiated)
    }

    /// Instances currently parked in a bucket's queues.
    pub fn queued(&self, bucket: &str) -> usize {
        self.buckets.get(bucket).map_or(0, |b| b.queued())
    }

    /// Dispense an actor from a bucket at the given pose. Reuses a queued
    /// instance when one exists, instantiates otherwise. Unknown bucket ids
    /// log and return `None`.
    pub fn acquire(&mut self, world: &mut World, bucket_id: &str, pose: Pose) -> Option<Entity> {
        let Some(bucket) = self.buckets.get_mut(bucket_id) else {
            log::warn!("acquire from unknown pool '{}'", bucket_id);
            return None;
        };

        let indices: Vec<usize> = (0..bucket.config.templates.len()).collect();
        let template = bucket.selector.pick(&mut self.rng, &indices, None)?;

        let entity = match bucket.queues[template].pop_front() {
            Some(entity) => entity,
            None => bucket.instantiate(
                world,
                bucket_id,
                template,
                self.end_point,
                self.reach_threshold,
            ),
        };

        if let Ok(mut p) = world.get::<&mut Pose>(entity) {
            *p = pose;
        }
        if let Ok(mut agent) = world.get::<&mut PoolAgent>(entity) {
            agent.end_point = self.end_point;
            agent.active = true;
        }
        Some(entity)
    }

    /// Return an actor to its queue and immediately spawn a replacement.
    /// Instances without a `PooledIdentity` log and are left untouched.
    pub fn release(&mut self, world: &mut World, entity: Entity) {
        let (bucket_id, template) = match world.get::<&PooledIdentity>(entity) {
            Ok(identity) => (identity.bucket.clone(), identity.template),
            Err(_) => {
                log::warn!("release of entity without PooledIdentity; ignoring");
                return;
            }
        };
        let Some(bucket) = self.buckets.get_mut(&bucket_id) else {
            log::warn!("release into unknown pool '{}'", bucket_id);
            return;
        };

        if let Ok(mut agent) = world.get::<&mut PoolAgent>(entity) {
            agent.active = false;
        }
        let slot = template.min(bucket.queues.len() - 1);
        bucket.queues[slot].push_back(entity);

        self.spawn_next(world);
    }

    /// Policy entrypoint: dispense from the special bucket once enough time
    /// has passed (and it exists), from the normal bucket otherwise.
    pub fn spawn_next(&mut self, world: &mut World) -> Option<Entity> {
        let use_special = self.elapsed >= self.special_after_seconds
            && self.buckets.contains_key(&self.special_bucket);
        if use_special {
            let (bucket, pose) = (self.special_bucket.clone(), self.special_spawn);
            self.acquire(world, &bucket, pose)
        } else {
            let (bucket, pose) = (self.normal_bucket.clone(), self.normal_spawn);
            self.acquire(world, &bucket, pose)
        }
    }

    /// Advance time, move every active agent, and release the ones that
    /// reached their end point (each release spawns a replacement).
    pub fn tick(&mut self, world: &mut World, dt: f32) {
        self.elapsed += dt;

        let mut reached = Vec::new();
        for (entity, (pose, mover, agent)) in
            world.query_mut::<(&mut Pose, &ForwardMover, &PoolAgent)>()
        {
            if !agent.active {
                continue;
            }
            let step = pose.forward() * mover.speed * dt;
            pose.position += step;
            if pose.position.distance(agent.end_point) <= mover.reach_threshold {
                reached.push(entity);
            }
        }
        for entity in reached {
            self.release(world, entity);
        }
    }

    /// Shift the pool's reference points by a world offset (track re-base).
    /// Actor poses are world entities; the caller shifts those.
    pub fn apply_offset(&mut self, world: &mut World, offset: Vec3) {
        self.normal_spawn.position += offset;
        self.special_spawn.position += offset;
        self.end_point += offset;
        for (_, agent) in world.query_mut::<&mut PoolAgent>() {
            agent.end_point += offset;
        }
    }

    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed
    }
}
