//! Runner configuration (simulation, track, pool). Loaded from runner.ron at startup.

use glam::Vec3;
use pool::{ActorTemplate, BucketConfig, PoolConfig};
use runner_core::Pose;
use serde::{Deserialize, Serialize};
use track::{
    FiniteTrack, GeneratorConfig, SegmentDescriptor, SegmentLibrary, TrackGenerator, TurnKind,
};

/// Persistent runner settings. Loaded from `runner.ron` in the current
/// directory; a missing or invalid file falls back to defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Simulated seconds to run.
    #[serde(default = "default_sim_seconds")]
    pub sim_seconds: f32,
    /// Fixed simulation rate in ticks per second.
    #[serde(default = "default_tick_rate")]
    pub tick_rate: f32,
    /// Seed for reproducible runs; entropy when unset.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Auto-runner speed in units per second.
    #[serde(default = "default_runner_speed")]
    pub runner_speed: f32,
    #[serde(default)]
    pub generator: GeneratorSection,
    #[serde(default)]
    pub content: ContentSection,
    #[serde(default)]
    pub pool: PoolSection,
    /// Segment set; empty uses the built-in straight/turn/split pieces.
    #[serde(default)]
    pub segments: Vec<SegmentDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorSection {
    #[serde(default = "default_tile_length")]
    pub tile_length: f32,
    #[serde(default = "default_tiles_ahead")]
    pub tiles_ahead: usize,
    #[serde(default = "default_safe_start")]
    pub safe_start_count: usize,
    #[serde(default = "default_true")]
    pub allow_turns: bool,
    #[serde(default = "default_turn_chance")]
    pub turn_chance: f32,
    #[serde(default = "default_true")]
    pub prevent_consecutive_turns: bool,
    #[serde(default = "default_true")]
    pub use_grid_guard: bool,
    #[serde(default = "default_tile_length")]
    pub cell_size: f32,
    #[serde(default = "default_one")]
    pub forward_cells_per_tile: usize,
    #[serde(default = "default_spawn_budget")]
    pub max_spawns_per_tick: usize,
    #[serde(default = "default_rebase_threshold")]
    pub rebase_threshold: f32,
    #[serde(default)]
    pub finite: Option<FiniteSection>,
}

/// Finite-track mode: cap regular tiles, then place the named end segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiniteSection {
    pub max_regular_tiles: usize,
    pub end_segment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentSection {
    #[serde(default = "default_obstacle_chance")]
    pub obstacle_chance: f32,
    #[serde(default = "default_coin_chance")]
    pub coin_chance: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSection {
    /// Live conveyor actors kicked off at startup.
    #[serde(default = "default_initial_actors")]
    pub initial_actors: usize,
    #[serde(default = "default_preload_each")]
    pub preload_each: usize,
    #[serde(default = "default_special_after")]
    pub special_after_seconds: f32,
    #[serde(default = "default_normal_templates")]
    pub normal_templates: Vec<TemplateDef>,
    #[serde(default = "default_special_templates")]
    pub special_templates: Vec<TemplateDef>,
    #[serde(default = "default_normal_spawn")]
    pub normal_spawn: SocketDef,
    #[serde(default = "default_special_spawn")]
    pub special_spawn: SocketDef,
    #[serde(default = "default_end_point")]
    pub end_point: [f32; 3],
    #[serde(default = "default_reach_threshold")]
    pub reach_threshold: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateDef {
    pub name: String,
    #[serde(default = "default_actor_speed")]
    pub speed: f32,
}

/// A pose in config notation: position plus yaw in degrees.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SocketDef {
    pub position: [f32; 3],
    #[serde(default)]
    pub yaw_degrees: f32,
}

impl SocketDef {
    pub fn pose(&self) -> Pose {
        Pose::from_position_yaw(Vec3::from(self.position), self.yaw_degrees.to_radians())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum TurnDef {
    #[default]
    Straight,
    Left,
    Right,
    Split,
}

impl From<TurnDef> for TurnKind {
    fn from(turn: TurnDef) -> Self {
        match turn {
            TurnDef::Straight => TurnKind::Straight,
            TurnDef::Left => TurnKind::Left90,
            TurnDef::Right => TurnKind::Right90,
            TurnDef::Split => TurnKind::SplitLr,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentDef {
    pub name: String,
    #[serde(default)]
    pub turn: TurnDef,
    #[serde(default = "default_tile_length")]
    pub length: f32,
    #[serde(default = "default_one_f32")]
    pub weight: f32,
    #[serde(default)]
    pub entry: Option<SocketDef>,
    #[serde(default)]
    pub exit: Option<SocketDef>,
    #[serde(default)]
    pub exit_left: Option<SocketDef>,
    #[serde(default)]
    pub exit_right: Option<SocketDef>,
    #[serde(default)]
    pub lanes: Vec<SocketDef>,
}

impl SegmentDef {
    pub fn descriptor(&self) -> SegmentDescriptor {
        SegmentDescriptor {
            name: self.name.clone(),
            turn_kind: self.turn.into(),
            entry: self.entry.map(|s| s.pose()),
            exit: self.exit.map(|s| s.pose()),
            exit_left: self.exit_left.map(|s| s.pose()),
            exit_right: self.exit_right.map(|s| s.pose()),
            approx_length: self.length,
            weight: self.weight.max(0.0),
            lane_points: self.lanes.iter().map(|s| s.pose()).collect(),
        }
    }
}

fn default_sim_seconds() -> f32 {
    60.0
}
fn default_tick_rate() -> f32 {
    60.0
}
fn default_runner_speed() -> f32 {
    8.0
}
fn default_tile_length() -> f32 {
    10.0
}
fn default_tiles_ahead() -> usize {
    8
}
fn default_safe_start() -> usize {
    3
}
fn default_true() -> bool {
    true
}
fn default_turn_chance() -> f32 {
    0.25
}
fn default_one() -> usize {
    1
}
fn default_one_f32() -> f32 {
    1.0
}
fn default_spawn_budget() -> usize {
    2
}
fn default_rebase_threshold() -> f32 {
    4096.0
}
fn default_obstacle_chance() -> f32 {
    0.45
}
fn default_coin_chance() -> f32 {
    0.35
}
fn default_initial_actors() -> usize {
    3
}
fn default_preload_each() -> usize {
    2
}
fn default_special_after() -> f32 {
    30.0
}
fn default_actor_speed() -> f32 {
    6.0
}
fn default_reach_threshold() -> f32 {
    0.5
}
fn default_normal_templates() -> Vec<TemplateDef> {
    vec![
        TemplateDef {
            name: "barrel".into(),
            speed: 6.0,
        },
        TemplateDef {
            name: "cart".into(),
            speed: 7.5,
        },
    ]
}
fn default_special_templates() -> Vec<TemplateDef> {
    vec![TemplateDef {
        name: "golden_cart".into(),
        speed: 9.0,
    }]
}
fn default_normal_spawn() -> SocketDef {
    SocketDef {
        position: [3.0, 0.0, 60.0],
        yaw_degrees: 180.0,
    }
}
fn default_special_spawn() -> SocketDef {
    SocketDef {
        position: [-3.0, 0.0, 60.0],
        yaw_degrees: 180.0,
    }
}
fn default_end_point() -> [f32; 3] {
    [0.0, 0.0, -30.0]
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            sim_seconds: default_sim_seconds(),
            tick_rate: default_tick_rate(),
            seed: None,
            runner_speed: default_runner_speed(),
            generator: GeneratorSection::default(),
            content: ContentSection::default(),
            pool: PoolSection::default(),
            segments: Vec::new(),
        }
    }
}

impl Default for GeneratorSection {
    fn default() -> Self {
        Self {
            tile_length: default_tile_length(),
            tiles_ahead: default_tiles_ahead(),
            safe_start_count: default_safe_start(),
            allow_turns: true,
            turn_chance: default_turn_chance(),
            prevent_consecutive_turns: true,
            use_grid_guard: true,
            cell_size: default_tile_length(),
            forward_cells_per_tile: default_one(),
            max_spawns_per_tick: default_spawn_budget(),
            rebase_threshold: default_rebase_threshold(),
            finite: None,
        }
    }
}

impl Default for ContentSection {
    fn default() -> Self {
        Self {
            obstacle_chance: default_obstacle_chance(),
            coin_chance: default_coin_chance(),
        }
    }
}

impl Default for PoolSection {
    fn default() -> Self {
        Self {
            initial_actors: default_initial_actors(),
            preload_each: default_preload_each(),
            special_after_seconds: default_special_after(),
            normal_templates: default_normal_templates(),
            special_templates: default_special_templates(),
            normal_spawn: default_normal_spawn(),
            special_spawn: default_special_spawn(),
            end_point: default_end_point(),
            reach_threshold: default_reach_threshold(),
        }
    }
}

impl RunnerConfig {
    /// Load config from `runner.ron`. If the file is missing or invalid,
    /// returns default config.
    pub fn load() -> Self {
        let path = config_path();
        if let Ok(data) = std::fs::read_to_string(&path) {
            match ron::from_str(&data) {
                Ok(c) => return c,
                Err(e) => log::warn!("Invalid config at {:?}: {}, using defaults", path, e),
            }
        }
        Self::default()
    }

    /// Segment descriptors from config, or the built-in piece set.
    pub fn descriptors(&self) -> Vec<SegmentDescriptor> {
        if self.segments.is_empty() {
            builtin_segments()
        } else {
            self.segments.iter().map(|s| s.descriptor()).collect()
        }
    }

    /// Assemble the track generator from this config.
    pub fn build_generator(&self) -> anyhow::Result<TrackGenerator> {
        let descriptors = self.descriptors();

        let finite = self.generator.finite.as_ref().and_then(|section| {
            match descriptors
                .iter()
                .position(|d| d.name == section.end_segment)
            {
                Some(end_descriptor) => Some(FiniteTrack {
                    max_regular_tiles: section.max_regular_tiles,
                    end_descriptor,
                }),
                None => {
                    log::warn!(
                        "finite track configured but end segment '{}' is not in the set; \
                         running infinite",
                        section.end_segment
                    );
                    None
                }
            }
        });

        let library = SegmentLibrary::new(descriptors)?;
        let config = GeneratorConfig {
            tile_length: self.generator.tile_length,
            tiles_ahead: self.generator.tiles_ahead,
            safe_start_count: self.generator.safe_start_count,
            allow_turns: self.generator.allow_turns,
            turn_chance: self.generator.turn_chance,
            prevent_consecutive_turns: self.generator.prevent_consecutive_turns,
            use_grid_guard: self.generator.use_grid_guard,
            cell_size: self.generator.cell_size,
            forward_cells_per_tile: self.generator.forward_cells_per_tile,
            max_spawns_per_tick: self.generator.max_spawns_per_tick,
            rebase_threshold: self.generator.rebase_threshold,
            finite,
            seed: self.seed,
            ..GeneratorConfig::default()
        };
        Ok(TrackGenerator::new(library, config, Pose::IDENTITY)?)
    }

    /// Assemble the actor pool config from this config.
    pub fn pool_config(&self) -> PoolConfig {
        let template = |t: &TemplateDef| ActorTemplate {
            name: t.name.clone(),
            speed: t.speed,
        };
        let mut buckets = vec![BucketConfig {
            id: "normal".into(),
            templates: self.pool.normal_templates.iter().map(template).collect(),
            preload_each: self.pool.preload_each,
        }];
        if !self.pool.special_templates.is_empty() {
            buckets.push(BucketConfig {
                id: "special".into(),
                templates: self.pool.special_templates.iter().map(template).collect(),
                preload_each: 0,
            });
        }
        PoolConfig {
            buckets,
            special_after_seconds: self.pool.special_after_seconds,
            normal_spawn: self.pool.normal_spawn.pose(),
            special_spawn: self.pool.special_spawn.pose(),
            end_point: Vec3::from(self.pool.end_point),
            reach_threshold: self.pool.reach_threshold,
            seed: self.seed,
            ..PoolConfig::default()
        }
    }
}

/// Built-in piece set: one straight, both 90° turns, a split fork, and a
/// zero-weight finish gate for finite tracks. Three lane anchors on the
/// straight.
fn builtin_segments() -> Vec<SegmentDescriptor> {
    let lanes = vec![
        SocketDef {
            position: [-2.0, 0.0, 5.0],
            yaw_degrees: 0.0,
        },
        SocketDef {
            position: [0.0, 0.0, 5.0],
            yaw_degrees: 0.0,
        },
        SocketDef {
            position: [2.0, 0.0, 5.0],
            yaw_degrees: 0.0,
        },
    ];
    let socket = |x: f32, z: f32, yaw: f32| {
        Some(SocketDef {
            position: [x, 0.0, z],
            yaw_degrees: yaw,
        })
    };
    let defs = vec![
        SegmentDef {
            name: "straight".into(),
            turn: TurnDef::Straight,
            length: 10.0,
            weight: 4.0,
            entry: socket(0.0, 0.0, 0.0),
            exit: socket(0.0, 10.0, 0.0),
            exit_left: None,
            exit_right: None,
            lanes: lanes.clone(),
        },
        SegmentDef {
            name: "turn_left".into(),
            turn: TurnDef::Left,
            length: 10.0,
            weight: 1.0,
            entry: socket(0.0, 0.0, 0.0),
            exit: socket(-5.0, 5.0, -90.0),
            exit_left: None,
            exit_right: None,
            lanes: Vec::new(),
        },
        SegmentDef {
            name: "turn_right".into(),
            turn: TurnDef::Right,
            length: 10.0,
            weight: 1.0,
            entry: socket(0.0, 0.0, 0.0),
            exit: socket(5.0, 5.0, 90.0),
            exit_left: None,
            exit_right: None,
            lanes: Vec::new(),
        },
        SegmentDef {
            name: "fork".into(),
            turn: TurnDef::Split,
            length: 10.0,
            weight: 0.5,
            entry: socket(0.0, 0.0, 0.0),
            exit: None,
            exit_left: socket(-5.0, 5.0, -90.0),
            exit_right: socket(5.0, 5.0, 90.0),
            lanes: Vec::new(),
        },
        SegmentDef {
            name: "finish".into(),
            turn: TurnDef::Straight,
            length: 10.0,
            weight: 0.0,
            entry: socket(0.0, 0.0, 0.0),
            exit: socket(0.0, 10.0, 0.0),
            exit_left: None,
            exit_right: None,
            lanes: Vec::new(),
        },
    ];
    defs.iter().map(|d| d.descriptor()).collect()
}

fn config_path() -> std::path::PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| std::path::PathBuf::from("."))
        .join("runner.ron")
}
