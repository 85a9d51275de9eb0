//! Components carried by pooled actors.

use glam::Vec3;

/// Which bucket and template an instance came from. Attached once at first
/// instantiation; required to route a release back to the right queue.
#[derive(Debug, Clone)]
pub struct PooledIdentity {
    pub bucket: String,
    pub template: usize,
}

/// Runtime pool state of an actor: its destination and whether it is
/// currently live or parked in a queue.
#[derive(Debug, Clone, Copy)]
pub struct PoolAgent {
    pub end_point: Vec3,
    pub active: bool,
}

/// Constant-speed travel along the actor's own forward axis. The pool's
/// tick releases the actor once it is within `reach_threshold` of its end
/// point.
#[derive(Debug, Clone, Copy)]
pub struct ForwardMover {
    pub speed: f32,
    pub reach_threshold: f32,
}
