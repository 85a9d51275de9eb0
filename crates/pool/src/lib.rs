//! Actor pooling: named buckets of reusable world entities.
//!
//! Pooled actors are hecs entities that are deactivated and queued on
//! release, never despawned. Identity components route a returned actor to
//! the queue it came from.

pub mod agent;
pub mod pool;

pub use agent::*;
pub use pool::*;
