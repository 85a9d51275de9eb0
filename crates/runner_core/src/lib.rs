//! Core types and utilities for the openrun track runner.
//!
//! This crate provides the foundational types used across all runner systems:
//! - Pose (position + orientation) for sockets, anchors, and placed actors
//! - Tick clock for the driver loop

pub mod pose;
pub mod time;

pub use pose::*;
pub use time::*;

// Re-export commonly used types
pub use glam::{IVec3, Quat, Vec3};
pub use hecs::{Entity, World};
