//! Construction-time errors for the track core.
//!
//! Runtime placement failures are not errors: an occupancy conflict is
//! retried or skipped inside the tick, a missing terminal descriptor is a
//! logged warning. Only problems that leave a component unusable from the
//! start surface here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackError {
    /// The segment library was built from an empty descriptor list.
    #[error("segment library has no descriptors")]
    EmptyLibrary,

    /// A config value no placement policy can work with.
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}
