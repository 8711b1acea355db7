//! Event-driven molecular dynamics of hard disks in a square box.
//!
//! Instead of integrating motion in fixed time steps, the engine computes
//! the exact future time of every possible collision, keeps those
//! predictions in a priority queue, and jumps the clock from one collision
//! to the next. Between events, particles fly in straight lines; the box
//! walls may move symmetrically about the centre.
//!
//! The crate splits into:
//! - [`core`]: particles, events, the collision system and its
//!   instrumentation;
//! - [`view`]: the snapshot/command seam to a presentation layer;
//! - [`config`]: per-instance physical constants and tunables;
//! - [`error`]: the crate-wide error type.

pub mod config;
pub mod core;
pub mod error;
pub mod view;

pub use config::{SimConfig, Units};
pub use core::{CollisionSystem, Event, EventKind, Particle};
pub use error::{Error, Result};
pub use view::{Command, FrameSink, NullSink, ParticleView, Snapshot};
