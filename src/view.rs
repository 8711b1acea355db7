//! The seam between the engine and its presentation layer.
//!
//! The engine owns all mutable state; observers receive immutable
//! [`Snapshot`] copies on every frame event and answer with abstract
//! [`Command`]s. Keyboard handling, drawing and pacing all live behind the
//! [`FrameSink`] trait.

use crate::core::stats::VelocityHistogram;

/// Read-only copy of one particle for presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleView {
    /// Centre x coordinate.
    pub x: f64,
    /// Centre y coordinate.
    pub y: f64,
    /// Velocity x component.
    pub vx: f64,
    /// Velocity y component.
    pub vy: f64,
    /// Disk radius.
    pub radius: f64,
    /// Display colour.
    pub color: [u8; 3],
}

/// Immutable view of the system emitted on each frame event.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Simulation clock.
    pub time: f64,
    /// Current box edge length.
    pub side: f64,
    /// Current outward wall speed.
    pub wall_speed: f64,
    /// Whether the loop is paused.
    pub paused: bool,
    /// Particle states.
    pub particles: Vec<ParticleView>,
    /// Number of collision events applied so far.
    pub collisions_total: u64,
    /// Mean kinetic energy in joules.
    pub avg_kinetic_energy: f64,
    /// Temperature in kelvin derived from the mean kinetic energy.
    pub temperature: f64,
    /// Pressure in pascals over the physical box area.
    pub pressure: f64,
    /// Summed disk area over box area.
    pub packing_factor: f64,
    /// Speed histogram at the configured horizontal scale.
    pub histogram: VelocityHistogram,
    /// Collision positions of the traced particle.
    pub trace: Vec<(f64, f64)>,
    /// Outstanding entries in the event queue, stale ones included.
    pub queue_size: usize,
}

/// Control commands the presentation layer can issue back to the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Toggle the pause flag.
    TogglePause,
    /// Insert one particle at a random interior position with a small
    /// random velocity.
    AddParticle,
    /// Remove the later-born particle of every overlapping pair.
    RemoveOverlapping,
    /// Add `delta` to the wall speed.
    WallSpeed(f64),
    /// Multiply the histogram's horizontal scale by this factor.
    HistogramScale(f64),
    /// Terminate the loop at the next iteration boundary.
    Shutdown,
}

/// Consumer of frame snapshots and source of control commands.
///
/// While the engine is paused it keeps calling [`FrameSink::on_frame`]
/// without advancing the clock, so the sink owns pacing and is the only
/// way out of a pause.
pub trait FrameSink {
    /// Consume one snapshot; returned commands are applied before the next
    /// event is popped.
    fn on_frame(&mut self, snapshot: &Snapshot) -> Vec<Command>;
}

/// Sink that discards snapshots and issues no commands.
#[derive(Debug, Default)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn on_frame(&mut self, _snapshot: &Snapshot) -> Vec<Command> {
        Vec::new()
    }
}
