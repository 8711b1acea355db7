//! Command-line driver: seeds a square lattice of disks and runs the
//! engine headlessly, logging per-frame aggregates.

use clap::Parser;
use disksim::{
    CollisionSystem, Command, Error, FrameSink, Particle, Result, SimConfig, Snapshot,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Event-driven hard-disk molecular dynamics in a box.
#[derive(Debug, Parser)]
#[command(name = "disksim", version, about)]
struct Args {
    /// Disk radius in box-space units
    radius: f64,
    /// Centre-to-centre lattice spacing in box-space units
    spacing: f64,
    /// Restitution coefficient in (0, 1]; 1.0 is fully elastic
    friction: f64,
    /// Simulated duration before shutdown
    #[arg(long, default_value_t = 20.0)]
    duration: f64,
    /// RNG seed for reproducible initial velocities
    #[arg(long)]
    seed: Option<u64>,
}

/// Headless sink: logs aggregates each frame and shuts the loop down once
/// the requested duration has been simulated.
struct ConsoleSink {
    duration: f64,
}

impl FrameSink for ConsoleSink {
    fn on_frame(&mut self, s: &Snapshot) -> Vec<Command> {
        log::info!(
            "t={:8.3} N={:4} <E>={:.4e} J T={:8.2} K P={:.4e} Pa phi={:.3} events={} queue={}",
            s.time,
            s.particles.len(),
            s.avg_kinetic_energy,
            s.temperature,
            s.pressure,
            s.packing_factor,
            s.collisions_total,
            s.queue_size,
        );
        if s.time >= self.duration {
            vec![Command::Shutdown]
        } else {
            Vec::new()
        }
    }
}

/// Fill the box with a square lattice of disks at the given spacing, each
/// with a small random velocity.
fn lattice(
    radius: f64,
    spacing: f64,
    config: &SimConfig,
    rng: &mut StdRng,
) -> Result<Vec<Particle>> {
    if !radius.is_finite() || radius <= 0.0 {
        return Err(Error::InvalidParam("radius must be finite and > 0".into()));
    }
    if !spacing.is_finite() || spacing < 2.0 * radius {
        return Err(Error::InvalidParam(
            "spacing must be at least one diameter".into(),
        ));
    }

    let half = config.side / 2.0;
    let (left, right) = (config.box_center.0 - half, config.box_center.0 + half);
    let (bottom, top) = (config.box_center.1 - half, config.box_center.1 + half);

    let mut particles = Vec::new();
    let mut y = bottom + spacing;
    while y <= top - spacing {
        let mut x = left + spacing;
        while x <= right - spacing {
            let vx = rng.random_range(-0.05..=0.05);
            let vy = rng.random_range(-0.05..=0.05);
            particles.push(Particle::new(0.0, x, y, vx, vy, radius, 1.0)?);
            x += spacing;
        }
        y += spacing;
    }

    if particles.is_empty() {
        return Err(Error::InvalidParam(
            "no lattice site fits the box at this radius and spacing".into(),
        ));
    }
    Ok(particles)
}

fn run(args: Args) -> Result<()> {
    let config = SimConfig {
        friction: args.friction,
        ..SimConfig::default()
    };
    config.validate()?;

    let mut rng = match args.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::seed_from_u64(rand::rng().random()),
    };
    let particles = lattice(args.radius, args.spacing, &config, &mut rng)?;
    log::info!(
        "seeded {} disks of radius {} at spacing {}",
        particles.len(),
        args.radius,
        args.spacing
    );

    let mut system = CollisionSystem::new(particles, config, args.seed)?;
    let mut sink = ConsoleSink {
        duration: args.duration,
    };
    system.run(&mut sink)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
