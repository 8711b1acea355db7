use disksim::{CollisionSystem, Command, FrameSink, NullSink, Result, SimConfig, Snapshot};

/// Sink that records frame times and shuts down once `until` is reached.
struct TimedSink {
    until: f64,
    times: Vec<f64>,
}

impl TimedSink {
    fn new(until: f64) -> Self {
        Self {
            until,
            times: Vec::new(),
        }
    }
}

impl FrameSink for TimedSink {
    fn on_frame(&mut self, s: &Snapshot) -> Vec<Command> {
        self.times.push(s.time);
        if s.time >= self.until {
            vec![Command::Shutdown]
        } else {
            Vec::new()
        }
    }
}

fn elastic_config() -> SimConfig {
    SimConfig {
        friction: 1.0,
        ..SimConfig::default()
    }
}

/// Energy conservation: with a static box and fully elastic collisions the
/// total kinetic energy is constant across any number of pair and wall
/// collisions.
#[test]
fn energy_conserved_over_long_run() -> Result<()> {
    let mut sys = CollisionSystem::random(32, 0.02, 1.0, elastic_config(), Some(12345))?;
    let e0 = sys.total_kinetic_energy();

    let mut sink = TimedSink::new(50.0);
    sys.run(&mut sink)?;

    assert!(
        sys.collisions_total() > 0,
        "expected some collisions over 50 time units"
    );
    let e1 = sys.total_kinetic_energy();
    let rel = ((e1 - e0) / e0).abs();
    assert!(
        rel < 1e-6,
        "relative energy drift {rel} too large (E0={e0}, E1={e1})"
    );
    Ok(())
}

/// Momentum conservation: an isolated pair collision preserves total
/// linear momentum to rounding.
#[test]
fn pair_collision_conserves_momentum() -> Result<()> {
    let a = disksim::Particle::new(0.0, 0.3, 0.5, 0.08, 0.02, 0.01, 2.0)?;
    let b = disksim::Particle::new(0.0, 0.7, 0.5, -0.09, 0.0, 0.01, 3.0)?;
    let mut sys = CollisionSystem::new(vec![a, b], elastic_config(), Some(1))?;

    let momentum = |sys: &CollisionSystem| {
        sys.particles().iter().fold((0.0, 0.0), |(px, py), p| {
            (px + p.mass * p.vx, py + p.mass * p.vy)
        })
    };
    let (px0, py0) = momentum(&sys);

    let mut sink = NullSink;
    while sys.collisions_total() == 0 {
        assert!(sys.step(&mut sink)?);
    }

    let (px1, py1) = momentum(&sys);
    assert!((px0 - px1).abs() < 1e-12);
    assert!((py0 - py1).abs() < 1e-12);
    Ok(())
}

/// Containment and non-overlap: across a long run every particle stays
/// inside the box and no two disks interpenetrate, modulo the position
/// tolerance.
#[test]
fn containment_and_non_overlap() -> Result<()> {
    let cfg = elastic_config();
    let eps = cfg.position_tolerance;
    let mut sys = CollisionSystem::random(24, 0.02, 1.0, cfg, Some(777))?;

    // Sample the state repeatedly along the run.
    for stage in 1..=10 {
        let mut sink = TimedSink::new(stage as f64 * 2.0);
        sys.run(&mut sink)?;

        for p in sys.particles() {
            assert!(
                p.x >= p.radius - eps && p.x <= 1.0 - p.radius + eps,
                "x escaped: {}",
                p.x
            );
            assert!(
                p.y >= p.radius - eps && p.y <= 1.0 - p.radius + eps,
                "y escaped: {}",
                p.y
            );
        }
        let ps = sys.particles();
        for i in 0..ps.len() {
            for j in (i + 1)..ps.len() {
                let dx = ps[j].x - ps[i].x;
                let dy = ps[j].y - ps[i].y;
                let dist = (dx * dx + dy * dy).sqrt();
                let sigma = ps[i].radius + ps[j].radius;
                assert!(
                    dist >= sigma - eps,
                    "overlap between {i} and {j}: dist {dist} < sigma {sigma}"
                );
            }
        }
    }
    Ok(())
}

/// The clock never runs backward, frame after frame.
#[test]
fn clock_is_monotonic() -> Result<()> {
    let mut sys = CollisionSystem::random(16, 0.02, 1.0, elastic_config(), Some(2468))?;
    let mut sink = TimedSink::new(10.0);
    sys.run(&mut sink)?;

    assert!(sink.times.len() > 2);
    for w in sink.times.windows(2) {
        assert!(w[1] >= w[0], "clock went backward: {} -> {}", w[0], w[1]);
    }
    Ok(())
}

/// Identical seeds and command sequences give identical trajectories.
#[test]
fn deterministic_replay_with_fixed_seed() -> Result<()> {
    let run_once = || -> Result<Vec<(f64, f64, f64, f64)>> {
        let mut sys = CollisionSystem::random(16, 0.02, 1.0, elastic_config(), Some(31415))?;
        let mut sink = TimedSink::new(10.0);
        sys.run(&mut sink)?;
        Ok(sys
            .particles()
            .iter()
            .map(|p| (p.x, p.y, p.vx, p.vy))
            .collect())
    };

    let first = run_once()?;
    let second = run_once()?;
    assert_eq!(first, second);
    Ok(())
}

/// Collision counters only ever grow.
#[test]
fn collision_counts_monotone() -> Result<()> {
    let mut sys = CollisionSystem::random(16, 0.02, 1.0, elastic_config(), Some(99))?;
    let mut last: Vec<u64> = sys.particles().iter().map(|p| p.collision_count).collect();

    for stage in 1..=5 {
        let mut sink = TimedSink::new(stage as f64 * 2.0);
        sys.run(&mut sink)?;
        let now: Vec<u64> = sys.particles().iter().map(|p| p.collision_count).collect();
        for (prev, cur) in last.iter().zip(&now) {
            assert!(cur >= prev);
        }
        last = now;
    }
    Ok(())
}
