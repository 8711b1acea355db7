use crate::config::SimConfig;
use crate::core::stats::{self, Tracer, VelocityHistogram};
use crate::core::{Event, EventKind, Particle};
use crate::error::{Error, Result};
use crate::view::{Command, FrameSink, ParticleView, Snapshot};
use rand::{rng, rngs::StdRng, Rng, SeedableRng};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Small numeric tolerance for clock comparisons.
const EPS_TIME: f64 = 1e-12;

/// Properties of particles injected by [`Command::AddParticle`].
const ADDED_RADIUS: f64 = 0.01;
const ADDED_MASS: f64 = 0.5;
const ADDED_SPEED: f64 = 0.05;

/// Axis-aligned square container, optionally expanding or contracting
/// symmetrically about its centre.
///
/// Each face travels outward at `wall_speed` (inward when negative), so the
/// side grows at twice that rate. The side is confined to `side_limits`;
/// reaching either bound stops the walls.
#[derive(Debug, Clone)]
pub struct BoxGeom {
    center: (f64, f64),
    side: f64,
    wall_speed: f64,
    side_limits: (f64, f64),
}

impl BoxGeom {
    fn new(center: (f64, f64), side: f64, wall_speed: f64, side_limits: (f64, f64)) -> Self {
        Self {
            center,
            side,
            wall_speed,
            side_limits,
        }
    }

    /// Current edge length.
    #[inline]
    pub fn side(&self) -> f64 {
        self.side
    }

    /// Current outward face speed.
    #[inline]
    pub fn wall_speed(&self) -> f64 {
        self.wall_speed
    }

    #[inline]
    fn left(&self) -> f64 {
        self.center.0 - self.side / 2.0
    }

    #[inline]
    fn right(&self) -> f64 {
        self.center.0 + self.side / 2.0
    }

    #[inline]
    fn bottom(&self) -> f64 {
        self.center.1 - self.side / 2.0
    }

    #[inline]
    fn top(&self) -> f64 {
        self.center.1 + self.side / 2.0
    }

    /// Advance wall motion by `dt`, clamping the side to its limits and
    /// stopping the walls when a limit is crossed. Returns whether the
    /// walls stopped.
    fn grow(&mut self, dt: f64) -> bool {
        if self.wall_speed == 0.0 {
            return false;
        }
        self.side += 2.0 * self.wall_speed * dt;
        let (lo, hi) = self.side_limits;
        if self.side < lo {
            self.side = lo;
            self.wall_speed = 0.0;
            log::info!("box side reached lower limit {lo}; walls stopped");
            return true;
        }
        if self.side > hi {
            self.side = hi;
            self.wall_speed = 0.0;
            log::info!("box side reached upper limit {hi}; walls stopped");
            return true;
        }
        false
    }
}

/// Owner of the particle slab and the event queue; drives the simulation.
///
/// The loop is a sequential dequeue-apply-predict cycle: extract the
/// earliest valid event, advance every particle to its time, apply the
/// event's velocity change, then re-predict for the involved particles
/// only. Stale entries (collision-count stamp mismatch) are discarded
/// lazily at pop time.
#[derive(Debug)]
pub struct CollisionSystem {
    config: SimConfig,
    bounds: BoxGeom,
    time: f64,
    particles: Vec<Particle>,
    pq: BinaryHeap<Reverse<Event>>,
    rng: StdRng,
    paused: bool,
    shutdown: bool,
    hist_scale: f64,
    collisions_total: u64,
    tracer: Tracer,
}

impl CollisionSystem {
    /// Build a system around an existing particle collection, schedule the
    /// initial predictions for every particle and seed the frame chain at
    /// time zero.
    pub fn new(particles: Vec<Particle>, config: SimConfig, seed: Option<u64>) -> Result<Self> {
        config.validate()?;
        let bounds = BoxGeom::new(
            config.box_center,
            config.side,
            config.wall_speed,
            config.side_limits,
        );
        let tracer = Tracer::aimed_at_center(&particles, config.box_center);
        let mut sys = Self {
            config,
            bounds,
            time: 0.0,
            particles,
            pq: BinaryHeap::new(),
            rng: seed_rng(seed),
            paused: false,
            shutdown: false,
            hist_scale: 1.0,
            collisions_total: 0,
            tracer,
        };
        for i in 0..sys.particles.len() {
            sys.predict(i)?;
        }
        sys.pq
            .push(Reverse(Event::new(0.0, EventKind::Frame, None, None)?));
        Ok(sys)
    }

    /// Build a system of `num_particles` identical disks at rejection-
    /// sampled non-overlapping random positions with small random
    /// velocities.
    pub fn random(
        num_particles: usize,
        radius: f64,
        mass: f64,
        config: SimConfig,
        seed: Option<u64>,
    ) -> Result<Self> {
        config.validate()?;
        if !radius.is_finite() || radius <= 0.0 {
            return Err(Error::InvalidParam("radius must be finite and > 0".into()));
        }
        if config.side < 2.0 * radius {
            return Err(Error::InvalidParam(
                "box side must be at least one particle diameter".into(),
            ));
        }

        let mut rng = seed_rng(seed);
        let half = config.side / 2.0;
        let (lo_x, hi_x) = (
            config.box_center.0 - half + radius,
            config.box_center.0 + half - radius,
        );
        let (lo_y, hi_y) = (
            config.box_center.1 - half + radius,
            config.box_center.1 + half - radius,
        );

        let mut particles: Vec<Particle> = Vec::with_capacity(num_particles);
        let max_attempts = 1_000_000usize;
        for id in 0..num_particles {
            let mut attempts = 0usize;
            let (x, y) = loop {
                if attempts >= max_attempts {
                    return Err(Error::InvalidParam(format!(
                        "failed to place particle {id} without overlap; \
                         try fewer particles or a smaller radius"
                    )));
                }
                attempts += 1;
                let x = rng.random_range(lo_x..=hi_x);
                let y = rng.random_range(lo_y..=hi_y);
                if !overlaps_existing(&particles, x, y, radius) {
                    break (x, y);
                }
            };
            let vx = rng.random_range(-ADDED_SPEED..=ADDED_SPEED);
            let vy = rng.random_range(-ADDED_SPEED..=ADDED_SPEED);
            particles.push(Particle::new(0.0, x, y, vx, vy, radius, mass)?);
        }

        Self::new(particles, config, seed)
    }

    /// Current simulation time.
    #[inline]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Number of particles.
    #[inline]
    pub fn num_particles(&self) -> usize {
        self.particles.len()
    }

    /// Read-only particle slab.
    #[inline]
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Outstanding queue entries, stale ones included.
    #[inline]
    pub fn queue_len(&self) -> usize {
        self.pq.len()
    }

    /// Number of collision events applied so far.
    #[inline]
    pub fn collisions_total(&self) -> u64 {
        self.collisions_total
    }

    /// Whether the loop is paused.
    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Current box edge length.
    #[inline]
    pub fn box_side(&self) -> f64 {
        self.bounds.side()
    }

    /// Current outward wall speed.
    #[inline]
    pub fn wall_speed(&self) -> f64 {
        self.bounds.wall_speed()
    }

    /// Total kinetic energy in model units (diagnostic).
    pub fn total_kinetic_energy(&self) -> f64 {
        self.particles.iter().map(Particle::kinetic_energy).sum()
    }

    /// Collision positions of the traced particle so far.
    pub fn trace(&self) -> &[(f64, f64)] {
        &self.tracer.points
    }

    /// Run until the queue starves, a shutdown command arrives, or an
    /// error surfaces. While paused, snapshots keep flowing to the sink
    /// (whose commands are the only way out) and the clock stands still.
    pub fn run(&mut self, sink: &mut dyn FrameSink) -> Result<()> {
        self.shutdown = false;
        while !self.shutdown {
            if self.paused {
                let snapshot = self.snapshot();
                for cmd in sink.on_frame(&snapshot) {
                    self.apply(cmd)?;
                }
                continue;
            }
            if !self.step(sink)? {
                break;
            }
        }
        Ok(())
    }

    /// Process a single event. Returns `Ok(false)` when the queue is
    /// exhausted.
    pub fn step(&mut self, sink: &mut dyn FrameSink) -> Result<bool> {
        // Drain stale and behind-clock entries until a live event surfaces.
        let ev = loop {
            let Some(Reverse(ev)) = self.pq.pop() else {
                return Ok(false);
            };
            if !self.event_valid(&ev) {
                continue;
            }
            if ev.time_f64() < self.time - EPS_TIME {
                log::debug!(
                    "dropping event at t={:.12} behind clock t={:.12}",
                    ev.time_f64(),
                    self.time
                );
                continue;
            }
            break ev;
        };

        // Advance every particle and the walls to the event time, then
        // absorb any numerical drift against the faces.
        let dt = (ev.time_f64() - self.time).max(0.0);
        for p in &mut self.particles {
            p.advance(dt);
        }
        let walls_stopped = self.bounds.grow(dt);
        self.clamp_positions();
        self.time = self.time.max(ev.time_f64());

        let (left, right) = (self.bounds.left(), self.bounds.right());
        let (bottom, top) = (self.bounds.bottom(), self.bounds.top());
        let ws = self.bounds.wall_speed();

        match ev.kind {
            EventKind::Pair { a, b } => {
                let friction = self.config.friction;
                let (pa, pb) = pair_mut(&mut self.particles, a, b);
                pa.bounce_off(pb, friction);
                self.collisions_total += 1;
                self.tracer.record(a, &self.particles);
                self.tracer.record(b, &self.particles);
                self.predict(a)?;
                self.predict(b)?;
            }
            EventKind::VerticalWall { a } => {
                self.particles[a].bounce_off_vertical_wall(left, right, ws);
                self.collisions_total += 1;
                self.tracer.record(a, &self.particles);
                self.predict(a)?;
            }
            EventKind::HorizontalWall { a } => {
                self.particles[a].bounce_off_horizontal_wall(bottom, top, ws);
                self.collisions_total += 1;
                self.tracer.record(a, &self.particles);
                self.predict(a)?;
            }
            EventKind::Frame => {
                // Reschedule before applying commands, so a regeneration
                // triggered by a command replaces this chain instead of
                // forking it.
                let next = Event::new(self.time + 1.0 / self.config.hz, EventKind::Frame, None, None)?;
                self.pq.push(Reverse(next));
                let snapshot = self.snapshot();
                for cmd in sink.on_frame(&snapshot) {
                    self.apply(cmd)?;
                }
            }
        }

        // Stamps cover collision counts, not box geometry: a wall stop
        // invalidates every prediction made against the old wall motion,
        // so rebuild the queue just as an external speed change does.
        if walls_stopped {
            self.regenerate()?;
        }

        Ok(true)
    }

    /// Apply one control command. Structural changes regenerate the event
    /// queue before the next pop.
    pub fn apply(&mut self, cmd: Command) -> Result<()> {
        match cmd {
            Command::TogglePause => {
                self.paused = !self.paused;
            }
            Command::AddParticle => {
                self.add_random_particle()?;
            }
            Command::RemoveOverlapping => {
                self.remove_overlapping()?;
            }
            Command::WallSpeed(delta) => {
                if !delta.is_finite() {
                    return Err(Error::InvalidParam("wall speed delta must be finite".into()));
                }
                self.bounds.wall_speed += delta;
                log::info!("wall speed now {}", self.bounds.wall_speed);
                self.regenerate()?;
            }
            Command::HistogramScale(factor) => {
                if !factor.is_finite() || factor <= 0.0 {
                    return Err(Error::InvalidParam(
                        "histogram scale factor must be finite and > 0".into(),
                    ));
                }
                self.hist_scale *= factor;
            }
            Command::Shutdown => {
                self.shutdown = true;
            }
        }
        Ok(())
    }

    /// Immutable view of the system for the presentation layer.
    pub fn snapshot(&self) -> Snapshot {
        let units = &self.config.units;
        let mean_ke = stats::mean_kinetic_energy(&self.particles, units);
        let side = self.bounds.side();
        Snapshot {
            time: self.time,
            side,
            wall_speed: self.bounds.wall_speed(),
            paused: self.paused,
            particles: self
                .particles
                .iter()
                .map(|p| ParticleView {
                    x: p.x,
                    y: p.y,
                    vx: p.vx,
                    vy: p.vy,
                    radius: p.radius,
                    color: p.color,
                })
                .collect(),
            collisions_total: self.collisions_total,
            avg_kinetic_energy: mean_ke,
            temperature: stats::temperature(mean_ke, units),
            pressure: stats::pressure(mean_ke, self.particles.len(), side, units),
            packing_factor: stats::packing_factor(&self.particles, side),
            histogram: VelocityHistogram::build(
                &self.particles,
                self.config.histogram_bin_width * self.hist_scale,
            ),
            trace: self.tracer.points.clone(),
            queue_size: self.pq.len(),
        }
    }

    /// Discard the whole queue, re-predict every particle and restart the
    /// frame chain at the current time. Required after structural changes:
    /// cached events reference trajectories that no longer produce the
    /// right ordering.
    pub fn regenerate(&mut self) -> Result<()> {
        self.pq.clear();
        for i in 0..self.particles.len() {
            self.predict(i)?;
        }
        self.pq
            .push(Reverse(Event::new(self.time, EventKind::Frame, None, None)?));
        log::info!(
            "event queue regenerated: {} entries for {} particles",
            self.pq.len(),
            self.particles.len()
        );
        Ok(())
    }

    // ============ Internal helpers ============

    /// Push all future events for particle `i`: one pair event per
    /// reachable partner and one per reachable wall. Duplicates are not
    /// deduplicated; invalidation filters them at pop time.
    fn predict(&mut self, i: usize) -> Result<()> {
        if i >= self.particles.len() {
            return Ok(());
        }

        for j in 0..self.particles.len() {
            // Self-prediction falls out as infinity.
            let dt = self.particles[i].time_to_hit(&self.particles[j]);
            let t_abs = self.time + dt;
            if dt >= 0.0 && t_abs.is_finite() {
                let ev = Event::new(
                    t_abs,
                    EventKind::Pair { a: i, b: j },
                    Some(self.particles[i].collision_count),
                    Some(self.particles[j].collision_count),
                )?;
                self.pq.push(Reverse(ev));
            }
        }

        let ws = self.bounds.wall_speed();
        let p = &self.particles[i];
        let dt_x = p.time_to_hit_vertical(self.bounds.left(), self.bounds.right(), ws);
        let t_abs = self.time + dt_x;
        if dt_x >= 0.0 && t_abs.is_finite() {
            let ev = Event::new(
                t_abs,
                EventKind::VerticalWall { a: i },
                Some(p.collision_count),
                None,
            )?;
            self.pq.push(Reverse(ev));
        }

        let p = &self.particles[i];
        let dt_y = p.time_to_hit_horizontal(self.bounds.bottom(), self.bounds.top(), ws);
        let t_abs = self.time + dt_y;
        if dt_y >= 0.0 && t_abs.is_finite() {
            let ev = Event::new(
                t_abs,
                EventKind::HorizontalWall { a: i },
                Some(p.collision_count),
                None,
            )?;
            self.pq.push(Reverse(ev));
        }

        Ok(())
    }

    /// Check an event's stamps against the referenced particles' current
    /// counters. Frame events carry no stamps and are always live.
    fn event_valid(&self, ev: &Event) -> bool {
        let cc = |idx: usize| self.particles.get(idx).map(|p| p.collision_count);
        match ev.kind {
            EventKind::Pair { a, b } => ev.is_valid(cc(a), cc(b)),
            EventKind::VerticalWall { a } | EventKind::HorizontalWall { a } => {
                ev.is_valid(cc(a), None)
            }
            EventKind::Frame => true,
        }
    }

    /// Clamp every centre into the box, tolerance-free on the inside.
    /// Absorbs floating-point drift after wall motion.
    fn clamp_positions(&mut self) {
        let (lx, hx) = (self.bounds.left(), self.bounds.right());
        let (ly, hy) = (self.bounds.bottom(), self.bounds.top());
        for p in &mut self.particles {
            let (lo, hi) = (lx + p.radius, hx - p.radius);
            if lo <= hi {
                p.x = p.x.clamp(lo, hi);
            }
            let (lo, hi) = (ly + p.radius, hy - p.radius);
            if lo <= hi {
                p.y = p.y.clamp(lo, hi);
            }
        }
    }

    fn add_random_particle(&mut self) -> Result<()> {
        let (lo_x, hi_x) = (
            self.bounds.left() + ADDED_RADIUS,
            self.bounds.right() - ADDED_RADIUS,
        );
        let (lo_y, hi_y) = (
            self.bounds.bottom() + ADDED_RADIUS,
            self.bounds.top() - ADDED_RADIUS,
        );
        if lo_x >= hi_x || lo_y >= hi_y {
            return Err(Error::InvalidParam(
                "box too small to admit another particle".into(),
            ));
        }
        let x = self.rng.random_range(lo_x..=hi_x);
        let y = self.rng.random_range(lo_y..=hi_y);
        let vx = self.rng.random_range(-ADDED_SPEED..=ADDED_SPEED);
        let vy = self.rng.random_range(-ADDED_SPEED..=ADDED_SPEED);
        let p = Particle::new(self.time, x, y, vx, vy, ADDED_RADIUS, ADDED_MASS)?;
        self.particles.push(p);
        log::info!("particle added at ({x:.3}, {y:.3}); {} total", self.particles.len());
        self.regenerate()
    }

    /// Drop the later-born member of every overlapping pair, then
    /// regenerate.
    fn remove_overlapping(&mut self) -> Result<()> {
        let n = self.particles.len();
        let mut doomed = vec![false; n];
        for i in 0..n {
            for j in (i + 1)..n {
                if doomed[i] || doomed[j] {
                    continue;
                }
                let (pi, pj) = (&self.particles[i], &self.particles[j]);
                let dx = pj.x - pi.x;
                let dy = pj.y - pi.y;
                let sigma = pi.radius + pj.radius;
                if dx * dx + dy * dy < sigma * sigma {
                    let victim = if pi.birthdate <= pj.birthdate { j } else { i };
                    doomed[victim] = true;
                }
            }
        }

        let removed = doomed.iter().filter(|&&d| d).count();
        if removed == 0 {
            return Ok(());
        }

        let mut idx = 0;
        self.particles.retain(|_| {
            let keep = !doomed[idx];
            idx += 1;
            keep
        });
        log::info!("removed {removed} overlapping particles; {} remain", self.particles.len());

        // Indices shifted; re-aim the tracer but keep its history.
        let points = std::mem::take(&mut self.tracer.points);
        self.tracer = Tracer::aimed_at_center(&self.particles, self.config.box_center);
        self.tracer.points = points;

        self.regenerate()
    }
}

fn seed_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::seed_from_u64(rng().random()),
    }
}

/// Distinct mutable borrows of two slab entries. Callers guarantee
/// `a != b`; self-pairs are never enqueued.
fn pair_mut(particles: &mut [Particle], a: usize, b: usize) -> (&mut Particle, &mut Particle) {
    debug_assert_ne!(a, b);
    if a < b {
        let (lo, hi) = particles.split_at_mut(b);
        (&mut lo[a], &mut hi[0])
    } else {
        let (lo, hi) = particles.split_at_mut(a);
        (&mut hi[0], &mut lo[b])
    }
}

fn overlaps_existing(existing: &[Particle], x: f64, y: f64, radius: f64) -> bool {
    existing.iter().any(|p| {
        let dx = x - p.x;
        let dy = y - p.y;
        let sigma = radius + p.radius;
        dx * dx + dy * dy < sigma * sigma
    })
}
