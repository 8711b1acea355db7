//! Derived aggregates reported with each frame snapshot.
//!
//! The engine runs in box-space units; conversions to physical quantities
//! happen here, against the configured [`Units`].

use crate::config::Units;
use crate::core::particle::Particle;
use std::f64::consts::PI;

/// Kinetic energy of one particle in joules.
#[inline]
pub fn physical_kinetic_energy(p: &Particle, units: &Units) -> f64 {
    let speed = units.speed * p.speed();
    0.5 * p.mass * units.mass * speed * speed
}

/// Arithmetic mean kinetic energy over all particles, in joules.
/// Zero for an empty system.
pub fn mean_kinetic_energy(particles: &[Particle], units: &Units) -> f64 {
    if particles.is_empty() {
        return 0.0;
    }
    let total: f64 = particles
        .iter()
        .map(|p| physical_kinetic_energy(p, units))
        .sum();
    total / particles.len() as f64
}

/// Temperature from the mean kinetic energy: T = (2/3) <E_k> / k_B.
#[inline]
pub fn temperature(mean_ke: f64, units: &Units) -> f64 {
    (2.0 / 3.0) * mean_ke / units.boltzmann
}

/// Pressure from the mean kinetic energy over the physical box area:
/// P = (2/3) <E_k> N / A.
pub fn pressure(mean_ke: f64, num_particles: usize, side: f64, units: &Units) -> f64 {
    let edge = side * units.distance;
    (2.0 / 3.0) * mean_ke * num_particles as f64 / (edge * edge)
}

/// Ratio of summed disk area to box area.
pub fn packing_factor(particles: &[Particle], side: f64) -> f64 {
    let disks: f64 = particles.iter().map(|p| PI * p.radius * p.radius).sum();
    disks / (side * side)
}

/// Speed histogram with fixed-width buckets over a dynamic maximum.
#[derive(Debug, Clone, PartialEq)]
pub struct VelocityHistogram {
    /// Bucket width in box-space speed units.
    pub bin_width: f64,
    /// Particle count per bucket; bucket `i` covers
    /// `[i * bin_width, (i + 1) * bin_width)`.
    pub counts: Vec<u32>,
    /// Fastest observed speed.
    pub s_max: f64,
}

impl VelocityHistogram {
    /// Bucket the speeds of `particles` into fixed-width bins reaching the
    /// fastest observed speed. `bin_width` must be > 0.
    pub fn build(particles: &[Particle], bin_width: f64) -> Self {
        let s_max = particles.iter().map(Particle::speed).fold(0.0, f64::max);
        let bins = ((s_max / bin_width).ceil() as usize).max(1);
        let mut counts = vec![0u32; bins];
        for p in particles {
            let bin = ((p.speed() / bin_width) as usize).min(bins - 1);
            counts[bin] += 1;
        }
        Self {
            bin_width,
            counts,
            s_max,
        }
    }

    /// Total number of bucketed samples.
    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }
}

/// Two-dimensional Maxwell-Boltzmann speed density at box-space speed `s`,
/// for a particle of model-unit `mass` in a gas at `temperature` kelvin:
/// f(s) = (m s / k T) exp(-m s^2 / 2 k T), evaluated in physical units.
///
/// Returns zero at non-positive temperature, where the distribution
/// degenerates.
pub fn maxwell_speed_pdf(s: f64, mass: f64, temperature: f64, units: &Units) -> f64 {
    if temperature <= 0.0 {
        return 0.0;
    }
    let m = mass * units.mass;
    let v = s * units.speed;
    let kt = units.boltzmann * temperature;
    (m * v / kt) * (-m * v * v / (2.0 * kt)).exp()
}

/// Successive collision positions of one traced particle.
#[derive(Debug, Clone, Default)]
pub struct Tracer {
    /// Slab index of the traced particle, if any.
    pub target: Option<usize>,
    /// Recorded centre positions, in event order.
    pub points: Vec<(f64, f64)>,
}

impl Tracer {
    /// Trace the particle whose centre lies nearest to `center`.
    pub fn aimed_at_center(particles: &[Particle], center: (f64, f64)) -> Self {
        let target = particles
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                let da = (a.x - center.0).powi(2) + (a.y - center.1).powi(2);
                let db = (b.x - center.0).powi(2) + (b.y - center.1).powi(2);
                da.total_cmp(&db)
            })
            .map(|(i, _)| i);
        Self {
            target,
            points: Vec::new(),
        }
    }

    /// Append the traced particle's position if `idx` references it.
    pub fn record(&mut self, idx: usize, particles: &[Particle]) {
        if self.target == Some(idx) {
            if let Some(p) = particles.get(idx) {
                self.points.push((p.x, p.y));
            }
        }
    }
}
