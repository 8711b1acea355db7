use crate::error::{Error, Result};

/// Conversion factors between box-space quantities and physical (SI) units.
///
/// The simulation itself runs entirely in box-space units; these factors are
/// only applied by the instrumentation layer when reporting energies,
/// temperatures and pressures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Units {
    /// Metres per second per box-space unit of speed.
    pub speed: f64,
    /// Metres per box-space unit of distance.
    pub distance: f64,
    /// Kilograms per particle mass unit (argon-like by default).
    pub mass: f64,
    /// Boltzmann constant, J/K.
    pub boltzmann: f64,
}

impl Default for Units {
    fn default() -> Self {
        Self {
            speed: 1000.0,
            distance: 188e-12,
            mass: 6.633_520_9e-26,
            boltzmann: 1.380_650_3e-23,
        }
    }
}

/// Full configuration of a simulation instance.
///
/// Every tunable the engine needs is carried here and plumbed through
/// constructors, so several instances with different parameters can coexist
/// in one process.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Centre of the square box in box-space coordinates.
    pub box_center: (f64, f64),
    /// Initial edge length of the box.
    pub side: f64,
    /// Bounds the side may reach under wall motion; hitting either bound
    /// stops the walls.
    pub side_limits: (f64, f64),
    /// Initial outward speed of each wall face. The side grows at twice
    /// this rate; negative values contract the box.
    pub wall_speed: f64,
    /// Restitution coefficient in (0, 1]; 1.0 is fully elastic.
    pub friction: f64,
    /// Frame events per unit of simulation time.
    pub hz: f64,
    /// Position clamp tolerance absorbing floating-point drift against
    /// moving walls.
    pub position_tolerance: f64,
    /// Base bin width of the velocity histogram, in box-space speed units.
    pub histogram_bin_width: f64,
    /// Physical unit conversions for derived quantities.
    pub units: Units,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            box_center: (0.5, 0.5),
            side: 1.0,
            side_limits: (0.1, 1.0),
            wall_speed: 0.0,
            friction: 0.99,
            hz: 25.0,
            position_tolerance: 1e-3,
            histogram_bin_width: 0.01,
            units: Units::default(),
        }
    }
}

impl SimConfig {
    /// Check that the configuration is internally consistent.
    pub fn validate(&self) -> Result<()> {
        if !self.side.is_finite() || self.side <= 0.0 {
            return Err(Error::InvalidParam("side must be finite and > 0".into()));
        }
        let (lo, hi) = self.side_limits;
        if !(lo.is_finite() && hi.is_finite()) || lo <= 0.0 || lo > hi {
            return Err(Error::InvalidParam(
                "side_limits must be finite with 0 < min <= max".into(),
            ));
        }
        if self.side < lo || self.side > hi {
            return Err(Error::InvalidParam(
                "side must lie within side_limits".into(),
            ));
        }
        if !self.wall_speed.is_finite() {
            return Err(Error::InvalidParam("wall_speed must be finite".into()));
        }
        if !self.friction.is_finite() || self.friction <= 0.0 || self.friction > 1.0 {
            return Err(Error::InvalidParam(
                "friction must lie in (0, 1]".into(),
            ));
        }
        if !self.hz.is_finite() || self.hz <= 0.0 {
            return Err(Error::InvalidParam("hz must be finite and > 0".into()));
        }
        if !self.position_tolerance.is_finite() || self.position_tolerance <= 0.0 {
            return Err(Error::InvalidParam(
                "position_tolerance must be finite and > 0".into(),
            ));
        }
        if !self.histogram_bin_width.is_finite() || self.histogram_bin_width <= 0.0 {
            return Err(Error::InvalidParam(
                "histogram_bin_width must be finite and > 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() -> Result<()> {
        SimConfig::default().validate()
    }

    #[test]
    fn zero_friction_rejected() {
        let cfg = SimConfig {
            friction: 0.0,
            ..SimConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("friction"));
    }

    #[test]
    fn friction_above_one_rejected() {
        let cfg = SimConfig {
            friction: 1.5,
            ..SimConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn side_outside_limits_rejected() {
        let cfg = SimConfig {
            side: 2.0,
            side_limits: (0.1, 1.0),
            ..SimConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("side"));
    }

    #[test]
    fn default_units_are_argon_like() {
        let u = Units::default();
        assert!((u.mass - 6.6335209e-26).abs() < 1e-32);
        assert!((u.boltzmann - 1.3806503e-23).abs() < 1e-29);
    }
}
