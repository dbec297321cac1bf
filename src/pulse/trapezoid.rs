//! Trapezoidal gradient shapes: the constraint solver that turns a target area
//! plus hardware limits into ramp and flat top timings, and the piecewise
//! evaluation of the solved shape.

use thiserror::Error;

/// Slopes steeper than this describe an idealized constant gradient. The ramp
/// times are still computed and counted in the duration, but the waveform
/// jumps to its amplitude immediately. Unit: `mT / m / ms`
pub const CONSTANT_GRADIENT_SLEW: f64 = 999.9;

/// Relative tolerance when comparing requested against minimal timings.
const SOLVER_TOL: f64 = 1e-12;

/// Hardware limits a trapezoid has to respect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradLimits {
    /// Must be positive. Unit: `mT / m`
    pub max_ampl: f64,
    /// Must be positive. Unit: `mT / m / ms`
    pub slew_rate: f64,
    /// Ramp asymmetry: a positive value scales the ramp up slope, a negative
    /// value scales the ramp down slope by its magnitude, zero is symmetric.
    pub asymmetry: f64,
}

impl GradLimits {
    /// Ramp up and ramp down slopes of a trapezoid with the given area sign.
    pub fn slopes(&self, sign: f64) -> (f64, f64) {
        let mut slope_up = sign * self.slew_rate;
        let mut slope_dn = -sign * self.slew_rate;
        if self.asymmetry > 0.0 {
            slope_up *= self.asymmetry;
        }
        if self.asymmetry < 0.0 {
            slope_dn *= self.asymmetry.abs();
        }
        (slope_up, slope_dn)
    }

    /// Combined ramp time constant `dC`: the area covered by both ramps of a
    /// trapezoid with amplitude `G` is `G² · dC`.
    pub fn ramp_constant(&self) -> f64 {
        let (slope_up, slope_dn) = self.slopes(1.0);
        ramp_constant(slope_up, slope_dn)
    }

    fn with_max_ampl(&self, max_ampl: f64) -> Self {
        Self { max_ampl, ..*self }
    }
}

fn ramp_constant(slope_up: f64, slope_dn: f64) -> f64 {
    1.0 / (2.0 * slope_up).abs() + 1.0 / (2.0 * slope_dn).abs()
}

/// The mutually exclusive ways a trapezoid can be constrained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constraint {
    /// Shortest possible trapezoid with the given area. Unit: `mT / m * ms`
    FreeArea { area: f64 },
    /// Trapezoid with the given area that lasts exactly `duration`.
    FixedDuration { area: f64, duration: f64 },
    /// Trapezoid whose flat top covers `flat_top_area` in exactly
    /// `flat_top_time`; the ramps add to the total area.
    FixedFlatTop {
        flat_top_area: f64,
        flat_top_time: f64,
    },
}

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum Infeasible {
    #[error("requested duration {requested} is shorter than the minimum of {minimum}")]
    DurationTooShort { requested: f64, minimum: f64 },
    #[error("requested flat top time {requested} is shorter than the minimum of {minimum}")]
    FlatTopTooShort { requested: f64, minimum: f64 },
    #[error("no amplitude covers an area of {area} in {duration}")]
    NegativeDiscriminant { area: f64, duration: f64 },
}

/// A solved trapezoid. All times are relative to the start of the pulse.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct TrapShape {
    /// Signed flat top amplitude. Unit: `mT / m`
    pub amplitude: f64,
    /// Unit: `mT / m / ms`
    pub slope_up: f64,
    /// Unit: `mT / m / ms`
    pub slope_dn: f64,
    /// Unit: `ms`
    pub ramp_up_time: f64,
    /// Unit: `ms`
    pub flat_top_time: f64,
    /// Unit: `ms`
    pub ramp_dn_time: f64,
    /// End of the flat top, `ramp_up_time + flat_top_time`. Unit: `ms`
    pub time_to_ramp_dn: f64,
}

impl TrapShape {
    /// Zero amplitude held for `time`, used when a timing is requested for a
    /// trapezoid without area.
    fn hold(time: f64) -> Self {
        Self {
            flat_top_time: time,
            time_to_ramp_dn: time,
            ..Self::default()
        }
    }

    pub fn duration(&self) -> f64 {
        self.ramp_up_time + self.flat_top_time + self.ramp_dn_time
    }

    /// Signed area of the nominal shape (both ramps as triangles).
    pub fn area(&self) -> f64 {
        self.amplitude * (0.5 * self.ramp_up_time + self.flat_top_time + 0.5 * self.ramp_dn_time)
    }

    /// Area of the flat top alone.
    pub fn flat_top_area(&self) -> f64 {
        self.amplitude * self.flat_top_time
    }

    /// Gradient amplitude at `time` after the start of the pulse.
    pub fn gradient(&self, time: f64) -> f64 {
        if time < self.ramp_up_time {
            if self.slope_up.abs() > CONSTANT_GRADIENT_SLEW {
                self.amplitude
            } else {
                time * self.slope_up
            }
        } else if time < self.time_to_ramp_dn {
            self.amplitude
        } else if self.slope_dn.abs() > CONSTANT_GRADIENT_SLEW {
            self.amplitude
        } else {
            self.amplitude + (time - self.time_to_ramp_dn) * self.slope_dn
        }
    }

    /// Exact integral of `gradient` over `[t_start, t_end]`, both clamped to
    /// the pulse.
    pub fn moment(&self, t_start: f64, t_end: f64) -> f64 {
        self.integral(t_end) - self.integral(t_start)
    }

    fn integral(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, self.duration());
        let ramp_up = |t: f64| {
            if self.slope_up.abs() > CONSTANT_GRADIENT_SLEW {
                self.amplitude * t
            } else {
                0.5 * self.slope_up * t * t
            }
        };

        if t <= self.ramp_up_time {
            ramp_up(t)
        } else if t <= self.time_to_ramp_dn {
            ramp_up(self.ramp_up_time) + self.amplitude * (t - self.ramp_up_time)
        } else {
            let dt = t - self.time_to_ramp_dn;
            let ramp_dn = if self.slope_dn.abs() > CONSTANT_GRADIENT_SLEW {
                self.amplitude * dt
            } else {
                self.amplitude * dt + 0.5 * self.slope_dn * dt * dt
            };
            ramp_up(self.ramp_up_time) + self.amplitude * self.flat_top_time + ramp_dn
        }
    }
}

/// Total area a trapezoid with amplitude `amplitude` must cover so that its
/// flat top covers `flat_top_area`.
pub fn effective_area(flat_top_area: f64, amplitude: f64, ramp_constant: f64) -> f64 {
    if flat_top_area == 0.0 {
        return 0.0;
    }
    flat_top_area * (1.0 + amplitude * amplitude * ramp_constant / flat_top_area.abs())
}

/// Solves a trapezoid for the given limits and constraint. The solver is pure:
/// on failure nothing is returned that could be mistaken for a shape.
pub fn solve(limits: &GradLimits, constraint: Constraint) -> Result<TrapShape, Infeasible> {
    match constraint {
        Constraint::FreeArea { area } => Ok(shortest(limits, area)),
        Constraint::FixedDuration { area, duration } => {
            if area == 0.0 {
                return Ok(TrapShape::hold(duration));
            }

            let fastest = shortest(limits, area);
            let minimum = fastest.duration();
            if duration < minimum - SOLVER_TOL * minimum.max(1.0) {
                return Err(Infeasible::DurationTooShort {
                    requested: duration,
                    minimum,
                });
            }

            // Amplitude G that stretches the shortest trapezoid to `duration`:
            // dC·G² − T·G + |A| = 0, smaller root in its cancellation-free form.
            let dc = ramp_constant(fastest.slope_up, fastest.slope_dn);
            let mut discriminant = duration * duration - 4.0 * area.abs() * dc;
            if discriminant < 0.0 {
                if discriminant < -SOLVER_TOL * duration * duration {
                    return Err(Infeasible::NegativeDiscriminant { area, duration });
                }
                discriminant = 0.0;
            }
            let max_ampl = 2.0 * area.abs() / (duration + discriminant.sqrt());

            Ok(shortest(&limits.with_max_ampl(max_ampl), area))
        }
        Constraint::FixedFlatTop {
            flat_top_area,
            flat_top_time,
        } => {
            if flat_top_area == 0.0 {
                return Ok(TrapShape::hold(flat_top_time));
            }

            let dc = limits.ramp_constant();
            let fastest = shortest(limits, effective_area(flat_top_area, limits.max_ampl, dc));
            let minimum = fastest.flat_top_time;
            if flat_top_time < minimum - SOLVER_TOL * minimum.max(1.0) {
                return Err(Infeasible::FlatTopTooShort {
                    requested: flat_top_time,
                    minimum,
                });
            }

            let amplitude = (flat_top_area / flat_top_time).abs();
            Ok(shortest(
                &limits.with_max_ampl(amplitude),
                effective_area(flat_top_area, amplitude, dc),
            ))
        }
    }
}

/// Trapezoid (or triangle) with the given area in the shortest possible time.
fn shortest(limits: &GradLimits, area: f64) -> TrapShape {
    if area == 0.0 {
        return TrapShape::default();
    }

    let abs_area = area.abs();
    let sign = area.signum();
    let (slope_up, slope_dn) = limits.slopes(sign);
    let dc = ramp_constant(slope_up, slope_dn);
    let max_ampl = limits.max_ampl;

    let (amplitude, flat_top_area) = if abs_area <= max_ampl * max_ampl * dc {
        // triangle, the ramps alone cover the area
        (sign * (abs_area / dc).sqrt(), 0.0)
    } else {
        (sign * max_ampl, sign * (abs_area - max_ampl * max_ampl * dc))
    };

    let ramp_up_time = (amplitude / slope_up).abs();
    let ramp_dn_time = (amplitude / slope_dn).abs();
    let flat_top_time = (flat_top_area / amplitude).abs();

    TrapShape {
        amplitude,
        slope_up,
        slope_dn,
        ramp_up_time,
        flat_top_time,
        ramp_dn_time,
        time_to_ramp_dn: ramp_up_time + flat_top_time,
    }
}
