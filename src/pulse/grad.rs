use super::trapezoid::{effective_area, solve, Constraint, GradLimits, TrapShape};
use super::PulseCommon;
use crate::{
    Attributes, Context, Diagnostics, Error, GradientChannel, GradientSample, PrepareErrorKind,
    PrepareMode, Sample, Tpoi,
};

pub const ATTRIBUTES: &[&str] = &[
    "Area",
    "FlatTopArea",
    "FlatTopTime",
    "Duration",
    "Asymmetric",
    "MaxAmpl",
    "SlewRate",
    "ADCs",
    "PhaseLock",
    "Amplitude",
    "RampUpTime",
    "RampDnTime",
    "EndOfFlatTop",
];

const DERIVED: [&str; 4] = ["Amplitude", "RampUpTime", "RampDnTime", "EndOfFlatTop"];

/// Which of the optional timing and area attributes were given. Only
/// evaluated by a full preparation, `PrepareMode::Update` reuses them.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
struct ConstraintFlags {
    duration: bool,
    flat_top_time: bool,
    flat_top_area: bool,
}

fn constraint_flags(attributes: &Attributes) -> Result<ConstraintFlags, PrepareErrorKind> {
    let flags = ConstraintFlags {
        duration: attributes.has_source("Duration"),
        flat_top_time: attributes.has_source("FlatTopTime"),
        flat_top_area: attributes.has_source("FlatTopArea"),
    };

    if flags.duration && flags.flat_top_time {
        return Err(PrepareErrorKind::ConstraintConflict {
            first: "Duration",
            second: "FlatTopTime",
        });
    }
    if attributes.has_source("Area") && flags.flat_top_area {
        return Err(PrepareErrorKind::ConstraintConflict {
            first: "Area",
            second: "FlatTopArea",
        });
    }
    if flags.flat_top_time && !flags.flat_top_area {
        return Err(PrepareErrorKind::MissingDependentConstraint {
            attribute: "FlatTopTime",
            requires: "FlatTopArea",
        });
    }
    Ok(flags)
}

fn check_positive(attribute: &'static str, value: f64) -> Result<f64, PrepareErrorKind> {
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(PrepareErrorKind::InvalidAttribute { attribute, value })
    }
}

/// Attribute values read at the start of `prepare`.
struct Inputs {
    area: f64,
    flat_top_area: f64,
    flat_top_time: f64,
    duration: f64,
    max_ampl: f64,
    slew_rate: f64,
    asymmetry: f64,
}

/// Trapezoidal gradient pulse on one gradient axis.
#[derive(Debug, Clone)]
pub struct TrapGradPulse {
    common: PulseCommon,
    channel: GradientChannel,
    non_lin_grad: bool,
    flags: ConstraintFlags,
    shape: TrapShape,
}

impl TrapGradPulse {
    pub fn new(name: &str, channel: GradientChannel) -> Self {
        Self::with_attributes(name, channel, Attributes::new(ATTRIBUTES))
    }

    pub fn with_attributes(name: &str, channel: GradientChannel, attributes: Attributes) -> Self {
        Self {
            common: PulseCommon::new(name, attributes),
            channel,
            non_lin_grad: false,
            flags: ConstraintFlags::default(),
            shape: TrapShape::default(),
        }
    }

    /// Marks the gradient as spatially nonlinear.
    pub fn with_non_lin_grad(mut self, non_lin_grad: bool) -> Self {
        self.non_lin_grad = non_lin_grad;
        self
    }

    pub(super) fn common(&self) -> &PulseCommon {
        &self.common
    }

    pub(super) fn common_mut(&mut self) -> &mut PulseCommon {
        &mut self.common
    }

    pub fn set_attribute(&mut self, name: &str, value: f64) -> Result<(), Error> {
        self.common.set_attribute(name, value)
    }

    pub fn channel(&self) -> GradientChannel {
        self.channel
    }

    pub fn non_lin_grad(&self) -> bool {
        self.non_lin_grad
    }

    /// Only valid after a successful `prepare`.
    pub fn shape(&self) -> &TrapShape {
        &self.shape
    }

    pub fn duration(&self) -> f64 {
        self.common.duration
    }

    pub fn tpois(&self) -> &crate::TpoiSet {
        &self.common.tpois
    }

    /// Validates the constraints, solves the trapezoid and places the time
    /// points of interest. On failure the previous shape is kept.
    pub fn prepare(&mut self, ctx: &Context, diag: &mut Diagnostics) -> bool {
        let attributes = &mut self.common.attributes;
        let inputs = Inputs {
            area: attributes.declare("Area", 0.0),
            flat_top_area: attributes.declare("FlatTopArea", 0.0),
            flat_top_time: attributes.declare("FlatTopTime", 0.0),
            duration: attributes.declare("Duration", 0.0),
            max_ampl: attributes.declare("MaxAmpl", ctx.grad_max_ampl),
            slew_rate: attributes.declare("SlewRate", ctx.grad_slew_rate),
            asymmetry: attributes.declare("Asymmetric", 0.0),
        };
        for name in DERIVED {
            attributes.hide(name);
        }

        if diag.mode() != PrepareMode::Update {
            match constraint_flags(attributes) {
                Ok(flags) => self.flags = flags,
                Err(kind) => {
                    diag.report(&self.common.name, kind);
                    return false;
                }
            }
        }

        if !self.common.prepare(diag) {
            return false;
        }

        let shape = self.constraint(&inputs).and_then(|(limits, constraint)| {
            solve(&limits, constraint).map_err(PrepareErrorKind::from)
        });
        match shape {
            Ok(shape) => self.shape = shape,
            Err(kind) => {
                diag.report(&self.common.name, kind);
                return false;
            }
        }

        self.common.duration = self.shape.duration();
        let attributes = &mut self.common.attributes;
        attributes.set_derived("Amplitude", self.shape.amplitude);
        attributes.set_derived("RampUpTime", self.shape.ramp_up_time);
        attributes.set_derived("RampDnTime", self.shape.ramp_dn_time);
        attributes.set_derived("EndOfFlatTop", self.shape.time_to_ramp_dn);
        if !self.flags.duration {
            attributes.set_derived("Duration", self.shape.duration());
        }
        if !self.flags.flat_top_time {
            attributes.set_derived("FlatTopTime", self.shape.flat_top_time);
        }
        if self.flags.flat_top_area {
            attributes.set_derived("Area", self.shape.area());
        }

        self.set_tpois(ctx);
        true
    }

    /// Picks the solver mode from the constraint flags.
    fn constraint(&self, inputs: &Inputs) -> Result<(GradLimits, Constraint), PrepareErrorKind> {
        let limits = GradLimits {
            max_ampl: check_positive("MaxAmpl", inputs.max_ampl)?,
            slew_rate: check_positive("SlewRate", inputs.slew_rate)?,
            asymmetry: inputs.asymmetry,
        };
        let area = if self.flags.flat_top_area {
            effective_area(inputs.flat_top_area, limits.max_ampl, limits.ramp_constant())
        } else {
            inputs.area
        };

        let constraint = if self.flags.duration {
            if !(inputs.duration >= 0.0 && inputs.duration.is_finite()) {
                return Err(PrepareErrorKind::InvalidAttribute {
                    attribute: "Duration",
                    value: inputs.duration,
                });
            }
            Constraint::FixedDuration {
                area,
                duration: inputs.duration,
            }
        } else if self.flags.flat_top_time {
            Constraint::FixedFlatTop {
                flat_top_area: inputs.flat_top_area,
                flat_top_time: check_positive("FlatTopTime", inputs.flat_top_time)?,
            }
        } else {
            Constraint::FreeArea { area }
        };
        Ok((limits, constraint))
    }

    /// With a fixed flat top time the ADCs are restricted to the flat top,
    /// otherwise they are spread over the whole pulse. The corners of the
    /// trapezoid are always marked.
    fn set_tpois(&mut self, ctx: &Context) {
        let shape = self.shape;
        if self.flags.flat_top_time {
            let phase = self.common.adc_phase(ctx);
            self.common.tpois.reset();
            self.common.set_boundaries();

            let adcs = self.common.adcs;
            let step = shape.flat_top_time / (adcs + 1) as f64;
            for i in 0..adcs {
                let time = shape.ramp_up_time + (i + 1) as f64 * step;
                self.common.tpois.insert(Tpoi::adc(time, phase));
            }
        } else {
            self.common.set_tpois(ctx);
        }

        self.common.tpois.insert(Tpoi::marker(shape.ramp_up_time));
        self.common.tpois.insert(Tpoi::marker(shape.time_to_ramp_dn));
    }

    /// Gradient amplitude at `time` after the start of the pulse.
    pub fn gradient(&self, time: f64) -> f64 {
        self.shape.gradient(time)
    }

    pub fn sample(&self, time: f64, non_lin_grad: bool) -> Sample {
        if non_lin_grad {
            return Sample::default();
        }
        Sample {
            gradient: GradientSample::on(self.channel, self.gradient(time)),
            ..Sample::default()
        }
    }

    pub(super) fn info(&self) -> String {
        let mut info = format!(", Area = {}", self.shape.area());
        if self.flags.flat_top_time {
            info.push_str(&format!(
                " , FlatTop: (Area,time)= ({},{})",
                self.shape.flat_top_area(),
                self.shape.flat_top_time
            ));
        }
        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Infeasible, TIME_ERR_TOL};
    use assert2::{check, let_assert};

    fn ctx() -> Context {
        Context {
            phase_lock: 0.75,
            grad_max_ampl: 2.0,
            grad_slew_rate: 100.0,
        }
    }

    fn pulse(attributes: &[(&str, f64)]) -> TrapGradPulse {
        let mut pulse = TrapGradPulse::new("G", GradientChannel::Y);
        for &(name, value) in attributes {
            pulse.set_attribute(name, value).unwrap();
        }
        pulse
    }

    #[test]
    fn free_area() {
        let mut pulse = pulse(&[("Area", 10.0), ("ADCs", 3.0)]);
        let mut diag = Diagnostics::new(PrepareMode::Strict);
        check!(pulse.prepare(&ctx(), &mut diag));
        check!((pulse.duration() - 5.02).abs() < 1e-12);
        check!(pulse.common.attributes.get("Amplitude") == Some(2.0));
        check!(pulse.common.attributes.is_hidden("RampUpTime"));

        // boundaries, 3 ADCs over the whole pulse and two corners
        check!(pulse.tpois().len() == 7);
        check!(pulse.tpois().num_adcs() == 3);
        let_assert!(Some(first_adc) = pulse.tpois().iter().find(|p| p.is_adc()));
        check!((first_adc.time - 5.02 / 4.0).abs() < 1e-12);
        check!(first_adc.phase == 0.0);

        let sample = pulse.sample(1.0, false);
        check!(sample.gradient.y == 2.0);
        check!(sample.gradient.x == 0.0);
        check!(pulse.sample(1.0, true) == Sample::default());
    }

    #[test]
    fn adcs_on_flat_top() {
        let n = 5;
        let mut pulse = pulse(&[
            ("FlatTopArea", 4.0),
            ("FlatTopTime", 4.0),
            ("ADCs", n as f64),
            ("PhaseLock", 1.0),
        ]);
        let mut diag = Diagnostics::new(PrepareMode::Strict);
        check!(pulse.prepare(&ctx(), &mut diag));

        let shape = *pulse.shape();
        check!((shape.amplitude - 1.0).abs() < 1e-12);
        check!((shape.flat_top_time - 4.0).abs() < 1e-12);

        let (adcs, markers): (Vec<Tpoi>, Vec<Tpoi>) =
            pulse.tpois().iter().copied().partition(|p| p.is_adc());
        check!(adcs.len() == n);
        for (i, adc) in adcs.iter().enumerate() {
            check!(adc.time > shape.ramp_up_time);
            check!(adc.time < shape.time_to_ramp_dn);
            let spacing = shape.flat_top_time / (n + 1) as f64;
            let expected = shape.ramp_up_time + (i + 1) as f64 * spacing;
            check!((adc.time - expected).abs() < 1e-12);
            check!(adc.phase == 0.75);
        }

        check!(markers.len() == 4);
        check!(markers[0].time == TIME_ERR_TOL);
        check!(markers[1].time == shape.ramp_up_time);
        check!(markers[2].time == shape.time_to_ramp_dn);
        check!((markers[3].time - (pulse.duration() - TIME_ERR_TOL)).abs() < 1e-12);

        let times: Vec<f64> = pulse.tpois().iter().map(|p| p.time).collect();
        check!(times.windows(2).all(|t| t[0] < t[1]));
    }

    #[test]
    fn flat_top_area_alone() {
        let mut pulse = pulse(&[("FlatTopArea", -3.0)]);
        let mut diag = Diagnostics::new(PrepareMode::Strict);
        check!(pulse.prepare(&ctx(), &mut diag));
        check!((pulse.shape().flat_top_area() + 3.0).abs() < 1e-12);
        check!(pulse.shape().amplitude == -2.0);
        let_assert!(Some(area) = pulse.common.attributes.get("Area"));
        check!((area + 3.04).abs() < 1e-12);
    }

    #[test]
    fn fixed_duration() {
        let mut pulse = pulse(&[("Area", 10.0), ("Duration", 8.0)]);
        let mut diag = Diagnostics::new(PrepareMode::Strict);
        check!(pulse.prepare(&ctx(), &mut diag));
        check!((pulse.duration() - 8.0).abs() < 1e-9);
        check!(pulse.shape().amplitude < 2.0);
    }

    #[test]
    fn constraint_conflicts() {
        let cases: [(&[(&str, f64)], PrepareErrorKind); 3] = [
            (
                &[("Area", 1.0), ("Duration", 2.0), ("FlatTopTime", 1.0), ("FlatTopArea", 1.0)],
                PrepareErrorKind::ConstraintConflict {
                    first: "Duration",
                    second: "FlatTopTime",
                },
            ),
            (
                &[("Area", 1.0), ("FlatTopArea", 1.0)],
                PrepareErrorKind::ConstraintConflict {
                    first: "Area",
                    second: "FlatTopArea",
                },
            ),
            (
                &[("Area", 1.0), ("FlatTopTime", 1.0)],
                PrepareErrorKind::MissingDependentConstraint {
                    attribute: "FlatTopTime",
                    requires: "FlatTopArea",
                },
            ),
        ];

        for (attributes, expected) in cases {
            let mut pulse = pulse(attributes);
            let mut diag = Diagnostics::new(PrepareMode::Verbose);
            check!(!pulse.prepare(&ctx(), &mut diag));
            check!(diag.errors().len() == 1);
            check!(diag.errors()[0].kind == expected);
            check!(diag.errors()[0].node == "G");
        }
    }

    #[test]
    fn infeasible_keeps_previous_shape() {
        let mut pulse = pulse(&[("Area", 10.0)]);
        let mut diag = Diagnostics::new(PrepareMode::Strict);
        check!(pulse.prepare(&ctx(), &mut diag));
        let before = *pulse.shape();

        pulse.set_attribute("Duration", 1.0).unwrap();
        check!(!pulse.prepare(&ctx(), &mut diag));
        let_assert!([error] = diag.errors());
        check!(matches!(
            error.kind,
            PrepareErrorKind::Infeasible(Infeasible::DurationTooShort { .. })
        ));
        check!(*pulse.shape() == before);
    }

    #[test]
    fn update_reuses_constraint_checks() {
        let mut pulse = pulse(&[("Area", 10.0)]);
        let mut diag = Diagnostics::new(PrepareMode::Strict);
        check!(pulse.prepare(&ctx(), &mut diag));

        // conflicting attributes are not re-validated by an update
        pulse.set_attribute("FlatTopArea", 1.0).unwrap();
        pulse.set_attribute("Area", 20.0).unwrap();
        let mut diag = Diagnostics::new(PrepareMode::Update);
        check!(pulse.prepare(&ctx(), &mut diag));
        check!((pulse.shape().area() - 20.0).abs() < 1e-9);

        let mut diag = Diagnostics::new(PrepareMode::Strict);
        check!(!pulse.prepare(&ctx(), &mut diag));
    }

    #[test]
    fn invalid_limits() {
        let mut pulse = pulse(&[("Area", 1.0), ("SlewRate", 0.0)]);
        let mut diag = Diagnostics::new(PrepareMode::Strict);
        check!(!pulse.prepare(&ctx(), &mut diag));
        check!(
            diag.errors()[0].kind
                == PrepareErrorKind::InvalidAttribute {
                    attribute: "SlewRate",
                    value: 0.0
                }
        );
    }
}
