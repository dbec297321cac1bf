use super::PulseCommon;
use crate::{Attributes, Context, Diagnostics, Error, PrepareErrorKind, RfPulseSample, Sample};

pub const EMPTY_ATTRIBUTES: &[&str] = &["Duration", "ADCs", "PhaseLock"];

pub const HARD_RF_ATTRIBUTES: &[&str] = &[
    "FlipAngle",
    "InitialPhase",
    "Duration",
    "ADCs",
    "PhaseLock",
    "Amplitude",
];

/// A pulse without any waveform: a delay, or a readout window when it
/// carries ADCs.
#[derive(Debug, Clone)]
pub struct EmptyPulse {
    common: PulseCommon,
}

impl EmptyPulse {
    pub fn new(name: &str) -> Self {
        Self::with_attributes(name, Attributes::new(EMPTY_ATTRIBUTES))
    }

    pub fn with_attributes(name: &str, attributes: Attributes) -> Self {
        Self {
            common: PulseCommon::new(name, attributes),
        }
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

    pub fn prepare(&mut self, ctx: &Context, diag: &mut Diagnostics) -> bool {
        if !self.common.prepare(diag) {
            return false;
        }
        let Some(duration) = self.common.declared_duration(diag) else {
            return false;
        };
        self.common.duration = duration;
        self.common.set_tpois(ctx);
        true
    }
}

/// Rectangular RF pulse: constant B1 amplitude and phase over its duration.
#[derive(Debug, Clone)]
pub struct HardRfPulse {
    common: PulseCommon,
    /// Unit: `rad / ms`
    amplitude: f64,
    /// Unit: `rad`
    phase: f64,
}

impl HardRfPulse {
    pub fn new(name: &str) -> Self {
        Self::with_attributes(name, Attributes::new(HARD_RF_ATTRIBUTES))
    }

    pub fn with_attributes(name: &str, attributes: Attributes) -> Self {
        Self {
            common: PulseCommon::new(name, attributes),
            amplitude: 0.0,
            phase: 0.0,
        }
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

    /// Flip angle and initial phase are given in degrees, the B1 amplitude
    /// follows from the flip angle spread over the whole duration.
    pub fn prepare(&mut self, ctx: &Context, diag: &mut Diagnostics) -> bool {
        let attributes = &mut self.common.attributes;
        let flip_angle = attributes.declare("FlipAngle", 90.0);
        let initial_phase = attributes.declare("InitialPhase", 0.0);
        attributes.hide("Amplitude");

        if !self.common.prepare(diag) {
            return false;
        }
        let Some(duration) = self.common.declared_duration(diag) else {
            return false;
        };
        if duration <= 0.0 {
            diag.report(
                &self.common.name,
                PrepareErrorKind::InvalidAttribute {
                    attribute: "Duration",
                    value: duration,
                },
            );
            return false;
        }

        self.amplitude = flip_angle.to_radians() / duration;
        self.phase = initial_phase.to_radians();
        self.common.duration = duration;
        self.common.attributes.set_derived("Amplitude", self.amplitude);
        self.common.set_tpois(ctx);
        true
    }

    pub fn sample(&self, time: f64) -> Sample {
        if !(0.0..=self.common.duration).contains(&time) {
            return Sample::default();
        }
        Sample {
            pulse: RfPulseSample {
                amplitude: self.amplitude,
                phase: self.phase,
            },
            ..Sample::default()
        }
    }

    pub(super) fn info(&self) -> String {
        format!(
            ", FlipAngle = {}, Phase = {}",
            (self.amplitude * self.common.duration).to_degrees(),
            self.phase.to_degrees()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PrepareMode, TIME_ERR_TOL};
    use assert2::{check, let_assert};
    use std::f64::consts::{FRAC_PI_2, TAU};

    #[test]
    fn empty_pulse_readout_window() {
        let mut pulse = EmptyPulse::new("ADC");
        pulse.set_attribute("Duration", 4.0).unwrap();
        pulse.set_attribute("ADCs", 3.0).unwrap();
        let mut diag = Diagnostics::new(PrepareMode::Strict);
        check!(pulse.prepare(&Context::default(), &mut diag));

        let times: Vec<f64> = pulse.common.tpois.iter().map(|p| p.time).collect();
        check!(times == vec![TIME_ERR_TOL, 1.0, 2.0, 3.0, 4.0 - TIME_ERR_TOL]);
        check!(pulse.common.tpois.num_adcs() == 3);
    }

    #[test]
    fn adc_phase_is_wrapped() {
        let mut pulse = EmptyPulse::new("ADC");
        pulse.set_attribute("Duration", 4.0).unwrap();
        pulse.set_attribute("ADCs", 1.0).unwrap();
        pulse.set_attribute("PhaseLock", 1.0).unwrap();

        for (phase_lock, expected) in [(-FRAC_PI_2, 3.0 * FRAC_PI_2), (7.0, 7.0 - TAU)] {
            let ctx = Context {
                phase_lock,
                ..Context::default()
            };
            let mut diag = Diagnostics::new(PrepareMode::Strict);
            check!(pulse.prepare(&ctx, &mut diag));
            let_assert!(Some(adc) = pulse.common.tpois.iter().find(|p| p.is_adc()));
            check!((adc.phase - expected).abs() < 1e-12);
            check!(pulse.common.tpois.num_adcs() == 1);
        }
    }

    #[test]
    fn empty_pulse_rejects_negative_duration() {
        let mut pulse = EmptyPulse::new("D");
        pulse.set_attribute("Duration", -1.0).unwrap();
        let mut diag = Diagnostics::new(PrepareMode::Strict);
        check!(!pulse.prepare(&Context::default(), &mut diag));
        check!(diag.errors().len() == 1);
    }

    #[test]
    fn hard_rf_flip_angle() {
        let mut pulse = HardRfPulse::new("RF");
        pulse.set_attribute("Duration", 0.5).unwrap();
        pulse.set_attribute("InitialPhase", 180.0).unwrap();
        let mut diag = Diagnostics::new(PrepareMode::Strict);
        check!(pulse.prepare(&Context::default(), &mut diag));

        let sample = pulse.sample(0.25);
        check!((sample.pulse.amplitude * 0.5 - FRAC_PI_2).abs() < 1e-12);
        check!((sample.pulse.phase - std::f64::consts::PI).abs() < 1e-12);
        check!(sample.gradient.x == 0.0);
        check!(pulse.sample(0.6) == Sample::default());
        check!(pulse.common.attributes.is_hidden("Amplitude"));
        check!(pulse.set_attribute("Amplitude", 1.0).is_err());
    }

    #[test]
    fn hard_rf_needs_duration() {
        let mut pulse = HardRfPulse::new("RF");
        let mut diag = Diagnostics::new(PrepareMode::Strict);
        check!(!pulse.prepare(&Context::default(), &mut diag));
        check!(
            diag.errors()[0].kind
                == PrepareErrorKind::InvalidAttribute {
                    attribute: "Duration",
                    value: 0.0
                }
        );
    }
}
