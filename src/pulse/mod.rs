use std::f64::consts::TAU;

use crate::{
    Attributes, Context, Diagnostics, Error, PrepareErrorKind, Sample, Tpoi, TpoiSet, TIME_ERR_TOL,
};

mod grad;
mod rf;
pub mod trapezoid;

pub use grad::TrapGradPulse;
pub use rf::{EmptyPulse, HardRfPulse};

pub(crate) use grad::ATTRIBUTES as TRAP_GRAD_ATTRIBUTES;
pub(crate) use rf::{EMPTY_ATTRIBUTES, HARD_RF_ATTRIBUTES};

/// The pulse owned by an atomic block.
#[derive(Debug, Clone)]
pub enum Pulse {
    TrapGrad(TrapGradPulse),
    HardRf(HardRfPulse),
    Empty(EmptyPulse),
}

impl Pulse {
    fn common(&self) -> &PulseCommon {
        match self {
            Pulse::TrapGrad(p) => p.common(),
            Pulse::HardRf(p) => p.common(),
            Pulse::Empty(p) => p.common(),
        }
    }

    fn common_mut(&mut self) -> &mut PulseCommon {
        match self {
            Pulse::TrapGrad(p) => p.common_mut(),
            Pulse::HardRf(p) => p.common_mut(),
            Pulse::Empty(p) => p.common_mut(),
        }
    }

    pub fn name(&self) -> &str {
        &self.common().name
    }

    /// Only valid after a successful `prepare`. Unit: `ms`
    pub fn duration(&self) -> f64 {
        self.common().duration
    }

    /// Only valid after a successful `prepare`.
    pub fn tpois(&self) -> &TpoiSet {
        &self.common().tpois
    }

    pub fn attributes(&self) -> &Attributes {
        &self.common().attributes
    }

    pub fn set_attribute(&mut self, name: &str, value: f64) -> Result<(), Error> {
        self.common_mut().set_attribute(name, value)
    }

    /// True if the pulse declares spatially nonlinear gradients.
    pub fn has_non_lin_grad(&self) -> bool {
        match self {
            Pulse::TrapGrad(p) => p.non_lin_grad(),
            Pulse::HardRf(_) | Pulse::Empty(_) => false,
        }
    }

    pub fn prepare(&mut self, ctx: &Context, diag: &mut Diagnostics) -> bool {
        let ok = match self {
            Pulse::TrapGrad(p) => p.prepare(ctx, diag),
            Pulse::HardRf(p) => p.prepare(ctx, diag),
            Pulse::Empty(p) => p.prepare(ctx, diag),
        };
        if !ok {
            self.common_mut().tpois.reset();
        }
        ok
    }

    /// Waveform values at `time` after the start of the pulse. Gradients of a
    /// block with nonlinear gradients are evaluated per position by the
    /// simulator and do not show up on the linear gradient axes.
    pub fn sample(&self, time: f64, non_lin_grad: bool) -> Sample {
        match self {
            Pulse::TrapGrad(p) => p.sample(time, non_lin_grad),
            Pulse::HardRf(p) => p.sample(time),
            Pulse::Empty(_) => Sample::default(),
        }
    }

    pub fn info(&self) -> String {
        let common = self.common();
        let (kind, details) = match self {
            Pulse::TrapGrad(p) => ("TrapGradPulse", p.info()),
            Pulse::HardRf(p) => ("HardRfPulse", p.info()),
            Pulse::Empty(_) => ("EmptyPulse", String::new()),
        };
        format!(
            "{kind} {}: duration = {}, ADCs = {}{details}",
            common.name, common.duration, common.adcs
        )
    }
}

/// State and behaviour every pulse shares: name, attributes, duration and the
/// generic placement of time points of interest.
#[derive(Debug, Clone)]
pub struct PulseCommon {
    name: String,
    attributes: Attributes,
    duration: f64,
    adcs: usize,
    phase_lock: bool,
    tpois: TpoiSet,
}

impl PulseCommon {
    pub fn new(name: &str, attributes: Attributes) -> Self {
        Self {
            name: name.to_owned(),
            attributes,
            duration: 0.0,
            adcs: 0,
            phase_lock: false,
            tpois: TpoiSet::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn adcs(&self) -> usize {
        self.adcs
    }

    pub fn tpois(&self) -> &TpoiSet {
        &self.tpois
    }

    pub fn set_attribute(&mut self, name: &str, value: f64) -> Result<(), Error> {
        self.attributes.set(&self.name, name, value)
    }

    /// Reads the attributes shared by all pulses: `ADCs` and `PhaseLock`.
    fn prepare(&mut self, diag: &mut Diagnostics) -> bool {
        let adcs = self.attributes.declare("ADCs", 0.0);
        let phase_lock = self.attributes.declare("PhaseLock", 0.0);

        if !(adcs >= 0.0 && adcs.fract() == 0.0 && adcs.is_finite()) {
            diag.report(
                &self.name,
                PrepareErrorKind::InvalidAttribute {
                    attribute: "ADCs",
                    value: adcs,
                },
            );
            return false;
        }
        self.adcs = adcs as usize;
        self.phase_lock = phase_lock != 0.0;
        true
    }

    /// Reads the `Duration` attribute of pulses that do not derive it.
    fn declared_duration(&mut self, diag: &mut Diagnostics) -> Option<f64> {
        let duration = self.attributes.declare("Duration", 0.0);
        if duration >= 0.0 && duration.is_finite() {
            Some(duration)
        } else {
            diag.report(
                &self.name,
                PrepareErrorKind::InvalidAttribute {
                    attribute: "Duration",
                    value: duration,
                },
            );
            None
        }
    }

    /// Receiver phase of the ADC samples of this pulse.
    fn adc_phase(&self, ctx: &Context) -> f64 {
        if self.phase_lock {
            ctx.phase_lock.rem_euclid(TAU)
        } else {
            0.0
        }
    }

    /// Structural markers just inside both ends of the pulse.
    fn set_boundaries(&mut self) {
        self.tpois.insert(Tpoi::marker(TIME_ERR_TOL));
        self.tpois.insert(Tpoi::marker(self.duration - TIME_ERR_TOL));
    }

    /// Generic placement: boundary markers and the ADCs spread evenly over
    /// the whole pulse.
    pub fn set_tpois(&mut self, ctx: &Context) {
        let phase = self.adc_phase(ctx);
        self.tpois.reset();
        self.set_boundaries();

        let step = self.duration / (self.adcs + 1) as f64;
        for i in 0..self.adcs {
            self.tpois.insert(Tpoi::adc((i + 1) as f64 * step, phase));
        }
    }
}
