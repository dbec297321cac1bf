use std::cell::Cell;

use super::{Cursor, AUX_ATTRIBUTES};
use crate::{
    Attributes, Context, Diagnostics, Error, GradientSample, PrepareMode, Pulse, Sample,
    SampleMatrix,
};

pub const ATTRIBUTES: &[&str] = &["Duration", "Aux1", "Aux2", "Aux3"];

/// Leaf of the sequence tree: a single pulse with its time points.
#[derive(Debug, Clone)]
pub struct AtomicSequence {
    name: String,
    attributes: Attributes,
    pulse: Pulse,
    non_lin_grad: Cell<bool>,
}

impl AtomicSequence {
    pub fn new(name: &str, pulse: Pulse) -> Self {
        Self::with_attributes(name, Attributes::new(ATTRIBUTES), pulse)
    }

    pub fn with_attributes(name: &str, attributes: Attributes, pulse: Pulse) -> Self {
        let non_lin_grad = Cell::new(pulse.has_non_lin_grad());
        Self {
            name: name.to_owned(),
            attributes,
            pulse,
            non_lin_grad,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn set_attribute(&mut self, name: &str, value: f64) -> Result<(), Error> {
        self.attributes.set(&self.name, name, value)
    }

    pub fn pulse(&self) -> &Pulse {
        &self.pulse
    }

    pub fn pulse_mut(&mut self) -> &mut Pulse {
        &mut self.pulse
    }

    pub fn has_non_lin_grad(&self) -> bool {
        self.non_lin_grad.get()
    }

    pub fn set_non_lin_grad(&self, non_lin_grad: bool) {
        self.non_lin_grad.set(non_lin_grad);
    }

    pub fn duration(&self) -> f64 {
        self.pulse.duration()
    }

    pub fn num_tpois(&self) -> usize {
        self.pulse.tpois().len()
    }

    pub fn num_adcs(&self) -> usize {
        self.pulse.tpois().num_adcs()
    }

    pub(crate) fn prepare(&mut self, ctx: &Context, diag: &mut Diagnostics) -> bool {
        for aux in AUX_ATTRIBUTES {
            self.attributes.declare(aux, 0.0);
        }
        let ok = self.pulse.prepare(ctx, diag);

        if diag.mode() != PrepareMode::Update {
            self.attributes.hide("Duration");
        }
        self.attributes.set_derived("Duration", self.pulse.duration());
        ok
    }

    /// Waveform values at `time` after the start of the block.
    pub fn sample(&self, time: f64) -> Sample {
        self.pulse.sample(time, self.non_lin_grad.get())
    }

    pub fn gradient(&self, time: f64) -> GradientSample {
        self.sample(time).gradient
    }

    /// Writes one row per time point, then moves the cursor past this block.
    /// Nonlinear gradients are sampled like linear ones while doing so.
    pub(crate) fn collect_seq_data(&self, matrix: &mut SampleMatrix, cursor: &mut Cursor) {
        let _guard = NonLinGradGuard::new(&self.non_lin_grad);
        for (i, tpoi) in self.pulse.tpois().iter().enumerate() {
            let sample = self.sample(tpoi.time);
            matrix.set_row(
                cursor.offset + i + 1,
                cursor.time + tpoi.time,
                tpoi.phase,
                &sample,
            );
        }
        cursor.advance(self.duration(), self.num_tpois());
    }

    pub fn info(&self) -> String {
        format!(
            "AtomicSequence {}: duration = {}, tpois = {}",
            self.name,
            self.duration(),
            self.num_tpois()
        )
    }
}

/// Clears a nonlinear gradient flag for its lifetime and restores the
/// previous value when dropped.
pub struct NonLinGradGuard<'a> {
    flag: &'a Cell<bool>,
    saved: bool,
}

impl<'a> NonLinGradGuard<'a> {
    pub fn new(flag: &'a Cell<bool>) -> Self {
        let saved = flag.replace(false);
        Self { flag, saved }
    }
}

impl Drop for NonLinGradGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(self.saved);
    }
}
