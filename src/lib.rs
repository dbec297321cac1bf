//! This crate models an MRI pulse sequence as a tree of building blocks and
//! turns it into sampled waveforms. Repeated groups (`ConcatSequence`) contain
//! other groups or atomic blocks (`AtomicSequence`), each atomic block owns a
//! single pulse. After `SequenceTree::prepare` solved every pulse shape, the
//! tree can be flattened into a sequence diagram: time, receiver phase, RF
//! magnitude and phase and the three gradient axes at every time point of
//! interest, together with the k-space trajectory.
//!
//! Units follow the usual sequence design conventions: time in `ms`, gradient
//! amplitudes in `mT / m`, slew rates in `mT / m / ms` and phases in `rad`.

use serde::Deserialize;

mod attributes;
mod error;
mod export;
mod pulse;
mod sequence;
mod types;
mod util;

pub use attributes::Attributes;
pub use error::{Diagnostics, Error, PrepareError, PrepareErrorKind, PrepareFailure};
pub use export::{DiagramWriter, DirectoryWriter, MemoryWriter, SEQDIAG_GROUP};
pub use pulse::trapezoid::{
    effective_area, solve, Constraint, GradLimits, Infeasible, TrapShape, CONSTANT_GRADIENT_SLEW,
};
pub use pulse::{EmptyPulse, HardRfPulse, Pulse, PulseCommon, TrapGradPulse};
pub use sequence::{
    AtomicDescription, AtomicSequence, ConcatDescription, ConcatSequence, GenericPulseDescription,
    NodeDescription, NonLinGradGuard, PulseDescription, Sequence, SequenceDescription, SequenceTree,
    TrapGradDescription,
};
pub use types::*;
pub use util::cumtrapz;

/// Nesting limit of a sequence tree. Every traversal is recursive, so trees
/// deeper than this are rejected when a `SequenceTree` is built.
pub const MAX_TREE_DEPTH: usize = 64;

/// Selects how much work `prepare` does and whether it talks about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrepareMode {
    /// Validate everything, report failures only through the return value.
    Strict,
    /// Validate everything and log a diagnostic for every failure.
    Verbose,
    /// Re-derive dependent values after attributes changed, reusing the
    /// constraint checks of the last full preparation.
    Update,
}

/// Read-only settings shared by the whole tree. Replaces any kind of global
/// state: it is handed to `prepare` explicitly and never modified by it.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Context {
    /// Receiver phase given to ADC samples of phase locked pulses.
    /// Unit: `rad`
    #[serde(rename = "PhaseLock")]
    pub phase_lock: f64,
    /// Default gradient amplitude limit of every gradient pulse.
    /// Unit: `mT / m`
    #[serde(rename = "GradMaxAmpl")]
    pub grad_max_ampl: f64,
    /// Default gradient slew rate of every gradient pulse.
    /// Unit: `mT / m / ms`
    #[serde(rename = "GradSlewRate")]
    pub grad_slew_rate: f64,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            phase_lock: 0.0,
            grad_max_ampl: 40.0,
            grad_slew_rate: 200.0,
        }
    }
}
