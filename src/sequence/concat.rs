use tracing::debug;

use super::{Cursor, Position, Sequence, AUX_ATTRIBUTES};
use crate::{Attributes, Context, Diagnostics, Error, PrepareErrorKind, PrepareMode, SampleMatrix};

pub const ATTRIBUTES: &[&str] = &["Repetitions", "Duration", "Aux1", "Aux2", "Aux3"];

/// Upper bound of `Repetitions`.
pub const MAX_REPETITIONS: usize = u32::MAX as usize;

/// Plays its children in order, `repetitions` times.
#[derive(Debug, Clone)]
pub struct ConcatSequence {
    name: String,
    attributes: Attributes,
    children: Vec<Sequence>,
    repetitions: usize,
    /// Time point and ADC counts of the whole group, set by `prepare`
    num_tpois: usize,
    num_adcs: usize,
}

impl ConcatSequence {
    pub fn new(name: &str, children: Vec<Sequence>) -> Self {
        Self::with_attributes(name, Attributes::new(ATTRIBUTES), children)
    }

    pub fn with_attributes(name: &str, attributes: Attributes, children: Vec<Sequence>) -> Self {
        Self {
            name: name.to_owned(),
            attributes,
            children,
            repetitions: 1,
            num_tpois: 0,
            num_adcs: 0,
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

    pub fn children(&self) -> &[Sequence] {
        &self.children
    }

    pub(super) fn children_mut(&mut self) -> &mut [Sequence] {
        &mut self.children
    }

    pub fn repetitions(&self) -> usize {
        self.repetitions
    }

    pub fn duration(&self) -> f64 {
        self.repetitions as f64 * self.children.iter().map(Sequence::duration).sum::<f64>()
    }

    /// Only valid after a successful `prepare`.
    pub fn num_tpois(&self) -> usize {
        self.num_tpois
    }

    /// Only valid after a successful `prepare`.
    pub fn num_adcs(&self) -> usize {
        self.num_adcs
    }

    /// `repetitions` times the sum of `count` over the children, `None` on
    /// overflow.
    fn repeated_count(&self, count: fn(&Sequence) -> usize) -> Option<usize> {
        self.children
            .iter()
            .try_fold(0usize, |sum, child| sum.checked_add(count(child)))?
            .checked_mul(self.repetitions)
    }

    /// Prepares all children, also after one of them failed.
    pub(crate) fn prepare(&mut self, pos: Position, ctx: &Context, diag: &mut Diagnostics) -> bool {
        let repetitions = self.attributes.declare("Repetitions", 1.0);
        for aux in AUX_ATTRIBUTES {
            self.attributes.declare(aux, 0.0);
        }

        let mut ok = true;
        if repetitions >= 0.0
            && repetitions.fract() == 0.0
            && repetitions <= MAX_REPETITIONS as f64
        {
            self.repetitions = repetitions as usize;
        } else {
            diag.report(
                &self.name,
                PrepareErrorKind::InvalidAttribute {
                    attribute: "Repetitions",
                    value: repetitions,
                },
            );
            ok = false;
        }

        for child in &mut self.children {
            let child_ok = child.prepare(pos.child(), ctx, diag);
            debug!(
                "{} (depth {}) prepared {}: {child_ok}",
                self.name,
                pos.depth(),
                child.name()
            );
            ok &= child_ok;
        }

        match (
            self.repeated_count(Sequence::num_tpois),
            self.repeated_count(Sequence::num_adcs),
        ) {
            (Some(num_tpois), Some(num_adcs)) => {
                self.num_tpois = num_tpois;
                self.num_adcs = num_adcs;
            }
            _ => {
                self.num_tpois = 0;
                self.num_adcs = 0;
                diag.report(
                    &self.name,
                    PrepareErrorKind::TooManyTimePoints {
                        repetitions: self.repetitions,
                    },
                );
                ok = false;
            }
        }

        if diag.mode() != PrepareMode::Update {
            self.attributes.hide("Duration");
        }
        self.attributes.set_derived("Duration", self.duration());
        ok
    }

    pub(crate) fn collect_seq_data(&self, matrix: &mut SampleMatrix, cursor: &mut Cursor) {
        for _ in 0..self.repetitions {
            for child in &self.children {
                child.collect_seq_data(matrix, cursor);
            }
        }
    }

    pub fn info(&self) -> String {
        format!(
            "ConcatSequence {}: repetitions = {}, duration = {}",
            self.name,
            self.repetitions,
            self.duration()
        )
    }
}
