//! Declarative JSON form of a sequence tree.
//!
//! ```json
//! {
//!   "parameters": { "GradMaxAmpl": 2.0, "GradSlewRate": 100.0 },
//!   "sequence": { "ConcatSequence": {
//!     "Name": "C1", "Repetitions": 2,
//!     "Children": [
//!       { "AtomicSequence": { "Name": "A1", "Pulse": { "TrapGradPulse": {
//!         "Name": "P1", "Axis": "GX", "Area": 10.0, "ADCs": 4
//!       } } } }
//!     ]
//!   } }
//! }
//! ```
//!
//! Every numeric key besides the structural ones is an attribute and checked
//! against the attribute list of the node kind.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::{atomic, concat, AtomicSequence, ConcatSequence, Sequence};
use crate::pulse::{EMPTY_ATTRIBUTES, HARD_RF_ATTRIBUTES, TRAP_GRAD_ATTRIBUTES};
use crate::{
    Attributes, Context, EmptyPulse, Error, GradientChannel, HardRfPulse, Pulse, TrapGradPulse,
};

#[derive(Debug, Clone, Deserialize)]
pub struct SequenceDescription {
    #[serde(default)]
    pub parameters: Context,
    pub sequence: NodeDescription,
}

#[derive(Debug, Clone, Deserialize)]
pub enum NodeDescription {
    ConcatSequence(ConcatDescription),
    AtomicSequence(AtomicDescription),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConcatDescription {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Children", default)]
    pub children: Vec<NodeDescription>,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AtomicDescription {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Pulse")]
    pub pulse: PulseDescription,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub enum PulseDescription {
    TrapGradPulse(TrapGradDescription),
    HardRfPulse(GenericPulseDescription),
    EmptyPulse(GenericPulseDescription),
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrapGradDescription {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Axis")]
    pub channel: GradientChannel,
    /// Spatially nonlinear gradient, see `AtomicSequence::has_non_lin_grad`
    #[serde(rename = "NonLinear", default)]
    pub non_lin_grad: bool,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenericPulseDescription {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, f64>,
}

impl NodeDescription {
    pub fn build(self) -> Result<Sequence, Error> {
        Ok(match self {
            NodeDescription::ConcatSequence(desc) => {
                let attributes =
                    Attributes::from_source(concat::ATTRIBUTES, &desc.name, desc.attributes)?;
                let children = desc
                    .children
                    .into_iter()
                    .map(NodeDescription::build)
                    .collect::<Result<Vec<_>, _>>()?;
                ConcatSequence::with_attributes(&desc.name, attributes, children).into()
            }
            NodeDescription::AtomicSequence(desc) => {
                let attributes =
                    Attributes::from_source(atomic::ATTRIBUTES, &desc.name, desc.attributes)?;
                AtomicSequence::with_attributes(&desc.name, attributes, desc.pulse.build()?).into()
            }
        })
    }
}

impl PulseDescription {
    pub fn build(self) -> Result<Pulse, Error> {
        Ok(match self {
            PulseDescription::TrapGradPulse(desc) => {
                let attributes =
                    Attributes::from_source(TRAP_GRAD_ATTRIBUTES, &desc.name, desc.attributes)?;
                Pulse::TrapGrad(
                    TrapGradPulse::with_attributes(&desc.name, desc.channel, attributes)
                        .with_non_lin_grad(desc.non_lin_grad),
                )
            }
            PulseDescription::HardRfPulse(desc) => {
                let attributes =
                    Attributes::from_source(HARD_RF_ATTRIBUTES, &desc.name, desc.attributes)?;
                Pulse::HardRf(HardRfPulse::with_attributes(&desc.name, attributes))
            }
            PulseDescription::EmptyPulse(desc) => {
                let attributes =
                    Attributes::from_source(EMPTY_ATTRIBUTES, &desc.name, desc.attributes)?;
                Pulse::Empty(EmptyPulse::with_attributes(&desc.name, attributes))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};

    #[test]
    fn parse_tree() {
        let json = r#"{
            "parameters": { "GradMaxAmpl": 2.0, "GradSlewRate": 100 },
            "sequence": { "ConcatSequence": {
                "Name": "C1", "Repetitions": 2, "Aux1": 1,
                "Children": [
                    { "AtomicSequence": { "Name": "A1", "Pulse": { "TrapGradPulse": {
                        "Name": "P1", "Axis": "GY", "Area": 10.0, "ADCs": 4
                    } } } },
                    { "AtomicSequence": { "Name": "A2", "Pulse": { "EmptyPulse": {
                        "Name": "P2", "Duration": 1.5
                    } } } }
                ]
            } }
        }"#;
        let description: SequenceDescription = serde_json::from_str(json).unwrap();
        check!(description.parameters.grad_slew_rate == 100.0);
        check!(description.parameters.phase_lock == 0.0);

        let_assert!(Ok(Sequence::Concat(root)) = description.sequence.build());
        check!(root.name() == "C1");
        check!(root.attributes().has_source("Repetitions"));
        check!(root.children().len() == 2);
        let_assert!(Sequence::Atomic(atom) = &root.children()[0]);
        let_assert!(Pulse::TrapGrad(pulse) = atom.pulse());
        check!(pulse.channel() == GradientChannel::Y);
        check!(!pulse.non_lin_grad());
        check!(atom.pulse().attributes().has_source("ADCs"));
    }

    #[test]
    fn unknown_attribute() {
        let json = r#"{ "EmptyPulse": { "Name": "P", "Area": 1.0 } }"#;
        let description: PulseDescription = serde_json::from_str(json).unwrap();
        let_assert!(Err(Error::UnknownAttribute { node, attribute }) = description.build());
        check!(node == "P");
        check!(attribute == "Area");
    }

    #[test]
    fn unknown_node_kind() {
        let json = r#"{ "sequence": { "LoopSequence": { "Name": "L" } } }"#;
        check!(serde_json::from_str::<SequenceDescription>(json).is_err());
    }
}
