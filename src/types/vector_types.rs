use ndarray::Array2;

use crate::{cumtrapz, SeqAxis};

#[derive(Debug, Clone, PartialEq)]
pub struct RfPulseSampleVec {
    pub amplitude: Vec<f64>,
    pub phase: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradientSampleVec {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
}

/// Running time integral of the gradients, the k-space trajectory.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientMomentVec {
    /// Unit: `mT / m * ms`
    pub x: Vec<f64>,
    /// Unit: `mT / m * ms`
    pub y: Vec<f64>,
    /// Unit: `mT / m * ms`
    pub z: Vec<f64>,
}

/// A flattened sequence: every axis sampled at all time points of interest,
/// starting with the sentinel sample at t = 0.
#[derive(Debug, Clone, PartialEq)]
pub struct SeqDiagram {
    /// Unit: `ms`
    pub time: Vec<f64>,
    /// Negative where the sample is not an ADC. Unit: `rad`
    pub receiver_phase: Vec<f64>,
    pub pulse: RfPulseSampleVec,
    pub gradient: GradientSampleVec,
    pub kspace: GradientMomentVec,
}

impl SeqDiagram {
    /// Builds the diagram from an axis-major matrix (see
    /// `SampleMatrix::into_axis_major`), integrating the gradient axes.
    pub fn from_axis_major(data: &Array2<f64>) -> Self {
        let axis = |axis: SeqAxis| data.row(axis.index()).to_vec();

        let time = axis(SeqAxis::Time);
        let gradient = GradientSampleVec {
            x: axis(SeqAxis::Gx),
            y: axis(SeqAxis::Gy),
            z: axis(SeqAxis::Gz),
        };
        let kspace = GradientMomentVec {
            x: cumtrapz(&gradient.x, &time),
            y: cumtrapz(&gradient.y, &time),
            z: cumtrapz(&gradient.z, &time),
        };

        Self {
            receiver_phase: axis(SeqAxis::ReceiverPhase),
            pulse: RfPulseSampleVec {
                amplitude: axis(SeqAxis::TxMagnitude),
                phase: axis(SeqAxis::TxPhase),
            },
            gradient,
            kspace,
            time,
        }
    }

    /// Raw samples of one axis.
    pub fn axis(&self, axis: SeqAxis) -> &[f64] {
        match axis {
            SeqAxis::Time => &self.time,
            SeqAxis::ReceiverPhase => &self.receiver_phase,
            SeqAxis::TxMagnitude => &self.pulse.amplitude,
            SeqAxis::TxPhase => &self.pulse.phase,
            SeqAxis::Gx => &self.gradient.x,
            SeqAxis::Gy => &self.gradient.y,
            SeqAxis::Gz => &self.gradient.z,
        }
    }

    /// Time integral of a gradient axis, `None` for the other axes.
    pub fn moment(&self, axis: SeqAxis) -> Option<&[f64]> {
        match axis {
            SeqAxis::Gx => Some(&self.kspace.x),
            SeqAxis::Gy => Some(&self.kspace.y),
            SeqAxis::Gz => Some(&self.kspace.z),
            _ => None,
        }
    }

    /// Datasets in export order: every axis, each gradient axis directly
    /// followed by its integral.
    pub fn datasets(&self) -> Vec<(&'static str, &[f64])> {
        let mut datasets = Vec::new();
        for axis in SeqAxis::ALL {
            datasets.push((axis.urn(), self.axis(axis)));
            if let (Some(urn), Some(moment)) = (axis.moment_urn(), self.moment(axis)) {
                datasets.push((urn, moment));
            }
        }
        datasets
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Number of samples that are ADC readouts.
    pub fn num_adcs(&self) -> usize {
        self.receiver_phase.iter().filter(|&&p| p >= 0.0).count()
    }
}
