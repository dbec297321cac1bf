use ndarray::{Array2, ArrayView1, Axis};

use crate::Sample;

/// Columns of the sequence diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqAxis {
    Time,
    ReceiverPhase,
    TxMagnitude,
    TxPhase,
    Gx,
    Gy,
    Gz,
}

impl SeqAxis {
    pub const ALL: [SeqAxis; 7] = [
        SeqAxis::Time,
        SeqAxis::ReceiverPhase,
        SeqAxis::TxMagnitude,
        SeqAxis::TxPhase,
        SeqAxis::Gx,
        SeqAxis::Gy,
        SeqAxis::Gz,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Dataset name of the axis in an exported diagram.
    pub fn urn(self) -> &'static str {
        match self {
            SeqAxis::Time => "T",
            SeqAxis::ReceiverPhase => "RXP",
            SeqAxis::TxMagnitude => "TXM",
            SeqAxis::TxPhase => "TXP",
            SeqAxis::Gx => "GX",
            SeqAxis::Gy => "GY",
            SeqAxis::Gz => "GZ",
        }
    }

    /// Dataset name of the time integral, only gradient axes have one.
    pub fn moment_urn(self) -> Option<&'static str> {
        match self {
            SeqAxis::Gx => Some("KX"),
            SeqAxis::Gy => Some("KY"),
            SeqAxis::Gz => Some("KZ"),
            _ => None,
        }
    }
}

/// Sequence diagram under construction: one row per time point, one column
/// per `SeqAxis`. Row 0 is a sentinel at t = 0 with receiver phase -1, the
/// time points of the tree start at row 1.
#[derive(Debug, Clone)]
pub struct SampleMatrix {
    data: Array2<f64>,
}

impl SampleMatrix {
    pub fn new(num_tpois: usize) -> Self {
        let mut data = Array2::zeros((num_tpois + 1, SeqAxis::ALL.len()));
        data[[0, SeqAxis::ReceiverPhase.index()]] = -1.0;
        Self { data }
    }

    /// Number of rows including the sentinel.
    pub fn num_samples(&self) -> usize {
        self.data.nrows()
    }

    /// # Panics
    /// If `row` is out of range
    pub fn set_row(&mut self, row: usize, time: f64, phase: f64, sample: &Sample) {
        let mut row = self.data.row_mut(row);
        row[SeqAxis::Time.index()] = time;
        row[SeqAxis::ReceiverPhase.index()] = phase;
        row[SeqAxis::TxMagnitude.index()] = sample.pulse.amplitude;
        row[SeqAxis::TxPhase.index()] = sample.pulse.phase;
        row[SeqAxis::Gx.index()] = sample.gradient.x;
        row[SeqAxis::Gy.index()] = sample.gradient.y;
        row[SeqAxis::Gz.index()] = sample.gradient.z;
    }

    pub fn axis(&self, axis: SeqAxis) -> ArrayView1<'_, f64> {
        self.data.index_axis(Axis(1), axis.index())
    }

    /// Transposes into axis-major order: row `SeqAxis::index()` holds all
    /// samples of that axis contiguously.
    pub fn into_axis_major(self) -> Array2<f64> {
        self.data.reversed_axes().as_standard_layout().into_owned()
    }
}
