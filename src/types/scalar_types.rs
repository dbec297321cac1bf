use crate::GradientChannel;

/// Contains the RF Pulse state for a single point in time.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct RfPulseSample {
    /// Unit: `rad / ms`
    pub amplitude: f64,
    /// Unit: `rad`
    pub phase: f64,
}

/// Contains the gradient amplitudes for a single point in time.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct GradientSample {
    /// Unit: `mT / m`
    pub x: f64,
    /// Unit: `mT / m`
    pub y: f64,
    /// Unit: `mT / m`
    pub z: f64,
}

impl GradientSample {
    /// A sample with `amplitude` on `channel` and zero on the other axes.
    pub fn on(channel: GradientChannel, amplitude: f64) -> Self {
        let mut sample = Self::default();
        match channel {
            GradientChannel::X => sample.x = amplitude,
            GradientChannel::Y => sample.y = amplitude,
            GradientChannel::Z => sample.z = amplitude,
        }
        sample
    }
}

/// See `RfPulseSample` and `GradientSample`
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub pulse: RfPulseSample,
    pub gradient: GradientSample,
}
