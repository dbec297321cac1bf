mod sample_matrix;
mod scalar_types;
mod tpoi;
mod vector_types;

use serde::Deserialize;

pub use sample_matrix::*;
pub use scalar_types::*;
pub use tpoi::*;
pub use vector_types::*;

/// Gradient axis a gradient pulse plays out on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum GradientChannel {
    #[serde(rename = "GX")]
    X,
    #[serde(rename = "GY")]
    Y,
    #[serde(rename = "GZ")]
    Z,
}
