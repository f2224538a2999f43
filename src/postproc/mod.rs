//! Heatmap post-processing: normalization, thresholding and region extraction.

mod normalize;
mod regions;
mod threshold;

pub use normalize::*;
pub use regions::*;
pub use threshold::*;
