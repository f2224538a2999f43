mod hbb;
mod heatmap;
mod inspection;
mod mask;

pub use hbb::*;
pub use heatmap::*;
pub use inspection::*;
pub use mask::*;
