//! Output collaborators: artifact images and the JSON report.

mod artifacts;
mod report;

pub use artifacts::*;
pub use report::*;
