//! **vinspect** scores product images for visual anomalies against a reference
//! learned from known-good samples, localizes the anomalous regions, labels the
//! defect from a fixed vocabulary and decides risk, action and whether a human
//! has to look at the result.
//!
//! The flow for one image:
//!
//! ```text
//! image -> MeanDiff::infer -> (score, heatmap)
//!       -> normalize_heatmap -> threshold_heatmap -> extract_regions -> boxes
//!       -> SemanticLabeler -> label / evidence / confidence
//!       -> RpmTable::lookup_strict + ActionPolicy -> risk / action
//!       -> combine_confidence -> requires_review
//! ```
//!
//! [`Pipeline`] wires these together for a single image or a whole dataset
//! split and produces [`InspectionResult`] records.

mod config;
mod data;
mod error;
mod io;
mod labeler;
mod models;
mod pipeline;
mod postproc;
mod results;
mod risk;
mod uncertainty;
mod utils;
mod viz;

pub use config::*;
pub use data::*;
pub use error::*;
pub use io::*;
pub use labeler::*;
pub use models::*;
pub use pipeline::*;
pub use postproc::*;
pub use results::*;
pub use risk::*;
pub use uncertainty::*;
pub use viz::*;
