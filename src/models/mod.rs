mod mean_diff;

pub use mean_diff::*;
