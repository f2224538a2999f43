mod fusion;
mod review;

pub use fusion::*;
pub use review::*;
