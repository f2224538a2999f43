//! Deterministic risk resolution and action policy.

mod policy;
mod rpm;

pub use policy::*;
pub use rpm::*;
