mod overlay;

pub use overlay::*;
