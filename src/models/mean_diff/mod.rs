mod r#impl;

pub use r#impl::*;
