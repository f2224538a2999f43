mod mvtec;

pub use mvtec::*;
