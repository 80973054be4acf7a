//! Common numeric building blocks shared by all strategy crates

pub mod errors;
pub mod fixed_point;
