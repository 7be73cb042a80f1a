pub mod context;
pub mod filler;
pub mod plan;
