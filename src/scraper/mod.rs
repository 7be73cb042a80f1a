pub mod generator;
pub mod widget;
