pub mod catalog;
pub mod condition;
pub mod field_model;
pub mod form_map;
