pub mod assignment;
pub mod normalize;
pub mod record;
pub mod translator;
