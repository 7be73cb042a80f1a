pub mod driver;
pub mod limiter;
pub mod protocol;
pub mod session;
