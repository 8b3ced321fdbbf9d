pub mod analysis;
pub mod color;
pub mod config;
pub mod error;
pub mod fitting;
pub mod geometry;
pub mod grid;
pub mod math;
pub mod operations;
pub mod topology;

pub use error::{Result, SunHoursError};
