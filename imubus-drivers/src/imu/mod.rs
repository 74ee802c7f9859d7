//! IMU drivers

pub mod lsm6;

pub use lsm6::{ImuConfig, ImuError, Lsm6, RawSample};
