//! Configuration types
//!
//! Board-level settings for the bus. Optionally serde-serializable so a
//! board file can carry them.

pub mod bus;

pub use bus::*;
