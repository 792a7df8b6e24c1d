//! Data model shared by the planner engine and its front ends.
//!
//! Readings, the timing configuration, estimated rates and the
//! prediction result are plain serializable values.

mod outcome;
mod reading;
mod timing;

pub use outcome::*;
pub use reading::*;
pub use timing::*;
