//! Rate estimation from sparse durability readings.
//!
//! - `decline`: locates T0, the first strict decrease in the log
//! - `rate`: samples two readings near fixed round offsets from T0 and turns
//!   their difference into a per-round rate

mod decline;
mod rate;

pub use decline::find_first_decline;
pub use rate::{
    estimate_rate, RateEstimate, RateEstimator, RateEstimatorConfig, RateSample, SamplingWindow,
};
