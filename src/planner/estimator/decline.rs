//! First-decline detection.
//!
//! The first reading that is strictly lower than its predecessor marks T0,
//! the moment sustained attrition began. Later reversals are ignored.

use crate::types::Reading;

/// Index of the first reading whose value is strictly below the previous one.
///
/// Returns `None` when fewer than two readings exist or the sequence never
/// decreases.
pub fn find_first_decline(readings: &[Reading]) -> Option<usize> {
    readings
        .windows(2)
        .position(|w| w[1].value < w[0].value)
        .map(|i| i + 1)
}
