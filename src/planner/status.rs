//! Human-readable status text for a session.

use super::phase::Phase;
use super::session::SessionState;
use crate::consts::{READINGS_FOR_ADVERSARY, READINGS_FOR_ALLY};

/// One-line guidance for the current phase.
pub fn status_message(state: &SessionState) -> String {
    let count = state.readings().len();
    let round = state.config().round_duration_minutes;

    match state.display_phase() {
        Phase::Idle => "Set the timing config, then record durability once it first drops.".to_string(),
        Phase::WaitingForAdversaryData => format!(
            "{count} readings recorded; {} more needed for the adversary rate \
             (include the first drop and readings ~{} and ~{} min after it).",
            READINGS_FOR_ADVERSARY.saturating_sub(count),
            round,
            round * 2
        ),
        Phase::ReadyForAdversaryEstimate => "Enough readings: estimate the adversary rate.".to_string(),
        Phase::AdversaryEstimated | Phase::WaitingForAllyData => format!(
            "Adversary rate known; {} more readings needed for the ally rate \
             (readings ~{} and ~{} min after the first drop, with the ally attacking).",
            READINGS_FOR_ALLY.saturating_sub(count),
            round * 3,
            round * 4
        ),
        Phase::ReadyForAllyEstimate => "Enough readings: estimate the ally rate.".to_string(),
        Phase::AllyEstimated => {
            "Both rates known. Stop the ally attack, then predict or keep recording.".to_string()
        }
        Phase::Predicting => format!(
            "{} (new readings refresh the prediction)",
            state.prediction().message
        ),
        Phase::Error => format!(
            "Last command failed: {}",
            state.last_error().unwrap_or("unknown error")
        ),
    }
}
