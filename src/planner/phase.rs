//! Phase state machine gating which command is legal.
//!
//! ```text
//! Idle ─(≥1 reading)→ WaitingForAdversaryData ─(≥3)→ ReadyForAdversaryEstimate
//!   ─(adversary estimated)→ AdversaryEstimated ⇒ WaitingForAllyData | ReadyForAllyEstimate
//!   WaitingForAllyData ─(≥5)→ ReadyForAllyEstimate
//!   ─(ally estimated)→ AllyEstimated ─(prediction ok)→ Predicting
//! ```
//!
//! Transitions are a pure function of `(phase, event)`. Failed commands do not
//! produce events, so the flow phase never regresses; only `Reset` returns to
//! `Idle`. `Error` is the phase reported while the last command left an error
//! message. It is never stored as the flow phase, and the next successful
//! event clears it.

use serde::{Deserialize, Serialize};

use crate::consts::{READINGS_FOR_ADVERSARY, READINGS_FOR_ALLY, READINGS_TO_START};

/// Current node of the planner's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Phase {
    /// No readings yet
    #[default]
    Idle,
    /// Collecting readings for the adversary estimate
    WaitingForAdversaryData,
    /// Enough readings to estimate the adversary rate
    ReadyForAdversaryEstimate,
    /// Adversary rate known; resolves at once by reading count
    AdversaryEstimated,
    /// Collecting readings for the ally estimate
    WaitingForAllyData,
    /// Enough readings to estimate the ally rate
    ReadyForAllyEstimate,
    /// Both rates known, no successful prediction yet
    AllyEstimated,
    /// A prediction succeeded; each new reading refreshes it
    Predicting,
    /// The last command failed; see the session's error message
    Error,
}

impl Phase {
    /// Display name for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "Idle",
            Phase::WaitingForAdversaryData => "WaitingForAdversaryData",
            Phase::ReadyForAdversaryEstimate => "ReadyForAdversaryEstimate",
            Phase::AdversaryEstimated => "AdversaryEstimated",
            Phase::WaitingForAllyData => "WaitingForAllyData",
            Phase::ReadyForAllyEstimate => "ReadyForAllyEstimate",
            Phase::AllyEstimated => "AllyEstimated",
            Phase::Predicting => "Predicting",
            Phase::Error => "Error",
        }
    }

    /// Position in the forward order. `Error` has none.
    pub fn rank(&self) -> Option<u8> {
        match self {
            Phase::Idle => Some(0),
            Phase::WaitingForAdversaryData => Some(1),
            Phase::ReadyForAdversaryEstimate => Some(2),
            Phase::AdversaryEstimated => Some(3),
            Phase::WaitingForAllyData => Some(4),
            Phase::ReadyForAllyEstimate => Some(5),
            Phase::AllyEstimated => Some(6),
            Phase::Predicting => Some(7),
            Phase::Error => None,
        }
    }

    /// Phase implied by the reading count alone, before any estimate.
    pub fn from_reading_count(count: usize) -> Phase {
        if count >= READINGS_FOR_ADVERSARY {
            Phase::ReadyForAdversaryEstimate
        } else if count >= READINGS_TO_START {
            Phase::WaitingForAdversaryData
        } else {
            Phase::Idle
        }
    }

    /// Whether `command` may run in this phase.
    ///
    /// Adding readings, replacing the config and resetting are always legal.
    pub fn permits(&self, command: CommandKind) -> bool {
        match command {
            CommandKind::AddReading | CommandKind::SetConfig | CommandKind::Reset => true,
            CommandKind::EstimateAdversaryRate => *self == Phase::ReadyForAdversaryEstimate,
            CommandKind::EstimateAllyRate => *self == Phase::ReadyForAllyEstimate,
            CommandKind::Predict => matches!(self, Phase::AllyEstimated | Phase::Predicting),
        }
    }

    /// The single command this phase is waiting for.
    pub fn next_action(&self) -> CommandKind {
        match self {
            Phase::Idle
            | Phase::WaitingForAdversaryData
            | Phase::AdversaryEstimated
            | Phase::WaitingForAllyData
            | Phase::Predicting
            | Phase::Error => CommandKind::AddReading,
            Phase::ReadyForAdversaryEstimate => CommandKind::EstimateAdversaryRate,
            Phase::ReadyForAllyEstimate => CommandKind::EstimateAllyRate,
            Phase::AllyEstimated => CommandKind::Predict,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Commands accepted by the planner, without their arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    AddReading,
    SetConfig,
    EstimateAdversaryRate,
    EstimateAllyRate,
    Predict,
    Reset,
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CommandKind::AddReading => "AddReading",
            CommandKind::SetConfig => "SetConfig",
            CommandKind::EstimateAdversaryRate => "EstimateAdversaryRate",
            CommandKind::EstimateAllyRate => "EstimateAllyRate",
            CommandKind::Predict => "Predict",
            CommandKind::Reset => "Reset",
        };
        f.write_str(name)
    }
}

/// Successful occurrences that move the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    /// The reading log now holds `count` readings
    ReadingsChanged { count: usize },
    /// The adversary rate was estimated with `count` readings in the log
    AdversaryEstimated { count: usize },
    AllyEstimated,
    PredictionSucceeded,
    Reset,
}

fn ally_gate(count: usize) -> Phase {
    if count >= READINGS_FOR_ALLY {
        Phase::ReadyForAllyEstimate
    } else {
        Phase::WaitingForAllyData
    }
}

/// Apply `event` to `phase`.
///
/// Events that do not apply to the current phase leave it unchanged.
pub fn transition(phase: Phase, event: PhaseEvent) -> Phase {
    use Phase::*;

    match (phase, event) {
        (_, PhaseEvent::Reset) => Idle,

        (Idle | WaitingForAdversaryData | Error, PhaseEvent::ReadingsChanged { count }) => {
            let derived = Phase::from_reading_count(count);
            if phase == Error || derived.rank() > phase.rank() {
                derived
            } else {
                phase
            }
        }
        (AdversaryEstimated | WaitingForAllyData, PhaseEvent::ReadingsChanged { count }) => {
            ally_gate(count)
        }
        (_, PhaseEvent::ReadingsChanged { .. }) => phase,

        (ReadyForAdversaryEstimate, PhaseEvent::AdversaryEstimated { count }) => {
            transition(AdversaryEstimated, PhaseEvent::ReadingsChanged { count })
        }
        (ReadyForAllyEstimate, PhaseEvent::AllyEstimated) => AllyEstimated,
        (AllyEstimated | Predicting, PhaseEvent::PredictionSucceeded) => Predicting,

        _ => phase,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_count_gates() {
        let mut phase = Phase::Idle;
        phase = transition(phase, PhaseEvent::ReadingsChanged { count: 0 });
        assert_eq!(phase, Phase::Idle);
        phase = transition(phase, PhaseEvent::ReadingsChanged { count: 1 });
        assert_eq!(phase, Phase::WaitingForAdversaryData);
        phase = transition(phase, PhaseEvent::ReadingsChanged { count: 2 });
        assert_eq!(phase, Phase::WaitingForAdversaryData);
        phase = transition(phase, PhaseEvent::ReadingsChanged { count: 3 });
        assert_eq!(phase, Phase::ReadyForAdversaryEstimate);
        // More readings do not skip the estimate
        phase = transition(phase, PhaseEvent::ReadingsChanged { count: 9 });
        assert_eq!(phase, Phase::ReadyForAdversaryEstimate);
    }

    #[test]
    fn test_restored_log_derives_phase_in_one_step() {
        let phase = transition(Phase::Idle, PhaseEvent::ReadingsChanged { count: 12 });
        assert_eq!(phase, Phase::ReadyForAdversaryEstimate);
    }

    #[test]
    fn test_adversary_estimate_resolves_by_count() {
        let few = transition(
            Phase::ReadyForAdversaryEstimate,
            PhaseEvent::AdversaryEstimated { count: 4 },
        );
        assert_eq!(few, Phase::WaitingForAllyData);

        let enough = transition(
            Phase::ReadyForAdversaryEstimate,
            PhaseEvent::AdversaryEstimated { count: 5 },
        );
        assert_eq!(enough, Phase::ReadyForAllyEstimate);

        let later = transition(few, PhaseEvent::ReadingsChanged { count: 5 });
        assert_eq!(later, Phase::ReadyForAllyEstimate);
    }

    #[test]
    fn test_estimate_events_ignored_out_of_phase() {
        assert_eq!(
            transition(Phase::Idle, PhaseEvent::AdversaryEstimated { count: 5 }),
            Phase::Idle
        );
        assert_eq!(
            transition(Phase::WaitingForAllyData, PhaseEvent::AllyEstimated),
            Phase::WaitingForAllyData
        );
        assert_eq!(
            transition(Phase::ReadyForAllyEstimate, PhaseEvent::PredictionSucceeded),
            Phase::ReadyForAllyEstimate
        );
    }

    #[test]
    fn test_predicting_persists_across_readings() {
        let phase = transition(Phase::AllyEstimated, PhaseEvent::PredictionSucceeded);
        assert_eq!(phase, Phase::Predicting);
        let phase = transition(phase, PhaseEvent::ReadingsChanged { count: 40 });
        assert_eq!(phase, Phase::Predicting);
        let phase = transition(phase, PhaseEvent::PredictionSucceeded);
        assert_eq!(phase, Phase::Predicting);
    }

    #[test]
    fn test_reset_from_anywhere() {
        for phase in [
            Phase::Idle,
            Phase::ReadyForAdversaryEstimate,
            Phase::AllyEstimated,
            Phase::Predicting,
            Phase::Error,
        ] {
            assert_eq!(transition(phase, PhaseEvent::Reset), Phase::Idle);
        }
    }

    #[test]
    fn test_error_recovers_from_data() {
        let phase = transition(Phase::Error, PhaseEvent::ReadingsChanged { count: 2 });
        assert_eq!(phase, Phase::WaitingForAdversaryData);
    }

    #[test]
    fn test_non_reset_events_never_move_backwards() {
        let phases = [
            Phase::Idle,
            Phase::WaitingForAdversaryData,
            Phase::ReadyForAdversaryEstimate,
            Phase::AdversaryEstimated,
            Phase::WaitingForAllyData,
            Phase::ReadyForAllyEstimate,
            Phase::AllyEstimated,
            Phase::Predicting,
        ];
        for &phase in &phases {
            for count in 0..8 {
                for event in [
                    PhaseEvent::ReadingsChanged { count },
                    PhaseEvent::AdversaryEstimated { count },
                    PhaseEvent::AllyEstimated,
                    PhaseEvent::PredictionSucceeded,
                ] {
                    let next = transition(phase, event);
                    assert!(
                        next.rank() >= phase.rank(),
                        "{phase} --{event:?}--> {next} moved backwards"
                    );
                }
            }
        }
    }

    #[test]
    fn test_command_gating() {
        assert!(Phase::Idle.permits(CommandKind::AddReading));
        assert!(Phase::Predicting.permits(CommandKind::SetConfig));
        assert!(!Phase::Idle.permits(CommandKind::EstimateAdversaryRate));
        assert!(Phase::ReadyForAdversaryEstimate.permits(CommandKind::EstimateAdversaryRate));
        assert!(!Phase::WaitingForAllyData.permits(CommandKind::EstimateAllyRate));
        assert!(Phase::ReadyForAllyEstimate.permits(CommandKind::EstimateAllyRate));
        assert!(Phase::AllyEstimated.permits(CommandKind::Predict));
        assert!(Phase::Predicting.permits(CommandKind::Predict));
        assert!(!Phase::ReadyForAllyEstimate.permits(CommandKind::Predict));

        assert_eq!(
            Phase::ReadyForAllyEstimate.next_action(),
            CommandKind::EstimateAllyRate
        );
        assert_eq!(Phase::AllyEstimated.next_action(), CommandKind::Predict);
    }

    #[test]
    fn test_error_recovers_through_input() {
        // More or corrected readings recover from an error, never a reset
        assert_eq!(Phase::Error.next_action(), CommandKind::AddReading);
        assert!(Phase::Error.permits(CommandKind::AddReading));
    }
}
