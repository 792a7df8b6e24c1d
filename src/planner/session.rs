//! Session state and the controller that executes planner commands.
//!
//! `Planner` exclusively owns the `SessionState`. Every mutation goes through
//! one of its command methods, handled to completion before the next. Automatic
//! re-prediction (after a successful ally estimate, after a new reading while
//! predicting, after a config change once the ally rate is known) runs
//! synchronously inside the triggering command.
//!
//! A failing command replaces only `last_error`; readings, rates and the
//! prediction are left as they were, except that a failed prediction replaces
//! the prediction result it targets. Commands issued outside their phase are
//! rejected with no side effects at all.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use super::estimator::RateEstimator;
use super::phase::{transition, CommandKind, Phase, PhaseEvent};
use super::predictor::{LaunchPlan, PredictionInput, Predictor};
use crate::errors::{Error, PredictError, Result};
use crate::types::{PredictionResult, Rates, Reading, ReadingLog, TimingConfig};

/// Everything the planner knows about the current siege.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    readings: ReadingLog,
    config: TimingConfig,
    rates: Rates,
    phase: Phase,
    prediction: PredictionResult,
    last_error: Option<String>,
}

impl SessionState {
    pub fn readings(&self) -> &ReadingLog {
        &self.readings
    }

    pub fn config(&self) -> &TimingConfig {
        &self.config
    }

    pub fn rates(&self) -> &Rates {
        &self.rates
    }

    /// Flow phase. Unchanged by failed commands.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Phase to present: `Error` while an error message is pending.
    pub fn display_phase(&self) -> Phase {
        if self.last_error.is_some() {
            Phase::Error
        } else {
            self.phase
        }
    }

    pub fn prediction(&self) -> &PredictionResult {
        &self.prediction
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Latest observed durability.
    pub fn current_value(&self) -> Option<i64> {
        self.readings.latest().map(|r| r.value)
    }
}

/// The persisted part of a session: config and the most recent readings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub config: TimingConfig,
    pub readings: Vec<Reading>,
}

impl SessionSnapshot {
    /// Structural check before restoring.
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.config.validate()?;
        if let Some(bad) = self.readings.iter().find(|r| r.value < 0) {
            return Err(format!(
                "reading at {} has negative value {}",
                bad.timestamp_ms, bad.value
            ));
        }
        Ok(())
    }
}

/// A planner command with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddReading { value: i64 },
    SetConfig(TimingConfig),
    EstimateAdversaryRate,
    EstimateAllyRate,
    Predict,
    Reset,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::AddReading { .. } => CommandKind::AddReading,
            Command::SetConfig(_) => CommandKind::SetConfig,
            Command::EstimateAdversaryRate => CommandKind::EstimateAdversaryRate,
            Command::EstimateAllyRate => CommandKind::EstimateAllyRate,
            Command::Predict => CommandKind::Predict,
            Command::Reset => CommandKind::Reset,
        }
    }
}

/// Controller owning one session.
#[derive(Debug)]
pub struct Planner<C: Clock = SystemClock> {
    state: SessionState,
    estimator: RateEstimator,
    predictor: Predictor,
    clock: C,
}

impl Default for Planner<SystemClock> {
    fn default() -> Self {
        Self::new(SystemClock)
    }
}

impl<C: Clock> Planner<C> {
    /// Create a planner with default estimator and predictor settings.
    pub fn new(clock: C) -> Self {
        Self::with_components(clock, RateEstimator::default(), Predictor::default())
    }

    pub fn with_components(clock: C, estimator: RateEstimator, predictor: Predictor) -> Self {
        Self {
            state: SessionState::default(),
            estimator,
            predictor,
            clock,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Execute a command.
    pub fn execute(&mut self, command: Command) -> Result<()> {
        match command {
            Command::AddReading { value } => self.add_reading(value),
            Command::SetConfig(config) => self.set_config(config),
            Command::EstimateAdversaryRate => self.estimate_adversary_rate().map(|_| ()),
            Command::EstimateAllyRate => self.estimate_ally_rate().map(|_| ()),
            Command::Predict => self.predict().map(|_| ()),
            Command::Reset => {
                self.reset();
                Ok(())
            }
        }
    }

    /// Record a reading stamped with the current time.
    ///
    /// While predicting, the recommendation is refreshed from the new reading.
    pub fn add_reading(&mut self, value: i64) -> Result<()> {
        if value < 0 {
            return Err(self.fail(Error::Validation(format!(
                "reading value must be >= 0, got {value}"
            ))));
        }

        let reading = Reading::new(self.clock.now_ms(), value);
        self.state.readings.insert(reading);
        self.state.last_error = None;
        let count = self.state.readings.len();
        self.apply(PhaseEvent::ReadingsChanged { count });
        info!(
            value,
            timestamp_ms = reading.timestamp_ms,
            count,
            phase = %self.state.phase,
            "Reading added"
        );

        if self.state.phase == Phase::Predicting {
            self.auto_predict();
        }
        Ok(())
    }

    /// Replace the timing configuration.
    ///
    /// Once the ally rate is known the prediction is recomputed.
    pub fn set_config(&mut self, config: TimingConfig) -> Result<()> {
        if let Err(reason) = config.validate() {
            return Err(self.fail(Error::Validation(reason)));
        }

        self.state.config = config;
        self.state.last_error = None;
        info!(
            total_capacity = config.total_capacity,
            round_duration_minutes = config.round_duration_minutes,
            travel_time_minutes = config.travel_time_minutes,
            "Config replaced"
        );

        if self.state.phase == Phase::Predicting || self.state.rates.ally_per_round.is_some() {
            self.auto_predict();
        }
        Ok(())
    }

    /// Estimate the adversary's damage per round.
    pub fn estimate_adversary_rate(&mut self) -> Result<i64> {
        self.ensure_permitted(CommandKind::EstimateAdversaryRate)?;

        let round_ms = self.state.config.round_duration_ms();
        match self
            .estimator
            .estimate_adversary(self.state.readings.as_slice(), round_ms)
        {
            Ok(estimate) => {
                self.state.rates.adversary_per_round = Some(estimate.per_round);
                self.state.last_error = None;
                let count = self.state.readings.len();
                self.apply(PhaseEvent::AdversaryEstimated { count });
                info!(
                    adversary_per_round = estimate.per_round,
                    decline_index = estimate.decline_index,
                    phase = %self.state.phase,
                    "Adversary rate estimated"
                );
                Ok(estimate.per_round)
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    /// Estimate the ally's damage per round, net of the adversary's.
    ///
    /// On success a prediction is attempted immediately.
    pub fn estimate_ally_rate(&mut self) -> Result<i64> {
        self.ensure_permitted(CommandKind::EstimateAllyRate)?;
        let adversary = match self.state.rates.adversary_per_round {
            Some(rate) => rate,
            None => return Err(self.reject(CommandKind::EstimateAllyRate)),
        };

        let round_ms = self.state.config.round_duration_ms();
        match self
            .estimator
            .estimate_ally(self.state.readings.as_slice(), round_ms, adversary)
        {
            Ok(estimate) => {
                self.state.rates.ally_per_round = Some(estimate.per_round);
                self.state.last_error = None;
                self.apply(PhaseEvent::AllyEstimated);
                info!(
                    ally_per_round = estimate.per_round,
                    total_decline = estimate.sample.decline,
                    "Ally rate estimated"
                );
                self.auto_predict();
                Ok(estimate.per_round)
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    /// Recompute the launch recommendation from the latest reading.
    pub fn predict(&mut self) -> Result<LaunchPlan> {
        self.ensure_permitted(CommandKind::Predict)?;
        self.run_prediction().map_err(Error::from)
    }

    /// Restore the default session.
    pub fn reset(&mut self) {
        self.state = SessionState::default();
        info!("Session reset");
    }

    /// Config plus the `max_readings` most recent readings.
    pub fn snapshot(&self, max_readings: usize) -> SessionSnapshot {
        SessionSnapshot {
            config: self.state.config,
            readings: self.state.readings.recent(max_readings).to_vec(),
        }
    }

    /// Replace the session with a restored snapshot.
    ///
    /// An invalid snapshot falls back to the default session. Rates and the
    /// prediction always start unset; the phase is derived from the restored
    /// reading count. Returns whether the snapshot was applied.
    pub fn restore(&mut self, snapshot: SessionSnapshot) -> bool {
        if let Err(reason) = snapshot.validate() {
            warn!(%reason, "Snapshot rejected, starting from defaults");
            self.state = SessionState::default();
            return false;
        }

        let readings = ReadingLog::from_unsorted(snapshot.readings);
        let count = readings.len();
        self.state = SessionState {
            readings,
            config: snapshot.config,
            phase: transition(Phase::Idle, PhaseEvent::ReadingsChanged { count }),
            ..SessionState::default()
        };
        info!(count, phase = %self.state.phase, "Session restored");
        true
    }

    fn apply(&mut self, event: PhaseEvent) {
        let before = self.state.phase;
        self.state.phase = transition(before, event);
        if self.state.phase != before {
            debug!(from = %before, to = %self.state.phase, ?event, "Phase transition");
        }
    }

    fn ensure_permitted(&self, command: CommandKind) -> Result<()> {
        if self.state.phase.permits(command) {
            Ok(())
        } else {
            Err(self.reject(command))
        }
    }

    fn reject(&self, command: CommandKind) -> Error {
        warn!(%command, phase = %self.state.phase, "Command rejected for phase");
        Error::InvalidForPhase {
            command,
            phase: self.state.phase,
        }
    }

    fn fail(&mut self, err: Error) -> Error {
        warn!(error = %err, phase = %self.state.phase, "Command failed");
        self.state.last_error = Some(err.to_string());
        err
    }

    fn auto_predict(&mut self) {
        if let Err(e) = self.run_prediction() {
            debug!(error = %e, "Automatic prediction did not produce a launch time");
        }
    }

    fn run_prediction(&mut self) -> std::result::Result<LaunchPlan, PredictError> {
        let outcome = match self.state.readings.latest() {
            None => Err(PredictError::NoReadings),
            Some(latest) => {
                let input = PredictionInput {
                    current_value: latest.value,
                    adversary_per_round: self.state.rates.adversary_per_round,
                    ally_per_round: self.state.rates.ally_per_round,
                    round_duration_ms: self.state.config.round_duration_ms(),
                    travel_time_ms: self.state.config.travel_time_ms(),
                };
                self.predictor.predict(&input, self.clock.now_ms())
            }
        };

        match outcome {
            Ok(plan) => {
                self.state.prediction = PredictionResult {
                    launch_time_ms: Some(plan.launch_time_ms),
                    message: plan.message(),
                };
                self.state.last_error = None;
                self.apply(PhaseEvent::PredictionSucceeded);
                info!(
                    rounds_to_wait = plan.rounds_to_wait,
                    launch_time_ms = plan.launch_time_ms,
                    landing_time_ms = plan.landing_time_ms,
                    "Prediction updated"
                );
                Ok(plan)
            }
            Err(e) => {
                let message = e.to_string();
                warn!(error = %message, "Prediction failed");
                self.state.prediction = PredictionResult {
                    launch_time_ms: None,
                    message: message.clone(),
                };
                self.state.last_error = Some(message);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::clock::ManualClock;

    const MIN: i64 = 60_000;
    const T0: i64 = 1_700_000_000_000;

    fn planner() -> Planner<ManualClock> {
        Planner::new(ManualClock::new(T0))
    }

    fn add_at(p: &mut Planner<ManualClock>, minute: i64, value: i64) {
        p.clock().set_ms(T0 + minute * MIN);
        p.add_reading(value).unwrap();
    }

    #[test]
    fn test_initial_state() {
        let p = planner();
        let s = p.state();
        assert_eq!(s.phase(), Phase::Idle);
        assert!(s.readings().is_empty());
        assert_eq!(*s.config(), TimingConfig::default());
        assert_eq!(*s.rates(), Rates::default());
        assert!(!s.prediction().is_success());
        assert!(s.last_error().is_none());
    }

    #[test]
    fn test_negative_reading_rejected_without_mutation() {
        let mut p = planner();
        let err = p.add_reading(-1).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(p.state().readings().is_empty());
        assert_eq!(p.phase(), Phase::Idle);
        assert!(p.state().last_error().is_some());
        assert_eq!(p.state().display_phase(), Phase::Error);

        // Next good reading clears the error
        p.add_reading(100).unwrap();
        assert!(p.state().last_error().is_none());
        assert_eq!(p.state().display_phase(), Phase::WaitingForAdversaryData);
    }

    #[test]
    fn test_out_of_order_clock_keeps_log_sorted() {
        let mut p = planner();
        add_at(&mut p, 10, 900);
        add_at(&mut p, 2, 1000);
        add_at(&mut p, 5, 950);
        assert!(p.state().readings().is_sorted());
        assert_eq!(p.state().current_value(), Some(900));
    }

    #[test]
    fn test_commands_rejected_outside_phase() {
        let mut p = planner();
        add_at(&mut p, 0, 1000);

        let err = p.estimate_adversary_rate().unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidForPhase {
                command: CommandKind::EstimateAdversaryRate,
                phase: Phase::WaitingForAdversaryData
            }
        ));
        assert!(matches!(p.estimate_ally_rate(), Err(Error::InvalidForPhase { .. })));
        assert!(matches!(p.predict(), Err(Error::InvalidForPhase { .. })));
        // Rejection leaves no trace
        assert!(p.state().last_error().is_none());
        assert_eq!(p.phase(), Phase::WaitingForAdversaryData);
    }

    #[test]
    fn test_failed_estimate_keeps_phase() {
        let mut p = planner();
        add_at(&mut p, 0, 1000);
        add_at(&mut p, 1, 1000);
        add_at(&mut p, 2, 1000);
        assert_eq!(p.phase(), Phase::ReadyForAdversaryEstimate);

        let err = p.estimate_adversary_rate().unwrap_err();
        assert!(matches!(err, Error::Estimate(_)));
        assert_eq!(p.phase(), Phase::ReadyForAdversaryEstimate);
        assert!(p.state().rates().adversary_per_round.is_none());
        assert!(p.state().last_error().is_some());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut p = planner();
        let err = p.set_config(TimingConfig::new(100, 0, 5)).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(*p.state().config(), TimingConfig::default());
        assert!(p.state().last_error().is_some());

        p.set_config(TimingConfig::new(100, 10, 0)).unwrap();
        assert_eq!(p.state().config().round_duration_minutes, 10);
        assert!(p.state().last_error().is_none());
    }

    #[test]
    fn test_execute_dispatch_and_reset() {
        let mut p = planner();
        p.execute(Command::AddReading { value: 500 }).unwrap();
        p.execute(Command::SetConfig(TimingConfig::new(500, 3, 1))).unwrap();
        assert_eq!(p.state().readings().len(), 1);

        p.execute(Command::Reset).unwrap();
        assert_eq!(*p.state(), SessionState::default());
        assert_eq!(Command::Predict.kind(), CommandKind::Predict);
    }

    #[test]
    fn test_snapshot_caps_readings_and_restore_derives_phase() {
        let mut p = planner();
        for i in 0..60 {
            add_at(&mut p, i, 10_000 - i * 10);
        }
        p.set_config(TimingConfig::new(10_000, 4, 2)).unwrap();

        let snap = p.snapshot(50);
        assert_eq!(snap.readings.len(), 50);
        assert_eq!(snap.readings[0].timestamp_ms, T0 + 10 * MIN);

        let json = serde_json::to_string(&snap).unwrap();
        let restored_snap: SessionSnapshot = serde_json::from_str(&json).unwrap();

        let mut q = planner();
        assert!(q.restore(restored_snap));
        assert_eq!(*q.state().config(), TimingConfig::new(10_000, 4, 2));
        assert_eq!(q.state().readings().as_slice(), p.state().readings().recent(50));
        assert_eq!(q.phase(), Phase::ReadyForAdversaryEstimate);
        assert_eq!(*q.state().rates(), Rates::default());
    }

    #[test]
    fn test_restore_small_log() {
        let mut p = planner();
        let snap = SessionSnapshot {
            config: TimingConfig::default(),
            readings: vec![Reading::new(T0 + MIN, 90), Reading::new(T0, 100)],
        };
        assert!(p.restore(snap));
        assert!(p.state().readings().is_sorted());
        assert_eq!(p.phase(), Phase::WaitingForAdversaryData);
    }

    #[test]
    fn test_restore_invalid_falls_back_to_defaults() {
        let mut p = planner();
        add_at(&mut p, 0, 1000);

        let snap = SessionSnapshot {
            config: TimingConfig::new(-5, 5, 5),
            readings: vec![Reading::new(T0, 100)],
        };
        assert!(!p.restore(snap));
        assert_eq!(*p.state(), SessionState::default());

        let snap = SessionSnapshot {
            config: TimingConfig::default(),
            readings: vec![Reading::new(T0, -3)],
        };
        assert!(!p.restore(snap));
        assert!(p.state().readings().is_empty());
    }
}
