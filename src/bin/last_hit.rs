//! Interactive siege timing planner
//!
//! A line-oriented planner session on stdin with:
//! - CLI arguments and TOML config file support
//! - Session persisted after every command, restored at startup
//! - Structured logging with tracing (to stderr, stdout stays for the session)

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use last_hit_planner::planner::{
    format_clock_time, Clock, Predictor, PredictorConfig, RateEstimator, RateEstimatorConfig,
};
use last_hit_planner::{
    status_message, Command, Planner, SnapshotStore, SystemClock, TimingConfig,
    DEFAULT_TOLERANCE_MS, LAUNCH_GRACE_MS, MAX_PREDICTION_ROUNDS, MAX_SAVED_READINGS, MINUTE_MS,
};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser)]
#[command(name = "last_hit")]
#[command(version, about = "Plan the launch time of a finishing hit", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "last_hit.toml")]
    config: String,

    /// Override the session state file
    #[arg(long, env = "LAST_HIT_STATE_FILE")]
    state_file: Option<String>,

    /// Override the matching tolerance, in minutes
    #[arg(long)]
    tolerance_minutes: Option<i64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Output format (pretty, json, compact)
    #[arg(long)]
    log_format: Option<String>,

    /// Do not load or save the session
    #[arg(long)]
    no_persist: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a sample config file
    GenerateConfig {
        /// Output file path
        #[arg(short, long, default_value = "last_hit.toml")]
        output: String,
    },
    /// Validate config without running
    ValidateConfig,
    /// Run the interactive planner (default)
    Run,
}

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub estimator: EstimatorAppConfig,
    #[serde(default)]
    pub predictor: PredictorAppConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl AppConfig {
    fn validate(&self) -> Result<(), String> {
        self.timing.validate()?;
        self.estimator_config().validate()?;
        self.predictor_config().validate()?;
        if self.storage.max_saved_readings == 0 {
            return Err("storage.max_saved_readings must be > 0".to_string());
        }
        Ok(())
    }

    fn estimator_config(&self) -> RateEstimatorConfig {
        RateEstimatorConfig {
            tolerance_ms: self.estimator.tolerance_minutes.saturating_mul(MINUTE_MS),
            ..RateEstimatorConfig::default()
        }
    }

    fn predictor_config(&self) -> PredictorConfig {
        PredictorConfig {
            max_rounds: self.predictor.max_rounds,
            launch_grace_ms: self.predictor.launch_grace_seconds.saturating_mul(1000),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EstimatorAppConfig {
    /// How far a reading may sit from its sampling target, in minutes
    #[serde(default = "default_tolerance_minutes")]
    pub tolerance_minutes: i64,
}

fn default_tolerance_minutes() -> i64 {
    DEFAULT_TOLERANCE_MS / MINUTE_MS
}

impl Default for EstimatorAppConfig {
    fn default() -> Self {
        Self {
            tolerance_minutes: default_tolerance_minutes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PredictorAppConfig {
    /// Safety bound on simulated adversary rounds
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
    /// How stale a launch time may be and still be reported
    #[serde(default = "default_launch_grace_seconds")]
    pub launch_grace_seconds: i64,
}

fn default_max_rounds() -> u32 {
    MAX_PREDICTION_ROUNDS
}

fn default_launch_grace_seconds() -> i64 {
    LAUNCH_GRACE_MS / 1000
}

impl Default for PredictorAppConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            launch_grace_seconds: default_launch_grace_seconds(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format: pretty, json, compact
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Whether the session is saved and restored at all
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_state_file")]
    pub state_file: String,
    /// Most recent readings kept in the saved session
    #[serde(default = "default_max_saved_readings")]
    pub max_saved_readings: usize,
}

fn default_true() -> bool {
    true
}

fn default_state_file() -> String {
    "last_hit_state.json".to_string()
}

fn default_max_saved_readings() -> usize {
    MAX_SAVED_READINGS
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            state_file: default_state_file(),
            max_saved_readings: default_max_saved_readings(),
        }
    }
}

// ============================================================================
// Interactive commands
// ============================================================================

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ReplCommand {
    Run(Command),
    Status,
    Readings,
    Help,
    Quit,
}

const HELP: &str = "\
Commands:
  <n> | add <n>                    record durability <n> at the current time
  config <capacity> <round> <travel>  set capacity and round/travel minutes
  adversary                        estimate the adversary rate
  ally                             estimate the ally rate (predicts on success)
  predict                          recompute the launch time
  reset                            clear the session
  status                           show the session
  readings                         list recorded readings
  help                             show this text
  quit                             exit";

fn parse_int(token: Option<&str>, what: &str) -> Result<i64, String> {
    let token = token.ok_or_else(|| format!("missing {what}"))?;
    token
        .parse::<i64>()
        .map_err(|_| format!("{what} must be an integer, got '{token}'"))
}

/// Parse one input line. Empty lines yield `Ok(None)`.
fn parse_command(line: &str) -> Result<Option<ReplCommand>, String> {
    let mut tokens = line.split_whitespace();
    let Some(head) = tokens.next() else {
        return Ok(None);
    };

    let command = match head.to_lowercase().as_str() {
        "add" => ReplCommand::Run(Command::AddReading {
            value: parse_int(tokens.next(), "reading value")?,
        }),
        "config" => ReplCommand::Run(Command::SetConfig(TimingConfig::new(
            parse_int(tokens.next(), "total capacity")?,
            parse_int(tokens.next(), "round duration")?,
            parse_int(tokens.next(), "travel time")?,
        ))),
        "adversary" => ReplCommand::Run(Command::EstimateAdversaryRate),
        "ally" => ReplCommand::Run(Command::EstimateAllyRate),
        "predict" => ReplCommand::Run(Command::Predict),
        "reset" => ReplCommand::Run(Command::Reset),
        "status" => ReplCommand::Status,
        "readings" => ReplCommand::Readings,
        "help" | "?" => ReplCommand::Help,
        "quit" | "exit" => ReplCommand::Quit,
        other => match other.parse::<i64>() {
            Ok(value) => ReplCommand::Run(Command::AddReading { value }),
            Err(_) => return Err(format!("unknown command '{other}' (try 'help')")),
        },
    };

    if let Some(extra) = tokens.next() {
        return Err(format!("unexpected argument '{extra}'"));
    }
    Ok(Some(command))
}

// ============================================================================
// Main
// ============================================================================

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::GenerateConfig { output }) => {
            generate_sample_config(output)?;
            return Ok(());
        }
        Some(Commands::ValidateConfig) => {
            let config = load_config(&cli)?;
            config.validate()?;
            println!("Configuration is valid:\n{:#?}", config);
            return Ok(());
        }
        Some(Commands::Run) | None => {}
    }

    let config = load_config(&cli)?;
    config.validate()?;

    setup_logging(&config, &cli)?;

    let mut planner = Planner::with_components(
        SystemClock,
        RateEstimator::new(config.estimator_config()),
        Predictor::new(config.predictor_config()),
    );
    planner.set_config(config.timing)?;

    let store = if config.storage.enabled && !cli.no_persist {
        let path = cli
            .state_file
            .clone()
            .unwrap_or_else(|| config.storage.state_file.clone());
        Some(SnapshotStore::new(path))
    } else {
        None
    };

    if let Some(store) = &store {
        match store.load() {
            Ok(Some(snapshot)) => {
                if !planner.restore(snapshot) {
                    println!("Saved session was invalid; starting fresh.");
                }
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Could not load saved session, starting fresh");
                println!("Could not load saved session ({e}); starting fresh.");
            }
        }
    }

    info!(
        state_file = ?store.as_ref().map(|s| s.path()),
        "Planner started"
    );
    println!("last_hit v{} (type 'help' for commands)", env!("CARGO_PKG_VERSION"));
    print_report(&planner);

    let stdin = io::stdin();
    let mut out = io::stdout();
    loop {
        print!("> ");
        out.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        match command {
            ReplCommand::Quit => break,
            ReplCommand::Help => println!("{HELP}"),
            ReplCommand::Status => print_report(&planner),
            ReplCommand::Readings => print_readings(&planner),
            ReplCommand::Run(command) => {
                let is_reset = command == Command::Reset;
                if let Err(e) = planner.execute(command) {
                    println!("error: {e}");
                }
                if let Some(store) = &store {
                    persist(store, &planner, is_reset, config.storage.max_saved_readings);
                }
                print_report(&planner);
            }
        }
    }

    Ok(())
}

/// Save the session after a command; a reset clears the saved copy instead.
fn persist(store: &SnapshotStore, planner: &Planner, is_reset: bool, max_readings: usize) {
    let result = if is_reset {
        store.clear()
    } else {
        store.save(&planner.snapshot(max_readings), planner.clock().now_ms())
    };
    if let Err(e) = result {
        warn!(error = %e, "Could not persist session");
        println!("warning: session not saved ({e})");
    }
}

fn print_report(planner: &Planner) {
    let state = planner.state();
    let rate = |r: Option<i64>| r.map_or_else(|| "-".to_string(), |v| format!("{v}/round"));

    println!("phase:      {}", state.display_phase());
    println!("next:       {}", state.phase().next_action());
    println!(
        "readings:   {} (current {})",
        state.readings().len(),
        state
            .current_value()
            .map_or_else(|| "-".to_string(), |v| v.to_string())
    );
    println!(
        "rates:      adversary {}, ally {}",
        rate(state.rates().adversary_per_round),
        rate(state.rates().ally_per_round)
    );
    println!("prediction: {}", state.prediction().message);
    if let Some(error) = state.last_error() {
        println!("error:      {error}");
    }
    println!("{}", status_message(state));
}

fn print_readings(planner: &Planner) {
    let readings = planner.state().readings();
    if readings.is_empty() {
        println!("no readings");
        return;
    }
    for (i, reading) in readings.iter().enumerate() {
        println!(
            "{:>3}  {}  {}",
            i,
            format_clock_time(reading.timestamp_ms),
            reading.value
        );
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn load_config(cli: &Cli) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config_path = &cli.config;
    let mut config = if Path::new(config_path).exists() {
        let content = std::fs::read_to_string(config_path)?;
        toml::from_str::<AppConfig>(&content)?
    } else {
        // Return default config if file doesn't exist
        AppConfig::default()
    };

    if let Some(minutes) = cli.tolerance_minutes {
        config.estimator.tolerance_minutes = minutes;
    }
    Ok(config)
}

fn setup_logging(config: &AppConfig, cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let level = cli.log_level.as_ref().unwrap_or(&config.logging.level);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let format = cli
        .log_format
        .as_deref()
        .unwrap_or(match config.logging.format {
            LogFormat::Json => "json",
            LogFormat::Compact => "compact",
            LogFormat::Pretty => "pretty",
        });

    // stdout carries the interactive session, so logs go to stderr
    match format {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .json()
                .init();
        }
        "compact" => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .compact()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .with_target(false)
                .init();
        }
    }

    Ok(())
}

fn generate_sample_config(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let sample = AppConfig::default();
    let content = toml::to_string_pretty(&sample)?;

    let with_comments = format!(
        r#"# last_hit configuration
# See: last_hit --help

{}"#,
        content
    );

    std::fs::write(path, with_comments)?;
    println!("Sample config written to: {}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_readings() {
        assert_eq!(
            parse_command("  1200 ").unwrap(),
            Some(ReplCommand::Run(Command::AddReading { value: 1200 }))
        );
        assert_eq!(
            parse_command("add 0").unwrap(),
            Some(ReplCommand::Run(Command::AddReading { value: 0 }))
        );
        // Negative values parse; the planner rejects them
        assert_eq!(
            parse_command("-5").unwrap(),
            Some(ReplCommand::Run(Command::AddReading { value: -5 }))
        );
        assert!(parse_command("add").is_err());
        assert!(parse_command("add ten").is_err());
    }

    #[test]
    fn test_parse_config() {
        assert_eq!(
            parse_command("config 250000 6 3").unwrap(),
            Some(ReplCommand::Run(Command::SetConfig(TimingConfig::new(
                250_000, 6, 3
            ))))
        );
        assert!(parse_command("config 250000 6").is_err());
        assert!(parse_command("config 250000 6 3 1").is_err());
    }

    #[test]
    fn test_parse_keywords() {
        assert_eq!(
            parse_command("Adversary").unwrap(),
            Some(ReplCommand::Run(Command::EstimateAdversaryRate))
        );
        assert_eq!(
            parse_command("ally").unwrap(),
            Some(ReplCommand::Run(Command::EstimateAllyRate))
        );
        assert_eq!(
            parse_command("predict").unwrap(),
            Some(ReplCommand::Run(Command::Predict))
        );
        assert_eq!(
            parse_command("reset").unwrap(),
            Some(ReplCommand::Run(Command::Reset))
        );
        assert_eq!(parse_command("status").unwrap(), Some(ReplCommand::Status));
        assert_eq!(parse_command("readings").unwrap(), Some(ReplCommand::Readings));
        assert_eq!(parse_command("quit").unwrap(), Some(ReplCommand::Quit));
        assert_eq!(parse_command("   ").unwrap(), None);
        assert!(parse_command("launch").is_err());
    }

    #[test]
    fn test_config_file_sections_default() {
        let config: AppConfig = toml::from_str(
            r#"
            [timing]
            round_duration_minutes = 10

            [storage]
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.timing.round_duration_minutes, 10);
        assert_eq!(config.timing.total_capacity, 400_000);
        assert!(!config.storage.enabled);
        assert_eq!(config.storage.max_saved_readings, 50);
        assert_eq!(config.estimator.tolerance_minutes, 2);
        assert_eq!(config.predictor_config(), PredictorConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sample_config_roundtrips() {
        let content = toml::to_string_pretty(&AppConfig::default()).unwrap();
        let parsed: AppConfig = toml::from_str(&content).unwrap();
        assert_eq!(parsed.timing, TimingConfig::default());
        assert_eq!(parsed.storage.state_file, "last_hit_state.json");
    }
}
