use std::{
    path::{Path, PathBuf},
    process::ExitCode,
    str::FromStr,
};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use volley_core::ExecutorSettings;

use crate::{
    commands::{predict::predict, strike::strike},
    scenario::ScenarioArgs,
};

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Run an aerial strike in closed loop against the car simulator.
    #[clap(name = "strike")]
    Strike {
        #[clap(flatten)]
        scenario: ScenarioArgs,

        /// Run the strike even if the intercept fails the feasibility check.
        #[clap(long, default_value = "false", action)]
        force: bool,

        /// Write the collected debug records to this file as JSON.
        #[clap(long)]
        debug_dump: Option<PathBuf>,
    },

    /// Predict a single flight from the initial state of a scenario.
    #[clap(name = "predict")]
    Predict {
        #[clap(flatten)]
        scenario: ScenarioArgs,
    },
}

#[derive(Debug, Parser)]
#[command(name = "volley-cli")]
pub struct Cli {
    #[clap(subcommand)]
    command: Command,

    #[clap(long, short = 'f', alias = "settings", default_value = "volley-settings.json")]
    pub settings_file: PathBuf,

    #[clap(long, default_value = "info")]
    pub log_level: String,

    /// Also write JSON logs to this file. `auto` picks a timestamped file in the
    /// local data directory.
    #[clap(long)]
    pub log_file: Option<String>,
}

impl Cli {
    pub fn start(self) -> ExitCode {
        let _guard = match self.setup_logging() {
            Ok(guard) => guard,
            Err(err) => {
                eprintln!("Failed to set up logging: {:#}", err);
                return ExitCode::FAILURE;
            }
        };

        let settings = match ExecutorSettings::load_or_insert(&self.settings_file) {
            Ok(settings) => settings,
            Err(err) => {
                eprintln!("Error loading settings: {:#}", err);
                return ExitCode::FAILURE;
            }
        };

        let result = match &self.command {
            Command::Strike {
                scenario,
                force,
                debug_dump,
            } => strike(&settings, scenario, *force, debug_dump.as_deref()),
            Command::Predict { scenario } => predict(&settings, scenario),
        };
        match result {
            Ok(_) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("Error: {:#}", err);
                ExitCode::FAILURE
            }
        }
    }

    /// Installs the global tracing subscriber. `log` records from the library crates
    /// are forwarded to it.
    fn setup_logging(&self) -> Result<Option<WorkerGuard>> {
        let level = tracing::Level::from_str(&self.log_level)
            .map_err(|_| anyhow!("Invalid log level: {}", self.log_level))?;

        let log_path = self.log_file.as_deref().map(log_file_path).transpose()?;
        let (logfile_layer, guard) = match &log_path {
            Some(path) => {
                let dir = match path.parent() {
                    Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
                    _ => PathBuf::from("."),
                };
                let name = path
                    .file_name()
                    .with_context(|| format!("Invalid log file path: {}", path.display()))?;
                std::fs::create_dir_all(&dir).with_context(|| {
                    format!("Failed to create log directory: {}", dir.display())
                })?;

                let appender = tracing_appender::rolling::never(&dir, name);
                let (non_blocking_appender, guard) = tracing_appender::non_blocking(appender);
                let layer = fmt::Layer::default()
                    .json()
                    .with_ansi(false)
                    .with_writer(non_blocking_appender);
                (Some(layer), Some(guard))
            }
            None => (None, None),
        };

        tracing_subscriber::registry()
            .with(LevelFilter::from_level(level))
            .with(fmt::layer().without_time())
            .with(logfile_layer)
            .try_init()
            .context("Unable to set global tracing subscriber")?;

        if let Some(path) = &log_path {
            tracing::info!("Saving logs to {}", path.display());
        }
        Ok(guard)
    }
}

fn log_file_path(log_file: &str) -> Result<PathBuf> {
    if log_file != "auto" {
        let path = PathBuf::from(log_file);
        if path.exists() {
            return Err(anyhow!("Log file already exists: {}", path.display()));
        }
        return Ok(path);
    }

    let time = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
    let filename = format!("volley-{time}.log");
    Ok(dirs::data_local_dir()
        .map(|p| p.join("volley").join(&filename))
        .unwrap_or_else(|| Path::new(&filename).to_path_buf()))
}
