//! Run configuration, loadable from a JSON file. Every field has a default.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, SimulationError};
use crate::global_variables::{MINUTE, OPTIMIZER_TOLERANCE};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Simulated seconds per tick.
    pub tick_seconds: u64,
    /// Second of the day the run starts at.
    pub start_time: u64,
    /// Number of simulated days to run.
    pub days: u64,
    /// Seed for destination sampling and stoplight polarities.
    pub seed: u64,
    /// Retime junction lights from road workloads after every tick.
    pub optimize_stoplights: bool,
    /// Accepted relative deviation of a retimed red phase from its target.
    pub optimizer_tolerance: f64,
    /// Where hourly average workloads are appended.
    pub stats_path: PathBuf,
    /// Optional chart of the run's hourly averages.
    pub chart_path: Option<PathBuf>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_seconds: MINUTE,
            start_time: 0,
            days: 1,
            seed: 42,
            optimize_stoplights: true,
            optimizer_tolerance: OPTIMIZER_TOLERANCE,
            stats_path: PathBuf::from("hourly_workload.csv"),
            chart_path: None,
        }
    }
}

impl SimulationConfig {
    /// Parses a configuration and rejects values the simulation cannot run with.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.optimizer_tolerance) {
            return Err(invalid(format!(
                "optimizer_tolerance must be within [0, 1], got {}",
                self.optimizer_tolerance
            )));
        }
        if self.tick_seconds == 0 {
            return Err(invalid("tick_seconds must be positive".to_string()));
        }
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

fn invalid(message: String) -> SimulationError {
    SimulationError::Schema(<serde_json::Error as serde::de::Error>::custom(message))
}
