/***************************************/
/*        3rd party libraries          */
/***************************************/
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::elevator::elevator::DEFAULT_CAPACITY;

/***************************************/
/*       Public data structures        */
/***************************************/
#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub building: BuildingConfig,
    pub elevator: ElevatorConfig,
    pub dispatch: DispatchConfig,
}

#[derive(Deserialize, Clone, Debug)]
pub struct BuildingConfig {
    pub floor_count: i32,
    pub ground_floor: i32,
    pub elevator_count: usize,
}

/// Times are in milliseconds.
#[derive(Deserialize, Clone, Debug)]
pub struct ElevatorConfig {
    #[serde(default = "default_capacity")]
    pub default_capacity: i32,
    pub floor_travel_time: u64,
    pub door_transition_time: u64,
    pub door_settle_time: u64,
}

fn default_capacity() -> i32 {
    DEFAULT_CAPACITY
}

#[derive(Deserialize, Clone, Debug)]
pub struct DispatchConfig {
    /// Milliseconds to wait after queueing before draining the pending queue.
    pub grace_delay: u64,
    /// Seconds between background drains of the pending queue.
    pub polling_interval: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse configuration file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/***************************************/
/*             Public API              */
/***************************************/
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let config_str = fs::read_to_string(path)?;
    parse_config(&config_str)
}

pub fn parse_config(config_str: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(config_str)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let building = &self.building;
        if building.floor_count < 2 {
            return Err(ConfigError::Invalid(format!(
                "floor_count must be at least 2, got {}",
                building.floor_count
            )));
        }
        // Floor 0 is where every elevator starts, so it must be inside the range.
        if building.ground_floor < 1 || building.ground_floor > building.floor_count {
            return Err(ConfigError::Invalid(format!(
                "ground_floor must be between 1 and {}, got {}",
                building.floor_count, building.ground_floor
            )));
        }
        if building.elevator_count == 0 {
            return Err(ConfigError::Invalid("elevator_count must be at least 1".into()));
        }
        if self.elevator.default_capacity <= 0 {
            return Err(ConfigError::Invalid(format!(
                "default_capacity must be positive, got {}",
                self.elevator.default_capacity
            )));
        }
        Ok(())
    }
}

impl ElevatorConfig {
    pub fn floor_travel(&self) -> Duration {
        Duration::from_millis(self.floor_travel_time)
    }

    pub fn door_transition(&self) -> Duration {
        Duration::from_millis(self.door_transition_time)
    }

    pub fn door_settle(&self) -> Duration {
        Duration::from_millis(self.door_settle_time)
    }
}

impl DispatchConfig {
    pub fn grace_delay(&self) -> Duration {
        Duration::from_millis(self.grace_delay)
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.polling_interval)
    }
}

/***************************************/
/*             Unit tests              */
/***************************************/
