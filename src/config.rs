//! Configuration loading for a Motoman controller session

use crate::control_group::ControlGroupDefinition;
use crate::io_connection::TCP_PORT_IO;
use crate::motion_connection::TCP_PORT_MOTION;
use crate::realtime_connection::TCP_PORT_REALTIME;
use crate::state_connection::TCP_PORT_STATE;
use crate::{MotoError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub robot: RobotConfig,
    pub control_groups: Vec<ControlGroupDefinition>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RobotConfig {
    pub host: String,
    #[serde(default)]
    pub ports: PortConfig,
    /// Socket read/write timeout; absent means block forever.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub start: StartConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PortConfig {
    pub motion: u16,
    pub state: u16,
    pub io: u16,
    pub realtime: u16,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            motion: TCP_PORT_MOTION,
            state: TCP_PORT_STATE,
            io: TCP_PORT_IO,
            realtime: TCP_PORT_REALTIME,
        }
    }
}

/// Which connections a session opens on construction
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StartConfig {
    #[serde(default = "enabled")]
    pub motion: bool,
    #[serde(default = "enabled")]
    pub state: bool,
    #[serde(default = "enabled")]
    pub io: bool,
    #[serde(default)]
    pub realtime: bool,
}

fn enabled() -> bool {
    true
}

impl Default for StartConfig {
    fn default() -> Self {
        Self {
            motion: true,
            state: true,
            io: true,
            realtime: false,
        }
    }
}

impl RobotConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

impl Config {
    /// Minimal config for `host` with the standard ports.
    pub fn new(host: &str, control_groups: Vec<ControlGroupDefinition>) -> Self {
        Self {
            robot: RobotConfig {
                host: host.to_string(),
                ports: PortConfig::default(),
                timeout_ms: None,
                start: StartConfig::default(),
            },
            control_groups,
        }
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| MotoError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::load_from_str(&contents)
    }

    pub fn load_from_str(contents: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.robot.host.trim().is_empty() {
            return Err(MotoError::Config("robot.host is empty".to_string()));
        }
        let mut ids = HashSet::new();
        let mut numbers = HashSet::new();
        for group in &self.control_groups {
            group
                .validate()
                .map_err(|e| MotoError::Config(e.to_string()))?;
            if !ids.insert(group.groupid.as_str()) {
                return Err(MotoError::Config(format!("duplicate control group id {}", group.groupid)));
            }
            if !numbers.insert(group.groupno) {
                return Err(MotoError::Config(format!("duplicate control group number {}", group.groupno)));
            }
        }
        Ok(())
    }
}
