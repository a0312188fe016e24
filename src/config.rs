//! Server configuration
//!
//! Defaults can be overridden with environment variables:
//!
//! - `TVSIM_BIND`    : websocket listen address (`0.0.0.0:9001`)
//! - `TVSIM_TICK_HZ` : simulation rate (60)
//! - `TVSIM_MAX_DT`  : largest frame delta handed to the step, seconds (0.1)
//! - `TVSIM_TRACK`   : initial track, `straight` | `circle` | `slalom`
//! - `TVSIM_PARAMS`  : path to a JSON `VehicleParams` file

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, SimError};
use crate::track::TrackType;
use crate::vehicle::VehicleParams;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind: String,
    pub tick_hz: u32,
    pub max_dt: f32,
    pub track: TrackType,
    pub spawn: [f32; 3],
    pub params_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:9001".to_string(),
            tick_hz: 60,
            max_dt: 0.1,
            track: TrackType::Straight,
            spawn: [0.0, 1.0, 0.0],
            params_path: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, with the variable source injected.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(bind) = lookup("TVSIM_BIND") {
            config.bind = bind;
        }

        if let Some(raw) = lookup("TVSIM_TICK_HZ") {
            config.tick_hz = raw
                .trim()
                .parse()
                .ok()
                .filter(|hz| (1..=1000).contains(hz))
                .ok_or_else(|| SimError::InvalidSetting { key: "TVSIM_TICK_HZ", value: raw.clone() })?;
        }

        if let Some(raw) = lookup("TVSIM_MAX_DT") {
            config.max_dt = raw
                .trim()
                .parse::<f32>()
                .ok()
                .filter(|dt| dt.is_finite() && *dt > 0.0)
                .ok_or_else(|| SimError::InvalidSetting { key: "TVSIM_MAX_DT", value: raw.clone() })?;
        }

        if let Some(raw) = lookup("TVSIM_TRACK") {
            config.track = raw
                .parse()
                .map_err(|_| SimError::InvalidSetting { key: "TVSIM_TRACK", value: raw.clone() })?;
        }

        if let Some(path) = lookup("TVSIM_PARAMS") {
            config.params_path = Some(PathBuf::from(path));
        }

        Ok(config)
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_hz.max(1)))
    }

    /// Parameter file if configured, defaults otherwise. Either way the
    /// result is validated.
    pub fn load_params(&self) -> Result<VehicleParams> {
        let params = match &self.params_path {
            None => VehicleParams::default(),
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|source| SimError::Io { path: path.clone(), source })?;
                serde_json::from_str(&text)
                    .map_err(|source| SimError::ParamsFormat { path: path.clone(), source })?
            }
        };

        params.validate()?;
        Ok(params)
    }
}
