use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::buffer::DEFAULT_WAVEFORM_CAPACITY;
use crate::connection::RetryPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key}={value:?} is invalid: {reason}")]
    Invalid {
        key:    &'static str,
        value:  String,
        reason: String,
    },
}

/// Where the telemetry stream lives.
#[derive(Clone, Debug, PartialEq)]
pub struct Endpoint {
    pub host:   String,
    pub port:   u16,
    pub path:   String,
    /// `wss` instead of `ws`.
    pub secure: bool,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            host:   "127.0.0.1".into(),
            port:   8000,
            path:   "/ws/simulation".into(),
            secure: false,
        }
    }
}

impl Endpoint {
    pub fn url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        let path = self.path.trim_start_matches('/');
        format!("{}://{}:{}/{}", scheme, self.host, self.port, path)
    }
}

/// Scales and timings used when painting packets.
#[derive(Clone, Debug, PartialEq)]
pub struct DisplaySettings {
    pub waveform_capacity: usize,
    /// Rate (cpm) that fills the rate bar.
    pub rate_ceiling:      f64,
    /// Depth that fills the depth bar.
    pub depth_ceiling:     f64,
    pub pulse:             Duration,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            waveform_capacity: DEFAULT_WAVEFORM_CAPACITY,
            rate_ceiling:      200.0,
            depth_ceiling:     100.0,
            pulse:             Duration::from_millis(150),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClientConfig {
    pub endpoint: Endpoint,
    pub retry:    RetryPolicy,
    pub display:  DisplaySettings,
}

impl ClientConfig {
    /// Read `CPR_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = ClientConfig::default();

        if let Some(host) = lookup("CPR_STREAM_HOST") {
            cfg.endpoint.host = host;
        }
        if let Some(port) = parse(&lookup, "CPR_STREAM_PORT")? {
            cfg.endpoint.port = port;
        }
        if let Some(path) = lookup("CPR_STREAM_PATH") {
            cfg.endpoint.path = path;
        }
        if let Some(secure) = parse_flag(&lookup, "CPR_STREAM_SECURE")? {
            cfg.endpoint.secure = secure;
        }

        if let Some(ms) = parse::<u64, _>(&lookup, "CPR_RECONNECT_DELAY_MS")? {
            cfg.retry.delay = Duration::from_millis(ms);
        }
        if let Some(backoff) = parse::<f64, _>(&lookup, "CPR_RECONNECT_BACKOFF")? {
            if !(backoff >= 1.0 && backoff.is_finite()) {
                return Err(invalid("CPR_RECONNECT_BACKOFF", backoff, "must be a finite number >= 1"));
            }
            cfg.retry.backoff = backoff;
        }
        if let Some(ms) = parse::<u64, _>(&lookup, "CPR_RECONNECT_MAX_DELAY_MS")? {
            cfg.retry.max_delay = Duration::from_millis(ms);
        }
        if let Some(max) = parse::<u32, _>(&lookup, "CPR_RECONNECT_MAX_ATTEMPTS")? {
            cfg.retry.max_attempts = Some(max);
        }

        if let Some(cap) = parse::<usize, _>(&lookup, "CPR_WAVEFORM_CAPACITY")? {
            if cap == 0 {
                return Err(invalid("CPR_WAVEFORM_CAPACITY", cap, "must be at least 1"));
            }
            cfg.display.waveform_capacity = cap;
        }
        if let Some(ceiling) = parse::<f64, _>(&lookup, "CPR_RATE_CEILING")? {
            cfg.display.rate_ceiling = positive("CPR_RATE_CEILING", ceiling)?;
        }
        if let Some(ceiling) = parse::<f64, _>(&lookup, "CPR_DEPTH_CEILING")? {
            cfg.display.depth_ceiling = positive("CPR_DEPTH_CEILING", ceiling)?;
        }
        if let Some(ms) = parse::<u64, _>(&lookup, "CPR_PULSE_MS")? {
            cfg.display.pulse = Duration::from_millis(ms);
        }

        Ok(cfg)
    }
}

fn invalid(key: &'static str, value: impl ToString, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| invalid(key, &raw, &e.to_string())),
    }
}

fn parse_flag<F>(lookup: &F, key: &'static str) -> Result<Option<bool>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).as_deref().map(str::trim) {
        None => Ok(None),
        Some("1" | "true" | "yes" | "on") => Ok(Some(true)),
        Some("0" | "false" | "no" | "off") => Ok(Some(false)),
        Some(other) => Err(invalid(key, other, "expected true/false")),
    }
}

fn positive(key: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(invalid(key, value, "must be a positive number"))
    }
}
