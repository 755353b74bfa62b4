use std::{
    env,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use log::LevelFilter;
use thiserror::Error;

use crate::fetcher::DEFAULT_API_BASE;

pub const DEFAULT_LISTEN_ADDR: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 8080));
pub const DEFAULT_PM_SENSOR_ID: &str = "85707";
pub const DEFAULT_TEMPERATURE_SENSOR_ID: &str = "85708";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_STATIC_DIR: &str = "./data";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Environment variable {0} is not valid unicode")]
    NotUnicode(&'static str),

    #[error("Environment variable {key} has invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub api_base: String,
    pub pm_sensor_id: String,
    pub temperature_sensor_id: String,
    pub poll_interval: Duration,
    pub static_dir: PathBuf,
    pub site_name: Option<String>,
    pub site_region: Option<String>,
    pub log_level: LevelFilter,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key))
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Result<String, env::VarError>,
    {
        let get = |key: &'static str| match lookup(key) {
            Ok(value) => Ok(Some(value)),
            Err(env::VarError::NotPresent) => Ok(None),
            Err(env::VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode(key)),
        };

        let poll_interval_secs: u64 = parse_or(
            "AQM_POLL_INTERVAL_SECS",
            get("AQM_POLL_INTERVAL_SECS")?,
            DEFAULT_POLL_INTERVAL_SECS,
        )?;
        if poll_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "AQM_POLL_INTERVAL_SECS",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            listen_addr: parse_or(
                "AQM_LISTEN_ADDR",
                get("AQM_LISTEN_ADDR")?,
                DEFAULT_LISTEN_ADDR,
            )?,
            api_base: get("AQM_API_BASE")?.unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            pm_sensor_id: get("AQM_PM_SENSOR_ID")?
                .unwrap_or_else(|| DEFAULT_PM_SENSOR_ID.to_string()),
            temperature_sensor_id: get("AQM_TEMP_SENSOR_ID")?
                .unwrap_or_else(|| DEFAULT_TEMPERATURE_SENSOR_ID.to_string()),
            poll_interval: Duration::from_secs(poll_interval_secs),
            static_dir: get("AQM_STATIC_DIR")?
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR)),
            site_name: get("AQM_SITE_NAME")?.filter(|name| !name.trim().is_empty()),
            site_region: get("AQM_SITE_REGION")?.filter(|region| !region.trim().is_empty()),
            log_level: parse_or("AQM_LOG_LEVEL", get("AQM_LOG_LEVEL")?, LevelFilter::Info)?,
        })
    }
}

fn parse_or<T>(key: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&'static str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<&str, String> = vars.iter().map(|(k, v)| (*k, v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned().ok_or(env::VarError::NotPresent))
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.api_base, "http://data.sensor.community/airrohr/v1/sensor/");
        assert_eq!(config.pm_sensor_id, "85707");
        assert_eq!(config.temperature_sensor_id, "85708");
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(config.static_dir, PathBuf::from("./data"));
        assert_eq!(config.site_name, None);
        assert_eq!(config.site_region, None);
        assert_eq!(config.log_level, LevelFilter::Info);
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("AQM_LISTEN_ADDR", "127.0.0.1:3000"),
            ("AQM_PM_SENSOR_ID", "1234"),
            ("AQM_POLL_INTERVAL_SECS", "300"),
            ("AQM_SITE_NAME", "Pa Rang Cafe & Art Stay"),
            ("AQM_SITE_REGION", "Chiang Mai, Thailand"),
            ("AQM_LOG_LEVEL", "debug"),
        ])
        .unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:3000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.pm_sensor_id, "1234");
        assert_eq!(config.poll_interval, Duration::from_secs(300));
        assert_eq!(config.site_name.as_deref(), Some("Pa Rang Cafe & Art Stay"));
        assert_eq!(config.site_region.as_deref(), Some("Chiang Mai, Thailand"));
        assert_eq!(config.log_level, LevelFilter::Debug);
    }

    #[test]
    fn test_invalid_values() {
        let err = config(&[("AQM_POLL_INTERVAL_SECS", "soon")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "AQM_POLL_INTERVAL_SECS",
                ..
            }
        ));

        let err = config(&[("AQM_POLL_INTERVAL_SECS", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));

        let err = config(&[("AQM_LISTEN_ADDR", "nowhere")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "AQM_LISTEN_ADDR",
                ..
            }
        ));
    }
}
