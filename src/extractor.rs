use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

use crate::{
    measurement::{LocationInfo, Measurement},
    sensor::SensorKind,
    time,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Feed returned no samples")]
    NoData,

    #[error("No {0:?} value in latest sample")]
    FieldNotFound(&'static str),

    #[error("Invalid sample timestamp {0:?}")]
    InvalidTimestamp(String),
}

#[derive(Deserialize, Debug)]
struct Sample {
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    location: Option<Location>,
    #[serde(default)]
    sensordatavalues: Vec<SensorDataValue>,
}

#[derive(Deserialize, Debug)]
struct Location {
    #[serde(default, deserialize_with = "loose_number")]
    latitude: f64,
    #[serde(default, deserialize_with = "loose_number")]
    longitude: f64,
    #[serde(default, deserialize_with = "loose_number")]
    altitude: f64,
}

impl From<&Location> for LocationInfo {
    fn from(location: &Location) -> Self {
        LocationInfo {
            latitude: location.latitude,
            longitude: location.longitude,
            altitude: location.altitude,
        }
    }
}

#[derive(Deserialize, Debug)]
struct SensorDataValue {
    #[serde(default)]
    value_type: Option<String>,
    #[serde(default)]
    value: Value,
}

/// Numbers pass through; strings go through [`parse_loose`]; anything else is zero.
fn loose_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_as_f64(&Value::deserialize(deserializer)?))
}

fn value_as_f64(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => parse_loose(s),
        _ => 0.0,
    }
}

/// Parses the longest numeric prefix of `text`, like C's `atof`.
///
/// Text without a numeric prefix yields `0.0`.
pub fn parse_loose(text: &str) -> f64 {
    let text = text.trim_start();
    let end = text
        .find(|c: char| !(c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E')))
        .unwrap_or(text.len());
    let candidate = &text[..end];

    (1..=candidate.len())
        .rev()
        .find_map(|n| candidate[..n].parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Owns the once-per-process flag for the location banner.
#[derive(Debug, Default)]
pub struct ReadingExtractor {
    site_name: Option<String>,
    site_region: Option<String>,
    location_reported: bool,
}

impl ReadingExtractor {
    pub fn new(site_name: Option<String>, site_region: Option<String>) -> Self {
        Self {
            site_name,
            site_region,
            location_reported: false,
        }
    }

    pub fn extract(&mut self, body: &[u8], kind: SensorKind) -> Result<Measurement, ExtractError> {
        let document: Value = serde_json::from_slice(body)
            .map_err(|e| ExtractError::MalformedPayload(e.to_string()))?;

        // The feed lists the newest sample first.
        let first = match document.get(0) {
            None | Some(Value::Null) => return Err(ExtractError::NoData),
            Some(first) => first,
        };
        let sample: Sample = serde_path_to_error::deserialize(first)
            .map_err(|e| ExtractError::MalformedPayload(e.to_string()))?;

        if let Some(location) = &sample.location {
            if kind == SensorKind::ParticulateMatter && !self.location_reported {
                self.report_location(&location.into());
                self.location_reported = true;
            }
        }

        let timestamp = sample.timestamp.as_deref().unwrap_or_default();
        let observed_at = time::adjust(timestamp)
            .map_err(|_| ExtractError::InvalidTimestamp(timestamp.to_string()))?;

        let field = kind.field_name();
        let entry = sample
            .sensordatavalues
            .iter()
            .find(|v| v.value_type.as_deref() == Some(field))
            .ok_or(ExtractError::FieldNotFound(field))?;

        Ok(Measurement {
            kind,
            value: value_as_f64(&entry.value),
            observed_at,
        })
    }

    fn report_location(&self, location: &LocationInfo) {
        for line in self.location_banner(location) {
            log::info!("{line}");
        }
    }

    fn location_banner(&self, location: &LocationInfo) -> Vec<String> {
        let rule = "-".repeat(40);
        let mut lines = vec![rule.clone()];
        if let Some(site_name) = &self.site_name {
            lines.push(format!("Location: {site_name}"));
        }
        if let Some(site_region) = &self.site_region {
            lines.push(site_region.clone());
        }
        lines.push(format!(
            "GPS: {:.6}, {:.6} (Alt: {:.2}m)",
            location.latitude, location.longitude, location.altitude
        ));
        lines.push(format!("Timezone: {}", time::LOCAL_ZONE_NAME));
        lines.push(rule);
        lines
    }
}
