use chrono::NaiveDateTime;

use crate::sensor::SensorKind;

#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub kind: SensorKind,
    pub value: f64,
    /// Sample time, already shifted to local time.
    pub observed_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationInfo {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}
