use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    ParticulateMatter,
    Temperature,
}

impl SensorKind {
    /// Polling order within one acquisition cycle.
    pub const ALL: [SensorKind; 2] = [SensorKind::ParticulateMatter, SensorKind::Temperature];

    /// `value_type` of the entry carrying this measurement in `sensordatavalues`.
    pub fn field_name(self) -> &'static str {
        match self {
            SensorKind::ParticulateMatter => "P2",
            SensorKind::Temperature => "temperature",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SensorKind::ParticulateMatter => "PM2.5",
            SensorKind::Temperature => "Temperature",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            SensorKind::ParticulateMatter => "µg/m³",
            SensorKind::Temperature => "°C",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sensor {
    pub kind: SensorKind,
    pub id: String,
}

impl Sensor {
    pub fn new(kind: SensorKind, id: impl Into<String>) -> Sensor {
        Sensor {
            kind,
            id: id.into(),
        }
    }
}
