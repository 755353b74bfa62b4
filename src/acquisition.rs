use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::MissedTickBehavior;

use crate::{
    cache::ReadingCache,
    extractor::{ExtractError, ReadingExtractor},
    fetcher::{FetchError, Fetcher, Transport},
    measurement::Measurement,
    sensor::{Sensor, SensorKind},
    time,
};

/// Pause between the two sensor requests of one cycle.
pub const SENSOR_PAUSE: Duration = Duration::from_secs(1);

#[derive(Error, Debug)]
pub enum AcquisitionError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),
}

pub struct Acquisition<T> {
    fetcher: Fetcher<T>,
    extractor: ReadingExtractor,
    cache: Arc<ReadingCache>,
    sensors: Vec<Sensor>,
    sensor_pause: Duration,
}

impl<T: Transport> Acquisition<T> {
    pub fn new(
        fetcher: Fetcher<T>,
        extractor: ReadingExtractor,
        cache: Arc<ReadingCache>,
        sensors: Vec<Sensor>,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            cache,
            sensors,
            sensor_pause: SENSOR_PAUSE,
        }
    }

    /// A failed sensor leaves its cached value alone and does not stop the others.
    pub async fn run(&mut self) {
        for i in 0..self.sensors.len() {
            if i > 0 {
                tokio::time::sleep(self.sensor_pause).await;
            }

            let sensor = self.sensors[i].clone();
            log::info!("Fetching {} data", sensor.kind);
            match self.acquire(&sensor).await {
                Ok(m) => {
                    log::info!(
                        "{} | {}: {} {}",
                        time::format(&m.observed_at),
                        m.kind,
                        m.value,
                        m.kind.unit()
                    );
                }
                Err(e) => log::error!("Failed to update {}: {e}", sensor.kind),
            }
        }
    }

    pub async fn acquire(&mut self, sensor: &Sensor) -> Result<Measurement, AcquisitionError> {
        let body = self.fetcher.fetch(&sensor.id).await?;
        let m = self.extractor.extract(&body, sensor.kind)?;
        self.cache.apply(&m);
        Ok(m)
    }
}

pub fn sensors(pm_sensor_id: &str, temperature_sensor_id: &str) -> Vec<Sensor> {
    SensorKind::ALL
        .into_iter()
        .map(|kind| match kind {
            SensorKind::ParticulateMatter => Sensor::new(kind, pm_sensor_id),
            SensorKind::Temperature => Sensor::new(kind, temperature_sensor_id),
        })
        .collect()
}

/// Runs a cycle right away, then every `period` after it finishes.
pub async fn run_with_initial_fetch<T: Transport>(
    mut acquisition: Acquisition<T>,
    period: Duration,
) {
    log::info!("Initial data fetch:");
    acquisition.run().await;
    log::info!("Next update in {} seconds...", period.as_secs());

    run_periodically(acquisition, period).await;
}

/// Runs a cycle every `period`, starting one period from now.
pub async fn run_periodically<T: Transport>(mut acquisition: Acquisition<T>, period: Duration) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        acquisition.run().await;
        log::info!("Next update in {} seconds...", period.as_secs());
    }
}
