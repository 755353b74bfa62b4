use std::sync::Arc;

use acquisition::{Acquisition, run_with_initial_fetch, sensors};
use anyhow::Context;
use cache::ReadingCache;
use config::Config;
use extractor::ReadingExtractor;
use fetcher::{Fetcher, HTTP_TIMEOUT, HttpTransport, RetryPolicy};
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};
use tokio::net::TcpListener;

mod acquisition;
mod cache;
mod config;
mod extractor;
mod fetcher;
mod http;
mod measurement;
mod sensor;
mod time;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env().context("Failed to read configuration")?;

    TermLogger::init(
        config.log_level,
        ConfigBuilder::new()
            .set_time_format_rfc3339()
            .set_time_offset_to_local()
            .map_err(|_| anyhow::anyhow!("Failed to set time offset to local"))?
            .build(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .context("Failed to initialize logger")?;

    if let Err(e) = run(config).await {
        log::error!("{e:#}");
    }

    Ok(())
}

pub async fn run(config: Config) -> Result<(), anyhow::Error> {
    log::info!("Starting Air Quality Monitor...");

    let cache = Arc::new(ReadingCache::new());
    let transport = HttpTransport::new(HTTP_TIMEOUT).context("Failed to initialize HTTP client")?;
    let acquisition = Acquisition::new(
        Fetcher::new(transport, &config.api_base, RetryPolicy::default()),
        ReadingExtractor::new(config.site_name.clone(), config.site_region.clone()),
        cache.clone(),
        sensors(&config.pm_sensor_id, &config.temperature_sensor_id),
    );

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;

    // Until the first cycle lands, /api/data serves the zero defaults.
    let server = tokio::spawn(http::serve(
        listener,
        http::router(cache, &config.static_dir),
    ));
    tokio::spawn(run_with_initial_fetch(acquisition, config.poll_interval));

    tokio::select! {
        result = server => {
            result
                .context("HTTP server task failed")?
                .context("HTTP server failed")?;
        }
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to wait for Ctrl+C signal")?;
            log::info!("Shutting down");
        }
    }

    Ok(())
}
