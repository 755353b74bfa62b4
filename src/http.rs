use std::path::Path;
use std::sync::Arc;

use axum::extract::State;
use axum::handler::HandlerWithoutStateExt;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Json, Router, routing::get};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::cache::{LatestState, ReadingCache};
use crate::time;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataResponse {
    pub pm25: f64,
    pub temperature: f64,
    /// Local time of the last update, or empty before the first one.
    pub timestamp: String,
}

impl From<LatestState> for DataResponse {
    fn from(state: LatestState) -> Self {
        DataResponse {
            pm25: state.pm25,
            temperature: state.temperature,
            timestamp: state
                .last_update_time
                .as_ref()
                .map(time::format)
                .unwrap_or_default(),
        }
    }
}

pub fn router(cache: Arc<ReadingCache>, static_dir: &Path) -> Router {
    let static_files = ServeDir::new(static_dir).not_found_service(not_found.into_service());

    Router::new()
        .route("/api/data", get(data))
        .fallback_service(static_files)
        .with_state(cache)
}

pub async fn serve(listener: TcpListener, app: Router) -> std::io::Result<()> {
    log::info!("HTTP server listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await
}

async fn data(State(cache): State<Arc<ReadingCache>>) -> Json<DataResponse> {
    Json(cache.snapshot().into())
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "File not found")
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::{measurement::Measurement, sensor::SensorKind};

    use super::*;

    async fn get_body(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    fn missing_dir() -> PathBuf {
        PathBuf::from("./does-not-exist")
    }

    #[tokio::test]
    async fn test_data_defaults() {
        let app = router(Arc::new(ReadingCache::new()), &missing_dir());
        let (status, body) = get_body(app, "/api/data").await;

        assert_eq!(status, StatusCode::OK);
        let data: DataResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(
            data,
            DataResponse {
                pm25: 0.0,
                temperature: 0.0,
                timestamp: String::new(),
            }
        );
    }

    #[tokio::test]
    async fn test_data_from_cache() {
        let cache = Arc::new(ReadingCache::new());
        cache.apply(&Measurement {
            kind: SensorKind::ParticulateMatter,
            value: 8.5,
            observed_at: time::parse("2025-06-01 07:30:00").unwrap(),
        });
        let app = router(cache, &missing_dir());
        let (_, body) = get_body(app, "/api/data").await;

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "pm25": 8.5,
                "temperature": 0.0,
                "timestamp": "2025-06-01 07:30:00",
            })
        );
    }

    #[tokio::test]
    async fn test_status_page() {
        let dir = std::env::temp_dir().join(format!("aqm-http-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("index.html"), "<h1>Air Quality</h1>").unwrap();

        let app = router(Arc::new(ReadingCache::new()), &dir);
        let (status, body) = get_body(app, "/").await;

        std::fs::remove_dir_all(&dir).unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<h1>Air Quality</h1>");
    }

    #[tokio::test]
    async fn test_missing_status_page() {
        let app = router(Arc::new(ReadingCache::new()), &missing_dir());
        let (status, body) = get_body(app, "/").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "File not found");
    }
}
