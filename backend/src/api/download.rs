use crate::config::CounterConfig;
use crate::models::{DownloadCountResponse, ErrorResponse, TrackDownloadResponse};
use crate::services::counter::{self, CounterStore};
use log::error;
use rocket::serde::json::Json;
use rocket::{get, post};

// Backend selection happens per request so credential changes apply on the
// next call, and production misconfiguration surfaces as a 500 here instead
// of a silently wrong instance-local count.

#[get("/track-download")]
pub async fn get_download_count() -> Result<Json<DownloadCountResponse>, ErrorResponse> {
    let backend = counter::select_backend(&CounterConfig::from_env()).map_err(|e| {
        error!("Counter backend unavailable: {e:?}");
        ErrorResponse::internal(e.to_string())
    })?;

    match backend.read().await {
        Ok(count) => Ok(Json(DownloadCountResponse { count })),
        Err(e) => {
            error!("Failed to read download count: {e:?}");
            Err(ErrorResponse::internal("Failed to get download count"))
        }
    }
}

#[post("/track-download")]
pub async fn track_download() -> Result<Json<TrackDownloadResponse>, ErrorResponse> {
    let backend = counter::select_backend(&CounterConfig::from_env()).map_err(|e| {
        error!("Counter backend unavailable: {e:?}");
        ErrorResponse::internal(e.to_string())
    })?;

    match backend.increment().await {
        Ok(count) => Ok(Json(TrackDownloadResponse {
            success: true,
            count,
        })),
        Err(e) => {
            error!("Failed to track download: {e:?}");
            Err(ErrorResponse::internal("Failed to track download"))
        }
    }
}
