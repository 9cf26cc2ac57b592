use anyhow::Result;
use env_logger::Builder;
use log::{info, LevelFilter};
use rocket::http::Method;
use rocket_cors::{AllowedHeaders, AllowedOrigins, CorsOptions};
use std::env;
use std::path::PathBuf;

pub const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
pub const DEFAULT_CHANNEL_ID: &str = "UC293HFEJqlqxTVNUkKg1xSw";
pub const DEFAULT_COUNTER_FILE: &str = "data/download-counter.json";

/// YouTube Data API settings. A missing key is a valid state: every client
/// operation degrades to fallback/empty/null content without it.
#[derive(Debug, Clone)]
pub struct YouTubeConfig {
    pub api_key: Option<String>,
    pub channel_id: String,
    pub api_base: String,
}

impl YouTubeConfig {
    pub fn from_env() -> Self {
        YouTubeConfig {
            api_key: env::var("YOUTUBE_API_KEY").ok().filter(|k| !k.is_empty()),
            channel_id: env::var("YOUTUBE_CHANNEL_ID")
                .unwrap_or_else(|_| DEFAULT_CHANNEL_ID.to_string()),
            api_base: YOUTUBE_API_BASE.to_string(),
        }
    }
}

/// Download-counter settings, resolved fresh on every request so that a
/// redeploy with new KV credentials takes effect without code changes.
#[derive(Debug, Clone)]
pub struct CounterConfig {
    pub kv_rest_api_url: Option<String>,
    pub kv_rest_api_token: Option<String>,
    pub is_production: bool,
    pub counter_file: PathBuf,
}

impl CounterConfig {
    pub fn from_env() -> Self {
        CounterConfig {
            kv_rest_api_url: env::var("KV_REST_API_URL").ok().filter(|v| !v.is_empty()),
            kv_rest_api_token: env::var("KV_REST_API_TOKEN").ok().filter(|v| !v.is_empty()),
            is_production: env::var("APP_ENV")
                .map(|v| v == "production")
                .unwrap_or(false),
            counter_file: env::var("DOWNLOAD_COUNTER_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_COUNTER_FILE)),
        }
    }
}

pub fn init_logger() {
    Builder::new().filter_level(LevelFilter::Info).init();
    info!("Starting Rocket backend...");
}

pub fn load_environment() {
    dotenv::dotenv().ok();
}

pub fn create_cors() -> Result<rocket_cors::Cors> {
    let cors = CorsOptions::default()
        .allowed_origins(AllowedOrigins::some_exact(&["http://localhost:3000"]))
        .allowed_methods(
            vec![Method::Get, Method::Post, Method::Options]
                .into_iter()
                .map(From::from)
                .collect(),
        )
        .allowed_headers(AllowedHeaders::some(&["Accept", "Content-Type"]))
        .to_cors()
        .map_err(|e| anyhow::anyhow!("Failed to create CORS options: {}", e))?;

    Ok(cors)
}
