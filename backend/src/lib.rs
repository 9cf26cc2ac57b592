pub mod api;
pub mod config;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::YouTubeConfig;
use crate::services::youtube::YouTubeClient;
use rocket::{routes, Build, Rocket};

pub struct AppState {
    pub youtube: YouTubeClient,
    pub channel_id: String,
}

impl AppState {
    pub fn from_env() -> Self {
        let youtube_config = YouTubeConfig::from_env();
        AppState {
            youtube: YouTubeClient::new(&youtube_config),
            channel_id: youtube_config.channel_id,
        }
    }
}

pub fn build_rocket() -> Rocket<Build> {
    build_rocket_with_state(AppState::from_env())
}

pub fn build_rocket_with_state(state: AppState) -> Rocket<Build> {
    let cors = config::create_cors().expect("CORS setup failed.");

    rocket::build()
        .manage(state)
        .mount(
            "/api",
            routes![
                api::download::get_download_count,
                api::download::track_download,
                api::videos::video_by_title,
                api::videos::latest_videos,
                api::videos::videos_page,
                api::videos::videos_by_ids,
                api::channel::channel_stats,
                api::channel::channel_comments,
            ],
        )
        .attach(cors)
}
