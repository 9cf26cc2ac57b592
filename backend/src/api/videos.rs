use crate::models::{ErrorResponse, Video, VideosPage};
use crate::AppState;
use log::error;
use rocket::serde::json::Json;
use rocket::{get, FromForm, State};

static DEFAULT_LATEST_LIMIT: u32 = 6;
static DEFAULT_PAGE_SIZE: u32 = 12;

#[derive(FromForm)]
pub struct VideoByTitleQuery {
    pub title: Option<String>,
    #[field(name = "channelId")]
    pub channel_id: Option<String>,
}

#[get("/video-by-title?<q..>")]
pub async fn video_by_title(
    q: VideoByTitleQuery,
    state: &State<AppState>,
) -> Result<Json<Video>, ErrorResponse> {
    let Some(title) = q.title.filter(|t| !t.is_empty()) else {
        return Err(ErrorResponse::bad_request("Title parameter is required"));
    };
    let channel_id = q.channel_id.unwrap_or_else(|| state.channel_id.clone());

    match state.youtube.find_video_by_title(&channel_id, &title).await {
        Ok(Some(video)) => Ok(Json(video)),
        Ok(None) => Err(ErrorResponse::not_found("Video not found")),
        Err(e) => {
            error!("Error fetching video by title: {e:?}");
            Err(ErrorResponse::internal("Failed to fetch video"))
        }
    }
}

#[derive(FromForm)]
pub struct LatestQuery {
    #[field(name = "channelId")]
    pub channel_id: Option<String>,
    pub limit: Option<u32>,
}

#[get("/videos/latest?<q..>")]
pub async fn latest_videos(q: LatestQuery, state: &State<AppState>) -> Json<Vec<Video>> {
    let channel_id = q.channel_id.unwrap_or_else(|| state.channel_id.clone());
    let limit = q.limit.unwrap_or(DEFAULT_LATEST_LIMIT);
    Json(state.youtube.latest_videos(&channel_id, limit).await)
}

#[derive(FromForm)]
pub struct PageQuery {
    #[field(name = "channelId")]
    pub channel_id: Option<String>,
    #[field(name = "pageSize")]
    pub page_size: Option<u32>,
    #[field(name = "pageToken")]
    pub page_token: Option<String>,
}

#[get("/videos/page?<q..>")]
pub async fn videos_page(q: PageQuery, state: &State<AppState>) -> Json<VideosPage> {
    let channel_id = q.channel_id.unwrap_or_else(|| state.channel_id.clone());
    let page_size = q.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    Json(
        state
            .youtube
            .channel_videos_page(&channel_id, page_size, q.page_token.as_deref())
            .await,
    )
}

#[get("/videos?<ids>")]
pub async fn videos_by_ids(ids: String, state: &State<AppState>) -> Json<Vec<Video>> {
    let ids: Vec<String> = ids
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .collect();
    Json(state.youtube.videos_by_ids(&ids).await)
}
