use crate::models::{ChannelStats, Comment, ErrorResponse};
use crate::AppState;
use rocket::serde::json::Json;
use rocket::{get, FromForm, State};

static DEFAULT_COMMENT_LIMIT: usize = 20;

#[derive(FromForm)]
pub struct StatsQuery {
    #[field(name = "channelId")]
    pub channel_id: Option<String>,
}

/// `None` from the client means "stats unavailable", never zero stats, so
/// this surfaces as a 404 instead of fabricated counters.
#[get("/channel/stats?<q..>")]
pub async fn channel_stats(
    q: StatsQuery,
    state: &State<AppState>,
) -> Result<Json<ChannelStats>, ErrorResponse> {
    let channel_id = q.channel_id.unwrap_or_else(|| state.channel_id.clone());
    match state.youtube.channel_stats(&channel_id).await {
        Some(stats) => Ok(Json(stats)),
        None => Err(ErrorResponse::not_found("Channel stats not available")),
    }
}

#[derive(FromForm)]
pub struct CommentsQuery {
    #[field(name = "channelId")]
    pub channel_id: Option<String>,
    pub limit: Option<usize>,
}

#[get("/channel/comments?<q..>")]
pub async fn channel_comments(q: CommentsQuery, state: &State<AppState>) -> Json<Vec<Comment>> {
    let channel_id = q.channel_id.unwrap_or_else(|| state.channel_id.clone());
    let limit = q.limit.unwrap_or(DEFAULT_COMMENT_LIMIT);
    Json(state.youtube.channel_comments(&channel_id, limit).await)
}
