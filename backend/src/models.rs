use rocket::http::{ContentType, Status};
use rocket::request::Request;
use rocket::response::Responder;
use rocket::serde::{Deserialize, Serialize};
use rocket::{response, Response};
use std::io::Cursor;

/// One piece of video content, normalized from the heterogeneous shapes the
/// Data API returns (search results nest the id, batch lookups do not).
/// `view_count`/`like_count` stay `None` when the statistics lookup failed or
/// never happened; JSON omits them in that case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    pub published_at: String,
    pub channel_title: String,
    pub video_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub like_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStats {
    pub subscriber_count: u64,
    pub video_count: u64,
    pub view_count: u64,
    pub channel_title: String,
}

/// A page of videos plus the platform's opaque continuation token. The token
/// is forwarded verbatim; `None` terminates pagination on the consumer side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideosPage {
    pub videos: Vec<Video>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub text: String,
    pub author: String,
    pub author_avatar_url: String,
    pub published_at: String,
    pub like_count: u64,
    pub video_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_title: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DownloadCountResponse {
    pub count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TrackDownloadResponse {
    pub success: bool,
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    #[serde(skip)]
    pub status: Status,
    pub error: String,
}

impl ErrorResponse {
    pub fn bad_request(error: impl Into<String>) -> Self {
        ErrorResponse {
            status: Status::BadRequest,
            error: error.into(),
        }
    }

    pub fn not_found(error: impl Into<String>) -> Self {
        ErrorResponse {
            status: Status::NotFound,
            error: error.into(),
        }
    }

    pub fn internal(error: impl Into<String>) -> Self {
        ErrorResponse {
            status: Status::InternalServerError,
            error: error.into(),
        }
    }
}

impl<'r> Responder<'r, 'static> for ErrorResponse {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let json = serde_json::to_string(&self).unwrap();
        Response::build()
            .status(self.status)
            .header(ContentType::JSON)
            .sized_body(json.len(), Cursor::new(json))
            .ok()
    }
}
