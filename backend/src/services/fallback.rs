use crate::models::Video;
use crate::utils::watch_url;

pub const FALLBACK_VIDEO_ID: &str = "kS0qU76oQHs";

/// What the video client substitutes when the Data API is unreachable or no
/// key is configured. The placeholder is a fixed known-good cover so the
/// gallery pages always have something to render; tests disable it to tell
/// fallback output apart from real results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FallbackPolicy {
    #[default]
    Placeholder,
    Disabled,
}

impl FallbackPolicy {
    pub fn videos(&self) -> Vec<Video> {
        match self {
            FallbackPolicy::Disabled => Vec::new(),
            FallbackPolicy::Placeholder => vec![Video {
                id: FALLBACK_VIDEO_ID.to_string(),
                title: "Metallica - Creeping Death Cover".to_string(),
                description: "Full guitar cover of Metallica's Creeping Death".to_string(),
                thumbnail: format!("https://img.youtube.com/vi/{FALLBACK_VIDEO_ID}/mqdefault.jpg"),
                published_at: "2024-01-15T10:00:00Z".to_string(),
                channel_title: "Your Channel Name".to_string(),
                video_url: watch_url(FALLBACK_VIDEO_ID),
                // counts stay None, the placeholder never claims statistics
                view_count: None,
                like_count: None,
            }],
        }
    }
}
