use crate::config::YouTubeConfig;
use crate::models::{ChannelStats, Comment, Video, VideosPage};
use crate::services::fallback::FallbackPolicy;
use crate::utils::{parse_count, parse_iso8601_to_timestamp, watch_url};
use anyhow::{anyhow, Result};
use log::{error, warn};
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;

/// How many recent videos feed the comment aggregation, and how many
/// relevance-ordered comments are pulled per video.
const COMMENT_SOURCE_VIDEOS: u32 = 10;
const COMMENTS_PER_VIDEO: u32 = 5;
/// Search window for title lookups on the tabs/download page.
const TITLE_SEARCH_WINDOW: u32 = 50;

/// Client for the YouTube Data API v3.
///
/// Every public operation is total: credential absence and upstream failures
/// are mapped to fallback/empty/null results at this boundary, so callers
/// never branch on errors for normal degraded operation. The exceptions are
/// `videos_by_ids` (hard-empty, callers must distinguish "not found" from a
/// real video) and `find_video_by_title` (transport errors surface as a 500).
#[derive(Clone)]
pub struct YouTubeClient {
    http: Client,
    api_key: Option<String>,
    api_base: String,
    fallback: FallbackPolicy,
}

struct VideoStats {
    views: u64,
    likes: u64,
}

impl YouTubeClient {
    pub fn new(config: &YouTubeConfig) -> Self {
        YouTubeClient {
            http: Client::new(),
            api_key: config.api_key.clone(),
            api_base: config.api_base.clone(),
            fallback: FallbackPolicy::default(),
        }
    }

    #[cfg(test)]
    pub fn with_fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.fallback = fallback;
        self
    }

    fn key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// Up to `max_results` videos of the channel, newest first, with view and
    /// like counts merged in where the statistics lookup returned them.
    pub async fn latest_videos(&self, channel_id: &str, max_results: u32) -> Vec<Video> {
        let Some(key) = self.key() else {
            warn!("YouTube API key not configured. Using fallback videos.");
            return self.fallback.videos();
        };

        match self.search_then_enrich(key, channel_id, max_results, None).await {
            Ok((videos, _)) => videos,
            Err(e) => {
                error!("Failed to fetch latest videos for channel {channel_id}: {e:?}");
                self.fallback.videos()
            }
        }
    }

    /// One page of the channel's videos. The continuation token is forwarded
    /// to the platform and returned verbatim; the fallback path never carries
    /// a token, so an infinite-scroll consumer always terminates.
    pub async fn channel_videos_page(
        &self,
        channel_id: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> VideosPage {
        let Some(key) = self.key() else {
            warn!("YouTube API key not configured. Using fallback videos.");
            return VideosPage {
                videos: self.fallback.videos(),
                next_page_token: None,
            };
        };

        match self
            .search_then_enrich(key, channel_id, page_size, page_token)
            .await
        {
            Ok((videos, next_page_token)) => VideosPage {
                videos,
                next_page_token,
            },
            Err(e) => {
                error!("Failed to fetch video page for channel {channel_id}: {e:?}");
                VideosPage {
                    videos: self.fallback.videos(),
                    next_page_token: None,
                }
            }
        }
    }

    /// Aggregate channel counters, or `None` when they cannot be fetched.
    /// No fallback here: a fabricated subscriber count would be misleading.
    pub async fn channel_stats(&self, channel_id: &str) -> Option<ChannelStats> {
        let Some(key) = self.key() else {
            warn!("YouTube API key not configured. Cannot fetch channel stats.");
            return None;
        };

        match self.fetch_channel_stats(key, channel_id).await {
            Ok(stats) => stats,
            Err(e) => {
                error!("Failed to fetch channel stats for {channel_id}: {e:?}");
                None
            }
        }
    }

    /// Batch lookup by video id, in platform order. Returns an empty list on
    /// any failure so callers (the gear-item lookup) can tell "no matching
    /// videos" apart from placeholder content.
    pub async fn videos_by_ids(&self, ids: &[String]) -> Vec<Video> {
        if ids.is_empty() {
            return Vec::new();
        }
        let Some(key) = self.key() else {
            return Vec::new();
        };

        match self.fetch_videos_batch(key, ids).await {
            Ok(videos) => videos,
            Err(e) => {
                error!("Failed to fetch videos by ids: {e:?}");
                Vec::new()
            }
        }
    }

    /// Top comments across the channel's most recent videos, globally ordered
    /// by (likes desc, publish date desc) and truncated to `limit`. Videos
    /// with comments disabled are skipped, not fatal.
    pub async fn channel_comments(&self, channel_id: &str, limit: usize) -> Vec<Comment> {
        let Some(key) = self.key() else {
            warn!("YouTube API key not configured. Cannot fetch comments.");
            return Vec::new();
        };

        let videos = match self
            .search_page(key, channel_id, COMMENT_SOURCE_VIDEOS, None)
            .await
        {
            Ok((videos, _)) => videos,
            Err(e) => {
                error!("Failed to list videos for comments on channel {channel_id}: {e:?}");
                return Vec::new();
            }
        };

        let mut comments = Vec::new();
        for video in &videos {
            match self.fetch_top_comments(key, video).await {
                Ok(batch) => comments.extend(batch),
                // comments disabled on this video, quota hit, etc.
                Err(e) => warn!("Skipping comments for video {}: {e:?}", video.id),
            }
        }

        comments.sort_by(|a, b| {
            b.like_count.cmp(&a.like_count).then_with(|| {
                parse_iso8601_to_timestamp(&b.published_at)
                    .cmp(&parse_iso8601_to_timestamp(&a.published_at))
            })
        });
        comments.truncate(limit);
        comments
    }

    /// Find a video by title within the channel's recent uploads. Exact match
    /// (case-insensitive) wins over substring containment. A missing API key
    /// yields `Ok(None)`; transport failures propagate to the caller.
    pub async fn find_video_by_title(
        &self,
        channel_id: &str,
        title: &str,
    ) -> Result<Option<Video>> {
        let Some(key) = self.key() else {
            warn!("YouTube API key not configured. Cannot look up video by title.");
            return Ok(None);
        };

        let (videos, _) = self
            .search_then_enrich(key, channel_id, TITLE_SEARCH_WINDOW, None)
            .await?;

        let needle = title.trim().to_lowercase();
        if let Some(exact) = videos
            .iter()
            .find(|v| v.title.trim().to_lowercase() == needle)
        {
            return Ok(Some(exact.clone()));
        }
        Ok(videos.into_iter().find(|v| {
            let haystack = v.title.to_lowercase();
            haystack.contains(needle.as_str()) || needle.contains(haystack.as_str())
        }))
    }

    /// Two-phase fetch: phase 1 (search) yields ids and snippets, phase 2
    /// (statistics by id) enriches exactly those ids. Phase 2 depends on
    /// phase 1's output, so the calls are strictly sequential.
    async fn search_then_enrich(
        &self,
        key: &str,
        channel_id: &str,
        max_results: u32,
        page_token: Option<&str>,
    ) -> Result<(Vec<Video>, Option<String>)> {
        let (mut videos, next_page_token) = self
            .search_page(key, channel_id, max_results, page_token)
            .await?;
        if videos.is_empty() {
            return Ok((videos, next_page_token));
        }

        let ids: Vec<&str> = videos.iter().map(|v| v.id.as_str()).collect();
        let stats = self.stats_by_id(key, &ids).await?;
        for video in &mut videos {
            if let Some(s) = stats.get(&video.id) {
                video.view_count = Some(s.views);
                video.like_count = Some(s.likes);
            }
        }

        Ok((videos, next_page_token))
    }

    async fn search_page(
        &self,
        key: &str,
        channel_id: &str,
        max_results: u32,
        page_token: Option<&str>,
    ) -> Result<(Vec<Video>, Option<String>)> {
        // Documentation: https://developers.google.com/youtube/v3/docs/search
        let url = format!("{}/search", self.api_base);
        let max_results = max_results.to_string();
        let mut query: Vec<(&str, &str)> = vec![
            ("part", "snippet"),
            ("channelId", channel_id),
            ("order", "date"),
            ("type", "video"),
            ("maxResults", &max_results),
            ("key", key),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let response = self.http.get(&url).query(&query).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("YouTube API error: {}", response.status()));
        }
        let data = response.json::<Value>().await?;

        let mut videos = Vec::new();
        if let Some(items) = data["items"].as_array() {
            for item in items {
                // search results can contain non-video hits without a videoId
                let Some(id) = item["id"]["videoId"].as_str() else {
                    continue;
                };
                videos.push(video_from_snippet(id, &item["snippet"]));
            }
        }
        let next_page_token = data["nextPageToken"].as_str().map(String::from);

        Ok((videos, next_page_token))
    }

    async fn stats_by_id(&self, key: &str, ids: &[&str]) -> Result<HashMap<String, VideoStats>> {
        let url = format!("{}/videos", self.api_base);
        let joined = ids.join(",");
        let response = self
            .http
            .get(&url)
            .query(&[("part", "statistics"), ("id", &joined), ("key", key)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(anyhow!("YouTube API error: {}", response.status()));
        }
        let data = response.json::<Value>().await?;

        let mut stats = HashMap::new();
        if let Some(items) = data["items"].as_array() {
            for item in items {
                let Some(id) = item["id"].as_str() else {
                    continue;
                };
                stats.insert(
                    id.to_string(),
                    VideoStats {
                        views: parse_count(&item["statistics"]["viewCount"]),
                        likes: parse_count(&item["statistics"]["likeCount"]),
                    },
                );
            }
        }
        Ok(stats)
    }

    async fn fetch_channel_stats(
        &self,
        key: &str,
        channel_id: &str,
    ) -> Result<Option<ChannelStats>> {
        let url = format!("{}/channels", self.api_base);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("part", "statistics,snippet"),
                ("id", channel_id),
                ("key", key),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(anyhow!("YouTube API error: {}", response.status()));
        }
        let data = response.json::<Value>().await?;

        let Some(channel) = data["items"].as_array().and_then(|items| items.first()) else {
            return Ok(None);
        };
        Ok(Some(ChannelStats {
            subscriber_count: parse_count(&channel["statistics"]["subscriberCount"]),
            video_count: parse_count(&channel["statistics"]["videoCount"]),
            view_count: parse_count(&channel["statistics"]["viewCount"]),
            channel_title: channel["snippet"]["title"].as_str().unwrap_or("").to_string(),
        }))
    }

    async fn fetch_videos_batch(&self, key: &str, ids: &[String]) -> Result<Vec<Video>> {
        // Documentation: https://developers.google.com/youtube/v3/docs/videos
        let url = format!("{}/videos", self.api_base);
        let joined = ids.join(",");
        let response = self
            .http
            .get(&url)
            .query(&[
                ("part", "snippet,statistics"),
                ("id", &joined),
                ("key", key),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(anyhow!("YouTube API error: {}", response.status()));
        }
        let data = response.json::<Value>().await?;

        let mut videos = Vec::new();
        if let Some(items) = data["items"].as_array() {
            for item in items {
                let Some(id) = item["id"].as_str() else {
                    continue;
                };
                let mut video = video_from_snippet(id, &item["snippet"]);
                video.view_count = Some(parse_count(&item["statistics"]["viewCount"]));
                video.like_count = Some(parse_count(&item["statistics"]["likeCount"]));
                videos.push(video);
            }
        }
        Ok(videos)
    }

    async fn fetch_top_comments(&self, key: &str, video: &Video) -> Result<Vec<Comment>> {
        // Documentation: https://developers.google.com/youtube/v3/docs/commentThreads
        let url = format!("{}/commentThreads", self.api_base);
        let max_results = COMMENTS_PER_VIDEO.to_string();
        let response = self
            .http
            .get(&url)
            .query(&[
                ("part", "snippet"),
                ("videoId", video.id.as_str()),
                ("order", "relevance"),
                ("maxResults", &max_results),
                ("key", key),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(anyhow!("YouTube API error: {}", response.status()));
        }
        let data = response.json::<Value>().await?;

        let mut comments = Vec::new();
        if let Some(items) = data["items"].as_array() {
            for item in items {
                let snippet = &item["snippet"]["topLevelComment"]["snippet"];
                comments.push(Comment {
                    id: item["id"].as_str().unwrap_or("").to_string(),
                    text: snippet["textDisplay"].as_str().unwrap_or("").to_string(),
                    author: snippet["authorDisplayName"].as_str().unwrap_or("").to_string(),
                    author_avatar_url: snippet["authorProfileImageUrl"]
                        .as_str()
                        .unwrap_or("")
                        .to_string(),
                    published_at: snippet["publishedAt"].as_str().unwrap_or("").to_string(),
                    // commentThreads serializes likeCount as a number
                    like_count: parse_count(&snippet["likeCount"]),
                    video_id: video.id.clone(),
                    video_title: Some(video.title.clone()),
                });
            }
        }
        Ok(comments)
    }
}

fn video_from_snippet(id: &str, snippet: &Value) -> Video {
    Video {
        id: id.to_string(),
        title: snippet["title"].as_str().unwrap_or("").to_string(),
        description: snippet["description"].as_str().unwrap_or("").to_string(),
        thumbnail: snippet["thumbnails"]["medium"]["url"]
            .as_str()
            .unwrap_or("")
            .to_string(),
        published_at: snippet["publishedAt"].as_str().unwrap_or("").to_string(),
        channel_title: snippet["channelTitle"].as_str().unwrap_or("").to_string(),
        video_url: watch_url(id),
        view_count: None,
        like_count: None,
    }
}
