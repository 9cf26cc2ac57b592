use serde_json::Value;

/// Parse ISO8601 date string to Unix timestamp for sorting
pub fn parse_iso8601_to_timestamp(date_str: &str) -> i64 {
    if date_str.is_empty() {
        return 0;
    }

    use chrono::{DateTime, Utc};
    if let Ok(dt) = date_str.parse::<DateTime<Utc>>() {
        return dt.timestamp();
    }

    0
}

/// Tolerant statistic parse. The videos/channels endpoints serialize counts
/// as JSON strings, commentThreads as JSON numbers; anything else (missing
/// field, "hidden" subscriber counts) defaults to 0.
pub fn parse_count(value: &Value) -> u64 {
    match value {
        Value::String(s) => s.parse().unwrap_or(0),
        Value::Number(n) => n.as_u64().unwrap_or(0),
        _ => 0,
    }
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_count_accepts_strings_and_numbers() {
        assert_eq!(parse_count(&json!("1234")), 1234);
        assert_eq!(parse_count(&json!(1234)), 1234);
    }

    #[test]
    fn parse_count_defaults_to_zero() {
        assert_eq!(parse_count(&json!("not-a-number")), 0);
        assert_eq!(parse_count(&json!(null)), 0);
        assert_eq!(parse_count(&json!(-3)), 0);
        assert_eq!(parse_count(&json!({})["viewCount"]), 0);
    }

    #[test]
    fn timestamps_order_by_publish_date() {
        let older = parse_iso8601_to_timestamp("2024-01-15T10:00:00Z");
        let newer = parse_iso8601_to_timestamp("2024-03-02T09:30:00Z");
        assert!(newer > older);
        assert_eq!(parse_iso8601_to_timestamp("garbage"), 0);
        assert_eq!(parse_iso8601_to_timestamp(""), 0);
    }

    #[test]
    fn watch_url_is_deterministic() {
        assert_eq!(
            watch_url("kS0qU76oQHs"),
            "https://www.youtube.com/watch?v=kS0qU76oQHs"
        );
    }
}
