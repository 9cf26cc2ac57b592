use crate::config::CounterConfig;
use crate::utils::parse_count;
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use log::{error, warn};
use reqwest::Client;
use rocket::serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use tokio::fs;

/// Fixed logical key for the single download counter.
pub const COUNTER_KEY: &str = "covers-site:downloads";

/// One named counter with two interchangeable physical representations.
/// `read` yields 0 for a counter that was never written; `increment` adds one
/// durably and returns the new value.
#[rocket::async_trait]
pub trait CounterStore: Send + Sync {
    async fn read(&self) -> Result<u64>;
    async fn increment(&self) -> Result<u64>;
}

pub enum CounterBackend {
    Remote(RemoteCounterStore),
    File(FileCounterStore),
}

/// Precedence rule: KV credentials win; without them a hosted-production
/// deployment must fail loudly (an instance-local file counter would look
/// correct there while silently diverging per instance); local development
/// gets the file fallback.
pub fn select_backend(config: &CounterConfig) -> Result<CounterBackend> {
    match (&config.kv_rest_api_url, &config.kv_rest_api_token) {
        (Some(url), Some(token)) => Ok(CounterBackend::Remote(RemoteCounterStore::new(
            url.clone(),
            token.clone(),
        ))),
        _ if config.is_production => Err(anyhow!(
            "KV_REST_API_URL and KV_REST_API_TOKEN must be set in production; \
             refusing to fall back to the local file counter"
        )),
        _ => Ok(CounterBackend::File(FileCounterStore::new(
            config.counter_file.clone(),
        ))),
    }
}

#[rocket::async_trait]
impl CounterStore for CounterBackend {
    async fn read(&self) -> Result<u64> {
        match self {
            CounterBackend::Remote(store) => store.read().await,
            CounterBackend::File(store) => store.read().await,
        }
    }

    async fn increment(&self) -> Result<u64> {
        match self {
            CounterBackend::Remote(store) => store.increment().await,
            CounterBackend::File(store) => store.increment().await,
        }
    }
}

/// Upstash-style KV REST backend. `incr` is the store's atomic primitive, so
/// concurrent callers across instances never lose increments. Transport
/// errors propagate; the HTTP layer turns them into a 500.
pub struct RemoteCounterStore {
    http: Client,
    base_url: String,
    token: String,
}

impl RemoteCounterStore {
    pub fn new(base_url: String, token: String) -> Self {
        RemoteCounterStore {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }
}

#[rocket::async_trait]
impl CounterStore for RemoteCounterStore {
    async fn read(&self) -> Result<u64> {
        let url = format!("{}/get/{}", self.base_url, COUNTER_KEY);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .context("KV store request failed")?;
        if !response.status().is_success() {
            return Err(anyhow!("KV store error: {}", response.status()));
        }
        let data = response.json::<Value>().await.context("KV store returned invalid JSON")?;
        // absent key -> null result -> 0
        Ok(parse_count(&data["result"]))
    }

    async fn increment(&self) -> Result<u64> {
        let url = format!("{}/incr/{}", self.base_url, COUNTER_KEY);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .context("KV store request failed")?;
        if !response.status().is_success() {
            return Err(anyhow!("KV store error: {}", response.status()));
        }
        let data = response.json::<Value>().await.context("KV store returned invalid JSON")?;
        data["result"]
            .as_u64()
            .ok_or_else(|| anyhow!("KV incr returned a non-numeric result"))
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CounterDocument {
    count: u64,
    last_updated: String,
}

/// Development-only file backend. Increment is a read-modify-write of the
/// whole document with no locking; concurrent local callers can lose
/// increments. The remote backend is the production path.
pub struct FileCounterStore {
    path: PathBuf,
}

impl FileCounterStore {
    pub fn new(path: PathBuf) -> Self {
        FileCounterStore { path }
    }

    async fn read_count(&self) -> u64 {
        if let Some(dir) = self.path.parent() {
            if let Err(e) = fs::create_dir_all(dir).await {
                warn!("Failed to create counter directory {}: {e:?}", dir.display());
            }
        }

        match fs::read_to_string(&self.path).await {
            Ok(raw) => match serde_json::from_str::<CounterDocument>(&raw) {
                Ok(doc) => doc.count,
                Err(e) => {
                    warn!("Counter file {} is not valid JSON: {e:?}", self.path.display());
                    0
                }
            },
            // first read, nothing written yet
            Err(_) => 0,
        }
    }
}

#[rocket::async_trait]
impl CounterStore for FileCounterStore {
    async fn read(&self) -> Result<u64> {
        Ok(self.read_count().await)
    }

    async fn increment(&self) -> Result<u64> {
        let current = self.read_count().await;
        let next = current + 1;
        let doc = CounterDocument {
            count: next,
            last_updated: Utc::now().to_rfc3339(),
        };
        let raw = serde_json::to_string(&doc)?;
        if let Err(e) = fs::write(&self.path, raw).await {
            error!("Failed to write counter file {}: {e:?}", self.path.display());
            return Ok(current);
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httptest::{matchers::*, responders::*, Expectation, Server};
    use serde_json::json;

    fn config(
        kv: Option<(&str, &str)>,
        is_production: bool,
        counter_file: PathBuf,
    ) -> CounterConfig {
        CounterConfig {
            kv_rest_api_url: kv.map(|(url, _)| url.to_string()),
            kv_rest_api_token: kv.map(|(_, token)| token.to_string()),
            is_production,
            counter_file,
        }
    }

    #[test]
    fn credentials_select_the_remote_backend() {
        let backend = select_backend(&config(
            Some(("https://kv.example", "token")),
            true,
            PathBuf::from("unused.json"),
        ))
        .unwrap();
        assert!(matches!(backend, CounterBackend::Remote(_)));
    }

    #[test]
    fn local_dev_without_credentials_uses_the_file() {
        let backend =
            select_backend(&config(None, false, PathBuf::from("data/counter.json"))).unwrap();
        assert!(matches!(backend, CounterBackend::File(_)));
    }

    #[test]
    fn production_without_credentials_is_a_configuration_error() {
        let result = select_backend(&config(None, true, PathBuf::from("unused.json")));
        let message = result.err().unwrap().to_string();
        assert!(message.contains("KV_REST_API_URL"));
    }

    #[tokio::test]
    async fn file_backend_reads_zero_before_first_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCounterStore::new(dir.path().join("data").join("counter.json"));
        assert_eq!(store.read().await.unwrap(), 0);
        // the directory is created, the file is not
        assert!(dir.path().join("data").is_dir());
        assert!(!dir.path().join("data").join("counter.json").exists());
    }

    #[tokio::test]
    async fn file_backend_round_trips_sequential_increments() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCounterStore::new(dir.path().join("counter.json"));

        assert_eq!(store.increment().await.unwrap(), 1);
        assert_eq!(store.read().await.unwrap(), 1);
        for expected in 2..=5 {
            assert_eq!(store.increment().await.unwrap(), expected);
        }
        assert_eq!(store.read().await.unwrap(), 5);

        let raw = tokio::fs::read_to_string(dir.path().join("counter.json"))
            .await
            .unwrap();
        let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(doc["count"], 5);
        assert!(doc["lastUpdated"].is_string());
    }

    #[tokio::test]
    async fn file_backend_tolerates_a_corrupt_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counter.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let store = FileCounterStore::new(path);
        assert_eq!(store.read().await.unwrap(), 0);
        // a corrupt document restarts the counter instead of failing
        assert_eq!(store.increment().await.unwrap(), 1);
    }

    fn remote_for(server: &Server) -> RemoteCounterStore {
        RemoteCounterStore::new(format!("http://{}", server.addr()), "test-token".to_string())
    }

    #[tokio::test]
    async fn remote_read_parses_string_results() {
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method_path("GET", "/get/covers-site:downloads"),
                request::headers(contains(("authorization", "Bearer test-token"))),
            ])
            .respond_with(json_encoded(json!({ "result": "41" }))),
        );
        assert_eq!(remote_for(&server).read().await.unwrap(), 41);
    }

    #[tokio::test]
    async fn remote_read_defaults_absent_keys_to_zero() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/get/covers-site:downloads"))
                .respond_with(json_encoded(json!({ "result": null }))),
        );
        assert_eq!(remote_for(&server).read().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn remote_increment_returns_the_new_count() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("POST", "/incr/covers-site:downloads"))
                .respond_with(json_encoded(json!({ "result": 42 }))),
        );
        assert_eq!(remote_for(&server).increment().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn remote_transport_errors_propagate() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/get/covers-site:downloads"))
                .respond_with(status_code(500)),
        );
        server.expect(
            Expectation::matching(request::method_path("POST", "/incr/covers-site:downloads"))
                .respond_with(status_code(500)),
        );

        let store = remote_for(&server);
        assert!(store.read().await.is_err());
        assert!(store.increment().await.is_err());
    }
}
