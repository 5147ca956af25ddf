//! [`Remote`](crate::Remote) implementation over the `curio-api` HTTP surface.

use async_trait::async_trait;
use curio_core::collection::UserCollection;
use curio_core::leaderboard::{AppendOutcome, LeaderboardEntry};
use curio_core::merge::ProgressPatch;
use curio_core::progress::QuestProgress;
use curio_core::quest::Quest;
use curio_core::store::{CollectionRecords, LeaderboardRecords, ProgressRecords, StoreError};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::SyncConfig;
use crate::remote::QuestSource;

/// `{ "data": T }` envelope used by every API response.
#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

/// HTTP client for one API deployment.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpRemote {
    pub fn new(config: &SyncConfig) -> Result<Self, StoreError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| StoreError::Backend(format!("invalid base URL '{}': {e}", config.base_url)))?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| StoreError::Backend(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, base_url })
    }

    /// `{base}/api/v1/{segments...}` with each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| StoreError::Backend(format!("base URL '{}' cannot have a path", self.base_url)))?
            .pop_if_empty()
            .extend(["api", "v1"])
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, StoreError> {
        Ok(self.client.request(method, self.url(segments)?))
    }
}

// ---------------------------------------------------------------------------
// Response handling
// ---------------------------------------------------------------------------

async fn send(request: RequestBuilder) -> Result<Response, StoreError> {
    request.send().await.map_err(transport_error)
}

fn transport_error(err: reqwest::Error) -> StoreError {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        StoreError::Unavailable(err.to_string())
    } else {
        StoreError::Backend(err.to_string())
    }
}

/// Map a non-success status to a store error.
///
/// Client errors other than 404, 408 and 429 mean the API refused the
/// request itself, so they are not retried.
fn status_error(status: StatusCode, entity: &'static str, id: &str) -> StoreError {
    match status {
        StatusCode::NOT_FOUND => StoreError::NotFound {
            entity,
            id: id.to_string(),
        },
        StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT
        | StatusCode::BAD_GATEWAY
        | StatusCode::REQUEST_TIMEOUT
        | StatusCode::TOO_MANY_REQUESTS => StoreError::Unavailable(format!("HTTP {status}")),
        other if other.is_client_error() => StoreError::Rejected(format!("HTTP {other}")),
        other => StoreError::Backend(format!("HTTP {other}")),
    }
}

/// Decode a `{ "data": T }` body, or map the status to an error.
async fn data<T: DeserializeOwned>(response: Response, entity: &'static str, id: &str) -> Result<T, StoreError> {
    let status = response.status();
    if !status.is_success() {
        return Err(status_error(status, entity, id));
    }
    let bytes = response.bytes().await.map_err(transport_error)?;
    let envelope: Envelope<T> = serde_json::from_slice(&bytes)?;
    Ok(envelope.data)
}

/// Like [`data`], but a 404 is `None`.
async fn optional<T: DeserializeOwned>(
    response: Response,
    entity: &'static str,
    id: &str,
) -> Result<Option<T>, StoreError> {
    if response.status() == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    data(response, entity, id).await.map(Some)
}

// ---------------------------------------------------------------------------
// Trait implementations
// ---------------------------------------------------------------------------

#[async_trait]
impl QuestSource for HttpRemote {
    async fn fetch_quest(&self, quest_id: &str) -> Result<Option<Quest>, StoreError> {
        let response = send(self.request(Method::GET, &["quests", quest_id])?).await?;
        optional(response, "Quest", quest_id).await
    }
}

#[async_trait]
impl LeaderboardRecords for HttpRemote {
    async fn append_entry(
        &self,
        quest_id: &str,
        entry: &LeaderboardEntry,
    ) -> Result<AppendOutcome, StoreError> {
        let request = self
            .request(Method::POST, &["quests", quest_id, "leaderboard"])?
            .json(entry);
        data(send(request).await?, "Quest", quest_id).await
    }
}

#[async_trait]
impl ProgressRecords for HttpRemote {
    async fn get_progress(
        &self,
        user_id: &str,
        quest_id: &str,
    ) -> Result<Option<QuestProgress>, StoreError> {
        let request = self.request(Method::GET, &["users", user_id, "progress", quest_id])?;
        optional(send(request).await?, "QuestProgress", quest_id).await
    }

    async fn list_progress(&self, user_id: &str) -> Result<Vec<QuestProgress>, StoreError> {
        let request = self.request(Method::GET, &["users", user_id, "progress"])?;
        data(send(request).await?, "User", user_id).await
    }

    async fn patch_progress(
        &self,
        user_id: &str,
        quest_id: &str,
        patch: &ProgressPatch,
    ) -> Result<QuestProgress, StoreError> {
        let request = self
            .request(Method::PATCH, &["users", user_id, "progress", quest_id])?
            .json(patch);
        data(send(request).await?, "Quest", quest_id).await
    }

    async fn delete_progress(&self, user_id: &str, quest_id: &str) -> Result<bool, StoreError> {
        let request = self.request(Method::DELETE, &["users", user_id, "progress", quest_id])?;
        let response = send(request).await?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(status_error(status, "QuestProgress", quest_id)),
        }
    }
}

#[async_trait]
impl CollectionRecords for HttpRemote {
    async fn get_collection(&self, user_id: &str) -> Result<UserCollection, StoreError> {
        let request = self.request(Method::GET, &["users", user_id, "collection"])?;
        data(send(request).await?, "User", user_id).await
    }

    async fn put_collection(
        &self,
        user_id: &str,
        collection: &UserCollection,
    ) -> Result<(), StoreError> {
        let request = self
            .request(Method::PUT, &["users", user_id, "collection"])?
            .json(collection);
        let response = send(request).await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(status_error(status, "User", user_id))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use assert_matches::assert_matches;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::retry::{send_with_retry, RetryConfig, RetryOutcome};

    fn remote(base: &str) -> HttpRemote {
        HttpRemote::new(&SyncConfig::new(base)).unwrap()
    }

    #[test]
    fn builds_api_urls() {
        let url = remote("http://localhost:3000").url(&["users", "u1", "progress", "q1"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/api/v1/users/u1/progress/q1");
    }

    #[test]
    fn keeps_a_base_path_and_encodes_segments() {
        let url = remote("https://museum.test/curio/").url(&["accounts", "a b@museum.test"]).unwrap();
        assert_eq!(url.as_str(), "https://museum.test/curio/api/v1/accounts/a%20b@museum.test");
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert_matches!(HttpRemote::new(&SyncConfig::new("not a url")), Err(StoreError::Backend(_)));
    }

    #[test]
    fn classifies_statuses() {
        assert_matches!(
            status_error(StatusCode::NOT_FOUND, "Quest", "q1"),
            StoreError::NotFound { entity: "Quest", .. }
        );
        assert!(status_error(StatusCode::SERVICE_UNAVAILABLE, "Quest", "q1").is_transient());
        assert!(status_error(StatusCode::TOO_MANY_REQUESTS, "Quest", "q1").is_transient());
        assert!(status_error(StatusCode::INTERNAL_SERVER_ERROR, "Quest", "q1").is_transient());
        for status in [StatusCode::BAD_REQUEST, StatusCode::CONFLICT, StatusCode::UNPROCESSABLE_ENTITY] {
            let err = status_error(status, "Quest", "q1");
            assert_matches!(err, StoreError::Rejected(_));
            assert!(!err.is_transient());
        }
    }

    #[tokio::test]
    async fn validation_rejection_is_sent_once() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig {
            backoff: Duration::from_millis(5),
        };
        let outcome = send_with_retry("save_progress", &config, &CancellationToken::new(), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(status_error(StatusCode::UNPROCESSABLE_ENTITY, "Quest", "q1"))
        })
        .await;
        assert_matches!(outcome, RetryOutcome::Failed(StoreError::Rejected(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn decodes_the_data_envelope() {
        let envelope: Envelope<AppendOutcome> =
            serde_json::from_str(r#"{ "data": "already_present" }"#).unwrap();
        assert_eq!(envelope.data, AppendOutcome::AlreadyPresent);
    }
}
