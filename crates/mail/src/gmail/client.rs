//! Gmail API HTTP client
//!
//! Provides methods for listing, fetching, and sending messages and
//! threads. Uses synchronous HTTP (ureq) to be executor-agnostic; the
//! bearer token is obtained per request from the auth layer, so there is
//! no process-wide session state.

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use log::warn;
use std::time::Duration;

use super::GmailAuth;
use super::api::{
    GmailMessage, GmailThread, ListMessagesResponse, ListThreadsResponse, ProfileResponse,
    SendMessageRequest, SendMessageResponse,
};
use crate::models::{MessageId, ThreadId};

/// Classified Gmail API failure.
///
/// Callers can downcast from `anyhow::Error` to distinguish a rejected
/// token (re-authenticate) from conditions worth retrying.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("access token rejected (401); re-authentication required")]
    Unauthorized,
    #[error("rate limited by the Gmail API (429)")]
    RateLimited,
    #[error("Gmail API returned status {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(String),
}

impl ApiError {
    fn from_ureq(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(401) => ApiError::Unauthorized,
            ureq::Error::StatusCode(429) => ApiError::RateLimited,
            ureq::Error::StatusCode(status) => ApiError::Status(status),
            other => ApiError::Transport(other.to_string()),
        }
    }

    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::RateLimited | ApiError::Transport(_) => true,
            ApiError::Status(status) => *status >= 500,
            ApiError::Unauthorized => false,
        }
    }
}

/// An outgoing message; `thread_id` marks it as a reply within an
/// existing thread
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub thread_id: Option<ThreadId>,
}

/// Gmail API client
pub struct GmailClient {
    auth: GmailAuth,
}

impl GmailClient {
    /// Gmail API base URL
    const BASE_URL: &'static str = "https://gmail.googleapis.com/gmail/v1";

    /// Retry budget for individual fetches within a batch fan-out
    const BATCH_RETRIES: u32 = 3;

    /// Create a new Gmail client
    pub fn new(auth: GmailAuth) -> Self {
        Self { auth }
    }

    /// List message IDs from the user's mailbox
    ///
    /// # Arguments
    /// * `max_results` - Maximum number of messages per page (1-500)
    /// * `query` - Optional Gmail search query (e.g. "in:inbox")
    /// * `page_token` - Optional page token for pagination
    pub fn list_messages(
        &self,
        max_results: usize,
        query: Option<&str>,
        page_token: Option<&str>,
    ) -> Result<ListMessagesResponse> {
        let mut url = format!(
            "{}/users/me/messages?maxResults={}",
            Self::BASE_URL,
            max_results.min(500)
        );
        if let Some(q) = query {
            url.push_str(&format!("&q={}", urlencoding::encode(q)));
        }
        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={}", token));
        }

        self.get_json(&url).context("Failed to list messages")
    }

    /// List threads from the user's mailbox
    pub fn list_threads(&self, max_results: usize, query: Option<&str>) -> Result<ListThreadsResponse> {
        let mut url = format!(
            "{}/users/me/threads?maxResults={}",
            Self::BASE_URL,
            max_results.min(500)
        );
        if let Some(q) = query {
            url.push_str(&format!("&q={}", urlencoding::encode(q)));
        }

        self.get_json(&url).context("Failed to list threads")
    }

    /// Get full message details by ID
    pub fn get_message(&self, id: &MessageId) -> Result<GmailMessage> {
        let url = format!(
            "{}/users/me/messages/{}?format=full",
            Self::BASE_URL,
            id.as_str()
        );
        self.get_json(&url)
            .with_context(|| format!("Failed to get message {}", id.as_str()))
    }

    /// Get a full thread (all constituent messages) by ID
    pub fn get_thread(&self, id: &ThreadId) -> Result<GmailThread> {
        let url = format!(
            "{}/users/me/threads/{}?format=full",
            Self::BASE_URL,
            id.as_str()
        );
        self.get_json(&url)
            .with_context(|| format!("Failed to get thread {}", id.as_str()))
    }

    /// Get the authenticated user's profile (mailbox address)
    pub fn get_profile(&self) -> Result<ProfileResponse> {
        let url = format!("{}/users/me/profile", Self::BASE_URL);
        self.get_json(&url).context("Failed to get profile")
    }

    /// Send a message, optionally as a reply within an existing thread.
    ///
    /// The message is assembled as RFC 2822 text and submitted base64url
    /// encoded without padding, as the API requires.
    pub fn send_message(&self, outgoing: &OutgoingMessage) -> Result<SendMessageResponse> {
        let access_token = self.auth.get_access_token()?;
        let url = format!("{}/users/me/messages/send", Self::BASE_URL);

        let request = SendMessageRequest {
            raw: encode_raw_message(&outgoing.to, &outgoing.subject, &outgoing.body),
            thread_id: outgoing.thread_id.as_ref().map(|t| t.0.clone()),
        };

        let mut response = ureq::post(&url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .send_json(&request)
            .map_err(ApiError::from_ureq)
            .context("Failed to send message")?;

        response
            .body_mut()
            .read_json()
            .context("Failed to parse send response")
    }

    /// Fetch full details for every message ID, one result per ID.
    ///
    /// The sequential stand-in for a parallel fan-out: each fetch gets a
    /// bounded retry with backoff, and failures are reported per item
    /// rather than failing the whole batch.
    pub fn get_messages_batch(&self, ids: &[MessageId]) -> Vec<Result<GmailMessage>> {
        ids.iter()
            .map(|id| self.with_retry(|| self.get_message(id)))
            .collect()
    }

    /// Fetch full details for every thread ID, one result per ID
    pub fn get_threads_batch(&self, ids: &[ThreadId]) -> Vec<Result<GmailThread>> {
        ids.iter()
            .map(|id| self.with_retry(|| self.get_thread(id)))
            .collect()
    }

    /// Check if the client is authenticated
    pub fn is_authenticated(&self) -> bool {
        self.auth.is_authenticated()
    }

    /// Trigger authentication flow
    pub fn authenticate(&self) -> Result<()> {
        self.auth.get_access_token()?;
        Ok(())
    }

    /// GET a URL with a fresh bearer token and parse the JSON response
    fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let access_token = self.auth.get_access_token()?;

        let mut response = ureq::get(url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .call()
            .map_err(ApiError::from_ureq)?;

        let parsed = response
            .body_mut()
            .read_json()
            .context("Failed to parse API response")?;
        Ok(parsed)
    }

    /// Run an operation with exponential backoff on transient failures.
    /// Non-transient failures (401, 4xx) are returned immediately.
    fn with_retry<T>(&self, mut op: impl FnMut() -> Result<T>) -> Result<T> {
        let mut delay = Duration::from_millis(100);

        for attempt in 0..Self::BATCH_RETRIES {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let transient = err
                        .downcast_ref::<ApiError>()
                        .is_some_and(ApiError::is_transient);
                    if !transient || attempt + 1 == Self::BATCH_RETRIES {
                        return Err(err);
                    }
                    warn!("Transient API failure (attempt {}): {}", attempt + 1, err);
                    std::thread::sleep(delay + Duration::from_millis(rand_jitter()));
                    delay *= 2;
                }
            }
        }

        unreachable!("retry loop always returns")
    }
}

/// Assemble an RFC 2822 message and encode it the way the send endpoint
/// expects: URL-safe base64, no padding
fn encode_raw_message(to: &str, subject: &str, body: &str) -> String {
    let raw = format!(
        "To: {}\r\nSubject: {}\r\nContent-Type: text/plain; charset=\"UTF-8\"\r\n\r\n{}",
        to, subject, body
    );
    URL_SAFE_NO_PAD.encode(raw)
}

/// Generate a random jitter value (0-100ms)
fn rand_jitter() -> u64 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let hasher = RandomState::new().build_hasher();
    hasher.finish() % 100
}
