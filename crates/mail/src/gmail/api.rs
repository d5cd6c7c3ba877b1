//! Gmail API response types
//!
//! Serde mappings for the subset of the Gmail REST API v1 that Threadly
//! consumes. Field names follow the API's camelCase convention.

use serde::{Deserialize, Serialize};

/// Response from listing messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMessagesResponse {
    pub messages: Option<Vec<MessageRef>>,
    pub next_page_token: Option<String>,
    pub result_size_estimate: Option<u32>,
}

/// Response from listing threads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListThreadsResponse {
    pub threads: Option<Vec<ThreadRef>>,
    pub next_page_token: Option<String>,
    pub result_size_estimate: Option<u32>,
}

/// Reference to a message (just ID and thread ID)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub id: String,
    pub thread_id: String,
}

/// Reference to a thread as returned by the list endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadRef {
    pub id: String,
    pub snippet: Option<String>,
    pub history_id: Option<String>,
}

/// Full thread from the Gmail API, with its constituent messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailThread {
    pub id: String,
    pub snippet: Option<String>,
    pub messages: Option<Vec<GmailMessage>>,
}

/// Full message from the Gmail API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailMessage {
    pub id: String,
    pub thread_id: String,
    pub label_ids: Option<Vec<String>>,
    #[serde(default)]
    pub snippet: String,
    /// Epoch milliseconds as a decimal string
    #[serde(default)]
    pub internal_date: String,
    pub payload: Option<MessagePayload>,
}

/// Message payload containing headers and body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    pub headers: Option<Vec<Header>>,
    pub body: Option<MessageBody>,
    pub parts: Option<Vec<MessagePart>>,
    pub mime_type: Option<String>,
}

/// Email header (name-value pair)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// Message body (base64url encoded when present)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageBody {
    pub size: Option<u32>,
    pub data: Option<String>,
}

/// Message part (for multipart messages); parts nest arbitrarily deep
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    pub part_id: Option<String>,
    pub mime_type: Option<String>,
    pub filename: Option<String>,
    pub headers: Option<Vec<Header>>,
    pub body: Option<MessageBody>,
    pub parts: Option<Vec<MessagePart>>,
}

/// Response from the getProfile endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub email_address: String,
    pub messages_total: Option<u64>,
    pub threads_total: Option<u64>,
    pub history_id: Option<String>,
}

/// Request body for the send endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    /// Entire RFC 2822 message, base64url encoded without padding
    pub raw: String,
    /// Set when the outgoing message is a reply within an existing thread
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

/// Response from the send endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub id: String,
    pub thread_id: Option<String>,
}
