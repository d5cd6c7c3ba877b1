//! Mail crate - Gmail conversation engine for Threadly
//!
//! This crate provides platform-independent mail functionality including:
//! - Domain models (Conversation, ChatMessage, EmailAddress)
//! - Gmail API client and OAuth authentication
//! - MIME body extraction from Gmail payload trees
//! - Conversation grouping (by provider thread and by sender domain)
//! - Fetch pipeline tying the API boundary to the grouping core
//!
//! Conversations are rebuilt from scratch on every fetch; the crate keeps
//! no persistent state besides OAuth tokens. It has zero UI dependencies.

pub mod config;
pub mod gmail;
pub mod inbox;
pub mod mime;
pub mod models;
pub mod query;

pub use config::GmailCredentials;
pub use gmail::{ApiError, GmailAuth, GmailClient, HeaderMap, OutgoingMessage, api};
pub use inbox::{FetchStats, fetch_conversations, fetch_domain_groups};
pub use mime::{BodyPolicy, DECODE_FAILURE, NO_CONTENT, extract_body, extract_body_with};
pub use models::{
    ChatMessage, Conversation, DomainBucket, DomainGroups, EmailAddress, MessageId, SenderRole,
    ThreadId,
};
pub use query::{group_by_domain, group_threads, group_threads_with};
