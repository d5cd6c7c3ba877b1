//! Gmail API integration
//!
//! This module provides:
//! - OAuth2 authentication flow (with token refresh and revocation)
//! - Gmail API client for listing/fetching messages and threads, and
//!   for sending replies
//! - Header access as a case-insensitive map

pub mod api;
mod auth;
mod client;
mod headers;

pub use auth::GmailAuth;
pub use client::{ApiError, GmailClient, OutgoingMessage};
pub use headers::HeaderMap;
