//! Conversation models produced by the grouping core
//!
//! Conversations are display-ready structures rebuilt fresh on every
//! fetch; they have no persisted identity across fetches.

use serde::{Deserialize, Serialize};

use super::{MessageId, ThreadId};
use crate::gmail::api::GmailMessage;

/// Who sent a message within a conversation, relative to the
/// authenticated user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SenderRole {
    /// The message's From header contains the user's own mailbox address
    #[serde(rename = "me")]
    Me,
    /// Anyone else
    #[serde(rename = "them")]
    Them,
}

/// A single message rendered for conversation display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    /// Decoded body text (or an extraction sentinel)
    pub text: String,
    pub sender: SenderRole,
    /// Epoch milliseconds; falls back to the time of grouping when the
    /// provider timestamp is absent or unparseable
    #[serde(rename = "ts")]
    pub timestamp: i64,
}

/// A provider thread rendered as a chat-style conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Provider thread ID
    pub id: ThreadId,
    /// Display name of the counterparty (sender's human name, else the
    /// local part of their address)
    pub name: String,
    /// Raw From header of the thread's first message ("Unknown" when
    /// missing)
    pub email: String,
    /// Subject of the first message ("No Subject" when missing)
    pub subject: String,
    /// Provider snippet for the thread
    pub snippet: String,
    /// Constituent messages, ascending by timestamp
    pub messages: Vec<ChatMessage>,
}

/// Messages from one sender domain, used as a conversation proxy when no
/// provider threading is available
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainBucket {
    pub domain: String,
    /// Raw messages sharing the domain, ascending by internal date
    pub messages: Vec<GmailMessage>,
}

/// Result of grouping a flat message list by sender domain.
///
/// Buckets appear in first-seen order of their domain. Messages with no
/// extractable sender domain are kept in `unclassified` rather than
/// silently dropped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainGroups {
    pub buckets: Vec<DomainBucket>,
    pub unclassified: Vec<GmailMessage>,
}

impl DomainGroups {
    /// Total number of messages across buckets and unclassified
    pub fn message_count(&self) -> usize {
        self.buckets.iter().map(|b| b.messages.len()).sum::<usize>() + self.unclassified.len()
    }

    /// Flatten every bucketed message back into one list, bucket by
    /// bucket. Unclassified messages are not included.
    pub fn into_flat_messages(self) -> Vec<GmailMessage> {
        self.buckets.into_iter().flat_map(|b| b.messages).collect()
    }
}
