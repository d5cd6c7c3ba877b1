//! Domain models for mail entities

mod conversation;
mod message;

pub use conversation::{ChatMessage, Conversation, DomainBucket, DomainGroups, SenderRole};
pub use message::{EmailAddress, MessageId, ThreadId};
