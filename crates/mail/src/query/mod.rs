//! Conversation grouping
//!
//! Two stateless transforms turn already-fetched Gmail data into
//! display-ready conversations: grouping by provider thread
//! ([`group_threads`]) and grouping by sender domain
//! ([`group_by_domain`]). Both operate on owned, in-memory input and
//! return freshly-built output; regrouping is total and idempotent.

mod conversations;
mod domains;

pub use conversations::{group_threads, group_threads_with};
pub use domains::group_by_domain;
