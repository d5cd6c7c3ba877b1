//! Inbox fetch pipeline
//!
//! Ties the Gmail boundary to the grouping core: list, fan out detail
//! fetches, group. Nothing is persisted; every call rebuilds its
//! conversations from scratch, so re-running is idempotent. Individual
//! fetch failures are logged and counted rather than failing the batch.

use anyhow::Result;
use log::{info, warn};

use crate::gmail::GmailClient;
use crate::gmail::api::{GmailMessage, GmailThread};
use crate::models::{Conversation, DomainGroups, MessageId, ThreadId};
use crate::query;

/// Statistics from a fetch operation
#[derive(Debug, Default, Clone)]
pub struct FetchStats {
    /// Number of items the list endpoint returned
    pub listed: usize,
    /// Number of items whose details were fetched successfully
    pub fetched: usize,
    /// Number of per-item fetch failures
    pub errors: usize,
    /// Duration of the whole fetch
    pub duration_ms: u64,
}

/// Fetch the user's inbox threads and group them into conversations.
///
/// # Arguments
/// * `client` - Gmail API client
/// * `max_threads` - Maximum number of threads to fetch
pub fn fetch_conversations(
    client: &GmailClient,
    max_threads: usize,
) -> Result<(Vec<Conversation>, FetchStats)> {
    let start = std::time::Instant::now();
    let mut stats = FetchStats::default();

    // The user's own address decides the me/them split
    let profile = client.get_profile()?;
    let user_email = profile.email_address;

    // 1. List inbox threads
    let list = client.list_threads(max_threads, Some("in:inbox"))?;
    let refs = list.threads.unwrap_or_default();
    stats.listed = refs.len();

    if refs.is_empty() {
        stats.duration_ms = start.elapsed().as_millis() as u64;
        return Ok((Vec::new(), stats));
    }

    // 2. Fan out detail fetches
    let ids: Vec<ThreadId> = refs.iter().map(|t| ThreadId::new(&t.id)).collect();
    let threads: Vec<GmailThread> = collect_ok(client.get_threads_batch(&ids), &mut stats);

    // 3. Group into conversations
    let conversations = query::group_threads(&threads, &user_email);

    stats.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Fetched {} of {} threads into {} conversations in {}ms ({} errors)",
        stats.fetched,
        stats.listed,
        conversations.len(),
        stats.duration_ms,
        stats.errors
    );

    Ok((conversations, stats))
}

/// Fetch recent messages and group them into sender-domain buckets.
///
/// # Arguments
/// * `client` - Gmail API client
/// * `max_messages` - Maximum number of messages to fetch
pub fn fetch_domain_groups(
    client: &GmailClient,
    max_messages: usize,
) -> Result<(DomainGroups, FetchStats)> {
    let start = std::time::Instant::now();
    let mut stats = FetchStats::default();

    // 1. List message IDs
    let list = client.list_messages(max_messages, None, None)?;
    let refs = list.messages.unwrap_or_default();
    stats.listed = refs.len();

    if refs.is_empty() {
        stats.duration_ms = start.elapsed().as_millis() as u64;
        return Ok((DomainGroups::default(), stats));
    }

    // 2. Fan out detail fetches
    let ids: Vec<MessageId> = refs.iter().map(|m| MessageId::new(&m.id)).collect();
    let messages: Vec<GmailMessage> = collect_ok(client.get_messages_batch(&ids), &mut stats);

    // 3. Group by sender domain
    let groups = query::group_by_domain(messages);

    stats.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Fetched {} of {} messages into {} domain buckets ({} unclassified, {} errors) in {}ms",
        stats.fetched,
        stats.listed,
        groups.buckets.len(),
        groups.unclassified.len(),
        stats.errors,
        stats.duration_ms
    );

    Ok((groups, stats))
}

/// Keep successful batch results, logging and counting the failures
fn collect_ok<T>(results: Vec<Result<T>>, stats: &mut FetchStats) -> Vec<T> {
    let mut ok = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Ok(value) => ok.push(value),
            Err(e) => {
                warn!("Failed to fetch item: {}", e);
                stats.errors += 1;
            }
        }
    }
    stats.fetched = ok.len();
    ok
}
