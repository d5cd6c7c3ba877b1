//! By-sender-domain grouping
//!
//! When no provider threading is available, messages sharing a sender
//! domain act as a conversation proxy. Buckets keep the first-seen order
//! of their domain; messages within a bucket sort ascending by internal
//! date.
//!
//! Messages whose From header yields no domain are returned in
//! [`DomainGroups::unclassified`] instead of being dropped. (Earlier
//! Threadly clients discarded them outright; keeping them visible lets
//! callers decide.)

use std::collections::HashMap;

use crate::gmail::HeaderMap;
use crate::gmail::api::GmailMessage;
use crate::models::{DomainBucket, DomainGroups, EmailAddress};

/// Group a flat message list into per-domain buckets.
///
/// Consumes the input; every message ends up in exactly one bucket or in
/// `unclassified`. Grouping twice yields the same partition.
pub fn group_by_domain(messages: Vec<GmailMessage>) -> DomainGroups {
    let mut buckets: Vec<DomainBucket> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut unclassified: Vec<GmailMessage> = Vec::new();

    for message in messages {
        match sender_domain(&message) {
            Some(domain) => {
                let slot = *index.entry(domain.clone()).or_insert_with(|| {
                    buckets.push(DomainBucket {
                        domain,
                        messages: Vec::new(),
                    });
                    buckets.len() - 1
                });
                buckets[slot].messages.push(message);
            }
            None => unclassified.push(message),
        }
    }

    for bucket in &mut buckets {
        bucket
            .messages
            .sort_by_key(|m| m.internal_date.parse::<i64>().unwrap_or(0));
    }

    DomainGroups {
        buckets,
        unclassified,
    }
}

/// Extract the sender domain from a message's From header: the address
/// inside angle brackets when present (else the whole header value),
/// then the substring after `@` up to whitespace or `>`.
fn sender_domain(message: &GmailMessage) -> Option<String> {
    let payload = message.payload.as_ref()?;
    let from = HeaderMap::from_payload(payload).get("from")?.to_string();
    EmailAddress::parse(&from).domain().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmail::api::{Header, MessagePayload};

    fn make_message(id: &str, from: Option<&str>, ts: &str) -> GmailMessage {
        GmailMessage {
            id: id.to_string(),
            thread_id: format!("t-{}", id),
            label_ids: None,
            snippet: String::new(),
            internal_date: ts.to_string(),
            payload: Some(MessagePayload {
                headers: Some(
                    from.map(|v| {
                        vec![Header {
                            name: "From".to_string(),
                            value: v.to_string(),
                        }]
                    })
                    .unwrap_or_default(),
                ),
                body: None,
                parts: None,
                mime_type: Some("text/plain".to_string()),
            }),
        }
    }

    #[test]
    fn test_groups_by_domain_first_seen_order() {
        let groups = group_by_domain(vec![
            make_message("m1", Some("a@example.com"), "1000"),
            make_message("m2", Some("b@other.org"), "2000"),
            make_message("m3", Some("Jane <jane@example.com>"), "3000"),
        ]);

        assert_eq!(groups.buckets.len(), 2);
        assert_eq!(groups.buckets[0].domain, "example.com");
        assert_eq!(groups.buckets[1].domain, "other.org");
        assert_eq!(groups.buckets[0].messages.len(), 2);
        assert!(groups.unclassified.is_empty());
    }

    #[test]
    fn test_messages_sorted_ascending_within_bucket() {
        let groups = group_by_domain(vec![
            make_message("m2", Some("a@example.com"), "2000"),
            make_message("m1", Some("b@example.com"), "1000"),
            make_message("m3", Some("c@example.com"), "3000"),
        ]);

        let ids: Vec<&str> = groups.buckets[0]
            .messages
            .iter()
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn test_domainless_message_goes_to_unclassified() {
        // First message lands in example.com; second has no @ anywhere
        // and is kept aside rather than dropped
        let groups = group_by_domain(vec![
            make_message("m1", Some("\"Jane Doe\" <jane@example.com>"), "1000"),
            make_message("m2", Some("mailer-daemon"), "2000"),
        ]);

        assert_eq!(groups.buckets.len(), 1);
        assert_eq!(groups.buckets[0].domain, "example.com");
        assert_eq!(groups.unclassified.len(), 1);
        assert_eq!(groups.unclassified[0].id, "m2");
    }

    #[test]
    fn test_missing_from_header_is_unclassified() {
        let groups = group_by_domain(vec![make_message("m1", None, "1000")]);
        assert!(groups.buckets.is_empty());
        assert_eq!(groups.unclassified.len(), 1);
    }

    #[test]
    fn test_no_message_lost() {
        let groups = group_by_domain(vec![
            make_message("m1", Some("a@example.com"), "1000"),
            make_message("m2", Some("nodomain"), "2000"),
            make_message("m3", Some("b@other.org"), "3000"),
        ]);
        assert_eq!(groups.message_count(), 3);
    }

    #[test]
    fn test_regrouping_is_idempotent() {
        let first = group_by_domain(vec![
            make_message("m1", Some("a@example.com"), "3000"),
            make_message("m2", Some("b@other.org"), "2000"),
            make_message("m3", Some("c@example.com"), "1000"),
        ]);

        let partition: Vec<(String, Vec<String>)> = first
            .buckets
            .iter()
            .map(|b| {
                (
                    b.domain.clone(),
                    b.messages.iter().map(|m| m.id.clone()).collect(),
                )
            })
            .collect();

        let second = group_by_domain(first.into_flat_messages());
        let repartition: Vec<(String, Vec<String>)> = second
            .buckets
            .iter()
            .map(|b| {
                (
                    b.domain.clone(),
                    b.messages.iter().map(|m| m.id.clone()).collect(),
                )
            })
            .collect();

        assert_eq!(partition, repartition);
    }
}
