//! By-thread grouping
//!
//! Converts raw Gmail threads into chat-style [`Conversation`]s. The
//! first message of each thread names the conversation; every message is
//! classified as sent by the user (`me`) or the counterparty (`them`)
//! and sorted ascending by timestamp.

use chrono::Utc;

use crate::gmail::HeaderMap;
use crate::gmail::api::{GmailMessage, GmailThread};
use crate::mime::{self, BodyPolicy};
use crate::models::{ChatMessage, Conversation, EmailAddress, MessageId, SenderRole, ThreadId};

/// Fallback sender when a first message has no From header
const UNKNOWN_SENDER: &str = "Unknown";

/// Fallback subject when a first message has no Subject header
const NO_SUBJECT: &str = "No Subject";

/// Group provider threads into conversations using the default body
/// extraction policy.
///
/// `user_email` is the authenticated user's own mailbox address; a
/// message counts as sent by the user when its From header contains it.
/// Output order equals input order, one conversation per thread.
pub fn group_threads(threads: &[GmailThread], user_email: &str) -> Vec<Conversation> {
    group_threads_with(threads, user_email, BodyPolicy::default())
}

/// Group provider threads into conversations under an explicit body
/// extraction policy
pub fn group_threads_with(
    threads: &[GmailThread],
    user_email: &str,
    policy: BodyPolicy,
) -> Vec<Conversation> {
    threads
        .iter()
        .map(|thread| convert_thread(thread, user_email, policy))
        .collect()
}

fn convert_thread(thread: &GmailThread, user_email: &str, policy: BodyPolicy) -> Conversation {
    let messages = thread.messages.as_deref().unwrap_or_default();

    let first_headers = messages
        .first()
        .and_then(|m| m.payload.as_ref())
        .map(HeaderMap::from_payload)
        .unwrap_or_default();

    let sender = first_headers.get("from").unwrap_or(UNKNOWN_SENDER);
    let name = EmailAddress::parse(sender).display_name();
    let subject = first_headers.get("subject").unwrap_or(NO_SUBJECT);

    let mut chat_messages: Vec<ChatMessage> = messages
        .iter()
        .map(|msg| convert_message(msg, user_email, policy))
        .collect();
    chat_messages.sort_by_key(|m| m.timestamp);

    Conversation {
        id: ThreadId::new(&thread.id),
        name,
        email: sender.to_string(),
        subject: subject.to_string(),
        snippet: thread.snippet.clone().unwrap_or_default(),
        messages: chat_messages,
    }
}

fn convert_message(msg: &GmailMessage, user_email: &str, policy: BodyPolicy) -> ChatMessage {
    let headers = msg
        .payload
        .as_ref()
        .map(HeaderMap::from_payload)
        .unwrap_or_default();
    let from = headers.get("from").unwrap_or_default();

    let sender = if from.contains(user_email) {
        SenderRole::Me
    } else {
        SenderRole::Them
    };

    let text = msg
        .payload
        .as_ref()
        .map(|p| mime::extract_body_with(p, policy))
        .unwrap_or_else(|| mime::NO_CONTENT.to_string());

    // Stability fallback for display ordering, not a correctness-critical
    // timestamp
    let timestamp = msg
        .internal_date
        .parse::<i64>()
        .unwrap_or_else(|_| Utc::now().timestamp_millis());

    ChatMessage {
        id: MessageId::new(&msg.id),
        text,
        sender,
        timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmail::api::{Header, MessageBody, MessagePayload};
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    fn make_message(id: &str, thread_id: &str, from: &str, body: &str, ts: &str) -> GmailMessage {
        make_message_with_headers(
            id,
            thread_id,
            vec![("From", from), ("Subject", "Weekly sync")],
            body,
            ts,
        )
    }

    fn make_message_with_headers(
        id: &str,
        thread_id: &str,
        headers: Vec<(&str, &str)>,
        body: &str,
        ts: &str,
    ) -> GmailMessage {
        GmailMessage {
            id: id.to_string(),
            thread_id: thread_id.to_string(),
            label_ids: None,
            snippet: String::new(),
            internal_date: ts.to_string(),
            payload: Some(MessagePayload {
                headers: Some(
                    headers
                        .into_iter()
                        .map(|(n, v)| Header {
                            name: n.to_string(),
                            value: v.to_string(),
                        })
                        .collect(),
                ),
                body: Some(MessageBody {
                    size: Some(body.len() as u32),
                    data: Some(URL_SAFE_NO_PAD.encode(body)),
                }),
                parts: None,
                mime_type: Some("text/plain".to_string()),
            }),
        }
    }

    fn make_thread(id: &str, messages: Vec<GmailMessage>) -> GmailThread {
        GmailThread {
            id: id.to_string(),
            snippet: Some(format!("snippet for {}", id)),
            messages: Some(messages),
        }
    }

    #[test]
    fn test_one_conversation_per_thread_in_input_order() {
        let threads = vec![
            make_thread(
                "t1",
                vec![make_message("m1", "t1", "a@example.com", "hi", "1000")],
            ),
            make_thread(
                "t2",
                vec![make_message("m2", "t2", "b@example.com", "yo", "2000")],
            ),
        ];

        let conversations = group_threads(&threads, "me@example.com");
        assert_eq!(conversations.len(), 2);
        assert_eq!(conversations[0].id.as_str(), "t1");
        assert_eq!(conversations[1].id.as_str(), "t2");
    }

    #[test]
    fn test_display_name_from_human_name() {
        let threads = vec![make_thread(
            "t1",
            vec![make_message(
                "m1",
                "t1",
                "Jane Doe <jane@example.com>",
                "hello",
                "1000",
            )],
        )];

        let conversations = group_threads(&threads, "me@example.com");
        assert_eq!(conversations[0].name, "Jane Doe");
        assert_eq!(conversations[0].email, "Jane Doe <jane@example.com>");
        assert_eq!(conversations[0].subject, "Weekly sync");
    }

    #[test]
    fn test_display_name_falls_back_to_local_part() {
        let threads = vec![make_thread(
            "t1",
            vec![make_message("m1", "t1", "jane@example.com", "hello", "1000")],
        )];

        let conversations = group_threads(&threads, "me@example.com");
        assert_eq!(conversations[0].name, "jane");
    }

    #[test]
    fn test_missing_headers_use_fallbacks() {
        let threads = vec![make_thread(
            "t1",
            vec![make_message_with_headers(
                "m1",
                "t1",
                vec![("Date", "irrelevant")],
                "hello",
                "1000",
            )],
        )];

        let conversations = group_threads(&threads, "me@example.com");
        assert_eq!(conversations[0].name, "Unknown");
        assert_eq!(conversations[0].email, "Unknown");
        assert_eq!(conversations[0].subject, "No Subject");
    }

    #[test]
    fn test_sender_role_classification() {
        let threads = vec![make_thread(
            "t1",
            vec![
                make_message("m1", "t1", "Jane <jane@example.com>", "question", "1000"),
                make_message("m2", "t1", "Me <me@example.com>", "answer", "2000"),
            ],
        )];

        let conversations = group_threads(&threads, "me@example.com");
        let msgs = &conversations[0].messages;
        assert_eq!(msgs[0].sender, SenderRole::Them);
        assert_eq!(msgs[1].sender, SenderRole::Me);
    }

    #[test]
    fn test_messages_sorted_ascending_and_count_preserved() {
        let threads = vec![make_thread(
            "t1",
            vec![
                make_message("m3", "t1", "a@example.com", "third", "3000"),
                make_message("m1", "t1", "a@example.com", "first", "1000"),
                make_message("m2", "t1", "a@example.com", "second", "2000"),
            ],
        )];

        let conversations = group_threads(&threads, "me@example.com");
        let msgs = &conversations[0].messages;
        assert_eq!(msgs.len(), 3);
        assert!(msgs.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert_eq!(msgs[0].text, "first");
        assert_eq!(msgs[2].text, "third");
    }

    #[test]
    fn test_unparseable_timestamp_falls_back_to_now() {
        let before = Utc::now().timestamp_millis();
        let threads = vec![make_thread(
            "t1",
            vec![make_message("m1", "t1", "a@example.com", "hi", "not-a-number")],
        )];

        let conversations = group_threads(&threads, "me@example.com");
        let after = Utc::now().timestamp_millis();
        let ts = conversations[0].messages[0].timestamp;
        assert!(ts >= before && ts <= after);
    }

    #[test]
    fn test_decoded_body_flows_through() {
        let threads = vec![make_thread(
            "t1",
            vec![make_message("m1", "t1", "a@example.com", "hello there", "1000")],
        )];

        let conversations = group_threads(&threads, "me@example.com");
        assert_eq!(conversations[0].messages[0].text, "hello there");
    }

    #[test]
    fn test_empty_thread_yields_empty_conversation() {
        let threads = vec![GmailThread {
            id: "t1".to_string(),
            snippet: None,
            messages: None,
        }];

        let conversations = group_threads(&threads, "me@example.com");
        assert_eq!(conversations.len(), 1);
        assert!(conversations[0].messages.is_empty());
        assert_eq!(conversations[0].subject, "No Subject");
        assert_eq!(conversations[0].snippet, "");
    }
}
