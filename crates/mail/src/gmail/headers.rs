//! Case-insensitive header access
//!
//! Gmail returns headers as an ordered list of name/value pairs with
//! inconsistent capitalization across senders ("From", "FROM", "from").
//! `HeaderMap` normalizes names once per message so lookups can't silently
//! miss on case.

use std::collections::HashMap;

use super::api::{Header, MessagePayload};

/// A case-insensitive mapping from header name to value, built once per
/// message. When a header repeats, the last occurrence wins.
#[derive(Debug, Clone, Default)]
pub struct HeaderMap {
    entries: HashMap<String, String>,
}

impl HeaderMap {
    /// Build a map from a raw header list
    pub fn new(headers: &[Header]) -> Self {
        let mut entries = HashMap::with_capacity(headers.len());
        for header in headers {
            entries.insert(header.name.to_ascii_lowercase(), header.value.clone());
        }
        Self { entries }
    }

    /// Build a map from a payload's headers, tolerating their absence
    pub fn from_payload(payload: &MessagePayload) -> Self {
        match &payload.headers {
            Some(headers) => Self::new(headers),
            None => Self::default(),
        }
    }

    /// Look up a header value by name, ignoring case
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_headers(pairs: &[(&str, &str)]) -> Vec<Header> {
        pairs
            .iter()
            .map(|(n, v)| Header {
                name: n.to_string(),
                value: v.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_lookup_ignores_case() {
        let map = HeaderMap::new(&make_headers(&[("FROM", "a@example.com")]));
        assert_eq!(map.get("from"), Some("a@example.com"));
        assert_eq!(map.get("From"), Some("a@example.com"));
        assert_eq!(map.get("FROM"), Some("a@example.com"));
    }

    #[test]
    fn test_missing_header() {
        let map = HeaderMap::new(&make_headers(&[("Subject", "Hi")]));
        assert_eq!(map.get("From"), None);
    }

    #[test]
    fn test_last_occurrence_wins() {
        let map = HeaderMap::new(&make_headers(&[
            ("Received", "first hop"),
            ("Received", "second hop"),
        ]));
        assert_eq!(map.get("received"), Some("second hop"));
    }

    #[test]
    fn test_from_payload_without_headers() {
        let payload = MessagePayload {
            headers: None,
            body: None,
            parts: None,
            mime_type: None,
        };
        let map = HeaderMap::from_payload(&payload);
        assert!(map.is_empty());
        assert_eq!(map.get("from"), None);
    }
}
