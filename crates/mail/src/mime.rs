//! MIME body extraction
//!
//! Gmail delivers message bodies as a tree of MIME parts: internal nodes
//! are multipart containers, leaves carry base64url-encoded content.
//! `extract_body` walks that tree and returns the best human-readable
//! body it can find.
//!
//! Extraction is a pure function: no I/O, deterministic, and total. It
//! never fails past its own boundary; missing or undecodable content is
//! reported through the [`NO_CONTENT`] and [`DECODE_FAILURE`] sentinels.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use thiserror::Error;

use crate::gmail::api::{MessagePart, MessagePayload};

/// Sentinel returned when the payload tree holds no body data at all
pub const NO_CONTENT: &str = "No content";

/// Sentinel returned when body data exists but none of it decodes
pub const DECODE_FAILURE: &str = "[Unable to decode content]";

/// Parts nested deeper than this are treated as absent. Real messages
/// rarely nest past four or five levels; anything deeper is malformed
/// or adversarial.
const MAX_PART_DEPTH: usize = 64;

/// Body data that is not valid base64, or decodes to invalid UTF-8.
///
/// Recovered inside the extractor; callers only ever see the
/// [`DECODE_FAILURE`] sentinel.
#[derive(Debug, Error)]
#[error("body data is not valid base64/UTF-8")]
struct MalformedContentError;

/// Which body the extractor should prefer.
///
/// The Gmail payload tree usually carries several renderings of the same
/// message; the two policies reflect the two consumers Threadly has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyPolicy {
    /// Prefer a `text/html` leaf, fall back to `text/plain`, then to a
    /// typed body on the root node
    #[default]
    HtmlFirst,
    /// Concatenate every `text/plain` leaf in document order, ignoring
    /// HTML renderings entirely
    PlainConcat,
}

/// Extract the best-available body using the default [`BodyPolicy::HtmlFirst`]
pub fn extract_body(payload: &MessagePayload) -> String {
    extract_body_with(payload, BodyPolicy::HtmlFirst)
}

/// Extract the best-available body under an explicit policy
pub fn extract_body_with(payload: &MessagePayload, policy: BodyPolicy) -> String {
    match policy {
        BodyPolicy::HtmlFirst => extract_html_first(payload),
        BodyPolicy::PlainConcat => extract_plain_concat(payload),
    }
}

fn extract_html_first(payload: &MessagePayload) -> String {
    let parts = flatten_parts(payload.parts.as_deref().unwrap_or_default());
    let mut saw_data = false;

    for mime in ["text/html", "text/plain"] {
        for part in &parts {
            if !part_has_mime(part, mime) {
                continue;
            }
            if let Some(data) = part_data(part) {
                saw_data = true;
                if let Ok(text) = decode_body_data(data) {
                    return text;
                }
            }
        }
    }

    // Last resort: a non-multipart root carrying its own typed body
    if let Some(body) = &payload.body
        && let Some(data) = &body.data
        && payload
            .mime_type
            .as_deref()
            .is_some_and(|m| m.starts_with("text/html") || m.starts_with("text/plain"))
    {
        return match decode_body_data(data) {
            Ok(text) => text,
            Err(MalformedContentError) => DECODE_FAILURE.to_string(),
        };
    }

    if saw_data {
        DECODE_FAILURE.to_string()
    } else {
        NO_CONTENT.to_string()
    }
}

fn extract_plain_concat(payload: &MessagePayload) -> String {
    let mut text = String::new();
    let mut saw_data = false;

    // The root node itself may be the only text/plain "leaf"
    if payload
        .mime_type
        .as_deref()
        .is_some_and(|m| m.starts_with("text/plain"))
        && let Some(body) = &payload.body
        && let Some(data) = &body.data
    {
        saw_data = true;
        if let Ok(decoded) = decode_body_data(data) {
            text.push_str(&decoded);
        }
    }

    for part in flatten_parts(payload.parts.as_deref().unwrap_or_default()) {
        if !part_has_mime(part, "text/plain") {
            continue;
        }
        if let Some(data) = part_data(part) {
            saw_data = true;
            if let Ok(decoded) = decode_body_data(data) {
                text.push_str(&decoded);
            }
        }
    }

    if !text.is_empty() {
        text
    } else if saw_data {
        DECODE_FAILURE.to_string()
    } else {
        NO_CONTENT.to_string()
    }
}

/// Flatten a parts tree into document (preorder) order with an explicit
/// stack. Depth is capped so a degenerate, deeply-nested tree can't blow
/// the call stack; parts beyond the cap are treated as absent.
fn flatten_parts(parts: &[MessagePart]) -> Vec<&MessagePart> {
    let mut out = Vec::new();
    let mut stack: Vec<(&MessagePart, usize)> = parts.iter().rev().map(|p| (p, 1)).collect();

    while let Some((part, depth)) = stack.pop() {
        out.push(part);
        if depth >= MAX_PART_DEPTH {
            continue;
        }
        if let Some(children) = &part.parts {
            for child in children.iter().rev() {
                stack.push((child, depth + 1));
            }
        }
    }

    out
}

fn part_has_mime(part: &MessagePart, mime: &str) -> bool {
    part.mime_type.as_deref().is_some_and(|m| m.starts_with(mime))
}

fn part_data(part: &MessagePart) -> Option<&str> {
    part.body.as_ref()?.data.as_deref()
}

/// Decode base64-encoded body data into UTF-8 text.
///
/// Gmail uses the URL-safe alphabet without padding, but real responses
/// vary, so padded and standard-alphabet variants are tolerated.
fn decode_body_data(data: &str) -> Result<String, MalformedContentError> {
    let data = data.trim();
    let decoders: &[&base64::engine::GeneralPurpose] =
        &[&URL_SAFE_NO_PAD, &URL_SAFE, &STANDARD, &STANDARD_NO_PAD];

    for decoder in decoders {
        if let Ok(bytes) = decoder.decode(data)
            && let Ok(text) = String::from_utf8(bytes)
        {
            return Ok(text);
        }
    }

    Err(MalformedContentError)
}
