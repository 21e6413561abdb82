// src/calls.rs
//! Voice-assistant webhook: turn end-of-call reports into `call_notes` rows.

use metrics::counter;
use serde_json::Value;

use crate::store::{CallNote, PortalStore};

pub const END_OF_CALL_REPORT: &str = "end-of-call-report";
pub const DEFAULT_CATEGORY: &str = "general";
pub const NEW_STATUS: &str = "new";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    Recorded(CallNote),
    /// Any message type other than the end-of-call report.
    Ignored(String),
}

// First path holding a non-empty string.
fn first_str<'a>(body: &'a Value, pointers: &[&str]) -> Option<&'a str> {
    pointers
        .iter()
        .filter_map(|p| body.pointer(p).and_then(Value::as_str))
        .find(|s| !s.is_empty())
}

fn text_or(body: &Value, pointers: &[&str], fallback: &str) -> String {
    first_str(body, pointers).unwrap_or(fallback).to_string()
}

/// `None` unless `message.type` is an end-of-call report.
pub fn parse_report(body: &Value) -> Option<CallNote> {
    if body.pointer("/message/type").and_then(Value::as_str) != Some(END_OF_CALL_REPORT) {
        return None;
    }
    Some(CallNote {
        caller_name: text_or(body, &["/message/analysis/structuredData/caller_name"], ""),
        caller_phone: text_or(
            body,
            &["/message/call/customer/number", "/customer/number"],
            "",
        ),
        category: text_or(
            body,
            &["/message/analysis/structuredData/category"],
            DEFAULT_CATEGORY,
        ),
        summary: text_or(body, &["/message/summary", "/message/analysis/summary"], ""),
        transcript: text_or(body, &["/message/transcript"], ""),
        vapi_call_id: text_or(body, &["/message/call/id"], ""),
        status: NEW_STATUS.to_string(),
    })
}

/// Short, non-reversible tag for a phone number so logs can correlate calls.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Record the report if it is one. Store errors are returned as-is so the
/// caller can echo the store's message.
pub async fn ingest_report(store: &dyn PortalStore, body: &Value) -> anyhow::Result<CallOutcome> {
    let Some(note) = parse_report(body) else {
        let kind = body
            .pointer("/message/type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        counter!("call_reports_ignored_total").increment(1);
        tracing::debug!(message_type = %kind, "ignoring voice webhook message");
        return Ok(CallOutcome::Ignored(kind));
    };

    store.record_call_note(&note).await?;

    counter!("call_notes_recorded_total").increment(1);
    tracing::info!(
        call_id = %note.vapi_call_id,
        caller = %anon_hash(&note.caller_phone),
        category = %note.category,
        "call note recorded"
    );
    Ok(CallOutcome::Recorded(note))
}
