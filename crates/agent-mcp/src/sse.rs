//! Server-sent events
//!
//! Streamable-HTTP servers may answer a POST with `text/event-stream`. The
//! stream can carry notifications ahead of the response, so the client scans
//! every `data:` payload for the message whose id matches its request.

use serde_json::Value;

use crate::error::Result;
use crate::types::{JsonRpcResponse, RpcId};

/// One dispatched event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub id: Option<String>,
    pub data: String,
}

/// Split an event-stream body into events.
pub fn parse_events(body: &str) -> Vec<SseEvent> {
    let mut events = Vec::new();
    let mut current = SseEvent::default();
    let mut data_lines: Vec<&str> = Vec::new();

    for line in body.lines() {
        if line.is_empty() {
            if !data_lines.is_empty() {
                current.data = data_lines.join("\n");
                events.push(std::mem::take(&mut current));
            } else {
                current = SseEvent::default();
            }
            data_lines.clear();
            continue;
        }
        if line.starts_with(':') {
            continue;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "data" => data_lines.push(value),
            "event" => current.event = Some(value.to_string()),
            "id" => current.id = Some(value.to_string()),
            _ => {}
        }
    }

    // Streams closed without a trailing blank line
    if !data_lines.is_empty() {
        current.data = data_lines.join("\n");
        events.push(current);
    }

    events
}

/// Find the response to `id` in an event-stream body.
pub fn find_response(body: &str, id: &RpcId) -> Result<Option<JsonRpcResponse>> {
    for event in parse_events(body) {
        let Ok(payload) = serde_json::from_str::<Value>(&event.data) else {
            tracing::debug!(data = %event.data, "Skipping non-JSON event");
            continue;
        };

        let candidates = match payload {
            Value::Array(batch) => batch,
            single => vec![single],
        };
        for message in candidates {
            let is_response = message.get("result").is_some() || message.get("error").is_some();
            if is_response && message.get("id").is_some_and(|raw| id.matches(raw)) {
                return Ok(Some(serde_json::from_value(message)?));
            }
        }
    }

    Ok(None)
}
