//! Result Extraction
//!
//! Turns a raw tool-service result into a [`ToolResult`]. The raw shape comes
//! from a third-party surface, so extraction never fails: anything it cannot
//! classify becomes [`ContentItem::Unknown`].

use serde_json::Value;

use crate::tool::{ContentItem, ToolResult};

/// Normalize a raw `{"content": [...], "isError": bool}` result.
pub fn extract(raw: &Value) -> ToolResult {
    let content = match raw.get("content") {
        Some(Value::Array(items)) => items.iter().map(classify).collect(),
        _ if raw.is_null() => Vec::new(),
        Some(other) => vec![unknown(other)],
        None => vec![unknown(raw)],
    };

    let is_error = raw
        .get("isError")
        .or_else(|| raw.get("is_error"))
        .and_then(Value::as_bool)
        .unwrap_or(false);

    ToolResult { content, is_error }
}

/// Classify one content item by the payload it carries.
pub fn classify(item: &Value) -> ContentItem {
    if let Some(text) = item.get("text").filter(|v| !v.is_null()) {
        return ContentItem::Text { text: stringify(text) };
    }

    if let Some(data) = item.get("data").filter(|v| !v.is_null()) {
        return ContentItem::Binary {
            kind: declared_type(item).unwrap_or("unknown").to_string(),
            data: stringify(data),
            mime_type: mime_type(item),
        };
    }

    // Embedded resources nest their payload one level down
    if let Some(resource) = item.get("resource").filter(|v| v.is_object()) {
        if let Some(text) = resource.get("text").filter(|v| !v.is_null()) {
            return ContentItem::Text { text: stringify(text) };
        }
        if let Some(blob) = resource.get("blob").filter(|v| !v.is_null()) {
            return ContentItem::Binary {
                kind: "resource".into(),
                data: stringify(blob),
                mime_type: mime_type(resource),
            };
        }
    }

    unknown(item)
}

fn declared_type(item: &Value) -> Option<&str> {
    item.get("type").and_then(Value::as_str).filter(|t| !t.is_empty())
}

fn mime_type(item: &Value) -> Option<String> {
    item.get("mimeType")
        .or_else(|| item.get("mime_type"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn unknown(value: &Value) -> ContentItem {
    ContentItem::Unknown { repr: stringify(value) }
}

/// Strings verbatim, everything else as compact JSON
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_and_image_items() {
        let raw = json!({
            "content": [
                {"type": "text", "text": "### Customer"},
                {"type": "image", "data": "iVBORw0K", "mimeType": "image/png"}
            ],
            "isError": false
        });

        let result = extract(&raw);
        assert!(!result.is_error);
        assert_eq!(result.content[0], ContentItem::text("### Customer"));
        assert_eq!(
            result.content[1],
            ContentItem::Binary {
                kind: "image".into(),
                data: "iVBORw0K".into(),
                mime_type: Some("image/png".into()),
            }
        );
    }

    #[test]
    fn test_data_without_type_is_unknown_kind() {
        let result = extract(&json!({"content": [{"data": "AAEC"}]}));
        assert!(matches!(&result.content[0], ContentItem::Binary { kind, .. } if kind == "unknown"));
    }

    #[test]
    fn test_items_without_payload_fall_back() {
        let raw = json!({"content": [{"type": "mystery"}, 42, "plain"], "isError": true});
        let result = extract(&raw);

        assert!(result.is_error);
        assert_eq!(result.content.len(), 3);
        assert_eq!(result.content[0], ContentItem::Unknown { repr: r#"{"type":"mystery"}"#.into() });
        assert_eq!(result.content[1], ContentItem::Unknown { repr: "42".into() });
        assert_eq!(result.content[2], ContentItem::Unknown { repr: "plain".into() });
    }

    #[test]
    fn test_embedded_resource() {
        let raw = json!({"content": [
            {"type": "resource", "resource": {"uri": "mem://a", "text": "hello"}},
            {"type": "resource", "resource": {"uri": "mem://b", "blob": "AA==", "mimeType": "application/pdf"}}
        ]});
        let result = extract(&raw);

        assert_eq!(result.content[0], ContentItem::text("hello"));
        assert!(matches!(&result.content[1], ContentItem::Binary { kind, .. } if kind == "resource"));
    }

    #[test]
    fn test_malformed_results_never_panic() {
        assert!(extract(&Value::Null).content.is_empty());
        assert!(!extract(&json!("oops")).is_error);
        assert_eq!(extract(&json!({"content": "flat"})).content.len(), 1);
        assert!(!extract(&json!({"isError": "yes"})).is_error);
        assert!(extract(&json!({"content": [], "is_error": true})).is_error);
    }
}
