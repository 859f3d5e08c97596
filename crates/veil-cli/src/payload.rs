//! Text segments inside chat request payloads.
//!
//! Chat front ends post JSON in a handful of shapes. This module finds the
//! user-authored strings in each shape so they can be rewritten one by one
//! and written back into a copy of the original structure.
//!
//! Shapes are tried in this order; the first that applies wins:
//!
//! | Format | Shape |
//! |---|---|
//! | copilot | `{"event": "send", "content": [{"type": "text", "text": ..}]}` |
//! | perplexity | `{"query_str": .., "params": {"dsl_query": ..}}` or `{"query": ..}` |
//! | chatgpt | `{"messages": [{"content": .. }]}` where content is a string, `{"parts": [..]}` or a list of strings / `{"text": ..}` blocks |
//! | claude | `{"prompt": ..}` |
//! | gemini | `{"contents": [{"parts": [{"text": ..}]}]}` |

use serde::Serialize;
use serde_json::Value;

/// Recognised payload shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadFormat {
    Copilot,
    Perplexity,
    #[serde(rename = "chatgpt")]
    ChatGpt,
    Claude,
    Gemini,
    Unknown,
}

impl std::fmt::Display for PayloadFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PayloadFormat::Copilot => "copilot",
            PayloadFormat::Perplexity => "perplexity",
            PayloadFormat::ChatGpt => "chatgpt",
            PayloadFormat::Claude => "claude",
            PayloadFormat::Gemini => "gemini",
            PayloadFormat::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

fn non_empty_str(value: Option<&Value>) -> bool {
    value.and_then(Value::as_str).is_some_and(|s| !s.is_empty())
}

fn is_array(value: Option<&Value>) -> bool {
    value.is_some_and(Value::is_array)
}

/// Identify the payload shape.
pub fn detect_format(payload: &Value) -> PayloadFormat {
    let Some(obj) = payload.as_object() else {
        return PayloadFormat::Unknown;
    };
    if obj.get("event").and_then(Value::as_str) == Some("send") && is_array(obj.get("content")) {
        PayloadFormat::Copilot
    } else if non_empty_str(obj.get("query_str")) || non_empty_str(obj.get("query")) {
        PayloadFormat::Perplexity
    } else if is_array(obj.get("messages")) {
        PayloadFormat::ChatGpt
    } else if non_empty_str(obj.get("prompt")) {
        PayloadFormat::Claude
    } else if is_array(obj.get("contents")) {
        PayloadFormat::Gemini
    } else {
        PayloadFormat::Unknown
    }
}

/// Mutable references to every text segment of `payload`, in document order.
fn segments_mut(payload: &mut Value) -> Vec<&mut String> {
    let format = detect_format(payload);
    let mut out = Vec::new();
    let Some(obj) = payload.as_object_mut() else {
        return out;
    };

    match format {
        PayloadFormat::Copilot => {
            if let Some(Value::Array(items)) = obj.get_mut("content") {
                for item in items.iter_mut() {
                    let Some(item) = item.as_object_mut() else {
                        continue;
                    };
                    if item.get("type").and_then(Value::as_str) != Some("text") {
                        continue;
                    }
                    if let Some(Value::String(text)) = item.get_mut("text") {
                        out.push(text);
                    }
                }
            }
        }
        PayloadFormat::Perplexity => {
            if non_empty_str(obj.get("query_str")) {
                // Split borrows: query_str and params are distinct keys.
                let mut query_str = None;
                let mut dsl_query = None;
                for (key, value) in obj.iter_mut() {
                    match (key.as_str(), value) {
                        ("query_str", Value::String(s)) => query_str = Some(s),
                        ("params", Value::Object(params)) => {
                            if let Some(Value::String(s)) = params.get_mut("dsl_query") {
                                dsl_query = Some(s);
                            }
                        }
                        _ => {}
                    }
                }
                out.extend(query_str);
                out.extend(dsl_query);
            } else if let Some(Value::String(query)) = obj.get_mut("query") {
                out.push(query);
            }
        }
        PayloadFormat::ChatGpt => {
            if let Some(Value::Array(messages)) = obj.get_mut("messages") {
                for message in messages.iter_mut() {
                    let Some(content) = message.as_object_mut().and_then(|m| m.get_mut("content"))
                    else {
                        continue;
                    };
                    match content {
                        Value::String(text) => out.push(text),
                        Value::Object(nested) => {
                            if let Some(Value::Array(parts)) = nested.get_mut("parts") {
                                for part in parts.iter_mut() {
                                    if let Value::String(text) = part {
                                        out.push(text);
                                    }
                                }
                            }
                        }
                        Value::Array(blocks) => {
                            for block in blocks.iter_mut() {
                                match block {
                                    Value::String(text) => out.push(text),
                                    Value::Object(b) => {
                                        if let Some(Value::String(text)) = b.get_mut("text") {
                                            out.push(text);
                                        }
                                    }
                                    _ => {}
                                }
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
        PayloadFormat::Claude => {
            if let Some(Value::String(prompt)) = obj.get_mut("prompt") {
                out.push(prompt);
            }
        }
        PayloadFormat::Gemini => {
            if let Some(Value::Array(contents)) = obj.get_mut("contents") {
                for content in contents.iter_mut() {
                    let Some(Value::Array(parts)) =
                        content.as_object_mut().and_then(|c| c.get_mut("parts"))
                    else {
                        continue;
                    };
                    for part in parts.iter_mut() {
                        if let Some(Value::String(text)) =
                            part.as_object_mut().and_then(|p| p.get_mut("text"))
                        {
                            out.push(text);
                        }
                    }
                }
            }
        }
        PayloadFormat::Unknown => {}
    }

    out.retain(|s| !s.is_empty());
    out
}

/// All non-empty text segments, in document order.
pub fn extract_segments(payload: &Value) -> Vec<String> {
    let mut copy = payload.clone();
    segments_mut(&mut copy).into_iter().map(|s| s.clone()).collect()
}

/// A copy of `payload` with every text segment passed through `rewrite`.
/// Non-text fields are untouched.
pub fn rewrite_segments(payload: &Value, mut rewrite: impl FnMut(&str) -> String) -> Value {
    let mut copy = payload.clone();
    for segment in segments_mut(&mut copy) {
        *segment = rewrite(segment);
    }
    copy
}

/// A copy of `payload` with segments replaced positionally. Segments beyond
/// `replacements.len()` keep their original text.
pub fn replace_segments(payload: &Value, replacements: &[String]) -> Value {
    let mut next = replacements.iter();
    rewrite_segments(payload, |original| {
        next.next()
            .cloned()
            .unwrap_or_else(|| original.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detect_format_order() {
        assert_eq!(
            detect_format(&json!({"event": "send", "content": []})),
            PayloadFormat::Copilot
        );
        assert_eq!(
            detect_format(&json!({"query_str": "hi", "messages": []})),
            PayloadFormat::Perplexity
        );
        assert_eq!(detect_format(&json!({"query": "hi"})), PayloadFormat::Perplexity);
        assert_eq!(
            detect_format(&json!({"messages": [], "prompt": "x"})),
            PayloadFormat::ChatGpt
        );
        assert_eq!(detect_format(&json!({"prompt": "x"})), PayloadFormat::Claude);
        assert_eq!(detect_format(&json!({"contents": []})), PayloadFormat::Gemini);
        assert_eq!(detect_format(&json!({"prompt": ""})), PayloadFormat::Unknown);
        assert_eq!(detect_format(&json!([1, 2])), PayloadFormat::Unknown);
        assert_eq!(detect_format(&json!("text")), PayloadFormat::Unknown);
    }

    #[test]
    fn test_copilot_segments() {
        let payload = json!({
            "event": "send",
            "content": [
                {"type": "text", "text": "first"},
                {"type": "image", "url": "x"},
                {"type": "text", "text": "second"}
            ]
        });
        assert_eq!(extract_segments(&payload), vec!["first", "second"]);
        let out = rewrite_segments(&payload, str::to_uppercase);
        assert_eq!(out["content"][0]["text"], "FIRST");
        assert_eq!(out["content"][1]["url"], "x");
        assert_eq!(out["content"][2]["text"], "SECOND");
    }

    #[test]
    fn test_perplexity_segments() {
        let payload = json!({"query_str": "q1", "params": {"dsl_query": "q2", "mode": "fast"}});
        assert_eq!(extract_segments(&payload), vec!["q1", "q2"]);
        let out = replace_segments(&payload, &["a".into(), "b".into()]);
        assert_eq!(out, json!({"query_str": "a", "params": {"dsl_query": "b", "mode": "fast"}}));

        let payload = json!({"query": "who is John"});
        assert_eq!(extract_segments(&payload), vec!["who is John"]);
    }

    #[test]
    fn test_chatgpt_content_shapes() {
        let payload = json!({
            "model": "gpt",
            "messages": [
                {"role": "system", "content": "plain"},
                {"role": "user", "content": {"content_type": "text", "parts": ["p1", "p2"]}},
                {"role": "user", "content": ["s1", {"type": "text", "text": "b1"}, {"type": "image"}]},
                null,
                {"role": "assistant", "content": ""}
            ]
        });
        assert_eq!(extract_segments(&payload), vec!["plain", "p1", "p2", "s1", "b1"]);

        let out = rewrite_segments(&payload, |s| format!("<{}>", s));
        assert_eq!(out["model"], "gpt");
        assert_eq!(out["messages"][0]["content"], "<plain>");
        // Parts are rewritten individually, not merged.
        assert_eq!(out["messages"][1]["content"]["parts"], json!(["<p1>", "<p2>"]));
        assert_eq!(out["messages"][2]["content"][1]["text"], "<b1>");
        assert_eq!(out["messages"][2]["content"][2], json!({"type": "image"}));
        assert_eq!(out["messages"][4]["content"], "");
    }

    #[test]
    fn test_claude_and_gemini() {
        let payload = json!({"prompt": "hello", "model": "c"});
        assert_eq!(extract_segments(&payload), vec!["hello"]);

        let payload = json!({
            "contents": [
                {"role": "user", "parts": [{"text": "g1"}, {"inline_data": {}}, null]},
                {"role": "user"},
                {"parts": [{"text": "g2"}]}
            ]
        });
        assert_eq!(extract_segments(&payload), vec!["g1", "g2"]);
        let out = replace_segments(&payload, &["x".into()]);
        assert_eq!(out["contents"][0]["parts"][0]["text"], "x");
        assert_eq!(out["contents"][2]["parts"][0]["text"], "g2");
    }

    #[test]
    fn test_unknown_payload_has_no_segments() {
        let payload = json!({"foo": "bar"});
        assert!(extract_segments(&payload).is_empty());
        assert_eq!(rewrite_segments(&payload, |_| "x".into()), payload);
    }
}
