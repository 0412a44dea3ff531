//! Decoded model-protocol events and the terminal outcome of a stream call.

use serde::Deserialize;

/// Inner model-protocol event, decoded once from a chunk frame's
/// base64-wrapped payload.
///
/// The wire format double-encodes: the frame payload is a JSON envelope whose
/// `bytes` field holds base64 of this document. Only `content_block_delta`
/// carries text; start/stop markers are recognized so callers can tell them
/// apart from genuinely unknown shapes.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ModelEvent {
    #[serde(rename = "message_start")]
    MessageStart,

    #[serde(rename = "content_block_start")]
    ContentBlockStart,

    #[serde(rename = "content_block_delta")]
    ContentBlockDelta {
        #[serde(default)]
        index: Option<u64>,
        delta: BlockDelta,
    },

    #[serde(rename = "content_block_stop")]
    ContentBlockStop,

    #[serde(rename = "message_delta")]
    MessageDelta,

    #[serde(rename = "message_stop")]
    MessageStop,

    #[serde(other)]
    Unknown,
}

/// The `delta` object inside a `content_block_delta` event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlockDelta {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl ModelEvent {
    /// Extract the incremental text, if this event carries any.
    pub fn delta_text(&self) -> Option<&str> {
        match self {
            ModelEvent::ContentBlockDelta { delta, .. } => {
                delta.text.as_deref().filter(|t| !t.is_empty())
            }
            _ => None,
        }
    }
}

/// Terminal state of one stream call.
///
/// Exactly one outcome exists per call: either the full concatenated text, or
/// the partial text produced before the failure together with the error.
/// Partial output already forwarded to the end user stays visible either way.
#[derive(Debug)]
pub enum StreamOutcome {
    Completed(String),
    Failed {
        partial: String,
        error: crate::Error,
    },
}

impl StreamOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, StreamOutcome::Completed(_))
    }

    /// The text produced by the stream, complete or partial.
    pub fn text(&self) -> &str {
        match self {
            StreamOutcome::Completed(t) => t,
            StreamOutcome::Failed { partial, .. } => partial,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_block_delta_text() {
        let json = r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hi"}}"#;
        let ev: ModelEvent = serde_json::from_str(json).unwrap();
        assert_eq!(ev.delta_text(), Some("Hi"));
    }

    #[test]
    fn test_empty_delta_yields_nothing() {
        let json = r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":""}}"#;
        let ev: ModelEvent = serde_json::from_str(json).unwrap();
        assert_eq!(ev.delta_text(), None);
    }

    #[test]
    fn test_markers_parse_and_carry_no_text() {
        for json in [
            r#"{"type":"message_start","message":{"id":"msg_1","role":"assistant"}}"#,
            r#"{"type":"message_stop"}"#,
            r#"{"type":"content_block_start","index":0,"content_block":{"type":"text"}}"#,
        ] {
            let ev: ModelEvent = serde_json::from_str(json).unwrap();
            assert_eq!(ev.delta_text(), None);
        }
    }

    #[test]
    fn test_unknown_type_tolerated() {
        let ev: ModelEvent =
            serde_json::from_str(r#"{"type":"some_future_event","data":42}"#).unwrap();
        assert!(matches!(ev, ModelEvent::Unknown));
    }
}
