//! Frame interpretation: from decoded frames to text deltas.
//!
//! A `chunk` frame's payload is a JSON envelope whose `bytes` field holds a
//! base64-encoded inner JSON document - the actual model-protocol event.
//! The double encoding is a property of the wire format, not a bug: the
//! outer envelope is transport framing, the inner document is the message.
//!
//! Unknown shapes are tolerated defensively: a missing `bytes` field, a
//! failed parse, or an unrecognized inner `type` is ignorable and logged,
//! never fatal. Service-reported exception frames are the only frames that
//! terminate the stream from here.

use base64::Engine as _;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::eventstream::frame::Frame;
use crate::types::events::ModelEvent;

/// Outcome of interpreting one frame. Pure function of the frame; no
/// cross-frame state is needed since content deltas are self-contained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEvent {
    /// An incremental fragment of model output.
    Delta(String),
    /// Nothing of interest; the stream continues.
    Ignored,
    /// The service reported an error; the stream must terminate.
    RemoteError { event_type: String, message: String },
}

/// Outer JSON envelope of a chunk payload.
#[derive(Deserialize)]
struct ChunkEnvelope {
    #[serde(default)]
    bytes: Option<String>,
}

/// Body of a service exception frame, best effort.
#[derive(Deserialize)]
struct ExceptionBody {
    #[serde(default, alias = "Message")]
    message: Option<String>,
}

pub fn interpret(frame: &Frame) -> FrameEvent {
    if is_exception(frame) {
        return remote_error(frame);
    }

    match frame.event_type() {
        Some("chunk") => interpret_chunk(&frame.payload),
        Some(other) => {
            debug!(event_type = other, "ignoring unrecognized event type");
            FrameEvent::Ignored
        }
        None => {
            debug!("frame without :event-type header, ignoring");
            FrameEvent::Ignored
        }
    }
}

/// Exception frames are flagged by `:message-type`, by an explicit
/// `:exception-type` header, or by an `...Exception` event type.
fn is_exception(frame: &Frame) -> bool {
    if matches!(frame.message_type(), Some("exception") | Some("error")) {
        return true;
    }
    if frame.headers.contains_key(":exception-type") {
        return true;
    }
    frame
        .event_type()
        .is_some_and(|t| t.ends_with("Exception"))
}

fn remote_error(frame: &Frame) -> FrameEvent {
    let event_type = frame
        .headers
        .get(":exception-type")
        .and_then(|v| v.as_str())
        .or_else(|| frame.event_type())
        .unwrap_or("unknown")
        .to_string();

    let message = serde_json::from_slice::<ExceptionBody>(&frame.payload)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| String::from_utf8_lossy(&frame.payload).into_owned());

    FrameEvent::RemoteError {
        event_type,
        message,
    }
}

fn interpret_chunk(payload: &[u8]) -> FrameEvent {
    let envelope: ChunkEnvelope = match serde_json::from_slice(payload) {
        Ok(e) => e,
        Err(e) => {
            warn!(error = %e, "chunk payload is not valid JSON, ignoring");
            return FrameEvent::Ignored;
        }
    };

    let Some(encoded) = envelope.bytes else {
        warn!("chunk envelope has no 'bytes' field, ignoring");
        return FrameEvent::Ignored;
    };

    let inner = match base64::engine::general_purpose::STANDARD.decode(&encoded) {
        Ok(b) => b,
        Err(e) => {
            warn!(error = %e, "chunk 'bytes' field is not valid base64, ignoring");
            return FrameEvent::Ignored;
        }
    };

    let event: ModelEvent = match serde_json::from_slice(&inner) {
        Ok(ev) => ev,
        Err(e) => {
            warn!(error = %e, "inner chunk document is not a known event, ignoring");
            return FrameEvent::Ignored;
        }
    };

    match event.delta_text() {
        Some(text) => FrameEvent::Delta(text.to_string()),
        None => FrameEvent::Ignored,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eventstream::frame::HeaderValue;
    use bytes::Bytes;
    use std::collections::HashMap;

    fn make_frame(headers: &[(&str, &str)], payload: &[u8]) -> Frame {
        let headers: HashMap<String, HeaderValue> = headers
            .iter()
            .map(|(n, v)| {
                (
                    n.to_string(),
                    HeaderValue {
                        value_type: 7,
                        bytes: Bytes::copy_from_slice(v.as_bytes()),
                    },
                )
            })
            .collect();
        Frame {
            total_length: (16 + payload.len()) as u32,
            headers,
            payload: Bytes::copy_from_slice(payload),
        }
    }

    fn chunk_payload(inner_json: &str) -> Vec<u8> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(inner_json);
        serde_json::to_vec(&serde_json::json!({ "bytes": encoded })).unwrap()
    }

    fn chunk_headers() -> Vec<(&'static str, &'static str)> {
        vec![(":event-type", "chunk"), (":message-type", "event")]
    }

    #[test]
    fn test_content_delta_extracted() {
        let payload = chunk_payload(
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hello"}}"#,
        );
        let frame = make_frame(&chunk_headers(), &payload);
        assert_eq!(interpret(&frame), FrameEvent::Delta("Hello".into()));
    }

    #[test]
    fn test_marker_events_ignored() {
        for inner in [
            r#"{"type":"message_start","message":{"id":"msg_1"}}"#,
            r#"{"type":"message_stop"}"#,
            r#"{"type":"content_block_stop","index":0}"#,
        ] {
            let frame = make_frame(&chunk_headers(), &chunk_payload(inner));
            assert_eq!(interpret(&frame), FrameEvent::Ignored);
        }
    }

    #[test]
    fn test_missing_event_type_ignored() {
        let frame = make_frame(&[], b"whatever");
        assert_eq!(interpret(&frame), FrameEvent::Ignored);
    }

    #[test]
    fn test_missing_bytes_field_ignored() {
        let frame = make_frame(&chunk_headers(), br#"{"p":"AAAA"}"#);
        assert_eq!(interpret(&frame), FrameEvent::Ignored);
    }

    #[test]
    fn test_invalid_base64_ignored() {
        let frame = make_frame(&chunk_headers(), br#"{"bytes":"!!not-base64!!"}"#);
        assert_eq!(interpret(&frame), FrameEvent::Ignored);
    }

    #[test]
    fn test_unparseable_payload_ignored() {
        let frame = make_frame(&chunk_headers(), b"\x00\x01binary garbage");
        assert_eq!(interpret(&frame), FrameEvent::Ignored);
    }

    #[test]
    fn test_exception_message_type_is_terminal() {
        let frame = make_frame(
            &[
                (":message-type", "exception"),
                (":exception-type", "throttlingException"),
            ],
            br#"{"message":"Too many requests"}"#,
        );
        match interpret(&frame) {
            FrameEvent::RemoteError {
                event_type,
                message,
            } => {
                assert_eq!(event_type, "throttlingException");
                assert_eq!(message, "Too many requests");
            }
            other => panic!("expected RemoteError, got {:?}", other),
        }
    }

    #[test]
    fn test_exception_event_type_suffix_is_terminal() {
        let frame = make_frame(
            &[(":event-type", "modelStreamErrorException")],
            b"stream broke",
        );
        match interpret(&frame) {
            FrameEvent::RemoteError {
                event_type,
                message,
            } => {
                assert_eq!(event_type, "modelStreamErrorException");
                assert_eq!(message, "stream broke");
            }
            other => panic!("expected RemoteError, got {:?}", other),
        }
    }
}
