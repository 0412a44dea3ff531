//! Shared helpers: synthetic event-stream frame encoding.

use base64::Engine as _;

/// Install a tracing subscriber once so decoder warnings show up under
/// `--nocapture`.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bedrock_stream=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

pub fn encode_header(name: &str, value: &str) -> Vec<u8> {
    let mut out = Vec::new();
    out.push(name.len() as u8);
    out.extend_from_slice(name.as_bytes());
    out.push(7); // string type tag
    out.extend_from_slice(&(value.len() as u16).to_be_bytes());
    out.extend_from_slice(value.as_bytes());
    out
}

pub fn encode_frame(headers: &[(&str, &str)], payload: &[u8]) -> Vec<u8> {
    let block: Vec<u8> = headers
        .iter()
        .flat_map(|(n, v)| encode_header(n, v))
        .collect();
    let total = (16 + block.len() + payload.len()) as u32;
    let mut out = Vec::new();
    out.extend_from_slice(&total.to_be_bytes());
    out.extend_from_slice(&(block.len() as u32).to_be_bytes());
    out.extend_from_slice(&[0; 4]); // prelude CRC, not validated by the decoder
    out.extend_from_slice(&block);
    out.extend_from_slice(payload);
    out.extend_from_slice(&[0; 4]); // trailing CRC
    out
}

/// A `chunk` frame whose double-encoded payload carries one text delta.
pub fn chunk_frame(text: &str) -> Vec<u8> {
    let inner = serde_json::json!({
        "type": "content_block_delta",
        "index": 0,
        "delta": { "type": "text_delta", "text": text },
    });
    wrap_chunk(&inner.to_string())
}

/// A `chunk` frame carrying an arbitrary inner document.
pub fn wrap_chunk(inner_json: &str) -> Vec<u8> {
    let encoded = base64::engine::general_purpose::STANDARD.encode(inner_json);
    let outer = serde_json::json!({ "bytes": encoded }).to_string();
    encode_frame(
        &[(":event-type", "chunk"), (":message-type", "event")],
        outer.as_bytes(),
    )
}

/// A service-reported exception frame.
pub fn exception_frame(exception_type: &str, message: &str) -> Vec<u8> {
    let payload = serde_json::json!({ "message": message }).to_string();
    encode_frame(
        &[
            (":message-type", "exception"),
            (":exception-type", exception_type),
        ],
        payload.as_bytes(),
    )
}
