//! Invocation payload construction and AWS Signature V4 request signing.
//!
//! Bedrock's Anthropic models share the Messages API shape with a few
//! Bedrock-specific twists:
//! - The model never appears in the body; it is part of the URL path.
//! - A fixed `anthropic_version` marker replaces the version header.
//! - System messages are a top-level `system` parameter, not part of
//!   `messages`.
//! - `max_tokens` is required, not optional.
//!
//! Signatures are a pure function of the request plus the timestamp, so the
//! signing entry point takes an explicit time and the public builder supplies
//! wall-clock now. A signed request is valid only for a short window and is
//! never reused across calls.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::config::{BedrockConfig, SamplingConfig};
use crate::types::message::{Message, MessageRole};
use crate::{Error, Result};

const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";
const SERVICE: &str = "bedrock";
const ALGORITHM: &str = "AWS4-HMAC-SHA256";

type HmacSha256 = Hmac<Sha256>;

/// A fully signed HTTP request, ready to hand to the transport layer.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub method: String,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

/// Build and sign an invocation request for `model`.
///
/// `stream` selects between the `invoke-with-response-stream` and plain
/// `invoke` endpoints; the body is identical for both.
pub fn build_invoke_request(
    config: &BedrockConfig,
    model: &str,
    messages: &[Message],
    sampling: SamplingConfig,
    stream: bool,
) -> Result<SignedRequest> {
    build_invoke_request_at(config, model, messages, sampling, stream, Utc::now())
}

/// Same as [`build_invoke_request`] with an explicit signing timestamp, so
/// signatures are deterministic under test.
pub fn build_invoke_request_at(
    config: &BedrockConfig,
    model: &str,
    messages: &[Message],
    sampling: SamplingConfig,
    stream: bool,
    signed_at: DateTime<Utc>,
) -> Result<SignedRequest> {
    let body = invocation_payload(messages, sampling)?;
    let action = if stream {
        "invoke-with-response-stream"
    } else {
        "invoke"
    };
    let url = format!(
        "{}/model/{}/{}",
        config.runtime_endpoint(),
        uri_encode(model),
        action
    );
    sign(config, "POST", &url, body, signed_at)
}

/// Serialize the conversation into the model's expected request schema.
///
/// At most one system message is lifted into the top-level `system`
/// parameter (multiple are joined); everything else keeps its order.
fn invocation_payload(messages: &[Message], sampling: SamplingConfig) -> Result<Bytes> {
    let mut system_parts: Vec<&str> = Vec::new();
    let mut chat_messages: Vec<Value> = Vec::new();

    for m in messages {
        match m.role {
            MessageRole::System => system_parts.push(&m.content),
            _ => chat_messages.push(serde_json::json!({
                "role": m.role.as_str(),
                "content": m.content,
            })),
        }
    }

    let mut body = serde_json::json!({
        "anthropic_version": ANTHROPIC_VERSION,
        "max_tokens": sampling.max_tokens,
        "messages": chat_messages,
        "temperature": sampling.temperature,
    });
    if !system_parts.is_empty() {
        body["system"] = Value::String(system_parts.join("\n\n"));
    }

    let bytes = serde_json::to_vec(&body)?;
    Ok(Bytes::from(bytes))
}

/// Sign an arbitrary request with SigV4 at the given instant.
fn sign(
    config: &BedrockConfig,
    method: &str,
    url: &str,
    body: Bytes,
    signed_at: DateTime<Utc>,
) -> Result<SignedRequest> {
    let parsed = url::Url::parse(url)
        .map_err(|e| Error::configuration(format!("invalid endpoint URL {}: {}", url, e)))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| Error::configuration(format!("endpoint URL {} has no host", url)))?;
    let host = match parsed.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };

    let amz_date = signed_at.format("%Y%m%dT%H%M%SZ").to_string();
    let date_stamp = signed_at.format("%Y%m%d").to_string();
    let payload_hash = hex::encode(Sha256::digest(&body));

    // Canonical headers, sorted by name; the security token participates in
    // the signature when present.
    let mut canonical: Vec<(String, String)> = vec![
        ("content-type".into(), "application/json".into()),
        ("host".into(), host.clone()),
        ("x-amz-date".into(), amz_date.clone()),
    ];
    if let Some(token) = &config.credentials.session_token {
        canonical.push(("x-amz-security-token".into(), token.clone()));
    }
    canonical.sort_by(|a, b| a.0.cmp(&b.0));

    let canonical_headers: String = canonical
        .iter()
        .map(|(k, v)| format!("{}:{}\n", k, v.trim()))
        .collect();
    let signed_headers: String = canonical
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(";");

    let canonical_query = parsed.query().unwrap_or("");
    let canonical_request = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        method,
        parsed.path(),
        canonical_query,
        canonical_headers,
        signed_headers,
        payload_hash
    );

    let credential_scope = format!(
        "{}/{}/{}/aws4_request",
        date_stamp, config.region, SERVICE
    );
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        credential_scope,
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    );

    let signing_key = derive_signing_key(
        &config.credentials.secret_access_key,
        &date_stamp,
        &config.region,
    );
    let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()));

    let authorization = format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        ALGORITHM, config.credentials.access_key_id, credential_scope, signed_headers, signature
    );

    let mut headers = HashMap::new();
    headers.insert("content-type".into(), "application/json".into());
    headers.insert("x-amz-date".into(), amz_date);
    headers.insert("authorization".into(), authorization);
    if let Some(token) = &config.credentials.session_token {
        headers.insert("x-amz-security-token".into(), token.clone());
    }

    Ok(SignedRequest {
        method: method.to_string(),
        url: url.to_string(),
        headers,
        body,
    })
}

/// SigV4 key derivation chain: date, region, service, terminal marker.
fn derive_signing_key(secret: &str, date_stamp: &str, region: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{}", secret).as_bytes(), date_stamp.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, SERVICE.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac =
        HmacSha256::new_from_slice(key).expect("HMAC-SHA256 accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// RFC 3986 percent-encoding for a single path segment. Model identifiers
/// carry `.` and `:`, and the canonical URI must match the request URI
/// byte-for-byte, so the segment is encoded once here and used for both.
fn uri_encode(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            other => out.push_str(&format!("%{:02X}", other)),
        }
    }
    out
}
