//! Provider façade: the streaming contract the HTTP layer consumes.
//!
//! Providers are resolved once per call from a named identifier; an
//! unrecognized identifier fails immediately, before any network I/O.

pub mod bedrock;

pub use bedrock::BedrockProvider;

use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;

use crate::config::BedrockConfig;
use crate::types::events::StreamOutcome;
use crate::types::message::Message;
use crate::{BoxStream, Error, Result};

/// The public streaming contract.
///
/// `stream_chat` returns a lazy, finite, single-pass sequence of text
/// deltas: each element is produced on demand, so a slow consumer throttles
/// the upstream read, and dropping the stream releases the connection.
/// Mid-stream failure yields the deltas decoded so far, then exactly one
/// `Err`, then end of stream - callers typically substitute a fallback
/// string rather than aborting their own response.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Stream a chat completion as incremental text deltas.
    async fn stream_chat(&self, messages: &[Message]) -> Result<BoxStream<'static, String>>;

    /// Single-shot title generation. Never fails: any provider error falls
    /// back to a deterministic truncation of the input (see
    /// [`fallback_title`]).
    async fn generate_title(&self, text: &str) -> String;

    fn name(&self) -> &str;

    fn model(&self) -> &str;
}

/// Resolve a named provider. Unknown identifiers are a configuration
/// error surfaced before any I/O.
pub fn create_provider(name: &str, config: BedrockConfig) -> Result<Arc<dyn ChatProvider>> {
    match name {
        "bedrock" => Ok(Arc::new(BedrockProvider::new(config)?)),
        other => Err(Error::configuration(format!(
            "unknown provider '{}'; supported providers: bedrock",
            other
        ))),
    }
}

/// Drain a delta stream into its terminal outcome, preserving partial text
/// on failure.
pub async fn collect_outcome(mut stream: BoxStream<'static, String>) -> StreamOutcome {
    let mut text = String::new();
    while let Some(item) = stream.next().await {
        match item {
            Ok(delta) => text.push_str(&delta),
            Err(error) => {
                return StreamOutcome::Failed {
                    partial: text,
                    error,
                }
            }
        }
    }
    StreamOutcome::Completed(text)
}

const TITLE_LIMIT: usize = 47;

/// Deterministic fallback title: the first 47 characters of the input plus
/// `"..."` when it was longer. This is part of the contract, not
/// best-effort - callers rely on it when the provider is unreachable.
pub fn fallback_title(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= TITLE_LIMIT {
        return trimmed.to_string();
    }
    let mut title: String = trimmed.chars().take(TITLE_LIMIT).collect();
    title.push_str("...");
    title
}
