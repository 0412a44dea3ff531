//! # bedrock-stream
//!
//! Streaming client core for AWS Bedrock model invocation. It signs
//! `InvokeModelWithResponseStream` requests with Signature V4, decodes the
//! binary event-stream wire format incrementally off the live HTTP
//! connection, and exposes the result as a lazy, pull-based stream of text
//! deltas with no intermediate buffering beyond the single frame being
//! assembled.
//!
//! ## Overview
//!
//! Bedrock's streaming endpoint does not speak SSE. Responses arrive as
//! self-length-delimited binary frames (prelude, headers, payload, trailing
//! checksum) whose payloads wrap a base64-encoded inner JSON document - the
//! actual model-protocol event. This crate owns that whole path:
//!
//! ```text
//! Messages → Request Builder → Signed POST → ByteCursor → Frame Decoder
//!                                                             │
//!             caller ← lazy delta stream ← Event Interpreter ←┘
//! ```
//!
//! Each delta is produced on demand: a slow consumer throttles the network
//! read, and dropping the stream releases the connection.
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Explicit provider configuration (credentials, region, models) |
//! | [`signing`] | Invocation payload construction and SigV4 request signing |
//! | [`transport`] | Streaming HTTP transport and the exact-read [`transport::ByteCursor`] |
//! | [`eventstream`] | Binary frame decoding and event interpretation |
//! | [`provider`] | The [`provider::ChatProvider`] façade and named selection |
//! | [`types`] | Core type definitions (messages, events, outcomes) |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bedrock_stream::{create_provider, collect_outcome, BedrockConfig, Message};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> bedrock_stream::Result<()> {
//!     let config = BedrockConfig::from_env()?;
//!     let provider = create_provider("bedrock", config)?;
//!
//!     let messages = vec![Message::user("Hello, how are you?")];
//!     let mut deltas = provider.stream_chat(&messages).await?;
//!
//!     while let Some(delta) = deltas.next().await {
//!         match delta {
//!             Ok(text) => print!("{}", text),
//!             Err(e) => eprintln!("stream failed: {}", e),
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod eventstream;
pub mod provider;
pub mod signing;
pub mod transport;
pub mod types;

/// Error type for the library
pub mod error;

// Re-export main types for convenience
pub use config::{AwsCredentials, BedrockConfig, SamplingConfig};
pub use error::Error;
pub use provider::{collect_outcome, create_provider, fallback_title, ChatProvider};
pub use types::{
    events::{ModelEvent, StreamOutcome},
    message::{Message, MessageRole},
};

use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// A unified pinned, boxed stream that emits `Result<T>`
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = Result<T>> + Send + 'a>>;
