//! AWS Bedrock chat provider.
//!
//! Wires the request builder, the chunked transport, and the event-stream
//! decoder into one pull-based iteration. The façade buffers nothing beyond
//! the single in-flight frame the decoder is assembling.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::{BedrockConfig, SamplingConfig};
use crate::eventstream::delta_stream;
use crate::provider::{fallback_title, ChatProvider};
use crate::signing::build_invoke_request;
use crate::transport::HttpTransport;
use crate::types::message::Message;
use crate::{BoxStream, Error, Result};

pub struct BedrockProvider {
    config: BedrockConfig,
    transport: HttpTransport,
}

impl BedrockProvider {
    pub fn new(config: BedrockConfig) -> Result<Self> {
        let transport = HttpTransport::new()?;
        Ok(Self { config, transport })
    }

    async fn request_title(&self, text: &str) -> Result<String> {
        let prompt = format!(
            "Generate a short title (a few words, no quotes) for a conversation \
             that starts with the following message. Reply with the title only.\n\n{}",
            text
        );
        let sampling = SamplingConfig {
            max_tokens: 64,
            temperature: 0.2,
        };
        let request = build_invoke_request(
            &self.config,
            &self.config.title_model_id,
            &[Message::user(prompt)],
            sampling,
            false,
        )?;
        let body = self.transport.execute(request).await?;

        body.pointer("/content/0/text")
            .and_then(|v| v.as_str())
            .map(|s| s.trim().trim_matches('"').to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                Error::UnexpectedResponse("invoke response has no content[0].text".into())
            })
    }
}

#[async_trait]
impl ChatProvider for BedrockProvider {
    async fn stream_chat(&self, messages: &[Message]) -> Result<BoxStream<'static, String>> {
        let request = build_invoke_request(
            &self.config,
            &self.config.model_id,
            messages,
            self.config.sampling,
            true,
        )?;
        debug!(model = %self.config.model_id, messages = messages.len(), "opening bedrock stream");
        let cursor = self.transport.open(request).await?;
        Ok(delta_stream(cursor))
    }

    async fn generate_title(&self, text: &str) -> String {
        match self.request_title(text).await {
            Ok(title) => title,
            Err(e) => {
                warn!(error = %e, "title generation failed, falling back to truncation");
                fallback_title(text)
            }
        }
    }

    fn name(&self) -> &str {
        "bedrock"
    }

    fn model(&self) -> &str {
        &self.config.model_id
    }
}
