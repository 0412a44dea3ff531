//! Explicit provider configuration.
//!
//! All credentials, region, and model identifiers are threaded through this
//! struct; nothing in the crate reads process-wide state at call time. The
//! [`BedrockConfig::from_env`] constructor is the one place environment
//! variables are consulted, and only when the caller asks for it.

use crate::{Error, Result};
use std::env;

/// Long-term AWS credentials used to derive the request signature.
#[derive(Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Present when running under temporary (STS) credentials.
    pub session_token: Option<String>,
}

impl AwsCredentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }
}

// Keep the secret out of debug output.
impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("session_token", &self.session_token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Sampling parameters applied to a model invocation.
#[derive(Debug, Clone, Copy)]
pub struct SamplingConfig {
    pub max_tokens: u32,
    pub temperature: f64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: 0.7,
        }
    }
}

/// Configuration for the Bedrock provider.
#[derive(Debug, Clone)]
pub struct BedrockConfig {
    pub credentials: AwsCredentials,
    pub region: String,
    /// Model used for chat streaming.
    pub model_id: String,
    /// Cheaper model used for single-shot title generation.
    pub title_model_id: String,
    /// Endpoint override, mainly for tests. Defaults to the regional
    /// `bedrock-runtime` endpoint.
    pub endpoint: Option<String>,
    pub sampling: SamplingConfig,
}

const DEFAULT_MODEL_ID: &str = "anthropic.claude-3-5-sonnet-20240620-v1:0";
const DEFAULT_TITLE_MODEL_ID: &str = "anthropic.claude-3-haiku-20240307-v1:0";

impl BedrockConfig {
    pub fn new(
        credentials: AwsCredentials,
        region: impl Into<String>,
        model_id: impl Into<String>,
    ) -> Self {
        Self {
            credentials,
            region: region.into(),
            model_id: model_id.into(),
            title_model_id: DEFAULT_TITLE_MODEL_ID.to_string(),
            endpoint: None,
            sampling: SamplingConfig::default(),
        }
    }

    /// Build a configuration from the conventional AWS environment variables
    /// (`AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, `AWS_SESSION_TOKEN`,
    /// `AWS_REGION`) plus `BEDROCK_MODEL_ID` / `BEDROCK_TITLE_MODEL_ID`
    /// overrides.
    pub fn from_env() -> Result<Self> {
        let access_key_id = require_env("AWS_ACCESS_KEY_ID")?;
        let secret_access_key = require_env("AWS_SECRET_ACCESS_KEY")?;
        let region = require_env("AWS_REGION")?;

        let mut credentials = AwsCredentials::new(access_key_id, secret_access_key);
        if let Ok(token) = env::var("AWS_SESSION_TOKEN") {
            if !token.is_empty() {
                credentials = credentials.with_session_token(token);
            }
        }

        let model_id =
            env::var("BEDROCK_MODEL_ID").unwrap_or_else(|_| DEFAULT_MODEL_ID.to_string());
        let mut config = Self::new(credentials, region, model_id);
        if let Ok(title_model) = env::var("BEDROCK_TITLE_MODEL_ID") {
            if !title_model.is_empty() {
                config.title_model_id = title_model;
            }
        }
        Ok(config)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_title_model(mut self, model_id: impl Into<String>) -> Self {
        self.title_model_id = model_id.into();
        self
    }

    pub fn with_sampling(mut self, sampling: SamplingConfig) -> Self {
        self.sampling = sampling;
        self
    }

    /// Base URL of the model-invocation service for this configuration.
    pub fn runtime_endpoint(&self) -> String {
        match &self.endpoint {
            Some(e) => e.trim_end_matches('/').to_string(),
            None => format!("https://bedrock-runtime.{}.amazonaws.com", self.region),
        }
    }
}

fn require_env(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::configuration(format!(
            "missing required environment variable {}",
            name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> BedrockConfig {
        BedrockConfig::new(
            AwsCredentials::new("AKIDEXAMPLE", "wJalrXUtnFEMI"),
            "us-east-1",
            "anthropic.claude-3-5-sonnet-20240620-v1:0",
        )
    }

    #[test]
    fn test_default_endpoint_is_regional() {
        assert_eq!(
            test_config().runtime_endpoint(),
            "https://bedrock-runtime.us-east-1.amazonaws.com"
        );
    }

    #[test]
    fn test_endpoint_override_strips_trailing_slash() {
        let cfg = test_config().with_endpoint("http://127.0.0.1:4010/");
        assert_eq!(cfg.runtime_endpoint(), "http://127.0.0.1:4010");
    }

    #[test]
    fn test_debug_hides_secret() {
        let rendered = format!("{:?}", test_config());
        assert!(!rendered.contains("wJalrXUtnFEMI"));
        assert!(rendered.contains("AKIDEXAMPLE"));
    }
}
