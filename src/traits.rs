//! Collaborator traits consumed by the orchestration layer.
//!
//! The admission and caching core never talks to the outside world
//! directly: text generation and persistence arrive as trait objects
//! injected at construction time. Tests substitute stubs; production wires
//! whatever provider and database the deployment uses.

use async_trait::async_trait;

use crate::Result;
use crate::portfolio::PortfolioContent;

/// Narrow interface to the external generation provider.
///
/// Implementations wrap whatever upstream API the deployment uses and are
/// expected to fail with [`HeimdallError::Provider`](crate::HeimdallError::Provider)
/// on upstream errors. The core imposes no timeout of its own — enforcing
/// one belongs to the implementation or the transport layer above it.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for `prompt`.
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String>;
}

/// Options forwarded to the generation provider.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
    /// Ask the provider for structured JSON output.
    #[serde(default)]
    pub json_output: bool,
}

impl GenerateOptions {
    pub fn temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn max_tokens(mut self, max: usize) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn json_output(mut self, json: bool) -> Self {
        self.json_output = json;
        self
    }
}

/// Narrow interface to the persistence layer for generated portfolios.
///
/// Only consumed by
/// [`PortfolioService::full_portfolio`](crate::portfolio::PortfolioService::full_portfolio),
/// and only when a store was wired at build time.
#[async_trait]
pub trait PortfolioStore: Send + Sync {
    /// Insert or update the stored portfolio for `user_id`.
    async fn upsert(&self, user_id: &str, content: &PortfolioContent) -> Result<()>;
}
