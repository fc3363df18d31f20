//! Heimdall - request admission and response caching for LLM-backed services
//!
//! This crate provides the layer that sits between a web backend and a
//! generative-text provider: a per-client sliding-window rate limiter that
//! decides *whether* a request may proceed, and a TTL-bounded response
//! cache that decides whether a previous answer can be reused instead of
//! calling the provider again. A portfolio-content orchestration service
//! composes the two in front of an injected [`TextGenerator`].
//!
//! State is in-memory and per-process by design; see the [`limiter`] and
//! [`cache`] module docs for the multi-instance caveat.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use heimdall::{
//!     AboutRequest, CallerContext, GenerateOptions, Heimdall, RateLimiterConfig, TextGenerator,
//! };
//!
//! struct MyProvider;
//!
//! #[async_trait::async_trait]
//! impl TextGenerator for MyProvider {
//!     async fn generate(&self, prompt: &str, _options: &GenerateOptions) -> heimdall::Result<String> {
//!         // call your upstream API here
//!         Ok(format!("generated for: {prompt}"))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> heimdall::Result<()> {
//!     let service = Heimdall::builder()
//!         .generator(Arc::new(MyProvider))
//!         .limiter_config(RateLimiterConfig::from_env()?)
//!         .build()?;
//!
//!     let caller = CallerContext {
//!         user_id: Some("42".into()),
//!         ..Default::default()
//!     }
//!     .resolve();
//!
//!     let about = service
//!         .about_section(
//!             &caller,
//!             &AboutRequest {
//!                 name: "Ada".into(),
//!                 skills: vec!["Rust".into(), "Postgres".into()],
//!                 experience_years: Some(7),
//!                 industry: None,
//!             },
//!         )
//!         .await?;
//!
//!     println!("{}", about.content);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod error;
pub mod identity;
pub mod limiter;
pub mod portfolio;
pub mod telemetry;
pub mod traits;

// Re-export main types at crate root
pub use cache::{CacheConfig, ResponseCache, cache_key};
pub use error::{HeimdallError, Result};
pub use identity::{CallerContext, ClientIdentity};
pub use limiter::{
    DEFAULT_SWEEP_INTERVAL, RateLimitInfo, RateLimiter, RateLimiterConfig, SweeperHandle,
    ThrottlePayload,
};
pub use portfolio::{
    AboutRequest, FullPortfolioRequest, Generated, GeneratedProject, HeadlineRequest, Heimdall,
    PortfolioContent, PortfolioService, PortfolioServiceBuilder, ProjectRequest, SkillsStructure,
};
pub use traits::{GenerateOptions, PortfolioStore, TextGenerator};
