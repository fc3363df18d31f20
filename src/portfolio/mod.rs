//! Portfolio content orchestration.
//!
//! [`PortfolioService`] is the glue in front of the generation provider:
//! every operation passes the admission controller first (denied requests
//! become [`HeimdallError::Throttled`] and never reach the provider), then
//! consults the response cache, and only on a miss invokes the injected
//! [`TextGenerator`]. Successful results are cached; failures cache
//! nothing.
//!
//! Request flow for one logical operation:
//!
//! ```text
//! RECEIVED ── denied ──────────────────────────▶ Throttled
//!    │
//! admitted ── cache hit ───────────────────────▶ returned
//!    │
//! cache miss ── generate ── ok ── cache put ───▶ returned
//!                   └────── err ───────────────▶ Provider error (nothing cached)
//! ```
//!
//! The skills-taxonomy path is the one deliberate exception to error
//! propagation: a provider failure or unparseable answer degrades to a
//! single default grouping of all input skills instead of failing the
//! request. The degradation is counted and logged.

mod prompt;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::{CacheConfig, ResponseCache, cache_key};
use crate::identity::ClientIdentity;
use crate::limiter::{RateLimitInfo, RateLimiter, RateLimiterConfig};
use crate::telemetry;
use crate::traits::{GenerateOptions, PortfolioStore, TextGenerator};
use crate::{HeimdallError, Result};

/// Input for the "about me" section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AboutRequest {
    pub name: String,
    pub skills: Vec<String>,
    pub experience_years: Option<u32>,
    pub industry: Option<String>,
}

/// Input for a single project description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRequest {
    pub name: String,
    pub technologies: Vec<String>,
    pub brief_description: Option<String>,
}

/// Input for the one-line headline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadlineRequest {
    pub name: String,
    pub skills: Vec<String>,
    pub industry: Option<String>,
}

/// Input for generating a complete portfolio in one call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullPortfolioRequest {
    pub name: String,
    pub skills: Vec<String>,
    pub experience_years: Option<u32>,
    pub industry: Option<String>,
    #[serde(default)]
    pub projects: Vec<ProjectRequest>,
}

/// A generated project description alongside its input metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedProject {
    pub name: String,
    pub description: String,
    pub technologies: Vec<String>,
}

/// Skill names grouped by category.
pub type SkillsStructure = BTreeMap<String, Vec<String>>;

/// Everything [`PortfolioService::full_portfolio`] produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioContent {
    pub about: Option<String>,
    pub headline: Option<String>,
    pub projects: Vec<GeneratedProject>,
    pub skills_structure: Option<SkillsStructure>,
}

/// An admitted response: the content plus the rate-limit snapshot the
/// transport layer surfaces as headers on every admitted reply.
#[derive(Debug, Clone)]
pub struct Generated<T> {
    pub content: T,
    pub rate_limit: RateLimitInfo,
}

/// Main entry point for creating service instances.
pub struct Heimdall;

impl Heimdall {
    /// Create a new builder for configuring the service.
    pub fn builder() -> PortfolioServiceBuilder {
        PortfolioServiceBuilder::new()
    }
}

/// Builder for [`PortfolioService`].
pub struct PortfolioServiceBuilder {
    generator: Option<Arc<dyn TextGenerator>>,
    store: Option<Arc<dyn PortfolioStore>>,
    limiter_config: RateLimiterConfig,
    cache_config: CacheConfig,
}

impl PortfolioServiceBuilder {
    pub fn new() -> Self {
        Self {
            generator: None,
            store: None,
            limiter_config: RateLimiterConfig::default(),
            cache_config: CacheConfig::default(),
        }
    }

    /// Wire the generation provider. Required.
    pub fn generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Wire the persistence layer consumed by
    /// [`full_portfolio`](PortfolioService::full_portfolio). Optional.
    pub fn store(mut self, store: Arc<dyn PortfolioStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Override the admission ceilings.
    pub fn limiter_config(mut self, config: RateLimiterConfig) -> Self {
        self.limiter_config = config;
        self
    }

    /// Override the cache TTL and capacity.
    pub fn cache_config(mut self, config: CacheConfig) -> Self {
        self.cache_config = config;
        self
    }

    /// Build the service.
    ///
    /// Fails with [`HeimdallError::Configuration`] when no generator was
    /// wired — the service is useless without one, and the failure belongs
    /// at startup, not on the first request.
    pub fn build(self) -> Result<PortfolioService> {
        let generator = self.generator.ok_or_else(|| {
            HeimdallError::Configuration("no text generator configured".to_string())
        })?;

        Ok(PortfolioService {
            generator,
            store: self.store,
            limiter: Arc::new(RateLimiter::new(self.limiter_config)),
            cache: Arc::new(ResponseCache::new(&self.cache_config)),
        })
    }
}

impl Default for PortfolioServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Orchestrates admission, caching and generation for portfolio content.
pub struct PortfolioService {
    generator: Arc<dyn TextGenerator>,
    store: Option<Arc<dyn PortfolioStore>>,
    limiter: Arc<RateLimiter>,
    cache: Arc<ResponseCache>,
}

impl PortfolioService {
    /// The admission controller, e.g. for spawning its background sweeper.
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// The response cache, e.g. for inspection or explicit clearing.
    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Generate the "about me" section.
    pub async fn about_section(
        &self,
        caller: &ClientIdentity,
        req: &AboutRequest,
    ) -> Result<Generated<String>> {
        let rate_limit = self.admit(caller, "portfolio.about")?;
        let content = self.generate_about(req).await?;
        Ok(Generated {
            content,
            rate_limit,
        })
    }

    /// Generate one project description.
    pub async fn project_description(
        &self,
        caller: &ClientIdentity,
        req: &ProjectRequest,
    ) -> Result<Generated<String>> {
        let rate_limit = self.admit(caller, "portfolio.project")?;
        let content = self.generate_project(req).await?;
        Ok(Generated {
            content,
            rate_limit,
        })
    }

    /// Generate the one-line headline.
    pub async fn headline(
        &self,
        caller: &ClientIdentity,
        req: &HeadlineRequest,
    ) -> Result<Generated<String>> {
        let rate_limit = self.admit(caller, "portfolio.headline")?;
        let content = self.generate_headline(req).await?;
        Ok(Generated {
            content,
            rate_limit,
        })
    }

    /// Group skills into categories.
    ///
    /// Degrades to a single default grouping on provider failure instead
    /// of propagating the error; see the module docs.
    pub async fn skills_structure(
        &self,
        caller: &ClientIdentity,
        skills: &[String],
    ) -> Result<Generated<SkillsStructure>> {
        let rate_limit = self.admit(caller, "portfolio.skills_structure")?;
        let content = self.generate_skills_structure(skills).await?;
        Ok(Generated {
            content,
            rate_limit,
        })
    }

    /// Generate a complete portfolio and, when a store is wired, persist
    /// it for `user_id`.
    ///
    /// Costs one admission regardless of how many provider calls the
    /// composition makes; the per-section caches are shared with the
    /// individual operations, so previously generated sections are reused.
    pub async fn full_portfolio(
        &self,
        caller: &ClientIdentity,
        user_id: &str,
        req: &FullPortfolioRequest,
    ) -> Result<Generated<PortfolioContent>> {
        let rate_limit = self.admit(caller, "portfolio.full")?;

        let about = self
            .generate_about(&AboutRequest {
                name: req.name.clone(),
                skills: req.skills.clone(),
                experience_years: req.experience_years,
                industry: req.industry.clone(),
            })
            .await?;

        let headline = self
            .generate_headline(&HeadlineRequest {
                name: req.name.clone(),
                skills: req.skills.clone(),
                industry: req.industry.clone(),
            })
            .await?;

        let mut projects = Vec::with_capacity(req.projects.len());
        for project in &req.projects {
            if project.name.is_empty() {
                continue;
            }
            let description = self.generate_project(project).await?;
            projects.push(GeneratedProject {
                name: project.name.clone(),
                description,
                technologies: project.technologies.clone(),
            });
        }

        let skills_structure = if req.skills.is_empty() {
            None
        } else {
            Some(self.generate_skills_structure(&req.skills).await?)
        };

        let content = PortfolioContent {
            about: Some(about),
            headline: Some(headline),
            projects,
            skills_structure,
        };

        if let Some(store) = &self.store {
            store.upsert(user_id, &content).await?;
        }

        Ok(Generated {
            content,
            rate_limit,
        })
    }

    fn admit(&self, caller: &ClientIdentity, endpoint: &str) -> Result<RateLimitInfo> {
        let (admitted, info) = self.limiter.check_and_admit(caller, endpoint);
        if admitted {
            Ok(info)
        } else {
            Err(HeimdallError::Throttled(info))
        }
    }

    async fn generate_about(&self, req: &AboutRequest) -> Result<String> {
        let key = request_key("about", req)?;
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let options = GenerateOptions::default().temperature(0.7).max_tokens(2048);
        let content = self
            .generator
            .generate(&prompt::about_prompt(req), &options)
            .await?;
        let content = content.trim().to_string();

        self.cache.put(key, content.clone());
        Ok(content)
    }

    async fn generate_project(&self, req: &ProjectRequest) -> Result<String> {
        let key = request_key("project", req)?;
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let options = GenerateOptions::default().temperature(0.7).max_tokens(2048);
        let content = self
            .generator
            .generate(&prompt::project_prompt(req), &options)
            .await?;
        let content = content.trim().to_string();

        self.cache.put(key, content.clone());
        Ok(content)
    }

    async fn generate_headline(&self, req: &HeadlineRequest) -> Result<String> {
        let key = request_key("headline", req)?;
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let options = GenerateOptions::default().temperature(0.7).max_tokens(256);
        let content = self
            .generator
            .generate(&prompt::headline_prompt(req), &options)
            .await?;
        let content = content.trim().to_string();

        self.cache.put(key, content.clone());
        Ok(content)
    }

    async fn generate_skills_structure(&self, skills: &[String]) -> Result<SkillsStructure> {
        // Keyed on the sorted skill list: the grouping does not depend on
        // the order skills were supplied in.
        let mut sorted = skills.to_vec();
        sorted.sort();

        let mut params = serde_json::Map::new();
        params.insert("skills".to_string(), serde_json::to_value(&sorted)?);
        let key = cache_key("skills_structure", &params);

        if let Some(cached) = self.cache.get_json::<SkillsStructure>(&key) {
            return Ok(cached);
        }

        let options = GenerateOptions::default()
            .temperature(0.7)
            .max_tokens(2048)
            .json_output(true);
        let raw = match self
            .generator
            .generate(&prompt::skills_prompt(skills), &options)
            .await
        {
            Ok(raw) => raw,
            Err(err) => return Ok(self.fallback_grouping(skills, &err)),
        };

        match serde_json::from_str::<SkillsStructure>(raw.trim()) {
            Ok(structure) => {
                self.cache.put(key, raw.trim());
                Ok(structure)
            }
            Err(err) => Ok(self.fallback_grouping(skills, &err)),
        }
    }

    /// Single default grouping used when the provider cannot deliver a
    /// taxonomy. Never cached — the next request tries the provider again.
    fn fallback_grouping(
        &self,
        skills: &[String],
        reason: &dyn std::fmt::Display,
    ) -> SkillsStructure {
        tracing::warn!(%reason, "skills taxonomy degraded to default grouping");
        metrics::counter!(
            telemetry::PROVIDER_FALLBACKS_TOTAL,
            "operation" => "skills_structure"
        )
        .increment(1);

        let mut structure = SkillsStructure::new();
        structure.insert("Skills".to_string(), skills.to_vec());
        structure
    }
}

/// Derive the cache key for a serializable request.
fn request_key<T: Serialize>(operation: &str, req: &T) -> Result<String> {
    match serde_json::to_value(req)? {
        serde_json::Value::Object(params) => Ok(cache_key(operation, &params)),
        other => {
            let mut params = serde_json::Map::new();
            params.insert("input".to_string(), other);
            Ok(cache_key(operation, &params))
        }
    }
}
