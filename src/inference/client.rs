//! Resilient inference client.
//!
//! # Responsibilities
//! - Answer from the exact or semantic cache when possible
//! - Track backend availability and refresh it lazily
//! - Guard every upstream operation with its own circuit breaker
//! - Retry transient failures, clean the text, cache successes
//! - Fall back to canned advice instead of surfacing errors

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use serde::Serialize;

use crate::cache::{cache_key, CacheStats, TieredResponseCache};
use crate::clock::SharedClock;
use crate::config::{AdvisorConfig, GenerationConfig};
use crate::health::{probe_backend, ProbeOutcome};
use crate::inference::api::{same_model, ChatMessage, ChatRequest, GenerateOptions, GenerateRequest, OllamaApi};
use crate::inference::clean::clean_response;
use crate::inference::error::{InferenceError, InferenceResult};
use crate::inference::fallback::fallback_response;
use crate::resilience::{CircuitBreaker, CircuitState, RetryExecutor};

/// Where a piece of generated text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationOrigin {
    Backend,
    ExactCache,
    SemanticCache,
    Fallback,
}

/// Text produced by the client, always non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub text: String,
    pub origin: GenerationOrigin,
    pub model: String,
}

impl Generation {
    pub fn is_fallback(&self) -> bool {
        self.origin == GenerationOrigin::Fallback
    }
}

/// One breaker per upstream operation.
#[derive(Debug)]
pub struct Breakers {
    pub availability: CircuitBreaker,
    pub generate: CircuitBreaker,
    pub chat: CircuitBreaker,
    pub list_models: CircuitBreaker,
}

impl Breakers {
    fn states(&self) -> Vec<BreakerStatus> {
        [&self.availability, &self.generate, &self.chat, &self.list_models]
            .into_iter()
            .map(|b| BreakerStatus { operation: b.name(), state: b.state(), failures: b.failure_count() })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BreakerStatus {
    pub operation: &'static str,
    pub state: CircuitState,
    pub failures: u32,
}

/// Snapshot for status endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ClientStatus {
    pub base_url: String,
    pub available: bool,
    pub models: Vec<String>,
    pub breakers: Vec<BreakerStatus>,
    pub cache: CacheStats,
}

/// Client for the remote inference backend.
#[derive(Debug)]
pub struct InferenceClient {
    api: OllamaApi,
    generation: GenerationConfig,
    default_model: String,
    refresh_interval_ms: u64,
    breakers: Breakers,
    retry: RetryExecutor,
    cache: Arc<TieredResponseCache>,
    available: AtomicBool,
    models: ArcSwap<Vec<String>>,
    last_refresh_ms: AtomicU64,
    clock: SharedClock,
}

impl InferenceClient {
    pub fn new(config: &AdvisorConfig, cache: Arc<TieredResponseCache>, clock: SharedClock) -> Result<Self, reqwest::Error> {
        let api = OllamaApi::new(&config.backend)?;
        let breakers = Breakers {
            availability: CircuitBreaker::new("availability", config.breakers.availability, clock.clone()),
            generate: CircuitBreaker::new("generate", config.breakers.generate, clock.clone()),
            chat: CircuitBreaker::new("chat", config.breakers.chat, clock.clone()),
            list_models: CircuitBreaker::new("list_models", config.breakers.list_models, clock.clone()),
        };

        Ok(Self {
            api,
            generation: config.generation.clone(),
            default_model: config.backend.default_model.clone(),
            refresh_interval_ms: Duration::from_secs(config.backend.refresh_interval_secs).as_millis() as u64,
            breakers,
            retry: RetryExecutor::new(&config.retries),
            cache,
            available: AtomicBool::new(false),
            models: ArcSwap::from_pointee(Vec::new()),
            last_refresh_ms: AtomicU64::new(0),
            clock,
        })
    }

    pub fn api(&self) -> &OllamaApi {
        &self.api
    }

    pub fn breakers(&self) -> &Breakers {
        &self.breakers
    }

    pub fn cache(&self) -> &Arc<TieredResponseCache> {
        &self.cache
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    /// Models seen by the last successful probe.
    pub fn installed_models(&self) -> Arc<Vec<String>> {
        self.models.load_full()
    }

    /// Model to use when the caller has no preference.
    ///
    /// The configured default if installed (or if nothing is known yet),
    /// otherwise the first installed model.
    pub fn resolve_model(&self, hint: Option<&str>) -> String {
        if let Some(hint) = hint {
            return hint.to_string();
        }
        let models = self.models.load();
        if models.is_empty() || models.iter().any(|m| same_model(m, &self.default_model)) {
            self.default_model.clone()
        } else {
            models[0].clone()
        }
    }

    /// Run the availability probe now and record the outcome.
    pub async fn refresh_availability(&self) -> bool {
        self.last_refresh_ms.store(self.clock.now_millis(), Ordering::Release);
        match probe_backend(&self.api, &self.breakers.availability).await {
            ProbeOutcome::Available { models } => {
                self.models.store(Arc::new(models));
                self.available.store(true, Ordering::Release);
                true
            }
            ProbeOutcome::Unavailable { .. } => {
                self.available.store(false, Ordering::Release);
                false
            }
        }
    }

    /// Refresh availability unless one ran within the refresh interval.
    async fn refresh_if_due(&self) -> bool {
        let now = self.clock.now_millis();
        let last = self.last_refresh_ms.load(Ordering::Acquire);
        if last != 0 && now.saturating_sub(last) < self.refresh_interval_ms {
            return self.is_available();
        }
        // Claim the refresh so concurrent callers don't all probe.
        if self
            .last_refresh_ms
            .compare_exchange(last, now, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return self.is_available();
        }
        tracing::info!("Backend marked unavailable, re-probing");
        self.refresh_availability().await
    }

    /// Installed model names, through the list-models breaker.
    pub async fn list_models(&self) -> InferenceResult<Vec<String>> {
        let breaker = &self.breakers.list_models;
        let Some(permit) = breaker.try_acquire() else {
            return Err(InferenceError::CircuitOpen(breaker.name()));
        };
        let result = self
            .retry
            .execute_if(|| self.api.list_models(), InferenceError::is_retryable)
            .await;
        match &result {
            Ok(_) => permit.success(),
            Err(_) => permit.failure(),
        }
        result
    }

    /// Generate text for `prompt`.
    ///
    /// Never fails: when the backend cannot help, the returned
    /// [`Generation`] carries keyword-bucketed fallback advice.
    pub async fn generate(
        &self,
        prompt: &str,
        model_hint: Option<&str>,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> Generation {
        let model = self.resolve_model(model_hint);
        let options = GenerateOptions {
            temperature: temperature.unwrap_or(self.generation.temperature),
            num_predict: max_tokens.unwrap_or(self.generation.max_tokens),
        };
        let key = cache_key(prompt, &model, options.temperature, options.num_predict);

        if let Some(text) = self.cache.get(&key) {
            tracing::debug!(model = %model, "Exact cache hit");
            return Generation { text, origin: GenerationOrigin::ExactCache, model };
        }
        if let Some(hit) = self.cache.find_semantic(prompt, self.cache.semantic_threshold()) {
            tracing::debug!(model = %model, score = hit.score, "Semantic cache hit");
            return Generation { text: hit.response, origin: GenerationOrigin::SemanticCache, model };
        }

        if !self.is_available() && !self.refresh_if_due().await {
            tracing::debug!("Backend unavailable, using fallback");
            return self.fallback(prompt, model);
        }

        let Some(permit) = self.breakers.generate.try_acquire() else {
            tracing::debug!("Generate circuit open, using fallback");
            return self.fallback(prompt, model);
        };

        let request = GenerateRequest {
            model: &model,
            prompt,
            stream: false,
            options,
            system: self.generation.system_prompt.as_deref(),
        };
        let result = self
            .retry
            .execute_if(|| self.api.generate(&request), InferenceError::is_retryable)
            .await
            .and_then(|raw| clean_response(&raw, self.generation.min_response_chars));

        match result {
            Ok(text) => {
                permit.success();
                self.cache.put(&key, prompt, &text);
                Generation { text, origin: GenerationOrigin::Backend, model }
            }
            Err(e) => {
                permit.failure();
                tracing::warn!(model = %model, error = %e, "Generation failed, using fallback");
                self.fallback(prompt, model)
            }
        }
    }

    /// One chat turn. Not cached: the answer depends on the whole history.
    pub async fn chat(&self, messages: &[ChatMessage], model_hint: Option<&str>) -> Generation {
        let model = self.resolve_model(model_hint);
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.clone())
            .unwrap_or_default();

        if !self.is_available() && !self.refresh_if_due().await {
            return self.fallback(&last_user, model);
        }

        let Some(permit) = self.breakers.chat.try_acquire() else {
            return self.fallback(&last_user, model);
        };

        let request = ChatRequest {
            model: &model,
            messages,
            stream: false,
            options: GenerateOptions {
                temperature: self.generation.temperature,
                num_predict: self.generation.max_tokens,
            },
        };
        let result = self
            .retry
            .execute_if(|| self.api.chat(&request), InferenceError::is_retryable)
            .await
            .and_then(|raw| clean_response(&raw, self.generation.min_response_chars));

        match result {
            Ok(text) => {
                permit.success();
                Generation { text, origin: GenerationOrigin::Backend, model }
            }
            Err(e) => {
                permit.failure();
                tracing::warn!(model = %model, error = %e, "Chat failed, using fallback");
                self.fallback(&last_user, model)
            }
        }
    }

    pub fn status(&self) -> ClientStatus {
        ClientStatus {
            base_url: self.api.base_url().to_string(),
            available: self.is_available(),
            models: self.installed_models().as_ref().clone(),
            breakers: self.breakers.states(),
            cache: self.cache.stats(),
        }
    }

    fn fallback(&self, prompt: &str, model: String) -> Generation {
        Generation { text: fallback_response(prompt).to_string(), origin: GenerationOrigin::Fallback, model }
    }
}
