//! Query orchestration.
//!
//! # Data Flow
//! ```text
//! query(type, params)
//!     → wait (bounded) for startup          → pending: "initializing"
//!     → classify.rs
//!     → similar.rs                          → hit: "cache"
//!     → facts.rs (knowledge source)
//!     → routing.rs → inference? (facts as context, specialized model hint)
//!     → merge.rs → augment.rs
//!     → similar.rs insert (long enough, not degraded)
//! ```

pub mod augment;
pub mod classify;
pub mod facts;
pub mod merge;
pub mod response;
pub mod routing;
pub mod similar;

use std::sync::Arc;
use std::time::Duration;

use crate::config::RoutingConfig;
use crate::inference::InferenceClient;
use crate::knowledge::KnowledgeSource;
use crate::lifecycle::{InitializationStatus, NonBlockingInitializer};
use crate::observability::metrics;
use crate::provisioning::ModelRegistry;

pub use augment::{augmenter_for, ResponseAugmenter};
pub use classify::{classify, ClassifiedQuery, QueryParams, QueryType};
pub use response::{QueryResponse, Source};
pub use similar::{QueryRecord, SimilarQueryCache};

const INITIALIZING_MESSAGE: &str = "The advisor is still starting up. Please try again in a minute.";

/// Top-level entry point for advisory queries.
#[derive(Debug)]
pub struct QueryOrchestrator {
    client: Arc<InferenceClient>,
    registry: Arc<ModelRegistry>,
    initializer: Arc<NonBlockingInitializer>,
    knowledge: Arc<dyn KnowledgeSource>,
    similar: SimilarQueryCache,
    augmenter: Box<dyn ResponseAugmenter>,
    routing: RoutingConfig,
}

impl QueryOrchestrator {
    pub fn new(
        client: Arc<InferenceClient>,
        registry: Arc<ModelRegistry>,
        initializer: Arc<NonBlockingInitializer>,
        knowledge: Arc<dyn KnowledgeSource>,
        routing: RoutingConfig,
    ) -> Self {
        Self {
            client,
            registry,
            initializer,
            knowledge,
            similar: SimilarQueryCache::new(routing.similarity_threshold, routing.max_similar_queries),
            augmenter: augmenter_for(&routing.augmenter),
            routing,
        }
    }

    pub fn similar_queries(&self) -> &SimilarQueryCache {
        &self.similar
    }

    /// Answer one query. Never fails; degraded answers say so in `source`.
    pub async fn query(&self, query_type: &str, params: &QueryParams) -> QueryResponse {
        let response = self.answer(query_type, params).await;
        metrics::record_query(response.source.as_str());
        response
    }

    async fn answer(&self, query_type: &str, params: &QueryParams) -> QueryResponse {
        let init = self
            .initializer
            .wait_until_complete(Duration::from_secs(self.routing.init_wait_secs))
            .await;
        if init == InitializationStatus::Pending {
            return QueryResponse::new(INITIALIZING_MESSAGE.to_string(), Source::Initializing, init);
        }

        let query = classify(query_type, params);
        tracing::debug!(query_type = %query.kind, text = %query.text, "Query classified");

        let subject = query.subject();
        if let Some(record) = self.similar.find(query.kind, &subject, &query.text) {
            tracing::debug!(score = ?record.score, "Similar query answered from cache");
            return QueryResponse::new(record.response, Source::Cache, init);
        }

        let facts = facts::gather(self.knowledge.as_ref(), &query);
        let use_inference = !query.text.is_empty()
            && routing::should_use_inference(query.kind, !facts.is_empty(), &query.text, &self.routing);

        let generation = if use_inference {
            let prompt = merge::build_prompt(&query.text, &facts);
            let hint = self.registry.model_for(query.kind.as_str());
            Some(self.client.generate(&prompt, hint.as_deref(), None, None).await)
        } else {
            None
        };

        let (text, source) = merge::merge(generation.as_ref(), &facts);
        tracing::debug!(
            query_type = %query.kind,
            inference = use_inference,
            facts = facts.lines.len(),
            source = source.as_str(),
            "Query routed"
        );

        let text = match source {
            Source::RuleEngine | Source::Inference | Source::InferenceWithContext => {
                self.augmenter.augment(&query, text, self.knowledge.as_ref())
            }
            _ => text,
        };

        if source.is_success() && text.chars().count() >= self.routing.min_cacheable_chars {
            self.similar.insert(query.kind, &subject, &query.text, &text);
        }

        QueryResponse::new(text, source, init)
    }
}
