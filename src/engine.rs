//! The advisor engine.
//!
//! Owns every long-lived component (client, caches, breakers, model
//! registry, initializer, orchestrator) and is passed by reference to the
//! HTTP layer. There is no global state.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::cache::{run_maintenance, TieredResponseCache};
use crate::clock::{self, SharedClock};
use crate::config::AdvisorConfig;
use crate::inference::client::ClientStatus;
use crate::inference::{ChatMessage, Generation, InferenceClient};
use crate::knowledge::{KnowledgeBase, KnowledgeError, KnowledgeSource};
use crate::lifecycle::{InitializationStatus, NonBlockingInitializer, Shutdown};
use crate::orchestrator::{QueryOrchestrator, QueryParams, QueryResponse};
use crate::provisioning::{ModelDescriptor, ModelProvisioner, ModelRegistry, ModelStatus};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("cannot build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error(transparent)]
    Knowledge(#[from] KnowledgeError),
}

/// Everything `GET /api/status` reports.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub version: &'static str,
    pub initialization: InitializationStatus,
    pub backend: ClientStatus,
    pub models: Vec<ModelDescriptor>,
    pub similar_queries: usize,
}

#[derive(Debug)]
pub struct Engine {
    config: AdvisorConfig,
    cache: Arc<TieredResponseCache>,
    client: Arc<InferenceClient>,
    registry: Arc<ModelRegistry>,
    provisioner: Arc<ModelProvisioner>,
    initializer: Arc<NonBlockingInitializer>,
    orchestrator: QueryOrchestrator,
}

impl Engine {
    /// Build with the system clock and the configured knowledge base.
    pub fn new(config: AdvisorConfig) -> Result<Self, EngineError> {
        let knowledge = Arc::new(KnowledgeBase::from_config(config.knowledge.path.as_deref())?);
        Self::with_parts(config, clock::system(), knowledge)
    }

    pub fn with_parts(
        config: AdvisorConfig,
        clock: SharedClock,
        knowledge: Arc<dyn KnowledgeSource>,
    ) -> Result<Self, EngineError> {
        let cache = Arc::new(TieredResponseCache::new(&config.cache, clock.clone()));
        let client = Arc::new(InferenceClient::new(&config, cache.clone(), clock)?);
        let registry = Arc::new(ModelRegistry::from_config(&config.models));
        let provisioner = Arc::new(ModelProvisioner::new(client.clone(), registry.clone(), &config.models));
        let initializer = Arc::new(NonBlockingInitializer::new());
        let orchestrator = QueryOrchestrator::new(
            client.clone(),
            registry.clone(),
            initializer.clone(),
            knowledge,
            config.routing.clone(),
        );

        Ok(Self { config, cache, client, registry, provisioner, initializer, orchestrator })
    }

    pub fn config(&self) -> &AdvisorConfig {
        &self.config
    }

    pub fn client(&self) -> &Arc<InferenceClient> {
        &self.client
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    pub fn initializer(&self) -> &Arc<NonBlockingInitializer> {
        &self.initializer
    }

    pub fn orchestrator(&self) -> &QueryOrchestrator {
        &self.orchestrator
    }

    /// Restore the cache snapshot, then start the initializer and the
    /// maintenance loop. Returns immediately.
    pub fn start(&self, shutdown: &Shutdown) -> JoinHandle<()> {
        match self.cache.load() {
            Ok(0) => {}
            Ok(loaded) => tracing::info!(loaded, "Restored cached responses"),
            Err(e) => tracing::warn!(error = %e, "Ignoring unreadable cache snapshot"),
        }

        let client = self.client.clone();
        let provisioner = self.provisioner.clone();
        let provision = self.config.models.provision;
        self.initializer.start(async move {
            if !client.refresh_availability().await {
                return false;
            }
            if provision {
                provisioner.provision_all().await;
            }
            true
        });

        tokio::spawn(run_maintenance(
            self.cache.clone(),
            Duration::from_secs(self.config.cache.maintenance_interval_secs),
            shutdown.subscribe(),
        ))
    }

    pub async fn query(&self, query_type: &str, params: &QueryParams) -> QueryResponse {
        self.orchestrator.query(query_type, params).await
    }

    pub async fn chat(&self, messages: &[ChatMessage], model: Option<&str>) -> Generation {
        self.client.chat(messages, model).await
    }

    /// Manual re-provisioning of one specialized model.
    pub async fn retry_model(&self, query_type: &str) -> Option<ModelStatus> {
        self.provisioner.retry(query_type).await
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            version: env!("CARGO_PKG_VERSION"),
            initialization: self.initializer.last_outcome(),
            backend: self.client.status(),
            models: self.registry.descriptors(),
            similar_queries: self.orchestrator.similar_queries().len(),
        }
    }
}
