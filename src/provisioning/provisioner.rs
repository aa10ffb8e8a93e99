//! Specialized model provisioning.
//!
//! # Responsibilities
//! - Detect models that already exist on the backend
//! - Build missing ones from their modelfile template
//! - Verify a created model becomes listable within a bounded budget
//!
//! # Design Decisions
//! - A failure marks only that model FAILED; callers degrade to the default model
//! - Nothing here blocks startup; the initializer runs it in the background

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use futures_util::StreamExt;
use thiserror::Error;

use crate::config::ModelsConfig;
use crate::inference::api::CreateRequest;
use crate::inference::{same_model, InferenceClient, InferenceError};
use crate::provisioning::modelfile::normalize_modelfile;
use crate::provisioning::registry::{ModelDescriptor, ModelRegistry, ModelStatus};
use crate::provisioning::stream::{parse_line, CreateTracker, LineBuffer};
use crate::resilience::timeouts::{with_deadline, Elapsed};

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("cannot read template {path}: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("backend error: {0}")]
    Backend(#[from] InferenceError),

    #[error("model create failed: {0}")]
    CreateFailed(String),

    #[error("model '{model}' not listed after {waited:?}")]
    NotVisible { model: String, waited: Duration },
}

pub type ProvisionResult<T> = Result<T, ProvisionError>;

/// Creates and verifies specialized models.
#[derive(Debug)]
pub struct ModelProvisioner {
    client: Arc<InferenceClient>,
    registry: Arc<ModelRegistry>,
    verify_timeout: Duration,
    verify_interval: Duration,
}

impl ModelProvisioner {
    pub fn new(client: Arc<InferenceClient>, registry: Arc<ModelRegistry>, config: &ModelsConfig) -> Self {
        Self {
            client,
            registry,
            verify_timeout: Duration::from_secs(config.verify_timeout_secs),
            verify_interval: Duration::from_millis(config.verify_interval_ms),
        }
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Provision every registered model concurrently. Returns how many are READY.
    pub async fn provision_all(&self) -> usize {
        let query_types = self.registry.query_types();
        let results = join_all(query_types.iter().map(|qt| self.ensure_ready(qt))).await;
        let ready = results.iter().filter(|ok| **ok).count();
        tracing::info!(ready, total = results.len(), "Specialized model provisioning finished");
        ready
    }

    /// Make the model for `query_type` READY. Never raises; `false` means FAILED.
    pub async fn ensure_ready(&self, query_type: &str) -> bool {
        let Some(descriptor) = self.registry.descriptor(query_type) else {
            tracing::warn!(query_type, "No specialized model registered");
            return false;
        };
        if descriptor.status == ModelStatus::Ready {
            return true;
        }

        match self.provision(&descriptor).await {
            Ok(()) => self.registry.set_status(query_type, ModelStatus::Ready),
            Err(e) => {
                tracing::warn!(query_type, model = %descriptor.name, error = %e, "Model provisioning failed");
                self.registry.set_status(query_type, ModelStatus::Failed);
                false
            }
        }
    }

    /// Manual re-provisioning of a FAILED model.
    ///
    /// Returns the resulting status, or `None` for an unregistered type.
    pub async fn retry(&self, query_type: &str) -> Option<ModelStatus> {
        let status = self.registry.status(query_type)?;
        if status == ModelStatus::Failed {
            self.registry.set_status(query_type, ModelStatus::Creating);
            self.ensure_ready(query_type).await;
        }
        self.registry.status(query_type)
    }

    async fn provision(&self, descriptor: &ModelDescriptor) -> ProvisionResult<()> {
        if self.is_listed(&descriptor.name).await? {
            tracing::info!(model = %descriptor.name, "Specialized model already present");
            return Ok(());
        }

        let template = tokio::fs::read_to_string(&descriptor.template)
            .await
            .map_err(|source| ProvisionError::Template { path: descriptor.template.clone(), source })?;
        let modelfile = normalize_modelfile(&template);

        self.registry.set_status(&descriptor.query_type, ModelStatus::Creating);
        self.create(&descriptor.name, &modelfile).await?;

        self.registry.set_status(&descriptor.query_type, ModelStatus::Verifying);
        self.verify(&descriptor.name).await
    }

    async fn is_listed(&self, name: &str) -> ProvisionResult<bool> {
        let models = self.client.list_models().await?;
        Ok(models.iter().any(|m| same_model(m, name)))
    }

    async fn create(&self, name: &str, modelfile: &str) -> ProvisionResult<()> {
        tracing::info!(model = %name, "Creating specialized model");
        let request = CreateRequest { name, modelfile, stream: true };
        let response = self.client.api().create_model(&request).await?;

        let mut tracker = CreateTracker::new();
        let mut lines = LineBuffer::default();
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(InferenceError::from_reqwest)?;
            for line in lines.push(&chunk) {
                if let Some(event) = parse_line(&line) {
                    tracker.apply(&event);
                }
            }
        }
        if let Some(event) = lines.finish().as_deref().and_then(parse_line) {
            tracker.apply(&event);
        }

        tracker.finish().map(|_| ()).map_err(ProvisionError::CreateFailed)
    }

    async fn verify(&self, name: &str) -> ProvisionResult<()> {
        let poll = async {
            loop {
                match self.is_listed(name).await {
                    Ok(true) => return,
                    Ok(false) => tracing::debug!(model = %name, "Model not listed yet"),
                    Err(e) => tracing::debug!(model = %name, error = %e, "Listing failed during verification"),
                }
                tokio::time::sleep(self.verify_interval).await;
            }
        };

        with_deadline(self.verify_timeout, poll)
            .await
            .map_err(|Elapsed(waited)| ProvisionError::NotVisible { model: name.to_string(), waited })
    }
}
