//! Specialized model registry.
//!
//! One descriptor per configured query type. Status only moves forward
//! (`UNKNOWN → CREATING → VERIFYING → READY`, or into `FAILED`), except that a
//! manual retry may move `FAILED` back to `CREATING`.

use std::path::PathBuf;

use dashmap::DashMap;
use serde::Serialize;

use crate::config::ModelsConfig;
use crate::observability::metrics;

/// Provisioning status of one specialized model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModelStatus {
    Unknown,
    Creating,
    Verifying,
    Ready,
    Failed,
}

impl ModelStatus {
    fn rank(self) -> u8 {
        match self {
            ModelStatus::Unknown => 0,
            ModelStatus::Creating => 1,
            ModelStatus::Verifying => 2,
            ModelStatus::Ready | ModelStatus::Failed => 3,
        }
    }

    /// Whether `self → next` is a legal transition.
    pub fn can_advance_to(self, next: ModelStatus) -> bool {
        match (self, next) {
            (a, b) if a == b => true,
            (ModelStatus::Failed, ModelStatus::Creating) => true,
            (ModelStatus::Ready, _) | (ModelStatus::Failed, _) => false,
            (a, b) => b.rank() > a.rank(),
        }
    }
}

impl std::fmt::Display for ModelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ModelStatus::Unknown => "UNKNOWN",
            ModelStatus::Creating => "CREATING",
            ModelStatus::Verifying => "VERIFYING",
            ModelStatus::Ready => "READY",
            ModelStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// A query type's specialized model.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModelDescriptor {
    pub query_type: String,
    pub name: String,
    pub template: PathBuf,
    pub status: ModelStatus,
}

/// Concurrent map from query type to its specialized model.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: DashMap<String, ModelDescriptor>,
}

impl ModelRegistry {
    pub fn from_config(config: &ModelsConfig) -> Self {
        let models = DashMap::new();
        for entry in &config.specialized {
            models.insert(
                entry.query_type.clone(),
                ModelDescriptor {
                    query_type: entry.query_type.clone(),
                    name: entry.name.clone(),
                    template: PathBuf::from(&entry.template),
                    status: ModelStatus::Unknown,
                },
            );
        }
        Self { models }
    }

    pub fn descriptor(&self, query_type: &str) -> Option<ModelDescriptor> {
        self.models.get(query_type).map(|d| d.clone())
    }

    /// All descriptors, ordered by query type.
    pub fn descriptors(&self) -> Vec<ModelDescriptor> {
        let mut all: Vec<ModelDescriptor> = self.models.iter().map(|d| d.value().clone()).collect();
        all.sort_by(|a, b| a.query_type.cmp(&b.query_type));
        all
    }

    pub fn query_types(&self) -> Vec<String> {
        self.descriptors().into_iter().map(|d| d.query_type).collect()
    }

    pub fn status(&self, query_type: &str) -> Option<ModelStatus> {
        self.models.get(query_type).map(|d| d.status)
    }

    /// Move a descriptor to `next`. Illegal transitions are refused.
    pub fn set_status(&self, query_type: &str, next: ModelStatus) -> bool {
        let Some(mut entry) = self.models.get_mut(query_type) else {
            return false;
        };
        let current = entry.status;
        if !current.can_advance_to(next) {
            tracing::warn!(query_type, from = %current, to = %next, "Refusing model status transition");
            return false;
        }
        if current != next {
            tracing::info!(query_type, model = %entry.name, from = %current, to = %next, "Model status changed");
            entry.status = next;
            metrics::record_model_ready(&entry.name, next == ModelStatus::Ready);
        }
        true
    }

    /// The specialized model for `query_type`, only once it is READY.
    pub fn model_for(&self, query_type: &str) -> Option<String> {
        self.models
            .get(query_type)
            .filter(|d| d.status == ModelStatus::Ready)
            .map(|d| d.name.clone())
    }
}
