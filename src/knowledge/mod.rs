//! Local knowledge source.
//!
//! The orchestrator consults a [`KnowledgeSource`] before deciding whether
//! the inference backend is needed. Sources that can also suggest related
//! practices expose the [`Augmentable`] capability.

pub mod store;
pub mod types;

use std::fmt::Debug;

pub use store::{KnowledgeBase, KnowledgeError};
pub use types::{CropRecord, EntityKind, KnowledgeRecord, Lookup, PestRecord, PracticeRecord};

/// Synchronous lookup of structured facts by entity name.
pub trait KnowledgeSource: Send + Sync + Debug {
    fn lookup(&self, kind: EntityKind, name: &str) -> Lookup;

    /// The augmentation capability, when this source has it.
    fn as_augmentable(&self) -> Option<&dyn Augmentable> {
        None
    }
}

/// Sources that can relate practices to a pest.
pub trait Augmentable {
    fn related_practices(&self, pest: &str) -> Vec<PracticeRecord>;
}
