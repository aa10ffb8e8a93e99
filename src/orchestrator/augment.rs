//! Response augmentation.
//!
//! One augmenter runs after merging, selected by `routing.augmenter`.

use std::fmt::Debug;

use crate::knowledge::KnowledgeSource;
use crate::orchestrator::classify::ClassifiedQuery;

const CHEMICAL_TERMS: &[&str] = &["insecticide", "pesticide", "miticide", "chemical", "emamectin", "sulphur"];

const SAFETY_NOTE: &str = "Safety: wear gloves and a mask when mixing or spraying, follow the label dose and \
pre-harvest interval, and keep products away from children, water sources and bees.";

/// Post-processing applied to merged answers.
pub trait ResponseAugmenter: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    fn augment(&self, query: &ClassifiedQuery, response: String, knowledge: &dyn KnowledgeSource) -> String;
}

/// Leaves answers unchanged.
#[derive(Debug, Default)]
pub struct NoAugmenter;

impl ResponseAugmenter for NoAugmenter {
    fn name(&self) -> &'static str {
        "none"
    }

    fn augment(&self, _query: &ClassifiedQuery, response: String, _knowledge: &dyn KnowledgeSource) -> String {
        response
    }
}

/// Appends practices the knowledge source relates to the query's pest.
#[derive(Debug, Default)]
pub struct RelatedPractices;

impl ResponseAugmenter for RelatedPractices {
    fn name(&self) -> &'static str {
        "related_practices"
    }

    fn augment(&self, query: &ClassifiedQuery, response: String, knowledge: &dyn KnowledgeSource) -> String {
        let (Some(pest), Some(augmentable)) = (query.pest.as_deref(), knowledge.as_augmentable()) else {
            return response;
        };

        let lowered = response.to_lowercase();
        let extra: Vec<String> = augmentable
            .related_practices(pest)
            .into_iter()
            .map(|p| p.name)
            .filter(|name| !lowered.contains(&name.to_lowercase()))
            .collect();

        if extra.is_empty() {
            response
        } else {
            format!("{}\n\nRelated practices: {}.", response, extra.join(", "))
        }
    }
}

/// Appends a handling reminder when chemical control is mentioned.
#[derive(Debug, Default)]
pub struct SafetyNote;

impl ResponseAugmenter for SafetyNote {
    fn name(&self) -> &'static str {
        "safety_note"
    }

    fn augment(&self, _query: &ClassifiedQuery, response: String, _knowledge: &dyn KnowledgeSource) -> String {
        let lowered = response.to_lowercase();
        if CHEMICAL_TERMS.iter().any(|t| lowered.contains(t)) && !response.contains(SAFETY_NOTE) {
            format!("{}\n\n{}", response, SAFETY_NOTE)
        } else {
            response
        }
    }
}

/// Augmenter by configured name. Unknown names fall back to `none`.
pub fn augmenter_for(name: &str) -> Box<dyn ResponseAugmenter> {
    match name {
        "none" => Box::new(NoAugmenter),
        "related_practices" => Box::new(RelatedPractices),
        "safety_note" => Box::new(SafetyNote),
        other => {
            tracing::warn!(augmenter = %other, "Unknown augmenter, using none");
            Box::new(NoAugmenter)
        }
    }
}
