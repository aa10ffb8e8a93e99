//! Facts gathered from the knowledge source for one query.

use crate::knowledge::{EntityKind, KnowledgeRecord, KnowledgeSource, PestRecord, PracticeRecord};
use crate::orchestrator::classify::{ClassifiedQuery, QueryType};

/// Formatted facts, one statement per line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Facts {
    pub lines: Vec<String>,
}

impl Facts {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

pub fn gather(knowledge: &dyn KnowledgeSource, query: &ClassifiedQuery) -> Facts {
    let mut lines = Vec::new();
    let pest = query.pest.as_deref().and_then(|name| lookup_pest(knowledge, name));

    match query.kind {
        QueryType::PestIdentification | QueryType::General => {
            if let Some(pest) = &pest {
                describe_pest(pest, &mut lines);
            }
        }
        QueryType::ControlMethods => {
            if let Some(pest) = &pest {
                if !pest.controls.is_empty() {
                    lines.push(format!("Control of {}:", pest.name));
                    lines.extend(pest.controls.iter().map(|c| format!("- {}", c)));
                }
            }
        }
        QueryType::CropPests => {
            let crop = query.crop.as_deref().and_then(|name| knowledge.lookup(EntityKind::Crop, name).found());
            if let Some(KnowledgeRecord::Crop(crop)) = crop {
                if !crop.pests.is_empty() {
                    lines.push(format!("Common pests of {}: {}.", crop.name, crop.pests.join(", ")));
                }
            }
        }
        QueryType::IndigenousPractice => {
            let practice =
                query.practice.as_deref().and_then(|name| knowledge.lookup(EntityKind::Practice, name).found());
            if let Some(KnowledgeRecord::Practice(practice)) = practice {
                describe_practice(&practice, &mut lines);
            } else if let (Some(pest), Some(augmentable)) = (&pest, knowledge.as_augmentable()) {
                for practice in augmentable.related_practices(&pest.name).iter().filter(|p| p.indigenous) {
                    describe_practice(practice, &mut lines);
                }
            }
        }
    }

    Facts { lines }
}

fn lookup_pest(knowledge: &dyn KnowledgeSource, name: &str) -> Option<PestRecord> {
    match knowledge.lookup(EntityKind::Pest, name).found() {
        Some(KnowledgeRecord::Pest(pest)) => Some(pest),
        _ => None,
    }
}

fn describe_pest(pest: &PestRecord, lines: &mut Vec<String>) {
    match &pest.scientific_name {
        Some(latin) => lines.push(format!("{} ({}): {}", pest.name, latin, pest.description)),
        None => lines.push(format!("{}: {}", pest.name, pest.description)),
    }
    if !pest.symptoms.is_empty() {
        lines.push(format!("Signs: {}.", pest.symptoms.join("; ")));
    }
}

fn describe_practice(practice: &PracticeRecord, lines: &mut Vec<String>) {
    lines.push(format!("{}: {}", practice.name, practice.description));
    for (i, step) in practice.steps.iter().enumerate() {
        lines.push(format!("  {}. {}", i + 1, step));
    }
}
