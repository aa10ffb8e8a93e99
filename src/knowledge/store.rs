//! In-memory knowledge base.
//!
//! Loaded once at startup from a JSON file, or from the built-in seed when no
//! file is configured. Names match case-insensitively, by alias, and with a
//! trailing plural `s` dropped.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

use crate::knowledge::types::{
    CropRecord, EntityKind, KnowledgeFile, KnowledgeRecord, Lookup, PestRecord, PracticeRecord,
};
use crate::knowledge::{Augmentable, KnowledgeSource};

const SEED: &str = include_str!("seed.json");

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("cannot read knowledge file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid knowledge file: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Default)]
pub struct KnowledgeBase {
    pests: Vec<PestRecord>,
    practices: Vec<PracticeRecord>,
    crops: Vec<CropRecord>,
    pest_index: HashMap<String, usize>,
    practice_index: HashMap<String, usize>,
    crop_index: HashMap<String, usize>,
}

impl KnowledgeBase {
    pub fn from_file_contents(file: KnowledgeFile) -> Self {
        let mut kb = Self::default();
        for (i, pest) in file.pests.iter().enumerate() {
            for name in std::iter::once(&pest.name).chain(&pest.aliases) {
                kb.pest_index.insert(normalize_name(name), i);
            }
        }
        for (i, practice) in file.practices.iter().enumerate() {
            kb.practice_index.insert(normalize_name(&practice.name), i);
        }
        for (i, crop) in file.crops.iter().enumerate() {
            for name in std::iter::once(&crop.name).chain(&crop.aliases) {
                kb.crop_index.insert(normalize_name(name), i);
            }
        }
        kb.pests = file.pests;
        kb.practices = file.practices;
        kb.crops = file.crops;
        kb
    }

    /// The bundled seed data.
    pub fn seed() -> Result<Self, KnowledgeError> {
        let file: KnowledgeFile = serde_json::from_str(SEED)?;
        Ok(Self::from_file_contents(file))
    }

    pub fn load(path: &Path) -> Result<Self, KnowledgeError> {
        let contents = std::fs::read_to_string(path)?;
        let file: KnowledgeFile = serde_json::from_str(&contents)?;
        let kb = Self::from_file_contents(file);
        tracing::info!(
            path = %path.display(),
            pests = kb.pests.len(),
            practices = kb.practices.len(),
            crops = kb.crops.len(),
            "Loaded knowledge base"
        );
        Ok(kb)
    }

    /// Load `path` if given, otherwise the seed.
    pub fn from_config(path: Option<&str>) -> Result<Self, KnowledgeError> {
        match path {
            Some(path) => Self::load(Path::new(path)),
            None => Self::seed(),
        }
    }

    fn index_of(index: &HashMap<String, usize>, name: &str) -> Option<usize> {
        let key = normalize_name(name);
        index.get(&key).copied().or_else(|| {
            let singular = key.strip_suffix('s')?;
            index.get(singular).copied()
        })
    }
}

fn normalize_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

impl KnowledgeSource for KnowledgeBase {
    fn lookup(&self, kind: EntityKind, name: &str) -> Lookup {
        let record = match kind {
            EntityKind::Pest => {
                Self::index_of(&self.pest_index, name).map(|i| KnowledgeRecord::Pest(self.pests[i].clone()))
            }
            EntityKind::Practice => Self::index_of(&self.practice_index, name)
                .map(|i| KnowledgeRecord::Practice(self.practices[i].clone())),
            EntityKind::Crop => {
                Self::index_of(&self.crop_index, name).map(|i| KnowledgeRecord::Crop(self.crops[i].clone()))
            }
        };
        record.map_or(Lookup::NotFound, Lookup::Found)
    }

    fn as_augmentable(&self) -> Option<&dyn Augmentable> {
        Some(self)
    }
}

impl Augmentable for KnowledgeBase {
    fn related_practices(&self, pest: &str) -> Vec<PracticeRecord> {
        let Some(i) = Self::index_of(&self.pest_index, pest) else {
            return Vec::new();
        };
        let canonical = normalize_name(&self.pests[i].name);
        self.practices
            .iter()
            .filter(|p| p.targets.iter().any(|t| normalize_name(t) == canonical))
            .cloned()
            .collect()
    }
}
