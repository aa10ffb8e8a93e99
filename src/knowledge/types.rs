//! Knowledge records.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PestRecord {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub scientific_name: Option<String>,
    pub description: String,
    #[serde(default)]
    pub symptoms: Vec<String>,
    /// Crops this pest attacks.
    #[serde(default)]
    pub crops: Vec<String>,
    #[serde(default)]
    pub controls: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PracticeRecord {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub steps: Vec<String>,
    /// Pest names the practice is used against.
    #[serde(default)]
    pub targets: Vec<String>,
    /// Traditional or farmer-developed practice.
    #[serde(default)]
    pub indigenous: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CropRecord {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Pest names known to attack the crop.
    #[serde(default)]
    pub pests: Vec<String>,
}

/// Which kind of entity a lookup is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Pest,
    Practice,
    Crop,
}

/// One structured record.
#[derive(Debug, Clone, PartialEq)]
pub enum KnowledgeRecord {
    Pest(PestRecord),
    Practice(PracticeRecord),
    Crop(CropRecord),
}

/// Result of a knowledge lookup. `NotFound` is an answer, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(KnowledgeRecord),
    NotFound,
}

impl Lookup {
    pub fn found(self) -> Option<KnowledgeRecord> {
        match self {
            Lookup::Found(record) => Some(record),
            Lookup::NotFound => None,
        }
    }
}

/// On-disk layout of a knowledge file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeFile {
    #[serde(default)]
    pub pests: Vec<PestRecord>,
    #[serde(default)]
    pub practices: Vec<PracticeRecord>,
    #[serde(default)]
    pub crops: Vec<CropRecord>,
}
