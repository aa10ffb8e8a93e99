//! Query classification.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Caller-supplied query parameters.
pub type QueryParams = BTreeMap<String, String>;

/// The kinds of question the advisor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    PestIdentification,
    ControlMethods,
    CropPests,
    IndigenousPractice,
    General,
}

impl QueryType {
    /// Unknown tags classify as `General`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "pest_identification" | "identify" | "identification" => QueryType::PestIdentification,
            "control_methods" | "control" => QueryType::ControlMethods,
            "crop_pests" => QueryType::CropPests,
            "indigenous_practice" | "indigenous_practices" | "indigenous" => QueryType::IndigenousPractice,
            _ => QueryType::General,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::PestIdentification => "pest_identification",
            QueryType::ControlMethods => "control_methods",
            QueryType::CropPests => "crop_pests",
            QueryType::IndigenousPractice => "indigenous_practice",
            QueryType::General => "general",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A query after classification.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedQuery {
    pub kind: QueryType,
    /// Free text, or a short phrase built from the entities when none was given.
    pub text: String,
    pub pest: Option<String>,
    pub crop: Option<String>,
    pub practice: Option<String>,
}

impl ClassifiedQuery {
    /// The entities this query is about, lower-cased, e.g. `pest=aphid|crop=|practice=`.
    ///
    /// Two queries with the same text but different subjects get different facts.
    pub fn subject(&self) -> String {
        let norm = |v: &Option<String>| v.as_deref().map(str::to_lowercase).unwrap_or_default();
        format!("pest={}|crop={}|practice={}", norm(&self.pest), norm(&self.crop), norm(&self.practice))
    }
}

fn param(params: &QueryParams, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| params.get(*k))
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn classify(query_type: &str, params: &QueryParams) -> ClassifiedQuery {
    let kind = QueryType::from_tag(query_type);
    let pest = param(params, &["pest_name", "pest"]);
    let crop = param(params, &["crop", "crop_name"]);
    let practice = param(params, &["practice", "practice_name"]);

    let text = param(params, &["query", "message", "question"]).unwrap_or_else(|| {
        let subject = pest.as_deref().or(practice.as_deref()).unwrap_or("");
        let phrase = match kind {
            QueryType::PestIdentification => format!("{} identification", subject),
            QueryType::ControlMethods => match &crop {
                Some(crop) => format!("{} control on {}", subject, crop),
                None => format!("{} control", subject),
            },
            QueryType::CropPests => format!("pests of {}", crop.as_deref().unwrap_or(subject)),
            QueryType::IndigenousPractice => format!("indigenous practices for {}", subject),
            QueryType::General => subject.to_string(),
        };
        phrase.trim().to_string()
    });

    ClassifiedQuery { kind, text, pest, crop, practice }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_known_and_unknown_tags() {
        assert_eq!(QueryType::from_tag("pest_identification"), QueryType::PestIdentification);
        assert_eq!(QueryType::from_tag("Control-Methods"), QueryType::ControlMethods);
        assert_eq!(QueryType::from_tag("crop_pests"), QueryType::CropPests);
        assert_eq!(QueryType::from_tag("indigenous_practice"), QueryType::IndigenousPractice);
        assert_eq!(QueryType::from_tag("weather"), QueryType::General);
        assert_eq!(QueryType::from_tag(""), QueryType::General);
    }

    #[test]
    fn test_entities_extracted() {
        let q = classify("control_methods", &params(&[("pest_name", "aphid"), ("crop", "tomato")]));
        assert_eq!(q.pest.as_deref(), Some("aphid"));
        assert_eq!(q.crop.as_deref(), Some("tomato"));
        assert_eq!(q.text, "aphid control on tomato");
    }

    #[test]
    fn test_free_text_wins() {
        let q = classify("general", &params(&[("query", " How do I control aphids on roses? "), ("pest", "aphid")]));
        assert_eq!(q.text, "How do I control aphids on roses?");
        assert_eq!(q.pest.as_deref(), Some("aphid"));
    }

    #[test]
    fn test_blank_params_ignored() {
        let q = classify("crop_pests", &params(&[("crop", "  "), ("crop_name", "maize")]));
        assert_eq!(q.crop.as_deref(), Some("maize"));
        assert_eq!(q.text, "pests of maize");
    }

    #[test]
    fn test_subject_names_entities() {
        let q = classify("general", &params(&[("query", "What damage does it cause?"), ("pest", "Aphid"), ("crop", "maize")]));
        assert_eq!(q.subject(), "pest=aphid|crop=maize|practice=");
        let other = classify("general", &params(&[("query", "What damage does it cause?"), ("pest", "whitefly")]));
        assert_ne!(q.subject(), other.subject());
    }
}
