//! Canned advice used when the backend cannot answer.
//!
//! Pure keyword bucketing; never touches the network.

const PEST_KEYWORDS: &[&str] = &[
    "pest", "insect", "aphid", "bug", "worm", "beetle", "mite", "caterpillar", "weevil", "locust",
    "whitefly", "thrip", "borer", "infest", "larva",
];

const SOIL_KEYWORDS: &[&str] = &["soil", "ph", "compost", "fertil", "manure", "nutrient", "mulch", "erosion"];

const CROP_KEYWORDS: &[&str] = &[
    "crop", "plant", "tomato", "maize", "corn", "bean", "cassava", "rice", "wheat", "harvest", "seed",
    "yield", "rose", "cabbage",
];

const PEST_ADVICE: &str = "Our advisory service is temporarily unavailable. For most pest problems: \
inspect plants regularly, especially the undersides of leaves; remove and destroy heavily infested parts; \
encourage natural enemies such as ladybirds and lacewings; try low-risk options like soapy water or neem \
extract before chemical sprays; and contact your local extension officer if the infestation spreads.";

const SOIL_ADVICE: &str = "Our advisory service is temporarily unavailable. For soil concerns: test soil pH \
and nutrients before adding amendments; add well-rotted compost or manure to improve structure; mulch to \
conserve moisture; and rotate crops to reduce nutrient depletion and soil-borne pests.";

const CROP_ADVICE: &str = "Our advisory service is temporarily unavailable. For healthy crops: use certified \
seed of adapted varieties; plant at the recommended spacing and time; rotate crops each season; keep fields \
weed-free; and scout weekly so problems are caught early.";

const GENERIC_ADVICE: &str = "Our advisory service is temporarily unavailable. Please try again shortly. \
Meanwhile, scout your fields regularly, keep records of what you observe, and consult your local \
agricultural extension office for urgent problems.";

/// Coarse topic of a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Pest,
    Soil,
    Crop,
    General,
}

/// Bucket a prompt by keyword. Pest wins over soil, soil over crop.
pub fn topic_of(prompt: &str) -> Topic {
    let words: Vec<String> = prompt
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect();
    let mentions = |keywords: &[&str]| words.iter().any(|w| keywords.iter().any(|k| w.starts_with(k)));

    if mentions(PEST_KEYWORDS) {
        Topic::Pest
    } else if mentions(SOIL_KEYWORDS) {
        Topic::Soil
    } else if mentions(CROP_KEYWORDS) {
        Topic::Crop
    } else {
        Topic::General
    }
}

/// Deterministic advice for `prompt`.
pub fn fallback_response(prompt: &str) -> &'static str {
    match topic_of(prompt) {
        Topic::Pest => PEST_ADVICE,
        Topic::Soil => SOIL_ADVICE,
        Topic::Crop => CROP_ADVICE,
        Topic::General => GENERIC_ADVICE,
    }
}
