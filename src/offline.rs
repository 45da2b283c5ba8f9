//! Canned answers served while the breaker is offline.
//!
//! The template kind is guessed from the prompt, the product category from
//! keywords in it, and the wording is picked at random among a few variants
//! so repeated offline answers don't read identically.

use rand::seq::SliceRandom;

use crate::types::{GenerateRequest, SyntheticResponse, TemplateKind};

struct Category {
    name: &'static str,
    keywords: &'static [&'static str],
    tags: &'static [&'static str],
}

const CATEGORIES: &[Category] = &[
    Category {
        name: "electronics",
        keywords: &[
            "electronic", "phone", "laptop", "headphone", "camera", "tablet", "speaker", "charger",
            "tv", "monitor",
        ],
        tags: &["electronics", "tech", "gadgets", "wireless", "smart"],
    },
    Category {
        name: "clothing",
        keywords: &[
            "clothing", "shirt", "dress", "jacket", "shoe", "sneaker", "jeans", "apparel", "hoodie",
        ],
        tags: &["fashion", "apparel", "style", "comfortable", "everyday"],
    },
    Category {
        name: "home",
        keywords: &["home", "kitchen", "furniture", "lamp", "sofa", "decor", "bedding", "cookware"],
        tags: &["home", "decor", "living", "kitchen", "cozy"],
    },
    Category {
        name: "beauty",
        keywords: &["beauty", "skincare", "makeup", "cosmetic", "fragrance", "serum", "lotion"],
        tags: &["beauty", "skincare", "self-care", "glow", "cosmetics"],
    },
    Category {
        name: "sports",
        keywords: &["sport", "fitness", "yoga", "running", "gym", "bike", "outdoor", "camping"],
        tags: &["sports", "fitness", "outdoor", "active", "training"],
    },
    Category {
        name: "books",
        keywords: &["book", "novel", "reading", "author", "paperback", "hardcover"],
        tags: &["books", "reading", "literature", "gift", "bestseller"],
    },
    Category {
        name: "toys",
        keywords: &["toy", "game", "puzzle", "lego", "kids", "children"],
        tags: &["toys", "kids", "games", "fun", "family"],
    },
    Category {
        name: "grocery",
        keywords: &["grocery", "food", "snack", "coffee", "tea", "organic", "beverage"],
        tags: &["grocery", "food", "organic", "pantry", "fresh"],
    },
];

const GENERAL_TAGS: &[&str] = &["popular", "quality", "value", "bestseller", "new-arrival"];

const DESCRIPTION_TEMPLATES: &[&str] = &[
    "A dependable {category} pick that balances quality and value. Built for everyday use, it is a smart addition to any collection.",
    "Discover this {category} favorite: thoughtfully designed, reliably made, and ready for daily use.",
    "Quality you can count on. This {category} item combines practical design with lasting durability.",
];

const REVIEW_TEMPLATES: &[&str] = &[
    "Customers generally appreciate this product's quality and value. Detailed review insights will be available again shortly.",
    "Reviewers highlight reliable performance and good value. A full AI summary is temporarily unavailable.",
];

const RECOMMENDATION_TEMPLATES: &[&str] = &[
    "Popular picks in {category} are a great place to start while personalized recommendations are unavailable.",
    "Browse our best-selling {category} items. Personalized suggestions will return shortly.",
];

const VISUAL_SEARCH_TEMPLATES: &[&str] = &[
    "Image search is temporarily unavailable. Try searching by product name or category instead.",
    "We couldn't analyze this image right now. Browse {category} or use keyword search in the meantime.",
];

const GENERIC_TEMPLATES: &[&str] = &[
    "AI features are temporarily unavailable. Please try again in a few minutes.",
    "Our assistant is taking a short break. Basic features remain available while it recovers.",
];

/// Produces [`SyntheticResponse`]s for offline mode.
#[derive(Debug, Clone, Default)]
pub struct OfflineResponder;

impl OfflineResponder {
    pub fn new() -> Self {
        Self
    }

    pub fn respond(&self, request: &GenerateRequest) -> SyntheticResponse {
        let prompt = request.prompt.to_lowercase();
        let tokens = words(&prompt);
        let template = classify(&tokens, request.has_image());
        let category = detect_category(&tokens);
        let category_name = category.map(|c| c.name).unwrap_or("store");
        let mut rng = rand::thread_rng();

        let text = match template {
            TemplateKind::ProductTags => {
                let mut tags: Vec<&str> = category
                    .map(|c| c.tags.to_vec())
                    .unwrap_or_else(|| GENERAL_TAGS.to_vec());
                tags.shuffle(&mut rng);
                tags.join(", ")
            }
            kind => {
                let pool = match kind {
                    TemplateKind::ProductDescription => DESCRIPTION_TEMPLATES,
                    TemplateKind::ReviewEnhancement => REVIEW_TEMPLATES,
                    TemplateKind::Recommendations => RECOMMENDATION_TEMPLATES,
                    TemplateKind::VisualSearch => VISUAL_SEARCH_TEMPLATES,
                    _ => GENERIC_TEMPLATES,
                };
                pool.choose(&mut rng)
                    .copied()
                    .unwrap_or(GENERIC_TEMPLATES[0])
                    .replace("{category}", category_name)
            }
        };

        SyntheticResponse {
            text,
            template,
            category: category.map(|c| c.name.to_string()),
        }
    }
}

/// Endings a prompt word may add to a keyword and still count as a mention.
const INFLECTIONS: &[&str] = &["", "s", "es", "d", "ed", "ing"];

fn words(prompt: &str) -> Vec<&str> {
    prompt
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect()
}

fn mentions(words: &[&str], keywords: &[&str]) -> bool {
    words.iter().any(|word| {
        keywords.iter().any(|k| {
            word.strip_prefix(*k)
                .is_some_and(|rest| INFLECTIONS.contains(&rest))
        })
    })
}

fn classify(words: &[&str], has_image: bool) -> TemplateKind {
    if has_image {
        TemplateKind::VisualSearch
    } else if mentions(words, &["tag", "keyword"]) {
        TemplateKind::ProductTags
    } else if mentions(words, &["review"]) {
        TemplateKind::ReviewEnhancement
    } else if mentions(words, &["recommend", "recommendation", "suggest", "suggestion"]) {
        TemplateKind::Recommendations
    } else if mentions(words, &["description", "describe"]) {
        TemplateKind::ProductDescription
    } else {
        TemplateKind::Generic
    }
}

fn detect_category(words: &[&str]) -> Option<&'static Category> {
    CATEGORIES.iter().find(|c| mentions(words, c.keywords))
}
