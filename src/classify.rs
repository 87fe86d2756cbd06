//! Tag and category auto-classification
//!
//! Keyword heuristics applied when a prompt is submitted. Both functions
//! are pure: same text and categories in, same labels out.

use crate::data::Category;

/// Keyword -> canonical category name, scanned in order
const CATEGORY_KEYWORDS: &[(&str, &str)] = &[
    ("seo", "SEO"),
    ("backlink", "SEO"),
    ("marketing", "Marketing"),
    ("campaign", "Marketing"),
    ("email", "AI Assistant"),
    ("mail", "AI Assistant"),
    ("cooking", "Cooking"),
    ("recipe", "Cooking"),
    ("code", "Code Generation"),
    ("programming", "Code Generation"),
    ("analysis", "Data Analysis"),
    ("data", "Data Analysis"),
    ("creative", "Creative Writing"),
    ("story", "Creative Writing"),
];

/// Keyword -> tag, scanned in order
const TAG_KEYWORDS: &[(&str, &str)] = &[
    ("email", "email"),
    ("mail", "email"),
    ("social", "social-media"),
    ("instagram", "social-media"),
    ("linkedin", "social-media"),
    ("business", "business"),
    ("professional", "business"),
    ("marketing", "marketing"),
    ("campaign", "marketing"),
    ("code", "coding"),
    ("programming", "coding"),
    ("creative", "creative"),
    ("story", "creative"),
    ("analysis", "analysis"),
    ("analyze", "analysis"),
    ("strategy", "strategy"),
    ("strategic", "strategy"),
    ("content", "content"),
    ("blog", "content"),
    ("sales", "sales"),
    ("selling", "sales"),
    ("legal", "legal"),
    ("contract", "legal"),
    ("resume", "resume"),
    ("cv", "resume"),
    ("interview", "interview"),
    ("seo", "seo"),
    ("cooking", "cooking"),
    ("recipe", "cooking"),
];

/// Pick up to `max` categories for a text.
///
/// Direct category-name matches come first, then keyword hits, each in
/// first-matched order without duplicates. When nothing matches and
/// categories exist, the first available category is returned.
pub fn detect_categories<'a>(
    text: &str,
    available: &'a [Category],
    max: usize,
) -> Vec<&'a Category> {
    let lower = text.to_lowercase();
    let mut matched: Vec<&'a Category> = Vec::new();

    for category in available {
        if matched.len() >= max {
            break;
        }
        if lower.contains(&category.name.to_lowercase())
            && !matched.iter().any(|m| m.id == category.id)
        {
            matched.push(category);
        }
    }

    for (keyword, name) in CATEGORY_KEYWORDS {
        if matched.len() >= max {
            break;
        }
        if !lower.contains(keyword) {
            continue;
        }
        let hit = available
            .iter()
            .find(|category| category.name.eq_ignore_ascii_case(name));
        if let Some(category) = hit {
            if !matched.iter().any(|m| m.id == category.id) {
                matched.push(category);
            }
        }
    }

    if matched.is_empty() && max > 0 {
        if let Some(first) = available.first() {
            matched.push(first);
        }
    }

    matched
}

/// Derive tags from free text, deduplicated in first-match order
pub fn generate_smart_tags(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut tags: Vec<String> = Vec::new();

    for (keyword, tag) in TAG_KEYWORDS {
        if lower.contains(keyword) && !tags.iter().any(|t| t == tag) {
            tags.push((*tag).to_string());
        }
    }

    tags
}
