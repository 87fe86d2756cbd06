//! PostgREST query construction for the prompt feed

use crate::data::{AiModel, Difficulty, FilterState, SortOption};

use super::PageRange;

/// Columns and embedded relations read for feed prompts
pub const PROMPT_SELECT: &str = "*,categories(name,color,icon),prompt_tags(tag)";

/// `order` clause for a sort mode
pub fn order_clause(sort: SortOption) -> &'static str {
    match sort {
        SortOption::Newest => "created_at.desc",
        SortOption::Popular => "total_uses.desc,total_likes.desc",
        SortOption::Trending => "total_likes.desc,created_at.desc",
    }
}

/// ILIKE pattern for a free-text term, `None` when nothing searchable remains.
///
/// PostgREST reserves `,().:"\` inside logic trees, so those characters
/// are folded to spaces.
pub fn search_pattern(search: &str) -> Option<String> {
    let cleaned: String = search
        .chars()
        .map(|c| match c {
            ',' | '(' | ')' | '.' | ':' | '"' | '\\' | '*' => ' ',
            other => other,
        })
        .collect();
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        None
    } else {
        Some(format!("*{cleaned}*"))
    }
}

/// Query string pairs for a filtered prompt page
pub fn prompt_query_params(filters: &FilterState, range: PageRange) -> Vec<(String, String)> {
    let mut params = vec![
        ("select".to_string(), PROMPT_SELECT.to_string()),
        ("order".to_string(), order_clause(filters.sort_by).to_string()),
    ];

    if !filters.category.is_empty() {
        params.push(("category_id".to_string(), format!("eq.{}", filters.category)));
    }

    if let Some(pattern) = search_pattern(&filters.search) {
        params.push((
            "or".to_string(),
            format!("(title.ilike.{pattern},content.ilike.{pattern})"),
        ));
        params.push((
            "prompt_tags.or".to_string(),
            format!("(tag.ilike.{pattern})"),
        ));

        // A search that names a difficulty or model also narrows on it
        if let Some(difficulty) = Difficulty::parse(&filters.search) {
            params.push((
                "difficulty_level".to_string(),
                format!("eq.{}", difficulty.as_str()),
            ));
        }
        if let Some(model) = AiModel::parse(&filters.search) {
            params.push(("primary_model".to_string(), format!("eq.{}", model.as_str())));
        }
    }

    if let Some(difficulty) = filters.difficulty {
        params.push((
            "difficulty_level".to_string(),
            format!("eq.{}", difficulty.as_str()),
        ));
    }
    if let Some(model) = filters.model {
        params.push(("primary_model".to_string(), format!("eq.{}", model.as_str())));
    }
    if filters.verified == Some(true) {
        params.push(("is_verified".to_string(), "eq.true".to_string()));
    }

    params.push(("offset".to_string(), range.from.to_string()));
    params.push(("limit".to_string(), range.len().to_string()));
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value<'a>(params: &'a [(String, String)], key: &str) -> Vec<&'a str> {
        params
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    #[test]
    fn default_filters_only_order_and_window() {
        let params = prompt_query_params(&FilterState::default(), PageRange::new(20, 20));
        assert_eq!(value(&params, "order"), vec!["total_uses.desc,total_likes.desc"]);
        assert_eq!(value(&params, "offset"), vec!["20"]);
        assert_eq!(value(&params, "limit"), vec!["20"]);
        assert!(value(&params, "or").is_empty());
        assert!(value(&params, "category_id").is_empty());
    }

    #[test]
    fn search_adds_text_and_tag_clauses() {
        let filters = FilterState {
            search: "cold email".to_string(),
            sort_by: SortOption::Newest,
            ..FilterState::default()
        };
        let params = prompt_query_params(&filters, PageRange::new(0, 20));
        assert_eq!(value(&params, "order"), vec!["created_at.desc"]);
        assert_eq!(
            value(&params, "or"),
            vec!["(title.ilike.*cold email*,content.ilike.*cold email*)"]
        );
        assert_eq!(value(&params, "prompt_tags.or"), vec!["(tag.ilike.*cold email*)"]);
    }

    #[test]
    fn search_naming_a_model_or_difficulty_narrows() {
        let filters = FilterState {
            search: "Claude".to_string(),
            ..FilterState::default()
        };
        let params = prompt_query_params(&filters, PageRange::new(0, 20));
        assert_eq!(value(&params, "primary_model"), vec!["eq.claude"]);

        let filters = FilterState {
            search: "advanced".to_string(),
            ..FilterState::default()
        };
        let params = prompt_query_params(&filters, PageRange::new(0, 20));
        assert_eq!(value(&params, "difficulty_level"), vec!["eq.advanced"]);
    }

    #[test]
    fn explicit_filters_map_to_equality() {
        let filters = FilterState {
            category: "c1".to_string(),
            difficulty: Some(Difficulty::Intermediate),
            model: Some(AiModel::Midjourney),
            verified: Some(true),
            ..FilterState::default()
        };
        let params = prompt_query_params(&filters, PageRange::new(0, 10));
        assert_eq!(value(&params, "category_id"), vec!["eq.c1"]);
        assert_eq!(value(&params, "difficulty_level"), vec!["eq.intermediate"]);
        assert_eq!(value(&params, "primary_model"), vec!["eq.midjourney"]);
        assert_eq!(value(&params, "is_verified"), vec!["eq.true"]);
    }

    #[test]
    fn verified_false_is_not_a_filter() {
        let filters = FilterState {
            verified: Some(false),
            ..FilterState::default()
        };
        let params = prompt_query_params(&filters, PageRange::new(0, 10));
        assert!(value(&params, "is_verified").is_empty());
    }

    #[test]
    fn reserved_characters_are_stripped_from_search() {
        assert_eq!(search_pattern("a,(b)"), Some("*a b*".to_string()));
        assert_eq!(search_pattern("  ()  "), None);
    }
}
