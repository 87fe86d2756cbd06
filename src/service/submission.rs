//! Prompt submission
//!
//! Validates a new prompt, inserts it, then attaches tags built from the
//! user's input, the chosen category and model, and keyword heuristics.

use std::sync::Arc;

use crate::classify::{detect_categories, generate_smart_tags};
use crate::data::{AiModel, Category, Difficulty, ModerationStatus, NewPrompt, Prompt};
use crate::error::AppError;
use crate::gateway::{PromptSource, PromptWriter};

const MIN_TITLE_CHARS: usize = 5;
const MIN_CONTENT_CHARS: usize = 20;
const DEFAULT_AUTHOR: &str = "Anonymous";

/// User input for a new prompt
#[derive(Debug, Clone, PartialEq)]
pub struct PromptSubmission {
    pub title: String,
    pub content: String,
    pub description: Option<String>,
    /// Selected category ids; the first one is stored on the prompt
    pub category_ids: Vec<String>,
    pub model: AiModel,
    pub difficulty: Difficulty,
    /// Comma-separated free-form tags
    pub tags: String,
    pub technique_explanation: Option<String>,
    pub example_output: Option<String>,
    pub author_name: Option<String>,
}

impl PromptSubmission {
    /// # Errors
    /// `Validation` naming the first offending field
    pub fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().chars().count() < MIN_TITLE_CHARS {
            return Err(AppError::Validation(format!(
                "title must be at least {MIN_TITLE_CHARS} characters"
            )));
        }
        if self.content.trim().chars().count() < MIN_CONTENT_CHARS {
            return Err(AppError::Validation(format!(
                "content must be at least {MIN_CONTENT_CHARS} characters"
            )));
        }
        if self.category_ids.is_empty() {
            return Err(AppError::Validation(
                "at least one category is required".to_string(),
            ));
        }
        Ok(())
    }

    fn to_row(&self) -> NewPrompt {
        NewPrompt {
            title: self.title.trim().to_string(),
            content: self.content.trim().to_string(),
            description: non_blank(self.description.as_deref()),
            category_id: self.category_ids.first().cloned(),
            primary_model: self.model.as_str().to_string(),
            compatible_models: vec![self.model.as_str().to_string()],
            difficulty_level: self.difficulty,
            author_name: non_blank(self.author_name.as_deref())
                .unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
            technique_explanation: non_blank(self.technique_explanation.as_deref()),
            example_output: non_blank(self.example_output.as_deref()),
            moderation_status: ModerationStatus::Approved,
            total_likes: 0,
            total_dislikes: 0,
            total_uses: 0,
            quality_score: 0.0,
            is_verified: false,
            is_featured: false,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Tags stored with a submission, deduplicated in first-seen order.
///
/// User tags come first, then the category name, model, difficulty and
/// keyword-derived tags.
pub fn build_tags(submission: &PromptSubmission, category_name: Option<&str>) -> Vec<String> {
    let user_tags = submission
        .tags
        .split(',')
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty());

    let text = format!(
        "{} {} {}",
        submission.title,
        submission.description.as_deref().unwrap_or_default(),
        submission.content
    );

    let mut tags: Vec<String> = Vec::new();
    let candidates = user_tags
        .chain(category_name.map(|name| name.to_lowercase()))
        .chain([
            submission.model.as_str().to_string(),
            submission.difficulty.as_str().to_string(),
        ])
        .chain(generate_smart_tags(&text));
    for tag in candidates {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

/// Creates prompts and suggests their categories
pub struct SubmissionService {
    source: Arc<dyn PromptSource>,
    writer: Arc<dyn PromptWriter>,
}

impl SubmissionService {
    pub fn new(source: Arc<dyn PromptSource>, writer: Arc<dyn PromptWriter>) -> Self {
        Self { source, writer }
    }

    /// Categories detected in `text`, at most `max`
    pub async fn suggest_categories(
        &self,
        text: &str,
        max: usize,
    ) -> Result<Vec<Category>, AppError> {
        let categories = self.source.fetch_categories().await?;
        Ok(detect_categories(text, &categories, max)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Validate and store a prompt with its tags.
    ///
    /// A tag insert failure is logged; the stored prompt is still returned.
    pub async fn submit(&self, submission: &PromptSubmission) -> Result<Prompt, AppError> {
        submission.validate()?;

        let categories = self.source.fetch_categories().await?;
        let category_name = submission.category_ids.first().and_then(|id| {
            categories
                .iter()
                .find(|category| &category.id == id)
                .map(|category| category.name.as_str())
        });

        let prompt = self.writer.insert_prompt(&submission.to_row()).await?;
        tracing::info!(prompt_id = %prompt.id, title = %prompt.title, "Prompt submitted");

        let tags = build_tags(submission, category_name);
        if let Err(error) = self.writer.insert_tags(&prompt.id, &tags).await {
            tracing::warn!(prompt_id = %prompt.id, %error, "Failed to store prompt tags");
        }

        Ok(prompt)
    }
}
