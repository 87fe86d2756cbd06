//! Data models
//!
//! Rust structs representing gateway records and locally persisted state.
//! Prompt ids are assigned by the backend; the anonymous session id is a ULID.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Enumerations
// =============================================================================

/// Prompt difficulty level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Self::Beginner, Self::Intermediate, Self::Advanced];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Beginner => "Beginner",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Beginner => "Easy to use and understand",
            Self::Intermediate => "Requires some experience",
            Self::Advanced => "For experienced users",
        }
    }

    /// Parse a case-insensitive difficulty name
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|difficulty| difficulty.as_str().eq_ignore_ascii_case(value))
    }
}

/// Feed sort mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOption {
    Newest,
    #[default]
    Popular,
    Trending,
}

/// Target AI model of a prompt
///
/// Keys are stored in the backend as `primary_model`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AiModel {
    #[serde(rename = "chatgpt")]
    ChatGpt,
    #[serde(rename = "gpt-4")]
    Gpt4,
    #[serde(rename = "claude")]
    Claude,
    #[serde(rename = "dalle")]
    Dalle,
    #[serde(rename = "midjourney")]
    Midjourney,
    #[serde(rename = "gemini")]
    Gemini,
    #[serde(rename = "perplexity")]
    Perplexity,
    #[serde(rename = "grok")]
    Grok,
    #[serde(rename = "other")]
    Other,
}

/// Display metadata for an AI model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiModelMeta {
    /// Human-readable name
    pub name: String,
    /// Where to try a prompt with this model
    pub url: String,
}

impl AiModel {
    pub const ALL: [AiModel; 9] = [
        Self::ChatGpt,
        Self::Gpt4,
        Self::Claude,
        Self::Dalle,
        Self::Midjourney,
        Self::Gemini,
        Self::Perplexity,
        Self::Grok,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChatGpt => "chatgpt",
            Self::Gpt4 => "gpt-4",
            Self::Claude => "claude",
            Self::Dalle => "dalle",
            Self::Midjourney => "midjourney",
            Self::Gemini => "gemini",
            Self::Perplexity => "perplexity",
            Self::Grok => "grok",
            Self::Other => "other",
        }
    }

    /// Parse a case-insensitive model key
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|model| model.as_str().eq_ignore_ascii_case(value))
    }

    /// Display name and launch URL; `None` for `Other`
    pub fn meta(&self) -> Option<AiModelMeta> {
        let (name, url) = match self {
            Self::ChatGpt => ("ChatGPT", "https://chat.openai.com/"),
            Self::Gpt4 => ("GPT-4", "https://chat.openai.com/"),
            Self::Claude => ("Claude", "https://claude.ai/"),
            Self::Dalle => ("DALL·E", "https://labs.openai.com/"),
            Self::Midjourney => ("Midjourney", "https://www.midjourney.com/"),
            Self::Gemini => ("Gemini", "https://gemini.google.com/app"),
            Self::Perplexity => ("Perplexity", "https://perplexity.ai/"),
            Self::Grok => ("Grok (xAI)", "https://grok.x.ai/"),
            Self::Other => return None,
        };
        Some(AiModelMeta {
            name: name.to_string(),
            url: url.to_string(),
        })
    }
}

/// Metadata for a stored `primary_model` key, with a web search fallback
/// for keys without a known launch page.
pub fn model_meta(key: &str) -> AiModelMeta {
    AiModel::parse(key)
        .and_then(|model| model.meta())
        .unwrap_or_else(|| AiModelMeta {
            name: key.to_string(),
            url: format!(
                "https://www.google.com/search?q={}",
                urlencoding::encode(&format!("{key} AI"))
            ),
        })
}

/// Moderation state of a prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// Prompt counter column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterColumn {
    Likes,
    Dislikes,
    Uses,
}

impl CounterColumn {
    pub fn column(&self) -> &'static str {
        match self {
            Self::Likes => "total_likes",
            Self::Dislikes => "total_dislikes",
            Self::Uses => "total_uses",
        }
    }

    /// Patch carrying `value` in this column
    pub fn patch(&self, value: i64) -> PromptPatch {
        let mut patch = PromptPatch::default();
        match self {
            Self::Likes => patch.total_likes = Some(value),
            Self::Dislikes => patch.total_dislikes = Some(value),
            Self::Uses => patch.total_uses = Some(value),
        }
        patch
    }
}

/// Vote direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
    Like,
    Dislike,
}

impl VoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Dislike => "dislike",
        }
    }
}

// =============================================================================
// Prompt
// =============================================================================

/// Category summary embedded in a prompt row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub name: String,
    pub color: Option<String>,
    pub icon: Option<String>,
}

/// Tag row embedded in a prompt row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTag {
    pub tag: String,
}

/// A prompt as returned by the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: String,
    pub title: String,
    pub content: String,
    pub description: Option<String>,
    pub category_id: Option<String>,
    #[serde(default)]
    pub compatible_models: Vec<String>,
    pub primary_model: String,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub quality_score: f64,
    #[serde(default)]
    pub total_uses: i64,
    #[serde(default)]
    pub total_likes: i64,
    #[serde(default)]
    pub total_dislikes: i64,
    pub technique_explanation: Option<String>,
    pub example_output: Option<String>,
    pub difficulty_level: Difficulty,
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub moderation_status: ModerationStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub categories: Option<CategoryRef>,
    #[serde(default)]
    pub prompt_tags: Vec<PromptTag>,
}

impl Prompt {
    /// Merge a counter patch into this prompt
    pub fn apply(&mut self, patch: &PromptPatch) {
        if let Some(likes) = patch.total_likes {
            self.total_likes = likes;
        }
        if let Some(dislikes) = patch.total_dislikes {
            self.total_dislikes = dislikes;
        }
        if let Some(uses) = patch.total_uses {
            self.total_uses = uses;
        }
    }

    pub fn counter(&self, column: CounterColumn) -> i64 {
        match column {
            CounterColumn::Likes => self.total_likes,
            CounterColumn::Dislikes => self.total_dislikes,
            CounterColumn::Uses => self.total_uses,
        }
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.prompt_tags.iter().map(|tag| tag.tag.as_str())
    }
}

/// Partial counter update applied optimistically to a local prompt list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PromptPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_likes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_dislikes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_uses: Option<i64>,
}

impl PromptPatch {
    pub fn is_empty(&self) -> bool {
        self.total_likes.is_none() && self.total_dislikes.is_none() && self.total_uses.is_none()
    }
}

/// Prompt ranking row used by the top prompts view
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PromptRank {
    pub id: String,
    #[serde(default)]
    pub total_likes: i64,
    #[serde(default)]
    pub total_uses: i64,
}

/// New prompt row sent on submission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPrompt {
    pub title: String,
    pub content: String,
    pub description: Option<String>,
    pub category_id: Option<String>,
    pub primary_model: String,
    pub compatible_models: Vec<String>,
    pub difficulty_level: Difficulty,
    pub author_name: String,
    pub technique_explanation: Option<String>,
    pub example_output: Option<String>,
    pub moderation_status: ModerationStatus,
    pub total_likes: i64,
    pub total_dislikes: i64,
    pub total_uses: i64,
    pub quality_score: f64,
    pub is_verified: bool,
    pub is_featured: bool,
}

// =============================================================================
// Category
// =============================================================================

/// Prompt category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Votes and follows
// =============================================================================

/// Response of the server-side rate-limited vote procedure
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VoteReceipt {
    pub success: bool,
    #[serde(default)]
    pub new_likes: Option<i64>,
    #[serde(default)]
    pub new_dislikes: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

impl VoteReceipt {
    /// Counter patch carried by this receipt
    pub fn patch(&self) -> PromptPatch {
        PromptPatch {
            total_likes: self.new_likes,
            total_dislikes: self.new_dislikes,
            total_uses: None,
        }
    }
}

/// Follower / following totals for a user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FollowCounts {
    pub followers: u64,
    pub following: u64,
}

// =============================================================================
// Filter state
// =============================================================================

/// Feed filter configuration
///
/// Persisted locally so a restart keeps the last filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    /// Category id, empty for any
    #[serde(default)]
    pub category: String,
    /// Free-text search, empty for none
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub sort_by: SortOption,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<AiModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            category: String::new(),
            search: String::new(),
            sort_by: SortOption::Popular,
            difficulty: None,
            model: None,
            verified: None,
        }
    }
}
