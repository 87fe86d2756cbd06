//! E2E tests for prompt submission and author follows

mod common;

use common::TestBackend;
use promptscroll::AppState;
use promptscroll::clipboard::MemoryClipboard;
use promptscroll::data::{AiModel, Difficulty, MemoryStore};
use promptscroll::error::AppError;
use promptscroll::service::PromptSubmission;
use std::sync::Arc;

fn submission() -> PromptSubmission {
    PromptSubmission {
        title: "Weeknight recipe planner".to_string(),
        content: "Plan five cooking recipes for busy weeknights with a shopping list".to_string(),
        description: Some("Meal planning".to_string()),
        category_ids: vec!["c3".to_string()],
        model: AiModel::ChatGpt,
        difficulty: Difficulty::Beginner,
        tags: "meal-prep, Budget".to_string(),
        technique_explanation: None,
        example_output: None,
        author_name: Some("Chef".to_string()),
    }
}

#[tokio::test]
async fn test_submit_stores_prompt_and_tags() {
    let server = TestBackend::new().await;
    let state = server.app_state();

    let prompt = state.submissions.submit(&submission()).await.unwrap();
    assert_eq!(prompt.id, "new-1");
    assert_eq!(prompt.author_name, "Chef");

    let stored = server.backend.prompt("new-1").unwrap();
    assert_eq!(stored["category_id"], "c3");
    assert_eq!(stored["moderation_status"], "approved");
    assert_eq!(stored["total_likes"], 0);

    let tags: Vec<String> = server
        .backend
        .tags
        .lock()
        .unwrap()
        .iter()
        .map(|row| row["tag"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        tags,
        vec!["meal-prep", "budget", "cooking", "chatgpt", "beginner"]
    );
}

#[tokio::test]
async fn test_invalid_submission_is_rejected_locally() {
    let server = TestBackend::new().await;
    let state = server.app_state();

    let mut input = submission();
    input.content = "short".to_string();
    assert!(matches!(
        state.submissions.submit(&input).await,
        Err(AppError::Validation(_))
    ));
    assert!(server.backend.requests_to("POST", "prompts").is_empty());
}

#[tokio::test]
async fn test_category_suggestions() {
    let server = TestBackend::new().await;
    let state = server.app_state();

    let found = state
        .submissions
        .suggest_categories("An SEO checklist with a recipe twist", 3)
        .await
        .unwrap();
    let names: Vec<_> = found.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["SEO", "Cooking"]);
}

#[tokio::test]
async fn test_follow_toggle_for_signed_in_user() {
    let server = TestBackend::new().await;
    let state = AppState::from_parts(
        server.config(),
        server.gateway(),
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryClipboard::new()),
        Some("u1".to_string()),
    );

    assert!(!state.follows.is_following("u2").await.unwrap());
    assert!(state.follows.toggle("u2").await.unwrap());
    assert!(state.follows.is_following("u2").await.unwrap());

    let counts = state.follows.counts("u2").await.unwrap();
    assert_eq!(counts.followers, 1);
    assert_eq!(counts.following, 0);

    assert!(!state.follows.toggle("u2").await.unwrap());
    assert_eq!(state.follows.counts("u2").await.unwrap().followers, 0);
}

#[tokio::test]
async fn test_anonymous_follow_is_unauthorized() {
    let server = TestBackend::new().await;
    let state = server.app_state();

    assert!(matches!(
        state.follows.toggle("u2").await,
        Err(AppError::Unauthorized)
    ));
    assert!(server.backend.requests_to("POST", "follows").is_empty());
}
