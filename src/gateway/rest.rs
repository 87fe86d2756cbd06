//! PostgREST gateway
//!
//! Talks to the hosted backend's REST endpoint with the anonymous API key
//! (or a user access token once signed in).

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_RANGE};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::{CounterGateway, FollowGateway, PageRange, PromptSource, PromptWriter};
use crate::config::GatewayConfig;
use crate::data::{
    Category, CounterColumn, FilterState, NewPrompt, Prompt, PromptRank, VoteReceipt, VoteType,
};
use crate::error::AppError;
use crate::metrics::{GATEWAY_REQUEST_DURATION_SECONDS, GATEWAY_REQUESTS_TOTAL};

const PROMPTS: &str = "prompts";
const CATEGORIES: &str = "categories";
const PROMPT_TAGS: &str = "prompt_tags";
const FOLLOWS: &str = "follows";
const VOTE_PROCEDURE: &str = "rpc/rate_limited_vote";

/// HTTP client for the PostgREST endpoint
#[derive(Clone)]
pub struct RestGateway {
    http: reqwest::Client,
    rest_url: String,
    anon_key: String,
    schema: String,
    /// Signed-in user's access token; the anon key is used otherwise
    access_token: Option<String>,
}

impl RestGateway {
    /// Create a gateway from configuration
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: &GatewayConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .user_agent("PromptScroll/0.1.0")
            .timeout(config.timeout())
            .build()?;

        if config.is_insecure() {
            tracing::warn!(
                url = %config.url,
                "Gateway is reached over plain http; the anon key travels unencrypted"
            );
        }

        Ok(Self {
            http,
            rest_url: config.rest_url(),
            anon_key: config.anon_key.clone(),
            schema: config.schema.clone(),
            access_token: None,
        })
    }

    /// Authenticate subsequent requests as a signed-in user
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn rest_url(&self) -> &str {
        &self.rest_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.anon_key);
        self.http
            .request(method, format!("{}/{}", self.rest_url, path))
            .header("apikey", &self.anon_key)
            .header(AUTHORIZATION, format!("Bearer {bearer}"))
            .header("Accept-Profile", &self.schema)
            .header("Content-Profile", &self.schema)
    }

    /// Send a request, recording metrics and mapping non-success statuses
    async fn execute(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<Response, AppError> {
        let timer = GATEWAY_REQUEST_DURATION_SECONDS
            .with_label_values(&[operation])
            .start_timer();
        let result = request.send().await;
        timer.observe_duration();

        let response = match result {
            Ok(response) => response,
            Err(error) => {
                GATEWAY_REQUESTS_TOTAL
                    .with_label_values(&[operation, "error"])
                    .inc();
                tracing::warn!(operation, %error, "Gateway request failed");
                return Err(AppError::from(error).record());
            }
        };

        let status = response.status();
        GATEWAY_REQUESTS_TOTAL
            .with_label_values(&[operation, status.as_str()])
            .inc();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = gateway_message(&body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
        tracing::warn!(
            operation,
            status = status.as_u16(),
            %message,
            "Gateway rejected request"
        );

        let error = match status.as_u16() {
            401 | 403 => AppError::Unauthorized,
            429 => AppError::RateLimited(message),
            code => AppError::Gateway {
                status: code,
                message,
            },
        };
        Err(error.record())
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<T, AppError> {
        let response = self.execute(operation, request).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Exact row count of `follows` where `column = user_id`
    async fn count_follows(
        &self,
        operation: &'static str,
        column: &str,
        user_id: &str,
    ) -> Result<u64, AppError> {
        let request = self
            .request(Method::HEAD, FOLLOWS)
            .header("Prefer", "count=exact")
            .query(&[
                ("select", "follower_id".to_string()),
                (column, format!("eq.{user_id}")),
            ]);
        let response = self.execute(operation, request).await?;

        let total = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .and_then(content_range_total);
        Ok(total.unwrap_or(0))
    }
}

/// Extract the `message` field of a PostgREST error body
fn gateway_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .and_then(|message| message.as_str())
        .map(str::to_string)
}

/// Total from a `Content-Range` header such as `0-24/3573` or `*/0`
fn content_range_total(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}

/// First row of a representation response
fn first_row(value: serde_json::Value) -> Option<serde_json::Value> {
    match value {
        serde_json::Value::Array(rows) => rows.into_iter().next(),
        serde_json::Value::Null => None,
        row => Some(row),
    }
}

#[async_trait]
impl PromptSource for RestGateway {
    async fn fetch_prompts(
        &self,
        filters: &FilterState,
        range: PageRange,
    ) -> Result<Vec<Prompt>, AppError> {
        let params = super::prompt_query_params(filters, range);
        tracing::debug!(from = range.from, to = range.to, "Fetching prompt page");
        self.fetch_json("fetch_prompts", self.request(Method::GET, PROMPTS).query(&params))
            .await
    }

    async fn fetch_categories(&self) -> Result<Vec<Category>, AppError> {
        let request = self
            .request(Method::GET, CATEGORIES)
            .query(&[("select", "*"), ("order", "name.asc")]);
        self.fetch_json("fetch_categories", request).await
    }

    async fn fetch_top_prompts(&self, limit: usize) -> Result<Vec<PromptRank>, AppError> {
        let request = self.request(Method::GET, PROMPTS).query(&[
            ("select", "id,total_likes,total_uses".to_string()),
            ("order", "total_uses.desc,total_likes.desc".to_string()),
            ("limit", limit.to_string()),
        ]);
        self.fetch_json("fetch_top_prompts", request).await
    }
}

#[async_trait]
impl CounterGateway for RestGateway {
    async fn increment_counter(
        &self,
        prompt_id: &str,
        column: CounterColumn,
        current: i64,
    ) -> Result<Option<i64>, AppError> {
        let name = column.column();
        let request = self
            .request(Method::PATCH, PROMPTS)
            .header("Prefer", "return=representation")
            .query(&[("id", format!("eq.{prompt_id}")), ("select", name.to_string())])
            .json(&serde_json::json!({ name: current + 1 }));

        let response = self.execute("increment_counter", request).await?;
        let body = response.bytes().await?;
        if body.is_empty() {
            return Ok(None);
        }

        // An empty array means no row matched or row-level security refused it
        let row = match serde_json::from_slice(&body)? {
            serde_json::Value::Array(rows) => match rows.into_iter().next() {
                Some(row) => row,
                None => {
                    tracing::warn!(prompt_id, column = name, "Counter update matched no row");
                    return Err(AppError::NotFound);
                }
            },
            serde_json::Value::Null => return Ok(None),
            row => row,
        };
        Ok(row.get(name).and_then(|value| value.as_i64()))
    }

    async fn rate_limited_vote(
        &self,
        prompt_id: &str,
        session_id: &str,
        vote: VoteType,
    ) -> Result<VoteReceipt, AppError> {
        let request = self.request(Method::POST, VOTE_PROCEDURE).json(&serde_json::json!({
            "p_prompt_id": prompt_id,
            "p_session_id": session_id,
            "p_vote_type": vote.as_str(),
        }));

        let body: serde_json::Value = self.fetch_json("rate_limited_vote", request).await?;
        let row = first_row(body).ok_or_else(|| AppError::Gateway {
            status: 200,
            message: "rate_limited_vote returned no rows".to_string(),
        })?;
        Ok(serde_json::from_value(row)?)
    }
}

#[async_trait]
impl PromptWriter for RestGateway {
    async fn insert_prompt(&self, prompt: &NewPrompt) -> Result<Prompt, AppError> {
        let request = self
            .request(Method::POST, PROMPTS)
            .header("Prefer", "return=representation")
            .json(prompt);

        let rows: Vec<Prompt> = self.fetch_json("insert_prompt", request).await?;
        rows.into_iter().next().ok_or_else(|| AppError::Gateway {
            status: 201,
            message: "insert returned no representation".to_string(),
        })
    }

    async fn insert_tags(&self, prompt_id: &str, tags: &[String]) -> Result<(), AppError> {
        if tags.is_empty() {
            return Ok(());
        }

        let rows: Vec<serde_json::Value> = tags
            .iter()
            .map(|tag| serde_json::json!({ "prompt_id": prompt_id, "tag": tag }))
            .collect();
        let request = self
            .request(Method::POST, PROMPT_TAGS)
            .header("Prefer", "return=minimal")
            .json(&rows);
        self.execute("insert_tags", request).await?;
        Ok(())
    }
}

#[async_trait]
impl FollowGateway for RestGateway {
    async fn is_following(
        &self,
        follower_id: &str,
        following_id: &str,
    ) -> Result<bool, AppError> {
        let request = self.request(Method::GET, FOLLOWS).query(&[
            ("select", "follower_id".to_string()),
            ("follower_id", format!("eq.{follower_id}")),
            ("following_id", format!("eq.{following_id}")),
            ("limit", "1".to_string()),
        ]);
        let rows: Vec<serde_json::Value> = self.fetch_json("is_following", request).await?;
        Ok(!rows.is_empty())
    }

    async fn insert_follow(&self, follower_id: &str, following_id: &str) -> Result<(), AppError> {
        let request = self
            .request(Method::POST, FOLLOWS)
            .header("Prefer", "return=minimal")
            .json(&serde_json::json!({
                "follower_id": follower_id,
                "following_id": following_id,
            }));
        self.execute("insert_follow", request).await?;
        Ok(())
    }

    async fn delete_follow(&self, follower_id: &str, following_id: &str) -> Result<(), AppError> {
        let request = self.request(Method::DELETE, FOLLOWS).query(&[
            ("follower_id", format!("eq.{follower_id}")),
            ("following_id", format!("eq.{following_id}")),
        ]);
        self.execute("delete_follow", request).await?;
        Ok(())
    }

    async fn count_followers(&self, user_id: &str) -> Result<u64, AppError> {
        self.count_follows("count_followers", "following_id", user_id)
            .await
    }

    async fn count_following(&self, user_id: &str) -> Result<u64, AppError> {
        self.count_follows("count_following", "follower_id", user_id)
            .await
    }
}
