//! Question store and result sink backed by a Supabase project (PostgREST).
//!
//! Counter increments go through the `increment_category_stat` RPC so the
//! `total_questions + 1` happens in the database.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{Attempt, Category, CategoryStat, NewAttempt, Question, QuestionId};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::repository::{QuestionStore, RecentAttempt, ResultSink, Storage, StorageError};

mod rows;

use rows::{CategoryStatRow, NewResultRow, QuestionRow, ResultRow};

const QUESTIONS_TABLE: &str = "driving_questions";
const RESULTS_TABLE: &str = "driving_quiz_results";
const STATS_TABLE: &str = "driving_category_stats";
const INCREMENT_RPC: &str = "increment_category_stat";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SupabaseConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    /// User JWT; the anon key is sent as bearer when absent.
    #[serde(default)]
    pub access_token: Option<String>,
}

impl SupabaseConfig {
    #[must_use]
    pub fn new(supabase_url: impl Into<String>, supabase_anon_key: impl Into<String>) -> Self {
        Self {
            supabase_url: supabase_url.into(),
            supabase_anon_key: supabase_anon_key.into(),
            access_token: None,
        }
    }

    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/rest/v1/{path}", self.supabase_url.trim_end_matches('/'))
    }

    fn bearer(&self) -> &str {
        self.access_token
            .as_deref()
            .unwrap_or(self.supabase_anon_key.as_str())
    }
}

#[derive(Clone)]
pub struct SupabaseRepository {
    client: Client,
    config: SupabaseConfig,
}

fn transport(e: reqwest::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

/// PostgREST `in` list: `(1,2,3)`.
fn id_list(ids: &[QuestionId]) -> String {
    let joined = ids
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");
    format!("({joined})")
}

impl SupabaseRepository {
    /// Build a client with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the HTTP client cannot be built.
    pub fn new(config: SupabaseConfig, timeout: Duration) -> Result<Self, StorageError> {
        let client = Client::builder().timeout(timeout).build().map_err(transport)?;
        Ok(Self { client, config })
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.config.supabase_anon_key)
            .header("Authorization", format!("Bearer {}", self.config.bearer()))
    }

    fn select(&self, table: &str) -> RequestBuilder {
        self.authorized(self.client.get(self.config.endpoint(table)))
    }

    async fn checked(response: Response) -> Result<Response, StorageError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), %body, "supabase request rejected");
        Err(StorageError::Remote {
            status: status.as_u16(),
            body,
        })
    }

    async fn fetch_rows<T: DeserializeOwned>(builder: RequestBuilder) -> Result<Vec<T>, StorageError> {
        let response = builder.send().await.map_err(transport)?;
        let response = Self::checked(response).await?;
        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn fetch_questions(builder: RequestBuilder) -> Result<Vec<Question>, StorageError> {
        let rows: Vec<QuestionRow> = Self::fetch_rows(builder).await?;
        rows.into_iter().map(QuestionRow::into_question).collect()
    }
}

#[async_trait]
impl QuestionStore for SupabaseRepository {
    async fn fetch_all_active(&self) -> Result<Vec<Question>, StorageError> {
        let builder = self.select(QUESTIONS_TABLE).query(&[
            ("select", "*"),
            ("is_active", "eq.true"),
            ("order", "id.asc"),
        ]);
        Self::fetch_questions(builder).await
    }

    async fn fetch_by_category(&self, category: &Category) -> Result<Vec<Question>, StorageError> {
        let builder = self.select(QUESTIONS_TABLE).query(&[
            ("select", "*".to_owned()),
            ("is_active", "eq.true".to_owned()),
            ("category", format!("eq.{category}")),
            ("order", "id.asc".to_owned()),
        ]);
        Self::fetch_questions(builder).await
    }

    async fn fetch_category_stats(&self) -> Result<Vec<CategoryStat>, StorageError> {
        let builder = self
            .select(STATS_TABLE)
            .query(&[("select", "*"), ("order", "category.asc")]);
        let rows: Vec<CategoryStatRow> = Self::fetch_rows(builder).await?;
        rows.into_iter().map(CategoryStatRow::into_stat).collect()
    }

    async fn fetch_by_id(&self, id: QuestionId) -> Result<Question, StorageError> {
        let builder = self.select(QUESTIONS_TABLE).query(&[
            ("select", "*".to_owned()),
            ("id", format!("eq.{id}")),
            ("limit", "1".to_owned()),
        ]);
        Self::fetch_questions(builder)
            .await?
            .into_iter()
            .next()
            .ok_or(StorageError::NotFound)
    }

    async fn fetch_candidates(
        &self,
        category: Option<&Category>,
        exclude: &[QuestionId],
        limit: usize,
    ) -> Result<Vec<Question>, StorageError> {
        let mut params = vec![
            ("select", "*".to_owned()),
            ("is_active", "eq.true".to_owned()),
            ("order", "id.asc".to_owned()),
            ("limit", limit.to_string()),
        ];
        if let Some(category) = category {
            params.push(("category", format!("eq.{category}")));
        }
        if !exclude.is_empty() {
            params.push(("id", format!("not.in.{}", id_list(exclude))));
        }
        let builder = self.select(QUESTIONS_TABLE).query(&params);
        Self::fetch_questions(builder).await
    }

    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let row = QuestionRow::from_question(question)?;
        let builder = self
            .authorized(self.client.post(self.config.endpoint(QUESTIONS_TABLE)))
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&[row]);
        let response = builder.send().await.map_err(transport)?;
        Self::checked(response).await?;
        Ok(())
    }
}

#[async_trait]
impl ResultSink for SupabaseRepository {
    async fn record_attempt(&self, attempt: &NewAttempt) -> Result<Attempt, StorageError> {
        let row = NewResultRow::from_attempt(attempt)?;
        let builder = self
            .authorized(self.client.post(self.config.endpoint(RESULTS_TABLE)))
            .header("Prefer", "return=representation")
            .json(&[row]);
        let rows: Vec<ResultRow> = Self::fetch_rows(builder).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StorageError::Serialization("insert returned no row".into()))?
            .into_attempt()
    }

    async fn increment_category_stat(
        &self,
        category: &Category,
        correct: bool,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let builder = self
            .authorized(
                self.client
                    .post(self.config.endpoint(&format!("rpc/{INCREMENT_RPC}"))),
            )
            .json(&json!({
                "p_category": category.as_str(),
                "p_correct": correct,
                "p_at": at,
            }));
        let response = builder.send().await.map_err(transport)?;
        Self::checked(response).await?;
        Ok(())
    }

    async fn recent_attempts(&self, limit: u32) -> Result<Vec<RecentAttempt>, StorageError> {
        let builder = self.select(RESULTS_TABLE).query(&[
            ("select", "*,driving_questions(category)".to_owned()),
            ("order", "created_at.desc".to_owned()),
            ("limit", limit.to_string()),
        ]);
        let rows: Vec<ResultRow> = Self::fetch_rows(builder).await?;
        rows.into_iter().map(ResultRow::into_recent).collect()
    }
}

impl Storage {
    /// Build a `Storage` backed by a Supabase project.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the HTTP client cannot be built.
    pub fn supabase(config: SupabaseConfig, timeout: Duration) -> Result<Self, StorageError> {
        let repo = SupabaseRepository::new(config, timeout)?;
        let questions: Arc<dyn QuestionStore> = Arc::new(repo.clone());
        let results: Arc<dyn ResultSink> = Arc::new(repo);
        Ok(Self { questions, results })
    }
}
