//! Mode Router
//!
//! Single recovery boundary of the pipeline. Query mode runs
//! translate → execute → table; chatbot mode adds enrichment, summarization
//! and a history append. Every failure becomes a user-facing message that keeps
//! the attempted SQL, so nothing here returns an error to the caller.

use crate::config::AssistantConfig;
use crate::enrichment::{Definition, DefinitionSource, TermEnricher, WikipediaClient};
use crate::error::Result;
use crate::execution_loop::{ExecutionLoop, LoopFailure};
use crate::executor::QueryExecutor;
use crate::history::{ConversationHistory, HistoryWindow, Turn, TurnStatus};
use crate::llm::{LlmClient, TextGenerator};
use crate::result::ResultSet;
use crate::sql::SqlText;
use crate::store::{RelationalStore, SqliteStore};
use crate::summarizer::{ConversationalSummarizer, SummaryInput};
use crate::translator::SqlTranslator;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

pub const NO_SQL_GENERATED: &str = "No SQL generated";
pub const NO_RESULTS: &str = "No results found.";

/// Interaction mode, chosen by the caller on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// One question, one SQL statement, one result table
    Query,
    /// Conversational answers with history and term definitions
    Chatbot,
}

/// Query-mode outcome.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryOutcome {
    Success { sql: SqlText, result: ResultSet },
    Failure { error: String, sql: Option<SqlText> },
}

impl QueryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, QueryOutcome::Success { .. })
    }

    pub fn sql(&self) -> Option<&SqlText> {
        match self {
            QueryOutcome::Success { sql, .. } => Some(sql),
            QueryOutcome::Failure { sql, .. } => sql.as_ref(),
        }
    }

    /// Markdown shown to the user.
    pub fn render(&self) -> String {
        match self {
            QueryOutcome::Success { sql, result } => {
                let table = if result.is_empty() {
                    NO_RESULTS.to_string()
                } else {
                    result.to_markdown()
                };
                format!("### Generated SQL Query:\n```sql\n{}\n```\n\n### Results:\n{}", sql, table)
            }
            QueryOutcome::Failure { error, sql } => {
                let attempted = sql.as_ref().map(SqlText::as_str).unwrap_or(NO_SQL_GENERATED);
                format!(
                    "### Error:\nThere was an error processing your query:\n\n```\n{}\n```\n\n### Generated SQL (if any):\n```sql\n{}\n```",
                    error, attempted
                )
            }
        }
    }
}

impl fmt::Display for QueryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Chatbot-mode reply.
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub answer: String,
    pub status: TurnStatus,
    pub sql: Option<SqlText>,
    pub definition: Option<Definition>,
}

impl ChatReply {
    fn failed(message: String, sql: Option<SqlText>) -> Self {
        let answer = match &sql {
            Some(sql) => format!("{}\n\nSQL attempted: {}", message, sql),
            None => message,
        };
        Self {
            answer,
            status: TurnStatus::Failed,
            sql,
            definition: None,
        }
    }

    pub fn is_answered(&self) -> bool {
        self.status == TurnStatus::Answered
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Response {
    Query(QueryOutcome),
    Chatbot(ChatReply),
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Query(outcome) => write!(f, "{}", outcome),
            Response::Chatbot(reply) => f.write_str(&reply.answer),
        }
    }
}

/// Healthcare data assistant: the two interaction modes over one pipeline.
pub struct Assistant {
    translator: SqlTranslator,
    executor: QueryExecutor,
    enricher: TermEnricher,
    summarizer: ConversationalSummarizer,
    execution_loop: ExecutionLoop,
}

impl Assistant {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        store: Arc<dyn RelationalStore>,
        definitions: Arc<dyn DefinitionSource>,
    ) -> Self {
        Self {
            translator: SqlTranslator::new(Arc::clone(&generator)),
            executor: QueryExecutor::new(store),
            enricher: TermEnricher::new(definitions),
            summarizer: ConversationalSummarizer::new(generator),
            execution_loop: ExecutionLoop::single_attempt(),
        }
    }

    /// Wire the production clients from configuration.
    pub fn from_config(config: &AssistantConfig) -> Result<Self> {
        let generator = LlmClient::new(
            config.llm.api_key.clone(),
            config.llm.base_url.clone(),
            config.llm.settings.clone(),
        );
        let store = SqliteStore::new(&config.database_path);
        let definitions = WikipediaClient::new(&config.definitions.base_url, config.definitions.timeout)?;

        Ok(Self::new(Arc::new(generator), Arc::new(store), Arc::new(definitions))
            .with_history_window(config.history_window)
            .with_preview_rows(config.preview_rows)
            .with_max_attempts(config.max_sql_attempts))
    }

    pub fn with_history_window(mut self, window: HistoryWindow) -> Self {
        self.summarizer = self.summarizer.with_window(window);
        self
    }

    pub fn with_preview_rows(mut self, preview_rows: usize) -> Self {
        self.summarizer = self.summarizer.with_preview_rows(preview_rows);
        self
    }

    /// Cap on translate→execute attempts. 1 disables retries.
    pub fn with_max_attempts(mut self, max_attempts: u8) -> Self {
        self.execution_loop = ExecutionLoop::new(max_attempts, true);
        self
    }

    pub fn store(&self) -> &Arc<dyn RelationalStore> {
        self.executor.store()
    }

    /// Query mode: translate, execute, and keep the result structured.
    pub async fn query(&self, question: &str) -> QueryOutcome {
        let span = info_span!("query", request_id = %Uuid::new_v4());
        async {
            info!("Question: {}", question);
            match self
                .execution_loop
                .execute_with_retry(question, &self.translator, &self.executor)
                .await
            {
                Ok(execution) => QueryOutcome::Success {
                    sql: execution.sql,
                    result: execution.result,
                },
                Err(LoopFailure {
                    error, attempted_sql, ..
                }) => {
                    warn!(error = %error, "query mode failed");
                    QueryOutcome::Failure {
                        error: error.to_string(),
                        sql: attempted_sql,
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Query mode rendered as markdown.
    pub async fn run_query(&self, question: &str) -> String {
        self.query(question).await.render()
    }

    /// Chatbot mode without touching the history.
    pub async fn chatbot_answer(&self, question: &str, history: &ConversationHistory) -> ChatReply {
        let span = info_span!("chatbot", request_id = %Uuid::new_v4(), prior_turns = history.len());
        async {
            info!("Question: {}", question);
            let execution = match self
                .execution_loop
                .execute_with_retry(question, &self.translator, &self.executor)
                .await
            {
                Ok(execution) => execution,
                Err(LoopFailure {
                    error, attempted_sql, ..
                }) => {
                    warn!(error = %error, "chatbot pipeline failed before summarization");
                    return ChatReply::failed(apology(&error), attempted_sql);
                }
            };

            let definition = self.enricher.enrich(question).await;

            let summary = self
                .summarizer
                .summarize(SummaryInput {
                    question,
                    sql: &execution.sql,
                    result: &execution.result,
                    history,
                    definition: definition.as_ref(),
                })
                .await;

            match summary {
                Ok(answer) => ChatReply {
                    answer,
                    status: TurnStatus::Answered,
                    sql: Some(execution.sql),
                    definition,
                },
                Err(error) => {
                    warn!(error = %error, "summarization failed");
                    ChatReply::failed(apology(&error), Some(execution.sql))
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Chatbot mode, appending the turn to `history`.
    pub async fn chat(&self, question: &str, history: &mut ConversationHistory) -> ChatReply {
        let reply = self.chatbot_answer(question, history).await;
        let turn = if reply.is_answered() {
            Turn::answered(question, reply.answer.clone())
        } else {
            Turn::failed(question, reply.answer.clone())
        };
        history.push(turn);
        reply
    }

    /// Dispatch on the caller's mode.
    pub async fn ask(&self, question: &str, mode: Mode, history: &mut ConversationHistory) -> Response {
        match mode {
            Mode::Query => Response::Query(self.query(question).await),
            Mode::Chatbot => Response::Chatbot(self.chat(question, history).await),
        }
    }
}

fn apology(error: &crate::error::AssistantError) -> String {
    format!("Sorry, I couldn't process your question due to an error: {}", error)
}
