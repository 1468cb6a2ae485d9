//! Conversational Summarizer
//!
//! Second model call in chatbot mode. Combines the replayed history, the
//! current question, an optional definition, the SQL that ran and a preview of
//! its rows into one prompt, and returns the model's prose trimmed.

use crate::enrichment::Definition;
use crate::error::Result;
use crate::history::{ConversationHistory, HistoryWindow};
use crate::llm::TextGenerator;
use crate::result::ResultSet;
use crate::schema;
use crate::sql::SqlText;
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_PREVIEW_ROWS: usize = 10;

const ASSISTANT_ROLE: &str = "You are a helpful healthcare data assistant. You have access to two tables.";

const ASSISTANT_DUTIES: &str = "When a user asks a question, you:
- Figure out what they want to know.
- If needed, run an SQL query on the data.
- Summarize the answer in clear, simple language.
- Give context, trends, and explanations, not just numbers.
- Use the conversation history to understand follow-up questions and context.
- If the user asks about a medical term, explain it using the provided definition.";

/// Everything the summarization prompt is built from.
pub struct SummaryInput<'a> {
    pub question: &'a str,
    pub sql: &'a SqlText,
    pub result: &'a ResultSet,
    pub history: &'a ConversationHistory,
    pub definition: Option<&'a Definition>,
}

#[derive(Clone)]
pub struct ConversationalSummarizer {
    generator: Arc<dyn TextGenerator>,
    window: HistoryWindow,
    preview_rows: usize,
}

impl ConversationalSummarizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            window: HistoryWindow::All,
            preview_rows: DEFAULT_PREVIEW_ROWS,
        }
    }

    pub fn with_window(mut self, window: HistoryWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_preview_rows(mut self, preview_rows: usize) -> Self {
        self.preview_rows = preview_rows;
        self
    }

    pub fn build_prompt(&self, input: &SummaryInput<'_>) -> String {
        let mut prompt = format!(
            "{}\n\n{}\n\n{}\n\nConversation so far:\n{}\n\nUser Question: {}\n\n",
            ASSISTANT_ROLE,
            schema::describe(),
            ASSISTANT_DUTIES,
            input.history.transcript(self.window),
            input.question
        );

        if let Some(definition) = input.definition {
            prompt.push_str(&format!(
                "Medical definition for '{}': {}\n\n",
                definition.term, definition.text
            ));
        }

        let preview = if input.result.is_empty() {
            "No results.".to_string()
        } else {
            input.result.to_markdown_limited(self.preview_rows)
        };
        prompt.push_str(&format!(
            "SQL Query Used: {}\n\nSQL Results (first {} rows):\n{}\n\n",
            input.sql, self.preview_rows, preview
        ));
        prompt.push_str(
            "Now, answer the user's question in clear, simple language, summarizing the results. \
             Explain trends and context, not just raw numbers.",
        );
        prompt
    }

    pub async fn summarize(&self, input: SummaryInput<'_>) -> Result<String> {
        let prompt = self.build_prompt(&input);
        let answer = self.generator.generate(&prompt).await?;
        info!(
            "Summarized {} rows with {} prior turns",
            input.result.row_count(),
            input.history.windowed(self.window).len()
        );
        Ok(answer.trim().to_string())
    }
}
