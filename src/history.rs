//! Conversation history for chatbot mode.
//!
//! The history is owned by the caller and only ever appended to. How much of it
//! is replayed into a prompt is decided by [`HistoryWindow`]; the stored turns
//! are never truncated.

use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnStatus {
    Answered,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
    pub status: TurnStatus,
    pub asked_at: DateTime<Utc>,
}

impl Turn {
    pub fn answered(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self::new(question, answer, TurnStatus::Answered)
    }

    pub fn failed(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self::new(question, answer, TurnStatus::Failed)
    }

    fn new(question: impl Into<String>, answer: impl Into<String>, status: TurnStatus) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            status,
            asked_at: Utc::now(),
        }
    }

    pub fn is_answered(&self) -> bool {
        self.status == TurnStatus::Answered
    }
}

/// How many prior turns are replayed into the summarization prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HistoryWindow {
    /// Replay every prior turn.
    #[default]
    All,
    /// Replay only the most recent N turns.
    Last(usize),
}

impl FromStr for HistoryWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(HistoryWindow::All);
        }
        match s.parse::<usize>() {
            Ok(n) if n > 0 => Ok(HistoryWindow::Last(n)),
            _ => Err(format!("expected 'all' or a positive number of turns, got '{}'", s)),
        }
    }
}

impl fmt::Display for HistoryWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryWindow::All => f.write_str("all"),
            HistoryWindow::Last(n) => write!(f, "{}", n),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationHistory {
    turns: Vec<Turn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Turns selected by `window`, oldest first.
    pub fn windowed(&self, window: HistoryWindow) -> &[Turn] {
        match window {
            HistoryWindow::All => &self.turns,
            HistoryWindow::Last(n) => &self.turns[self.turns.len().saturating_sub(n)..],
        }
    }

    /// `User:` / `Assistant:` transcript of the windowed turns, oldest first.
    pub fn transcript(&self, window: HistoryWindow) -> String {
        self.windowed(window)
            .iter()
            .map(|t| format!("User: {}\nAssistant: {}", t.question, t.answer))
            .join("\n")
    }
}
