pub mod assistant;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod execution_loop;
pub mod executor;
pub mod history;
pub mod llm;
pub mod result;
pub mod schema;
pub mod sql;
pub mod store;
pub mod summarizer;
pub mod translator;

pub use assistant::{Assistant, ChatReply, Mode, QueryOutcome, Response};
pub use config::AssistantConfig;
pub use error::{AssistantError, Result};
pub use history::{ConversationHistory, HistoryWindow, Turn, TurnStatus};
pub use result::{Cell, ResultSet, Row};
pub use sql::SqlText;
