//! Generated SQL text.
//!
//! Whatever the model returns is wrapped in [`SqlText`] and handed to the
//! executor untouched. Nothing here parses or validates the statement; the
//! only guarantee is that it is not blank.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SqlText(String);

impl SqlText {
    /// Wraps trimmed model output. Returns `None` for blank text.
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SqlText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SqlText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
