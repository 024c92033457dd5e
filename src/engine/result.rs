//! Shapes returned by the try-on backend

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{Result, TryOnError};

/// A reference to a generated image, as reported by the backend.
///
/// Backends report either a bare string or an object carrying a `url` or `path`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ResultRef {
    Plain(String),
    Url { url: String },
    Path { path: String },
}

/// Where a result reference points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultLocation {
    Remote(String),
    Local(PathBuf),
}

impl ResultRef {
    pub fn as_str(&self) -> &str {
        match self {
            ResultRef::Plain(s) => s,
            ResultRef::Url { url } => url,
            ResultRef::Path { path } => path,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_str().trim().is_empty()
    }

    pub fn location(&self) -> ResultLocation {
        let raw = self.as_str().trim();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            ResultLocation::Remote(raw.to_string())
        } else {
            ResultLocation::Local(PathBuf::from(raw))
        }
    }
}

impl From<&str> for ResultRef {
    fn from(value: &str) -> Self {
        ResultRef::Plain(value.to_string())
    }
}

/// Raw inference output: one reference or an ordered sequence of them
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum InferenceResult {
    Single(ResultRef),
    Sequence(Vec<ResultRef>),
}

impl InferenceResult {
    /// The first usable reference
    pub fn into_first(self) -> Result<ResultRef> {
        let first = match self {
            InferenceResult::Single(r) => Some(r),
            InferenceResult::Sequence(refs) => refs.into_iter().next(),
        };

        first
            .filter(|r| !r.is_empty())
            .ok_or_else(|| TryOnError::InferenceFailed("no result".to_string()))
    }
}
