//! Service layer types

use std::fmt;

use serde::Serialize;

use crate::error::TryOnError;

/// Incoming try-on job. Fields are optional so that missing ones are
/// rejected by the workflow's validation stage.
#[derive(Debug, Clone, Default)]
pub struct TryOnRequest {
    pub session_id: Option<String>,
    pub body_image_key: Option<String>,
    pub garment_image_keys: Option<Vec<String>>,
}

/// Workflow stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validating,
    FetchingBody,
    FetchingGarment,
    Inferring,
    ResolvingResult,
    Persisting,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Validating => "validating",
            Stage::FetchingBody => "fetching_body",
            Stage::FetchingGarment => "fetching_garment",
            Stage::Inferring => "inferring",
            Stage::ResolvingResult => "resolving_result",
            Stage::Persisting => "persisting",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one workflow execution. Never both a key and an error.
#[derive(Debug)]
pub enum TryOnOutcome {
    Completed {
        session_id: String,
        result_key: String,
    },
    Failed {
        session_id: Option<String>,
        stage: Stage,
        error: TryOnError,
    },
}

impl TryOnOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TryOnOutcome::Completed { .. })
    }

    pub fn error(&self) -> Option<&TryOnError> {
        match self {
            TryOnOutcome::Completed { .. } => None,
            TryOnOutcome::Failed { error, .. } => Some(error),
        }
    }

    pub fn error_message(&self) -> Option<String> {
        self.error().map(|e| e.to_string())
    }

    pub fn recoverable(&self) -> bool {
        self.error().is_some_and(|e| e.is_recoverable())
    }
}

/// Running totals since startup
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ServiceStats {
    pub completed: u64,
    pub failed: u64,
}

/// Health check result
#[derive(Debug, Clone, Serialize)]
pub struct HealthResult {
    pub service: String,
    pub backend_name: Option<String>,
    pub backend_connected: bool,
}
