//! Try-On Service - request workflow
//!
//! Validates a job, stages its images from the object store, runs the remote
//! model and persists the result. Every transient artifact is owned by the
//! executing call, so all of them are released on every exit path.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::engine::{BackendClient, InferenceBackend, ResultResolver};
use crate::error::TryOnError;
use crate::storage::{check_key_segment, normalize_key, Bucket, ObjectStore};

use super::types::*;

/// Failure tagged with the stage it happened in
#[derive(Debug)]
struct StageError {
    stage: Stage,
    error: TryOnError,
}

fn at(stage: Stage) -> impl FnOnce(TryOnError) -> StageError {
    move |error| StageError { stage, error }
}

/// A request that passed validation, with normalized keys
#[derive(Debug)]
struct ValidatedRequest {
    session_id: String,
    body_key: String,
    garment_key: String,
}

fn validate(request: TryOnRequest) -> Result<ValidatedRequest, TryOnError> {
    fn required(value: Option<String>, field: &str) -> Result<String, TryOnError> {
        value
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| TryOnError::BadRequest(format!("Missing required field: {}", field)))
    }

    let session_id = required(request.session_id, "session_id")?;
    // The session id names the result object
    check_key_segment(&session_id)?;
    let body_key = required(request.body_image_key, "body_image_key")?;

    let mut garment_keys = request.garment_image_keys.unwrap_or_default().into_iter();
    let garment_key = required(garment_keys.next(), "garment_image_keys")?;

    let ignored = garment_keys.len();
    if ignored > 0 {
        debug!("Session {}: using first garment, ignoring {} more", session_id, ignored);
    }

    Ok(ValidatedRequest {
        session_id,
        body_key: normalize_key(&body_key)?,
        garment_key: normalize_key(&garment_key)?,
    })
}

/// Try-on workflow service
pub struct TryOnService<S: ObjectStore, B: InferenceBackend> {
    store: Arc<S>,
    backend: Arc<BackendClient<B>>,
    resolver: ResultResolver,
    seed: u64,
    result_content_type: String,
    service_name: String,
    backend_name: Option<String>,
    completed: AtomicU64,
    failed: AtomicU64,
}

impl<S: ObjectStore, B: InferenceBackend> TryOnService<S, B> {
    /// Create a new try-on service
    pub fn new(store: Arc<S>, backend: Arc<BackendClient<B>>, resolver: ResultResolver, config: &Config) -> Self {
        Self {
            store,
            backend,
            resolver,
            seed: config.backend.seed,
            result_content_type: config.workflow.result_content_type.clone(),
            service_name: config.server.service_name.clone(),
            backend_name: config.backend.name.clone(),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Run one try-on job start to finish
    pub async fn run(&self, request: TryOnRequest) -> TryOnOutcome {
        let start = Instant::now();
        let session_id = request.session_id.clone();
        let session = session_id.as_deref().unwrap_or("-").to_string();

        match self.execute(request).await {
            Ok((session_id, result_key)) => {
                self.completed.fetch_add(1, Ordering::Relaxed);
                info!(
                    "Session {}: try-on stored as {} in {}ms",
                    session_id,
                    result_key,
                    start.elapsed().as_millis()
                );
                TryOnOutcome::Completed { session_id, result_key }
            }
            Err(StageError { stage, error }) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                if error.is_bad_request() {
                    warn!("Session {}: rejected at {}: {}", session, stage, error);
                } else {
                    error!("Session {}: failed at {}: {}", session, stage, error);
                }
                TryOnOutcome::Failed {
                    session_id,
                    stage,
                    error,
                }
            }
        }
    }

    async fn execute(&self, request: TryOnRequest) -> Result<(String, String), StageError> {
        let request = validate(request).map_err(at(Stage::Validating))?;
        let session = request.session_id.as_str();

        debug!("Session {}: fetching body image {}", session, request.body_key);
        let body = self
            .store
            .fetch(Bucket::BodyImages, &request.body_key)
            .await
            .map_err(at(Stage::FetchingBody))?;

        debug!("Session {}: fetching garment image {}", session, request.garment_key);
        let garment = self
            .store
            .fetch(Bucket::Garments, &request.garment_key)
            .await
            .map_err(at(Stage::FetchingGarment))?;

        let handle = self.backend.connect().await.map_err(at(Stage::Inferring))?;
        let reference = self
            .backend
            .infer(&handle, body.path(), garment.path(), self.seed)
            .await
            .map_err(at(Stage::Inferring))?;

        debug!("Session {}: resolving result {}", session, reference.as_str());
        let result = self
            .resolver
            .resolve(&reference)
            .await
            .map_err(at(Stage::ResolvingResult))?;

        let result_key = format!("{}.png", request.session_id);
        self.store
            .store(Bucket::Results, &result_key, result.path(), &self.result_content_type)
            .await
            .map_err(at(Stage::Persisting))?;

        Ok((request.session_id, result_key))
    }

    /// Completed/failed totals since startup
    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    /// Get health status
    pub fn health(&self) -> HealthResult {
        HealthResult {
            service: self.service_name.clone(),
            backend_name: self.backend_name.clone(),
            backend_connected: self.backend.is_connected(),
        }
    }
}
