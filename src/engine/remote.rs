//! HTTP try-on backend
//!
//! Talks to a model server exposing:
//! - `GET  {url}/info`              reachability probe, optionally `{"name": ...}`
//! - `POST {url}/run/{operation}`   multipart `person_image`, `garment_image`, `seed`
//!
//! The run endpoint answers `{"data": <result>}`, a bare result, or `{"error": ...}`.

use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::BackendConfig;
use crate::error::{Result, TryOnError};

use super::backend::InferenceBackend;
use super::result::InferenceResult;

/// Established session with the model server
#[derive(Debug, Clone)]
pub struct RemoteSession {
    pub run_url: String,
    pub model_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InfoResponse {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RunResponse {
    Envelope { data: InferenceResult },
    Error { error: String },
    Bare(InferenceResult),
}

pub struct RemoteBackend {
    http: reqwest::Client,
    base_url: String,
    operation: String,
    api_token: Option<String>,
    name: String,
}

impl RemoteBackend {
    pub fn new(config: &BackendConfig) -> Self {
        let base_url = config.url.trim_end_matches('/').to_string();
        let name = config.name.clone().unwrap_or_else(|| base_url.clone());

        Self {
            http: reqwest::Client::new(),
            base_url,
            operation: config.operation.clone(),
            api_token: config.api_token.clone(),
            name,
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn image_part(path: &Path) -> Result<Part> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        Ok(Part::bytes(bytes).file_name(file_name))
    }
}

#[async_trait]
impl InferenceBackend for RemoteBackend {
    type Handle = RemoteSession;

    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&self) -> Result<RemoteSession> {
        let info_url = format!("{}/info", self.base_url);
        let response = self
            .authorize(self.http.get(&info_url))
            .send()
            .await
            .map_err(|e| TryOnError::BackendUnreachable(format!("{}: {}", info_url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TryOnError::BackendUnreachable(format!("{} returned {}", info_url, status)));
        }

        let model_name = response.json::<InfoResponse>().await.ok().and_then(|info| info.name);
        info!(
            "Backend session ready (model: {})",
            model_name.as_deref().unwrap_or("unknown")
        );

        Ok(RemoteSession {
            run_url: format!("{}/run/{}", self.base_url, self.operation),
            model_name,
        })
    }

    async fn infer(
        &self,
        session: &RemoteSession,
        person_image: &Path,
        garment_image: &Path,
        seed: u64,
    ) -> Result<InferenceResult> {
        let form = Form::new()
            .part("person_image", Self::image_part(person_image).await?)
            .part("garment_image", Self::image_part(garment_image).await?)
            .text("seed", seed.to_string());

        debug!("POST {} (seed {})", session.run_url, seed);
        let response = self
            .authorize(self.http.post(&session.run_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| TryOnError::InferenceFailed(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TryOnError::InferenceFailed(format!("backend returned {}: {}", status, text)));
        }

        let body = response
            .json::<RunResponse>()
            .await
            .map_err(|e| TryOnError::InferenceFailed(format!("malformed response: {}", e)))?;

        match body {
            RunResponse::Envelope { data } | RunResponse::Bare(data) => Ok(data),
            RunResponse::Error { error } => Err(TryOnError::InferenceFailed(error)),
        }
    }
}
