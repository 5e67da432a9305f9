//! Text-generation backend seam and the Ollama bridge implementation.
//!
//! The loop only ever sees `TextBackend`; the live implementation talks to a
//! local Ollama instance with single-shot, non-streaming requests. One call
//! in flight at a time; a slow model call blocks the whole loop by design.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{EnrichError, EnrichResult};
use crate::persona::Persona;

/// Request timeout for a single model call. Large models on modest hardware
/// can take minutes per completion.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// Backend contract: one-time named model registration plus single-shot completion.
#[async_trait]
pub trait TextBackend: Send + Sync {
    /// Define a named model from the given modelfile. Succeeds iff the
    /// backend reports success; re-registration under the same name is
    /// backend-defined.
    async fn register(&self, name: &str, modelfile: &str) -> EnrichResult<()>;

    /// Single blocking request/response completion against a registered model.
    /// Returns the raw response text; trimming is the caller's job.
    async fn complete(&self, name: &str, prompt: &str) -> EnrichResult<String>;
}

// ---------------------------------------------------------------------------
// Ollama bridge
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct CreateRequest<'a> {
    name: &'a str,
    modelfile: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct CreateResponse {
    #[serde(default)]
    status: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Thin client for the Ollama HTTP API (`/api/create`, `/api/generate`).
pub struct OllamaBackend {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaBackend {
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[async_trait]
impl TextBackend for OllamaBackend {
    async fn register(&self, name: &str, modelfile: &str) -> EnrichResult<()> {
        let url = format!("{}/api/create", self.base_url);
        let res = self
            .client
            .post(&url)
            .json(&CreateRequest {
                name,
                modelfile,
                stream: false,
            })
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(EnrichError::Backend(format!(
                "model create returned {}: {}",
                status, body
            )));
        }

        let parsed: CreateResponse = res.json().await?;
        if parsed.status != "success" {
            return Err(EnrichError::Backend(format!(
                "model create reported status '{}'",
                parsed.status
            )));
        }
        tracing::info!(target: "tbr::ollama", model = name, "persona model registered");
        Ok(())
    }

    async fn complete(&self, name: &str, prompt: &str) -> EnrichResult<String> {
        let url = format!("{}/api/generate", self.base_url);
        let res = self
            .client
            .post(&url)
            .json(&GenerateRequest {
                model: name,
                prompt,
                stream: false,
            })
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(EnrichError::Backend(format!(
                "generate returned {}: {}",
                status, body
            )));
        }

        let parsed: GenerateResponse = res.json().await?;
        Ok(parsed.response)
    }
}

// ---------------------------------------------------------------------------
// Agent: a persona realized against the backend
// ---------------------------------------------------------------------------

/// A persona bound to a successfully registered backend model.
#[derive(Clone)]
pub struct Agent {
    persona: Persona,
    backend: Arc<dyn TextBackend>,
}

impl Agent {
    /// One-time registration. A backend failure here yields no agent; the
    /// caller is expected to abort the run rather than proceed with an
    /// unusable persona.
    pub async fn register(
        persona: Persona,
        backend: Arc<dyn TextBackend>,
        base_model: &str,
        num_ctx: u32,
    ) -> EnrichResult<Self> {
        let modelfile = persona.modelfile(base_model, num_ctx);
        backend
            .register(persona.as_str(), &modelfile)
            .await
            .map_err(|e| EnrichError::Registration {
                persona: persona.as_str().to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { persona, backend })
    }

    /// Single completion against this persona's registered model, trimmed.
    pub async fn run(&self, prompt: &str) -> EnrichResult<String> {
        let raw = self.backend.complete(self.persona.as_str(), prompt).await?;
        Ok(raw.trim().to_string())
    }
}
