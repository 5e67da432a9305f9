//! Enrichment configuration loaded from the environment.
//!
//! The runner loads `.env` via dotenvy before calling `from_env()`, so the
//! Airtable credentials and any Ollama overrides can live alongside the
//! checkout without code edits.

use crate::error::{EnrichError, EnrichResult};
use crate::persona::BaseModel;
use tracing::warn;

/// Default Ollama endpoint for a local install.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
/// Default context window for every persona. The long-context runs used
/// TBR_NUM_CTX=81920 against the same personas.
pub const DEFAULT_NUM_CTX: u32 = 8192;

/// Configuration for one enrichment run.
///
/// | Env | Default | Description |
/// |-----|---------|-------------|
/// | TBR_OLLAMA_URL | http://localhost:11434 | Ollama API endpoint. |
/// | TBR_BASE_MODEL | llama3.1:70b | Base model every persona is built FROM. |
/// | TBR_NUM_CTX | 8192 | Context window passed to every persona. |
/// | TBR_VALIDATE_CHOICES | true | Warn (never reject) when a closed-choice answer is outside the allowed set. |
/// | AIRTABLE_API_KEY | — | Required. Bearer token for the record store. |
/// | TBR_AIRTABLE_BASE | — | Required. Airtable base id. |
/// | TBR_AIRTABLE_TABLE | — | Required. Airtable table id or name. |
#[derive(Debug, Clone)]
pub struct EnrichConfig {
    pub ollama_url: String,
    pub base_model: String,
    pub num_ctx: u32,
    pub validate_choices: bool,
    pub airtable_token: String,
    pub airtable_base: String,
    pub airtable_table: String,
}

impl EnrichConfig {
    /// Load from environment. Missing store credentials are a process-level
    /// error: the run must abort before any record is touched.
    pub fn from_env() -> EnrichResult<Self> {
        let base_model = env_opt_string("TBR_BASE_MODEL")
            .unwrap_or_else(|| BaseModel::default().as_str().to_string());
        if BaseModel::from_str(&base_model).is_none() {
            warn!(
                target: "tbr::config",
                model = %base_model,
                "TBR_BASE_MODEL is not one of the known base models; using it as-is"
            );
        }
        Ok(Self {
            ollama_url: env_opt_string("TBR_OLLAMA_URL")
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            base_model,
            num_ctx: env_num_ctx(),
            validate_choices: env_bool("TBR_VALIDATE_CHOICES", true),
            airtable_token: env_required("AIRTABLE_API_KEY")?,
            airtable_base: env_required("TBR_AIRTABLE_BASE")?,
            airtable_table: env_required("TBR_AIRTABLE_TABLE")?,
        })
    }
}

fn env_required(name: &str) -> EnrichResult<String> {
    env_opt_string(name).ok_or_else(|| EnrichError::Config(format!("{} is not set", name)))
}

fn env_opt_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => v.trim().eq_ignore_ascii_case("true") || (v.trim().is_empty() && default),
        Err(_) => default,
    }
}

fn env_num_ctx() -> u32 {
    match std::env::var("TBR_NUM_CTX") {
        Ok(v) => v.trim().parse().unwrap_or(DEFAULT_NUM_CTX).max(1),
        Err(_) => DEFAULT_NUM_CTX,
    }
}
