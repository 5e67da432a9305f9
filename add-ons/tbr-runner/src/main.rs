//! One-shot enrichment runner.
//!
//! Loads `.env`, registers the six personas against the local Ollama
//! instance, fetches the full record snapshot from Airtable, and runs the
//! enrichment loop once. All state lives in the record store, so re-running
//! after a crash simply picks up the still-absent fields.

use std::sync::Arc;
use tbr_core::{AirtableStore, EnrichConfig, EnrichOptions, Enricher, OllamaBackend};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env::var calls)
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[tbr-runner] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match EnrichConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "configuration error; aborting before any record is processed");
            std::process::exit(1);
        }
    };

    tracing::info!(
        ollama_url = %config.ollama_url,
        base_model = %config.base_model,
        num_ctx = config.num_ctx,
        "starting enrichment run"
    );

    let backend = Arc::new(OllamaBackend::new(&config.ollama_url));
    let store = Arc::new(AirtableStore::new(
        &config.airtable_token,
        &config.airtable_base,
        &config.airtable_table,
    ));

    let enricher = match Enricher::new(backend, store, EnrichOptions::from(&config)).await {
        Ok(enricher) => enricher,
        Err(e) => {
            tracing::error!(error = %e, "persona registration failed; aborting run");
            std::process::exit(1);
        }
    };

    match enricher.run().await {
        Ok(report) => {
            tracing::info!(
                records_seen = report.records_seen,
                records_invalid = report.records_invalid,
                model_calls = report.model_calls,
                updates_attempted = report.updates_attempted,
                update_failures = report.update_failures,
                "enrichment run complete"
            );
            if let Ok(json) = serde_json::to_string_pretty(&report) {
                println!("{}", json);
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "enrichment run failed");
            std::process::exit(1);
        }
    }
}
