//! tbr-core: breakthrough-technology enrichment library.
//!
//! Enriches MIT Technology Review "Breakthrough Technology" records held in a
//! remote tabular store with model-derived fields: summaries, impact ratings,
//! optimist/pessimist opinions, categorical tags, and a Social Progress Index
//! contribution estimate. Six fixed personas served by a local Ollama
//! instance do the generation; the loop here only decides which fields are
//! still missing, builds the prompts, and writes results back.

mod backend;
mod config;
mod enrich;
mod error;
mod persona;
pub mod prompts;
mod store;
mod technology;

pub use backend::{Agent, OllamaBackend, TextBackend};
pub use config::{EnrichConfig, DEFAULT_NUM_CTX, DEFAULT_OLLAMA_URL};
pub use enrich::{EnrichOptions, EnrichReport, Enricher, FieldGroup};
pub use error::{EnrichError, EnrichResult};
pub use persona::{BaseModel, Persona, PERSONA_SEED, PERSONA_TEMPERATURE};
pub use store::{AirtableStore, RawRecord, RecordStore};
pub use technology::{text_fields, Record, Technology};
