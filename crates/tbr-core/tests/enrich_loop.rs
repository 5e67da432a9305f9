//! Integration tests for the enrichment loop against a deterministic stub
//! backend and an in-memory record store.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::{Arc, Mutex};
use tbr_core::{
    EnrichError, EnrichOptions, EnrichResult, Enricher, RawRecord, RecordStore, TextBackend,
};

/// Canned summarizer blob with all four labeled sections.
const RAW_BLOB: &str = "SUMMARY: stub summary\nIMPACT: stub impact\nAUTHOR: Jane Doe\nOPINION: stub opinion";

// ---------------------------------------------------------------------------
// Stub backend: canned responses per persona and prompt category
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StubBackend {
    /// Persona name whose registration should fail, if any.
    failed_registration: Option<&'static str>,
    /// Persona name whose completions should fail, if any.
    failing_persona: Option<&'static str>,
    registered: Mutex<Vec<String>>,
    /// Every completion issued: (model name, prompt).
    calls: Mutex<Vec<(String, String)>>,
}

impl StubBackend {
    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn calls_for(&self, model: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == model)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

#[async_trait]
impl TextBackend for StubBackend {
    async fn register(&self, name: &str, _modelfile: &str) -> EnrichResult<()> {
        if self.failed_registration == Some(name) {
            return Err(EnrichError::Backend("model create reported status 'error'".into()));
        }
        self.registered.lock().unwrap().push(name.to_string());
        Ok(())
    }

    async fn complete(&self, name: &str, prompt: &str) -> EnrichResult<String> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), prompt.to_string()));
        if self.failing_persona == Some(name) {
            return Err(EnrichError::Backend("generate returned 503".into()));
        }
        let response = match name {
            "summarizer" => RAW_BLOB.to_string(),
            "cleaner" => {
                if prompt.contains(r#"return the "SUMMARY:" text verbatim"#) {
                    "stub summary".to_string()
                } else if prompt.contains(r#"return the "IMPACT:" text verbatim"#) {
                    "stub impact".to_string()
                } else if prompt.contains(r#"return the "AUTHOR:" text verbatim"#) {
                    "Jane Doe".to_string()
                } else {
                    "stub opinion".to_string()
                }
            }
            "general" => {
                if prompt.contains("Classify the overall outcome") {
                    "Niche Success: adopted mainly in research labs.".to_string()
                } else if prompt.contains(r#""Low Impact", "Medium Impact", "High Impact""#) {
                    "Medium Impact".to_string()
                } else {
                    "biotech".to_string()
                }
            }
            "optimist" => "optimist view".to_string(),
            "pessimist" => "pessimist view".to_string(),
            "social_benefits" => {
                if prompt.contains(r#"Pick one of "quantity of life""#) {
                    "quality of life".to_string()
                } else if prompt.contains("% impact of this technology") {
                    "0.2%".to_string()
                } else if prompt.contains("actual social impact level") {
                    "High".to_string()
                } else if prompt.contains("potential social impact level") {
                    "Medium".to_string()
                } else if prompt.contains("only hypothesize about potential impacts") {
                    "potential narrative".to_string()
                } else {
                    "actual narrative".to_string()
                }
            }
            other => format!("[no canned response for {other}]"),
        };
        Ok(response)
    }
}

// ---------------------------------------------------------------------------
// In-memory store: updates merge back into the snapshot, like the real store
// ---------------------------------------------------------------------------

struct MemStore {
    records: Mutex<Vec<RawRecord>>,
    updates: Mutex<Vec<(String, Map<String, Value>)>>,
    /// Record id whose updates should fail, if any.
    failing_id: Option<String>,
}

impl MemStore {
    fn new(records: Vec<RawRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            updates: Mutex::new(Vec::new()),
            failing_id: None,
        }
    }

    fn with_update_failure(mut self, id: &str) -> Self {
        self.failing_id = Some(id.to_string());
        self
    }

    fn update_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }

    fn updates(&self) -> Vec<(String, Map<String, Value>)> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordStore for MemStore {
    async fn list_all(&self) -> EnrichResult<Vec<RawRecord>> {
        Ok(self.records.lock().unwrap().clone())
    }

    async fn update(&self, id: &str, fields: Map<String, Value>) -> EnrichResult<()> {
        if self.failing_id.as_deref() == Some(id) {
            return Err(EnrichError::Store(format!("PATCH for {id} returned 503")));
        }
        self.updates
            .lock()
            .unwrap()
            .push((id.to_string(), fields.clone()));
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| EnrichError::Store(format!("no record {id}")))?;
        for (k, v) in fields {
            record.fields.insert(k, v);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn record(id: &str, fields: Value) -> RawRecord {
    serde_json::from_value(json!({
        "id": id,
        "createdTime": "2020-01-01T00:00:00.000Z",
        "fields": fields,
    }))
    .unwrap()
}

/// A record where every derived field is already present.
fn fully_enriched(id: &str) -> RawRecord {
    record(
        id,
        json!({
            "name": "Foo", "year": 2020, "blurb": "text",
            "summary": "s", "impact": "i", "author": "Jane Doe", "opinion": "o",
            "impact_level": "High Impact", "optimist": "opt", "pessimist": "pess",
            "social_impact": "si", "social_impact_level": "High",
            "social_impact_potential": "sp", "social_impact_potential_level": "Low",
            "type": "software", "spi_impact": "0.1%",
            "quant_qual": "both", "flop_type": "Niche Success: n",
        }),
    )
}

fn with_fields_removed(mut raw: RawRecord, remove: &[&str]) -> RawRecord {
    for key in remove {
        raw.fields.remove(*key);
    }
    raw
}

async fn enricher(backend: Arc<StubBackend>, store: Arc<MemStore>) -> Enricher {
    Enricher::new(backend, store, EnrichOptions::default())
        .await
        .expect("persona registration")
}

fn sorted_keys(fields: &Map<String, Value>) -> Vec<&str> {
    let mut keys: Vec<&str> = fields.keys().map(|k| k.as_str()).collect();
    keys.sort_unstable();
    keys
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_end_to_end_fresh_record() {
    let store = Arc::new(MemStore::new(vec![record(
        "rec1",
        json!({ "name": "Foo", "year": 2020, "blurb": "text" }),
    )]));
    let backend = Arc::new(StubBackend::default());
    let enricher = enricher(Arc::clone(&backend), Arc::clone(&store)).await;

    let report = enricher.run().await.unwrap();
    assert_eq!(report.records_seen, 1);
    assert_eq!(report.records_invalid, 0);
    assert_eq!(report.update_failures, 0);
    // 1 summarize + 4 extractions + impact_level + optimist + pessimist +
    // type + 4 social + spi + quant_qual + flop_type
    assert_eq!(report.model_calls, 16);

    let updates = store.updates();
    assert_eq!(updates.len(), 8);
    let total_fields: usize = updates.iter().map(|(_, f)| f.len()).sum();
    assert_eq!(total_fields, 15);

    // Group boundaries, in order.
    assert_eq!(
        sorted_keys(&updates[0].1),
        vec!["author", "impact", "opinion", "summary"]
    );
    assert_eq!(updates[0].1.get("summary").unwrap(), "stub summary");
    assert_eq!(updates[0].1.get("author").unwrap(), "Jane Doe");
    assert_eq!(
        updates[1].1.get("impact_level").unwrap(),
        "Medium Impact"
    );
    assert_eq!(updates[2].1.get("optimist").unwrap(), "optimist view");
    assert_eq!(updates[3].1.get("pessimist").unwrap(), "pessimist view");
    assert_eq!(updates[4].1.get("type").unwrap(), "biotech");
    assert_eq!(
        sorted_keys(&updates[5].1),
        vec![
            "social_impact",
            "social_impact_level",
            "social_impact_potential",
            "social_impact_potential_level",
            "spi_impact"
        ]
    );
    assert_eq!(updates[5].1.get("social_impact").unwrap(), "actual narrative");
    assert_eq!(updates[5].1.get("social_impact_level").unwrap(), "High");
    assert_eq!(
        updates[5].1.get("social_impact_potential").unwrap(),
        "potential narrative"
    );
    assert_eq!(
        updates[5].1.get("social_impact_potential_level").unwrap(),
        "Medium"
    );
    assert_eq!(updates[5].1.get("spi_impact").unwrap(), "0.2%");
    assert_eq!(updates[6].1.get("quant_qual").unwrap(), "quality of life");
    let flop = updates[7].1.get("flop_type").unwrap().as_str().unwrap();
    assert!(flop.starts_with("Niche Success:"), "got {flop}");
}

#[tokio::test]
async fn test_second_pass_is_idempotent() {
    let store = Arc::new(MemStore::new(vec![record(
        "rec1",
        json!({ "name": "Foo", "year": 2020, "blurb": "text" }),
    )]));
    let backend = Arc::new(StubBackend::default());
    let enricher = enricher(Arc::clone(&backend), Arc::clone(&store)).await;

    enricher.run().await.unwrap();
    let calls_after_first = backend.call_count();
    let updates_after_first = store.update_count();

    let second = enricher.run().await.unwrap();
    assert_eq!(backend.call_count(), calls_after_first);
    assert_eq!(store.update_count(), updates_after_first);
    assert_eq!(second.model_calls, 0);
    assert_eq!(second.updates_attempted, 0);
}

#[tokio::test]
async fn test_field_group_independence() {
    let store = Arc::new(MemStore::new(vec![with_fields_removed(
        fully_enriched("rec1"),
        &["optimist"],
    )]));
    let backend = Arc::new(StubBackend::default());
    let enricher = enricher(Arc::clone(&backend), Arc::clone(&store)).await;

    enricher.run().await.unwrap();
    assert_eq!(backend.call_count(), 1);
    assert_eq!(backend.calls_for("optimist").len(), 1);

    let updates = store.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(sorted_keys(&updates[0].1), vec!["optimist"]);
    assert_eq!(updates[0].1.get("optimist").unwrap(), "optimist view");
}

#[tokio::test]
async fn test_author_repair_without_model_call() {
    let mut raw = fully_enriched("rec1");
    raw.fields
        .insert("author".into(), json!("AUTHOR:  Jane Doe "));
    let store = Arc::new(MemStore::new(vec![raw]));
    let backend = Arc::new(StubBackend::default());
    let enricher = enricher(Arc::clone(&backend), Arc::clone(&store)).await;

    enricher.run().await.unwrap();
    assert_eq!(backend.call_count(), 0);

    let updates = store.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(sorted_keys(&updates[0].1), vec!["author"]);
    assert_eq!(updates[0].1.get("author").unwrap(), "Jane Doe");
}

#[tokio::test]
async fn test_social_impact_reuse_issues_one_call() {
    let store = Arc::new(MemStore::new(vec![with_fields_removed(
        fully_enriched("rec1"),
        &["spi_impact"],
    )]));
    let backend = Arc::new(StubBackend::default());
    let enricher = enricher(Arc::clone(&backend), Arc::clone(&store)).await;

    enricher.run().await.unwrap();
    assert_eq!(backend.call_count(), 1);
    assert_eq!(backend.calls_for("social_benefits").len(), 1);

    // The five fields persist together; the four stored ones are reused verbatim.
    let updates = store.updates();
    assert_eq!(updates.len(), 1);
    let fields = &updates[0].1;
    assert_eq!(fields.len(), 5);
    assert_eq!(fields.get("social_impact").unwrap(), "si");
    assert_eq!(fields.get("social_impact_level").unwrap(), "High");
    assert_eq!(fields.get("social_impact_potential").unwrap(), "sp");
    assert_eq!(fields.get("social_impact_potential_level").unwrap(), "Low");
    assert_eq!(fields.get("spi_impact").unwrap(), "0.2%");

    // The reused narratives are the spi prompt's context.
    let spi_prompt = &backend.calls_for("social_benefits")[0];
    assert!(spi_prompt.contains(r#""si""#));
    assert!(spi_prompt.contains(r#""sp""#));
}

#[tokio::test]
async fn test_extraction_fanout_routing() {
    let store = Arc::new(MemStore::new(vec![record(
        "rec1",
        json!({ "name": "Foo", "year": 2020, "blurb": "text" }),
    )]));
    let backend = Arc::new(StubBackend::default());
    let enricher = enricher(Arc::clone(&backend), Arc::clone(&store)).await;

    enricher.run().await.unwrap();

    // Each of the four cleaner calls received the full raw blob as context.
    let cleaner_calls = backend.calls_for("cleaner");
    assert_eq!(cleaner_calls.len(), 4);
    for prompt in &cleaner_calls {
        assert!(prompt.contains(RAW_BLOB));
    }

    // And the persisted fields match the per-section cleaner outputs.
    let fields = &store.updates()[0].1;
    assert_eq!(fields.get("summary").unwrap(), "stub summary");
    assert_eq!(fields.get("impact").unwrap(), "stub impact");
    assert_eq!(fields.get("author").unwrap(), "Jane Doe");
    assert_eq!(fields.get("opinion").unwrap(), "stub opinion");
}

#[tokio::test]
async fn test_generation_failure_skips_group_and_continues() {
    let store = Arc::new(MemStore::new(vec![with_fields_removed(
        fully_enriched("rec1"),
        &["optimist", "pessimist"],
    )]));
    let backend = Arc::new(StubBackend {
        failing_persona: Some("optimist"),
        ..Default::default()
    });
    let enricher = enricher(Arc::clone(&backend), Arc::clone(&store)).await;

    // The optimist call fails; the run carries on to the pessimist group.
    let report = enricher.run().await.unwrap();
    assert_eq!(report.model_calls, 2);
    assert_eq!(report.updates_attempted, 1);
    assert_eq!(report.update_failures, 0);

    let updates = store.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(sorted_keys(&updates[0].1), vec!["pessimist"]);

    // The failed group persisted nothing, so a later run can retry it.
    let records = store.records.lock().unwrap();
    assert!(!records[0].fields.contains_key("optimist"));
    assert_eq!(records[0].fields.get("pessimist").unwrap(), "pessimist view");
}

#[tokio::test]
async fn test_store_failure_is_nonfatal_and_leaves_fields_absent() {
    let store = Arc::new(
        MemStore::new(vec![record(
            "rec1",
            json!({ "name": "Foo", "year": 2020, "blurb": "text" }),
        )])
        .with_update_failure("rec1"),
    );
    let backend = Arc::new(StubBackend::default());
    let enricher = enricher(Arc::clone(&backend), Arc::clone(&store)).await;

    let report = enricher.run().await.unwrap();
    assert_eq!(report.model_calls, 16);
    assert_eq!(report.updates_attempted, 8);
    assert_eq!(report.update_failures, 8);
    assert_eq!(store.update_count(), 0);

    // Nothing was written, so the stored row still has only the source fields.
    {
        let records = store.records.lock().unwrap();
        assert_eq!(sorted_keys(&records[0].fields), vec!["blurb", "name", "year"]);
    }

    // Failed writes never advance the in-memory view either: the outcome
    // classifier saw the social fields as absent, not as this pass's answers.
    let general_calls = backend.calls_for("general");
    let outcome_prompt = general_calls
        .iter()
        .find(|p| p.contains("Classify the overall outcome"))
        .unwrap();
    assert!(!outcome_prompt.contains("actual narrative"));
    assert!(!outcome_prompt.contains("optimist view"));
}

#[tokio::test]
async fn test_social_reuse_skips_never_stored_companion() {
    let store = Arc::new(MemStore::new(vec![with_fields_removed(
        fully_enriched("rec1"),
        &["spi_impact", "social_impact_potential_level"],
    )]));
    let backend = Arc::new(StubBackend::default());
    let enricher = enricher(Arc::clone(&backend), Arc::clone(&store)).await;

    enricher.run().await.unwrap();
    assert_eq!(backend.call_count(), 1);

    // The absent companion level is left out of the update instead of being
    // written back as an empty string.
    let updates = store.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(
        sorted_keys(&updates[0].1),
        vec![
            "social_impact",
            "social_impact_level",
            "social_impact_potential",
            "spi_impact"
        ]
    );

    let records = store.records.lock().unwrap();
    assert!(!records[0].fields.contains_key("social_impact_potential_level"));
}

#[tokio::test]
async fn test_registration_failure_aborts_setup() {
    let store = Arc::new(MemStore::new(vec![record(
        "rec1",
        json!({ "name": "Foo", "year": 2020, "blurb": "text" }),
    )]));
    let backend = Arc::new(StubBackend {
        failed_registration: Some("summarizer"),
        ..Default::default()
    });

    let result = Enricher::new(
        backend,
        Arc::clone(&store) as Arc<dyn RecordStore>,
        EnrichOptions::default(),
    )
    .await;
    match result {
        Err(EnrichError::Registration { persona, .. }) => assert_eq!(persona, "summarizer"),
        other => panic!("expected registration error, got {:?}", other.is_ok()),
    }
    assert_eq!(store.update_count(), 0);
}

#[tokio::test]
async fn test_invalid_record_is_skipped() {
    let store = Arc::new(MemStore::new(vec![
        record("rec1", json!({ "year": 2020, "blurb": "no name" })),
        with_fields_removed(fully_enriched("rec2"), &["pessimist"]),
    ]));
    let backend = Arc::new(StubBackend::default());
    let enricher = enricher(Arc::clone(&backend), Arc::clone(&store)).await;

    let report = enricher.run().await.unwrap();
    assert_eq!(report.records_seen, 2);
    assert_eq!(report.records_invalid, 1);
    assert_eq!(backend.call_count(), 1);
    assert_eq!(store.updates()[0].0, "rec2");
}
