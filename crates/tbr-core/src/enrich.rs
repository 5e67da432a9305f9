//! The enrichment loop: ordered field groups evaluated per record.
//!
//! Fully sequential: one record at a time, one field group at a time, one
//! blocking model call at a time. Every group is gated by "not yet computed",
//! which is what makes the loop idempotent across runs: a field already
//! present in the store is never recomputed. Later groups may read fields
//! written earlier in the same record's pass.

use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::backend::{Agent, TextBackend};
use crate::config::EnrichConfig;
use crate::error::EnrichResult;
use crate::persona::Persona;
use crate::prompts::{
    flop_type_prompt, impact_level_prompt, opinion_prompt, quant_qual_prompt,
    section_extract_prompt, social_actual_prompt, social_level_prompt, social_potential_prompt,
    spi_prompt, summarize_prompt, type_prompt, FLOP_TYPE_CHOICES, IMPACT_LEVEL_CHOICES,
    LEVEL_CHOICES, QUANT_QUAL_CHOICES, TYPE_CHOICES,
};
use crate::store::RecordStore;
use crate::technology::{text_fields, Record};

/// Marker left behind by an unclean prior run: an `author` value that still
/// carries the section label gets repaired in place, without a model call.
const AUTHOR_MARKER: &str = "AUTHOR:";

// ---------------------------------------------------------------------------
// Field groups: the dependency order as declared data
// ---------------------------------------------------------------------------

/// One set of derived fields computed together and persisted atomically.
/// `ORDER` is the loop's only source of evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldGroup {
    /// summary + impact + author + opinion (or the author-marker repair).
    Summarize,
    ImpactLevel,
    Optimist,
    Pessimist,
    TypeTag,
    /// social_impact, both levels, social_impact_potential, spi_impact.
    SocialImpact,
    QuantQual,
    /// flop_type; reads nearly every field derived above.
    Outcome,
}

impl FieldGroup {
    pub const ORDER: [FieldGroup; 8] = [
        FieldGroup::Summarize,
        FieldGroup::ImpactLevel,
        FieldGroup::Optimist,
        FieldGroup::Pessimist,
        FieldGroup::TypeTag,
        FieldGroup::SocialImpact,
        FieldGroup::QuantQual,
        FieldGroup::Outcome,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldGroup::Summarize => "summarize",
            FieldGroup::ImpactLevel => "impact_level",
            FieldGroup::Optimist => "optimist",
            FieldGroup::Pessimist => "pessimist",
            FieldGroup::TypeTag => "type",
            FieldGroup::SocialImpact => "social_impact",
            FieldGroup::QuantQual => "quant_qual",
            FieldGroup::Outcome => "flop_type",
        }
    }
}

// ---------------------------------------------------------------------------
// Options and run report
// ---------------------------------------------------------------------------

/// Loop-facing subset of the configuration.
#[derive(Debug, Clone)]
pub struct EnrichOptions {
    pub base_model: String,
    pub num_ctx: u32,
    /// Warn (never reject) when a closed-choice answer falls outside the
    /// allowed literal set. Stored semantics are unchanged either way.
    pub validate_choices: bool,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            base_model: crate::persona::BaseModel::default().as_str().to_string(),
            num_ctx: crate::config::DEFAULT_NUM_CTX,
            validate_choices: true,
        }
    }
}

impl From<&EnrichConfig> for EnrichOptions {
    fn from(config: &EnrichConfig) -> Self {
        Self {
            base_model: config.base_model.clone(),
            num_ctx: config.num_ctx,
            validate_choices: config.validate_choices,
        }
    }
}

/// Counters for one enrichment run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct EnrichReport {
    pub records_seen: u64,
    pub records_invalid: u64,
    pub model_calls: u64,
    pub updates_attempted: u64,
    pub update_failures: u64,
}

// ---------------------------------------------------------------------------
// Enricher
// ---------------------------------------------------------------------------

struct AgentSet {
    general: Agent,
    summarizer: Agent,
    cleaner: Agent,
    optimist: Agent,
    pessimist: Agent,
    social_benefits: Agent,
}

/// Drives one pass over the full record snapshot.
pub struct Enricher {
    store: Arc<dyn RecordStore>,
    agents: AgentSet,
    validate_choices: bool,
}

impl Enricher {
    /// Register all six personas against the backend. Any registration
    /// failure is a setup error: the run aborts before touching records,
    /// since every later call against that persona would be invalid.
    pub async fn new(
        backend: Arc<dyn TextBackend>,
        store: Arc<dyn RecordStore>,
        options: EnrichOptions,
    ) -> EnrichResult<Self> {
        let base = options.base_model.as_str();
        let ctx = options.num_ctx;
        let agents = AgentSet {
            general: Agent::register(Persona::General, Arc::clone(&backend), base, ctx).await?,
            summarizer: Agent::register(Persona::Summarizer, Arc::clone(&backend), base, ctx)
                .await?,
            cleaner: Agent::register(Persona::Cleaner, Arc::clone(&backend), base, ctx).await?,
            optimist: Agent::register(Persona::Optimist, Arc::clone(&backend), base, ctx).await?,
            pessimist: Agent::register(Persona::Pessimist, Arc::clone(&backend), base, ctx)
                .await?,
            social_benefits: Agent::register(Persona::SocialBenefits, backend, base, ctx).await?,
        };
        Ok(Self {
            store,
            agents,
            validate_choices: options.validate_choices,
        })
    }

    /// One full pass: snapshot the store, then evaluate every field group for
    /// every valid record in store order. Per-group failures degrade
    /// gracefully; only the snapshot fetch itself is fatal.
    pub async fn run(&self) -> EnrichResult<EnrichReport> {
        let mut report = EnrichReport::default();
        let snapshot = self.store.list_all().await?;
        for raw in &snapshot {
            report.records_seen += 1;
            let Some(mut record) = Record::from_raw(raw) else {
                report.records_invalid += 1;
                warn!(target: "tbr::enrich", record = %raw.id, "row is not a valid technology; skipping");
                continue;
            };
            let started = Instant::now();
            for group in FieldGroup::ORDER {
                if let Err(e) = self.apply_group(group, &mut record, &mut report).await {
                    warn!(
                        target: "tbr::enrich",
                        record = %record.id,
                        group = group.as_str(),
                        error = %e,
                        "field group failed; fields left absent for a future run"
                    );
                }
            }
            info!(
                target: "tbr::enrich",
                record = %record.id,
                technology = %record.technology.name,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "record pass complete"
            );
        }
        Ok(report)
    }

    async fn apply_group(
        &self,
        group: FieldGroup,
        record: &mut Record,
        report: &mut EnrichReport,
    ) -> EnrichResult<()> {
        match group {
            FieldGroup::Summarize => self.group_summarize(record, report).await,
            FieldGroup::ImpactLevel => self.group_impact_level(record, report).await,
            FieldGroup::Optimist => self.group_optimist(record, report).await,
            FieldGroup::Pessimist => self.group_pessimist(record, report).await,
            FieldGroup::TypeTag => self.group_type(record, report).await,
            FieldGroup::SocialImpact => self.group_social(record, report).await,
            FieldGroup::QuantQual => self.group_quant_qual(record, report).await,
            FieldGroup::Outcome => self.group_outcome(record, report).await,
        }
    }

    // -- group 1: summarize / author repair --------------------------------

    async fn group_summarize(
        &self,
        record: &mut Record,
        report: &mut EnrichReport,
    ) -> EnrichResult<()> {
        match record.technology.author.clone() {
            None => {
                let tech = &record.technology;
                let raw = self
                    .ask(
                        &self.agents.summarizer,
                        summarize_prompt(&tech.name, tech.year, &tech.blurb),
                        report,
                    )
                    .await?;
                // Fan-out: one cleaner extraction per labeled section, each
                // over the full raw blob.
                let cleaner = &self.agents.cleaner;
                let summary = self
                    .ask(cleaner, section_extract_prompt("SUMMARY", &raw), report)
                    .await?;
                let impact = self
                    .ask(cleaner, section_extract_prompt("IMPACT", &raw), report)
                    .await?;
                let author = self
                    .ask(cleaner, section_extract_prompt("AUTHOR", &raw), report)
                    .await?;
                let opinion = self
                    .ask(cleaner, section_extract_prompt("OPINION", &raw), report)
                    .await?;
                let fields = text_fields(&[
                    ("summary", &summary),
                    ("impact", &impact),
                    ("author", &author),
                    ("opinion", &opinion),
                ]);
                if self.persist(&record.id, fields, report).await {
                    record.technology.summary = Some(summary);
                    record.technology.impact = Some(impact);
                    record.technology.author = Some(author);
                    record.technology.opinion = Some(opinion);
                }
            }
            Some(author) => {
                // Self-healing repair for output of an unclean prior run; no model call.
                if let Some(repaired) = repaired_author(&author) {
                    let fields = text_fields(&[("author", &repaired)]);
                    if self.persist(&record.id, fields, report).await {
                        record.technology.author = Some(repaired);
                    }
                }
            }
        }
        Ok(())
    }

    // -- groups 2-5: single-field classifications and opinions -------------

    async fn group_impact_level(
        &self,
        record: &mut Record,
        report: &mut EnrichReport,
    ) -> EnrichResult<()> {
        if record.technology.impact_level.is_some() {
            return Ok(());
        }
        let tech = &record.technology;
        let answer = self
            .ask(
                &self.agents.general,
                impact_level_prompt(&tech.name, tech.year, &tech.blurb),
                report,
            )
            .await?;
        self.warn_unexpected_choice("impact_level", &answer, &IMPACT_LEVEL_CHOICES);
        if self
            .persist(&record.id, text_fields(&[("impact_level", &answer)]), report)
            .await
        {
            record.technology.impact_level = Some(answer);
        }
        Ok(())
    }

    async fn group_optimist(
        &self,
        record: &mut Record,
        report: &mut EnrichReport,
    ) -> EnrichResult<()> {
        if record.technology.optimist.is_some() {
            return Ok(());
        }
        let tech = &record.technology;
        let answer = self
            .ask(
                &self.agents.optimist,
                opinion_prompt(&tech.name, tech.year, &tech.blurb),
                report,
            )
            .await?;
        if self
            .persist(&record.id, text_fields(&[("optimist", &answer)]), report)
            .await
        {
            record.technology.optimist = Some(answer);
        }
        Ok(())
    }

    async fn group_pessimist(
        &self,
        record: &mut Record,
        report: &mut EnrichReport,
    ) -> EnrichResult<()> {
        if record.technology.pessimist.is_some() {
            return Ok(());
        }
        let tech = &record.technology;
        let answer = self
            .ask(
                &self.agents.pessimist,
                opinion_prompt(&tech.name, tech.year, &tech.blurb),
                report,
            )
            .await?;
        if self
            .persist(&record.id, text_fields(&[("pessimist", &answer)]), report)
            .await
        {
            record.technology.pessimist = Some(answer);
        }
        Ok(())
    }

    async fn group_type(
        &self,
        record: &mut Record,
        report: &mut EnrichReport,
    ) -> EnrichResult<()> {
        if record.technology.type_tag.is_some() {
            return Ok(());
        }
        let tech = &record.technology;
        let answer = self
            .ask(&self.agents.general, type_prompt(&tech.name, &tech.blurb), report)
            .await?;
        self.warn_unexpected_choice("type", &answer, &TYPE_CHOICES);
        if self
            .persist(&record.id, text_fields(&[("type", &answer)]), report)
            .await
        {
            record.technology.type_tag = Some(answer);
        }
        Ok(())
    }

    // -- group 6: social impact (multi-step, conditionally skippable) ------

    async fn group_social(
        &self,
        record: &mut Record,
        report: &mut EnrichReport,
    ) -> EnrichResult<()> {
        if record.technology.spi_impact.is_some() {
            return Ok(());
        }
        let tech = &record.technology;
        let social = &self.agents.social_benefits;

        let (actual, actual_level, potential, potential_level) = if tech.social_impact.is_none() {
            // Fresh derivation: four calls, all fields present.
            let actual = self
                .ask(
                    social,
                    social_actual_prompt(&tech.name, tech.year, &tech.blurb),
                    report,
                )
                .await?;
            let actual_level = self
                .ask(social, social_level_prompt("actual", &tech.name, &actual), report)
                .await?;
            let potential = self
                .ask(social, social_potential_prompt(&tech.name, &tech.blurb), report)
                .await?;
            // The level prompt is grounded on the actual-impact assessment in
            // both cases; only the wording of the question changes.
            let potential_level = self
                .ask(social, social_level_prompt("potential", &tech.name, &actual), report)
                .await?;
            self.warn_unexpected_choice("social_impact_level", &actual_level, &LEVEL_CHOICES);
            self.warn_unexpected_choice(
                "social_impact_potential_level",
                &potential_level,
                &LEVEL_CHOICES,
            );
            (
                Some(actual),
                Some(actual_level),
                Some(potential),
                Some(potential_level),
            )
        } else {
            // Reuse the stored narrative and levels verbatim; only spi_impact
            // is still missing. A companion the store never got (a partial
            // prior write) stays absent rather than becoming an empty string.
            (
                tech.social_impact.clone(),
                tech.social_impact_level.clone(),
                tech.social_impact_potential.clone(),
                tech.social_impact_potential_level.clone(),
            )
        };

        let spi = self
            .ask(
                social,
                spi_prompt(
                    &record.technology.name,
                    record.technology.year,
                    actual.as_deref().unwrap_or_default(),
                    potential.as_deref().unwrap_or_default(),
                ),
                report,
            )
            .await?;

        // The group persists together; only fields that actually have a value
        // go into the update map.
        let mut fields = Map::new();
        for (key, value) in [
            ("social_impact", &actual),
            ("social_impact_level", &actual_level),
            ("social_impact_potential", &potential),
            ("social_impact_potential_level", &potential_level),
        ] {
            if let Some(v) = value {
                fields.insert(key.to_string(), Value::String(v.clone()));
            }
        }
        fields.insert("spi_impact".to_string(), Value::String(spi.clone()));
        if self.persist(&record.id, fields, report).await {
            record.technology.social_impact = actual;
            record.technology.social_impact_level = actual_level;
            record.technology.social_impact_potential = potential;
            record.technology.social_impact_potential_level = potential_level;
            record.technology.spi_impact = Some(spi);
        }
        Ok(())
    }

    // -- groups 7-8: quantity/quality and outcome classification -----------

    async fn group_quant_qual(
        &self,
        record: &mut Record,
        report: &mut EnrichReport,
    ) -> EnrichResult<()> {
        if record.technology.quant_qual.is_some() {
            return Ok(());
        }
        let tech = &record.technology;
        let answer = self
            .ask(
                &self.agents.social_benefits,
                quant_qual_prompt(&tech.name, tech.year, &tech.blurb),
                report,
            )
            .await?;
        self.warn_unexpected_choice("quant_qual", &answer, &QUANT_QUAL_CHOICES);
        if self
            .persist(&record.id, text_fields(&[("quant_qual", &answer)]), report)
            .await
        {
            record.technology.quant_qual = Some(answer);
        }
        Ok(())
    }

    async fn group_outcome(
        &self,
        record: &mut Record,
        report: &mut EnrichReport,
    ) -> EnrichResult<()> {
        if record.technology.flop_type.is_some() {
            return Ok(());
        }
        // Reads social fields written earlier in this same pass.
        let answer = self
            .ask(&self.agents.general, flop_type_prompt(&record.technology), report)
            .await?;
        let label = answer.split(':').next().unwrap_or_default().trim().to_string();
        self.warn_unexpected_choice("flop_type", &label, &FLOP_TYPE_CHOICES);
        if self
            .persist(&record.id, text_fields(&[("flop_type", &answer)]), report)
            .await
        {
            record.technology.flop_type = Some(answer);
        }
        Ok(())
    }

    // -- helpers -----------------------------------------------------------

    async fn ask(
        &self,
        agent: &Agent,
        prompt: String,
        report: &mut EnrichReport,
    ) -> EnrichResult<String> {
        report.model_calls += 1;
        agent.run(&prompt).await
    }

    /// Immediate, independent persistence of one field group. Returns false
    /// on failure; the in-memory projection is only advanced on success so
    /// the fields stay absent for a future run.
    async fn persist(
        &self,
        id: &str,
        fields: Map<String, Value>,
        report: &mut EnrichReport,
    ) -> bool {
        report.updates_attempted += 1;
        match self.store.update(id, fields).await {
            Ok(()) => true,
            Err(e) => {
                report.update_failures += 1;
                warn!(
                    target: "tbr::enrich",
                    record = id,
                    error = %e,
                    "store update failed; fields stay absent for a future run"
                );
                false
            }
        }
    }

    fn warn_unexpected_choice(&self, field: &str, value: &str, allowed: &[&str]) {
        if !self.validate_choices {
            return;
        }
        let v = value.trim();
        if !allowed.iter().any(|a| a.eq_ignore_ascii_case(v)) {
            warn!(
                target: "tbr::enrich",
                field,
                value = v,
                "model answer outside the allowed choice set; storing as-is"
            );
        }
    }
}

/// Strips the stray `AUTHOR:` marker from a previously stored author value.
/// Returns `None` when the value is already clean.
fn repaired_author(author: &str) -> Option<String> {
    author
        .strip_prefix(AUTHOR_MARKER)
        .map(|rest| rest.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_author_repair_strips_marker_and_trims() {
        assert_eq!(
            repaired_author("AUTHOR:  Jane Doe "),
            Some("Jane Doe".to_string())
        );
        assert_eq!(repaired_author("Jane Doe"), None);
    }

    #[test]
    fn test_group_order_is_fixed() {
        let names: Vec<&str> = FieldGroup::ORDER.iter().map(|g| g.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "summarize",
                "impact_level",
                "optimist",
                "pessimist",
                "type",
                "social_impact",
                "quant_qual",
                "flop_type"
            ]
        );
    }
}
