//! In-memory projection of a stored technology row.
//!
//! A `Technology` is reconstructed from the store snapshot at the start of
//! each run and only ever written back through targeted field updates. Every
//! derived field is either absent (never computed) or present (computed on a
//! prior run); there is no in-progress state.

use serde_json::{Map, Value};

use crate::store::RawRecord;

/// One unit of work: a record id plus its technology projection.
#[derive(Debug, Clone)]
pub struct Record {
    pub id: String,
    pub technology: Technology,
}

impl Record {
    /// Project a raw row. Returns `None` when the row is not a valid
    /// technology (missing name, year, or source text).
    pub fn from_raw(raw: &RawRecord) -> Option<Self> {
        Technology::from_fields(&raw.fields).map(|technology| Self {
            id: raw.id.clone(),
            technology,
        })
    }
}

/// One Breakthrough Technology pick with its derived fields.
#[derive(Debug, Clone, Default)]
pub struct Technology {
    pub name: String,
    pub year: i64,
    /// Canonical source text: the MIT Technology Review article blurb.
    pub blurb: String,

    pub summary: Option<String>,
    pub impact: Option<String>,
    pub author: Option<String>,
    pub opinion: Option<String>,
    pub impact_level: Option<String>,
    pub optimist: Option<String>,
    pub pessimist: Option<String>,
    pub social_impact: Option<String>,
    pub social_impact_level: Option<String>,
    pub social_impact_potential: Option<String>,
    pub social_impact_potential_level: Option<String>,
    pub type_tag: Option<String>,
    pub spi_impact: Option<String>,
    pub quant_qual: Option<String>,
    pub flop_type: Option<String>,
}

impl Technology {
    /// Construct from a stored field map. `name`, `year`, and `blurb` are
    /// required; a row missing any of them is not a valid technology.
    pub fn from_fields(fields: &Map<String, Value>) -> Option<Self> {
        let name = text(fields, "name")?;
        let year = fields.get("year")?.as_i64()?;
        let blurb = text(fields, "blurb")?;
        Some(Self {
            name,
            year,
            blurb,
            summary: text(fields, "summary"),
            impact: text(fields, "impact"),
            author: text(fields, "author"),
            opinion: text(fields, "opinion"),
            impact_level: text(fields, "impact_level"),
            optimist: text(fields, "optimist"),
            pessimist: text(fields, "pessimist"),
            social_impact: text(fields, "social_impact"),
            social_impact_level: text(fields, "social_impact_level"),
            social_impact_potential: text(fields, "social_impact_potential"),
            social_impact_potential_level: text(fields, "social_impact_potential_level"),
            type_tag: text(fields, "type"),
            spi_impact: text(fields, "spi_impact"),
            quant_qual: text(fields, "quant_qual"),
            flop_type: text(fields, "flop_type"),
        })
    }
}

fn text(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields.get(key).and_then(|v| v.as_str()).map(String::from)
}

/// Build an update map from string field values.
pub fn text_fields(pairs: &[(&str, &str)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn test_missing_name_is_rejected() {
        let f = fields(json!({ "year": 2016, "blurb": "text" }));
        assert!(Technology::from_fields(&f).is_none());
    }

    #[test]
    fn test_full_projection() {
        let f = fields(json!({
            "name": "Reusable rockets",
            "year": 2016,
            "blurb": "Rockets that land themselves.",
            "author": "AUTHOR: Jane Doe",
            "impact_level": "High Impact"
        }));
        let tech = Technology::from_fields(&f).unwrap();
        assert_eq!(tech.name, "Reusable rockets");
        assert_eq!(tech.year, 2016);
        assert_eq!(tech.author.as_deref(), Some("AUTHOR: Jane Doe"));
        assert_eq!(tech.impact_level.as_deref(), Some("High Impact"));
        assert!(tech.summary.is_none());
        assert!(tech.flop_type.is_none());
    }
}
