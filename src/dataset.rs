use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context as _;

use crate::{
    core::{Iso3, Lang, Year, parse_hex_rgb},
    error::{RaceError, RaceResult},
};

/// One (country, year) GDP data point as stored in the generated dataset file.
///
/// Values are in billions of current USD. Field names match the file format
/// produced by the `fetch` step.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GdpRecord {
    pub year: Year,
    pub name: String,
    pub name_cn: String,
    pub code: String, // two-letter lowercase, used for flag URLs
    pub iso3: Iso3,
    pub value: f64,
    pub color: String, // #RRGGBB
    pub flag: String,
}

/// A historical annotation that pauses the race when its year is reached.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HistoryEvent {
    pub year: Year,
    pub event: String,
    pub event_cn: String,
    pub description: String,
    pub description_cn: String,
    pub impact: String,
    pub impact_cn: String,
    pub image_url: String,
}

impl HistoryEvent {
    pub fn title(&self, lang: Lang) -> &str {
        match lang {
            Lang::En => &self.event,
            Lang::Zh => &self.event_cn,
        }
    }

    pub fn description(&self, lang: Lang) -> &str {
        match lang {
            Lang::En => &self.description,
            Lang::Zh => &self.description_cn,
        }
    }

    pub fn impact(&self, lang: Lang) -> &str {
        match lang {
            Lang::En => &self.impact,
            Lang::Zh => &self.impact_cn,
        }
    }
}

/// A validated, immutable GDP dataset.
#[derive(Clone, Debug)]
pub struct Dataset {
    records: Vec<GdpRecord>,
}

impl Dataset {
    pub fn new(records: Vec<GdpRecord>) -> RaceResult<Self> {
        validate_records(&records)?;
        Ok(Self { records })
    }

    pub fn from_json_str(json: &str) -> RaceResult<Self> {
        let records: Vec<GdpRecord> =
            serde_json::from_str(json).map_err(|e| RaceError::serde(format!("dataset: {e}")))?;
        Self::new(records)
    }

    pub fn load(path: &Path) -> RaceResult<Self> {
        let file =
            File::open(path).with_context(|| format!("open dataset '{}'", path.display()))?;
        let records: Vec<GdpRecord> = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| RaceError::serde(format!("dataset '{}': {e}", path.display())))?;
        Self::new(records)
    }

    pub fn records(&self) -> &[GdpRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn validate_records(records: &[GdpRecord]) -> RaceResult<()> {
    if records.is_empty() {
        return Err(RaceError::validation("dataset has no records"));
    }

    let mut seen = HashSet::with_capacity(records.len());
    for r in records {
        if !r.value.is_finite() || r.value <= 0.0 {
            return Err(RaceError::validation(format!(
                "record {} {} has non-positive value {}",
                r.iso3, r.year, r.value
            )));
        }
        parse_hex_rgb(&r.color).map_err(|_| {
            RaceError::validation(format!("record {} {} has bad color '{}'", r.iso3, r.year, r.color))
        })?;
        if !seen.insert((r.iso3, r.year)) {
            return Err(RaceError::validation(format!(
                "duplicate record for {} in {}",
                r.iso3, r.year
            )));
        }
    }

    Ok(())
}

/// Loads the history events file. Order is preserved; when two events share a
/// year, the first one in the file wins (accepted data quirk, not an error).
pub fn load_events(path: &Path) -> RaceResult<Vec<HistoryEvent>> {
    let file = File::open(path).with_context(|| format!("open events '{}'", path.display()))?;
    let events: Vec<HistoryEvent> = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| RaceError::serde(format!("events '{}': {e}", path.display())))?;
    Ok(events)
}
