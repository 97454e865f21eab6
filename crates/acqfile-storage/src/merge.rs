//! Merge/rotation engine.
//!
//! Re-serializes indexed events from arbitrary source containers into a
//! series of size-bounded output containers:
//!
//! ```text
//! index file ─→ [IndexEntry*] ─→ seek source reader ─→ decode record
//!                                        │
//!                        optional master-key override
//!                                        │
//!                                 output writer ──→ rotate at budget
//! ```
//!
//! ## Rotation geometry
//!
//! The first output holds up to `max_events` events. After each rotation
//! the budget shrinks to `max(floor * max, ⌊scale * current⌋)`, so with
//! the defaults (scale 0.90, floor 0.50) and `max_events = 100` the
//! per-file budgets run 100, 90, 81, 72, 64, 57, 51, 50, 50, ... and hold
//! at the floor. Later files in a long merge stay small without ever
//! dropping below half the configured maximum.
//!
//! ## Failure policy
//!
//! Any decode or encode error aborts the whole merge. Partial output
//! files are left in place; only a fully empty output is truncated by the
//! writer's own close.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use acqfile_core::{Error, Keys, Result, RunConfig};

use crate::reader::EventReader;
use crate::writer::EventWriter;

/// Marker starting every event line in a merge index.
const EVENT_MARKER: &str = "EVT:";

const ENV_CHUNK_SCALE: &str = "ACQMERGE_CHUNK_SCALE";
const ENV_CHUNK_FLOOR: &str = "ACQMERGE_CHUNK_FLOOR";

/// Tunables for one merge run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Event budget of the first output file.
    pub max_events: u64,
    /// Geometric shrink factor applied to the budget after each rotation.
    pub scale: f64,
    /// Fraction of `max_events` the budget never shrinks below.
    pub floor: f64,
    /// When set, overwrite the physics master translation key of every
    /// merged record.
    pub override_master_key: Option<u32>,
    /// Configuration metadata written into each output header.
    pub run_config: RunConfig,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            max_events: 100_000,
            scale: 0.90,
            floor: 0.50,
            override_master_key: None,
            run_config: RunConfig::default(),
        }
    }
}

impl MergeConfig {
    /// Apply the process-environment overrides for the rotation fractions.
    /// Read once; out-of-range or unparsable values are ignored with a
    /// warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(scale) = read_env_fraction(ENV_CHUNK_SCALE) {
            config.scale = scale;
        }
        if let Some(floor) = read_env_fraction(ENV_CHUNK_FLOOR) {
            config.floor = floor;
        }
        config
    }
}

fn read_env_fraction(name: &str) -> Option<f64> {
    let raw = std::env::var(name).ok()?;
    match raw.parse::<f64>() {
        Ok(v) if v > 0.0 && v <= 1.0 => Some(v),
        _ => {
            warn!(var = name, value = %raw, "ignoring invalid rotation fraction");
            None
        }
    }
}

/// One event line of a merge index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub started_at: u32,
    pub sequence: u64,
    pub channel: u32,
    pub datagrams: u32,
    pub open_action: String,
    pub close_action: String,
    /// Absolute byte offset of the record within the source container.
    pub offset: u64,
    pub source: String,
}

impl IndexEntry {
    /// Parse one index line. Lines not starting with the event marker are
    /// ignored (`Ok(None)`); a malformed event line is an error.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.first() != Some(&EVENT_MARKER) {
            return Ok(None);
        }

        let bad = || Error::BadIndexLine(line.to_string());
        if fields.len() != 9 {
            return Err(bad());
        }

        Ok(Some(Self {
            started_at: fields[1].parse().map_err(|_| bad())?,
            sequence: fields[2].parse().map_err(|_| bad())?,
            channel: fields[3].parse().map_err(|_| bad())?,
            datagrams: fields[4].parse().map_err(|_| bad())?,
            open_action: fields[5].to_string(),
            close_action: fields[6].to_string(),
            offset: fields[7].parse().map_err(|_| bad())?,
            source: fields[8].to_string(),
        }))
    }
}

/// The shrinking per-file event budget.
#[derive(Debug)]
struct RotationBudget {
    max: u64,
    current: u64,
    scale: f64,
    floor: f64,
}

impl RotationBudget {
    fn new(config: &MergeConfig) -> Self {
        Self {
            max: config.max_events,
            current: config.max_events,
            scale: config.scale,
            floor: config.floor,
        }
    }

    fn current(&self) -> u64 {
        self.current
    }

    /// Shrink after a rotation. Floor-of-float-multiply on both terms;
    /// the rounding is externally observable in output file boundaries.
    fn shrink(&mut self) {
        let floor_events = (self.floor * self.max as f64) as u64;
        let scaled = (self.scale * self.current as f64) as u64;
        self.current = floor_events.max(scaled);
    }
}

/// One closed output container of a merge run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub path: PathBuf,
    pub events: u64,
}

/// Outcome of a completed merge run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub outputs: Vec<OutputFile>,
}

impl MergeSummary {
    pub fn total_events(&self) -> u64 {
        self.outputs.iter().map(|o| o.events).sum()
    }
}

/// The merge/rotation engine.
///
/// Source readers are cached per path, opened lazily, and kept open for
/// the life of the engine; repeated index entries against the same source
/// reuse the handle. The output writer is opened lazily on the first
/// successfully decoded record so an all-failing merge leaves no output.
pub struct Merger {
    run_id: u32,
    template: String,
    config: MergeConfig,
    readers: HashMap<String, EventReader>,
    writer: Option<EventWriter>,
    budget: RotationBudget,
    written: u64,
    summary: MergeSummary,
}

impl Merger {
    /// `run_id` identifies the downlink being merged and becomes the run
    /// id of every output container. `template` must contain two `{}`
    /// placeholders, filled with the run start time and sequence number
    /// of each output's first event.
    pub fn new(run_id: u32, template: impl Into<String>, config: MergeConfig) -> Self {
        let budget = RotationBudget::new(&config);
        Self {
            run_id,
            template: template.into(),
            config,
            readers: HashMap::new(),
            writer: None,
            budget,
            written: 0,
            summary: MergeSummary::default(),
        }
    }

    /// Run the whole merge from an index file. Fatal on the first error;
    /// partial outputs are left as-is.
    pub fn merge_index_file(&mut self, index_path: impl AsRef<Path>) -> Result<MergeSummary> {
        let index_path = index_path.as_ref();
        let file = File::open(index_path).map_err(|source| Error::Open {
            path: index_path.to_path_buf(),
            source,
        })?;

        info!(index = %index_path.display(), run_id = self.run_id, "starting merge");
        for line in BufReader::new(file).lines() {
            let line = line?;
            if let Some(entry) = IndexEntry::parse(&line)? {
                self.merge_entry(&entry)?;
            }
        }
        self.finish()
    }

    /// Merge one indexed event into the current output.
    pub fn merge_entry(&mut self, entry: &IndexEntry) -> Result<()> {
        let reader = match self.readers.entry(entry.source.clone()) {
            Entry::Occupied(slot) => slot.into_mut(),
            Entry::Vacant(slot) => slot.insert(EventReader::open(&entry.source)?),
        };

        reader.seek(entry.offset)?;
        let mut record = reader
            .next_record()?
            .ok_or_else(|| Error::MissingIndexedRecord {
                path: entry.source.clone(),
                offset: entry.offset,
            })?;

        if let Some(master) = self.config.override_master_key {
            if let Keys::Physics(keys) = &mut record.keys {
                keys.master = master;
            }
        }

        if self.writer.is_none() {
            let name = render_output_name(
                &self.template,
                record.context.run.started_at,
                record.context.scalers.sequence,
            );
            debug!(output = %name, budget = self.budget.current(), "opening output");
            self.writer = Some(EventWriter::open(
                &name,
                self.run_id,
                &self.config.run_config,
            )?);
        }

        if let Some(writer) = self.writer.as_mut() {
            writer.append(&record.context, &record.payload, &record.info, &record.keys)?;
        }
        self.written += 1;

        if self.written >= self.budget.current() {
            self.rotate()?;
        }
        Ok(())
    }

    /// Close the current output and flush the summary. Call once after
    /// the last entry; `merge_index_file` does this itself.
    pub fn finish(&mut self) -> Result<MergeSummary> {
        if self.writer.is_some() {
            self.close_current()?;
        }
        info!(
            outputs = self.summary.outputs.len(),
            events = self.summary.total_events(),
            "merge complete"
        );
        Ok(self.summary.clone())
    }

    fn rotate(&mut self) -> Result<()> {
        self.close_current()?;
        self.budget.shrink();
        Ok(())
    }

    fn close_current(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.close()?;
            info!(
                path = %writer.path().display(),
                events = writer.event_count(),
                "closed merge output"
            );
            self.summary.outputs.push(OutputFile {
                path: writer.path().to_path_buf(),
                events: writer.event_count(),
            });
        }
        self.written = 0;
        Ok(())
    }
}

/// Substitute the run start time and sequence number into the output
/// filename template, in that order.
fn render_output_name(template: &str, started_at: u32, sequence: u64) -> String {
    template
        .replacen("{}", &started_at.to_string(), 1)
        .replacen("{}", &sequence.to_string(), 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_shrinks_geometrically_to_floor() {
        let config = MergeConfig {
            max_events: 100,
            ..Default::default()
        };
        let mut budget = RotationBudget::new(&config);

        let mut observed = Vec::new();
        for _ in 0..10 {
            observed.push(budget.current());
            budget.shrink();
        }
        assert_eq!(observed, [100, 90, 81, 72, 64, 57, 51, 50, 50, 50]);
    }

    #[test]
    fn budget_respects_custom_fractions() {
        let config = MergeConfig {
            max_events: 10,
            scale: 0.5,
            floor: 0.1,
            ..Default::default()
        };
        let mut budget = RotationBudget::new(&config);
        budget.shrink();
        assert_eq!(budget.current(), 5);
        budget.shrink();
        assert_eq!(budget.current(), 2);
        budget.shrink();
        // floor(0.5 * 2) = 1 equals the floor fraction 1.
        assert_eq!(budget.current(), 1);
        budget.shrink();
        assert_eq!(budget.current(), 1);
    }

    #[test]
    fn index_event_line_parses() {
        let line = "EVT: 239557000 12345 2 17 startRun stopRun 128 /data/run0.acq";
        let entry = IndexEntry::parse(line).unwrap().unwrap();
        assert_eq!(
            entry,
            IndexEntry {
                started_at: 239557000,
                sequence: 12345,
                channel: 2,
                datagrams: 17,
                open_action: "startRun".into(),
                close_action: "stopRun".into(),
                offset: 128,
                source: "/data/run0.acq".into(),
            }
        );
    }

    #[test]
    fn non_event_lines_are_ignored() {
        assert_eq!(IndexEntry::parse("# comment").unwrap(), None);
        assert_eq!(IndexEntry::parse("").unwrap(), None);
        assert_eq!(IndexEntry::parse("RUN: 1 2 3").unwrap(), None);
    }

    #[test]
    fn malformed_event_line_is_rejected() {
        assert!(matches!(
            IndexEntry::parse("EVT: not-a-number 1 2 3 a b 4 /p"),
            Err(Error::BadIndexLine(_))
        ));
        assert!(matches!(
            IndexEntry::parse("EVT: 1 2 3"),
            Err(Error::BadIndexLine(_))
        ));
    }

    #[test]
    fn output_name_substitutes_in_order() {
        assert_eq!(
            render_output_name("merged-{}-{}.acq", 239557000, 42),
            "merged-239557000-42.acq"
        );
        // Extra placeholders are left alone.
        assert_eq!(render_output_name("x-{}-{}-{}", 1, 2), "x-1-2-{}");
    }
}
