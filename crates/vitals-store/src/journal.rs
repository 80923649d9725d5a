//! Append-only journal of admitted samples.
//!
//! The journal is the durable half of the offline buffer: every admitted
//! sample is appended as one JSON line, the whole file is replayed on boot,
//! and it is removed only after the sync engine has confirmed that every
//! pending sample was delivered.
//!
//! Persistence failures are never fatal. The first error from the medium
//! flips the journal into memory-only mode for the rest of the process
//! lifetime; the in-memory store keeps working without it.

use std::collections::VecDeque;
use std::path::Path;

use tracing::{debug, info, warn};

use vitals_types::{Sample, SampleRecord};

use crate::error::Result;
use crate::medium::{FileMedium, PersistenceMedium};
use crate::offline::DEFAULT_CAPACITY;

/// Durable, line-oriented sample log.
pub struct DurableJournal {
    medium: Option<Box<dyn PersistenceMedium>>,
    replay_limit: usize,
    appended: u64,
    skipped_on_replay: u64,
}

impl std::fmt::Debug for DurableJournal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableJournal")
            .field("medium", &self.medium.as_ref().map(|m| m.describe()))
            .field("replay_limit", &self.replay_limit)
            .field("appended", &self.appended)
            .finish()
    }
}

impl DurableJournal {
    /// Create a journal on top of the given medium.
    pub fn new(medium: impl PersistenceMedium + 'static) -> Self {
        Self {
            medium: Some(Box::new(medium)),
            replay_limit: DEFAULT_CAPACITY,
            appended: 0,
            skipped_on_replay: 0,
        }
    }

    /// Open a file-backed journal.
    ///
    /// If the file location cannot be prepared the journal starts in
    /// memory-only mode instead of failing.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        match FileMedium::open(path.as_ref()) {
            Ok(medium) => {
                info!("Journal at {}", path.as_ref().display());
                Self::new(medium)
            }
            Err(e) => {
                warn!("Journal unavailable ({}); running memory-only", e);
                Self::disabled()
            }
        }
    }

    /// A journal whose medium is unavailable from the start.
    pub fn disabled() -> Self {
        Self {
            medium: None,
            replay_limit: DEFAULT_CAPACITY,
            appended: 0,
            skipped_on_replay: 0,
        }
    }

    /// Cap the number of samples returned by [`DurableJournal::replay`].
    ///
    /// Should match the capacity of the offline store the journal backs.
    pub fn with_replay_limit(mut self, limit: usize) -> Self {
        self.replay_limit = limit;
        self
    }

    /// Whether the medium is still in use.
    pub fn is_available(&self) -> bool {
        self.medium.is_some()
    }

    /// Records appended during this process lifetime.
    pub fn records_appended(&self) -> u64 {
        self.appended
    }

    /// Lines dropped by the most recent replay because they failed to parse.
    pub fn skipped_on_replay(&self) -> u64 {
        self.skipped_on_replay
    }

    /// Append one sample. A no-op once the journal is unavailable.
    pub fn append(&mut self, sample: &Sample) {
        let Some(medium) = self.medium.as_mut() else {
            return;
        };

        let line = match encode_record(sample) {
            Ok(line) => line,
            Err(e) => {
                warn!("Skipping journal append for {}: {}", sample, e);
                return;
            }
        };

        match medium.append(&line) {
            Ok(()) => self.appended += 1,
            Err(e) => self.degrade("append", e),
        }
    }

    /// Read every record back, in file order.
    ///
    /// Malformed or implausible lines are skipped individually. Records
    /// already marked sent are filtered out. When more unsent records exist
    /// than the replay limit, the newest ones are kept, matching the
    /// overwrite-oldest policy of the offline store.
    pub fn replay(&mut self) -> Vec<Sample> {
        self.skipped_on_replay = 0;

        let Some(medium) = self.medium.as_mut() else {
            debug!("Journal unavailable, nothing to replay");
            return Vec::new();
        };

        let bytes = match medium.read_all() {
            Ok(bytes) => bytes,
            Err(e) => {
                self.degrade("replay", e);
                return Vec::new();
            }
        };

        let text = String::from_utf8_lossy(&bytes);
        let mut kept = VecDeque::with_capacity(self.replay_limit.min(1024));
        let mut dropped_for_capacity = 0usize;

        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let sample = match decode_record(line) {
                Ok(sample) => sample,
                Err(reason) => {
                    self.skipped_on_replay += 1;
                    debug!("Skipping journal line {}: {}", line_no + 1, reason);
                    continue;
                }
            };

            if sample.sent {
                continue;
            }

            kept.push_back(sample);
            if kept.len() > self.replay_limit {
                kept.pop_front();
                dropped_for_capacity += 1;
            }
        }

        if self.skipped_on_replay > 0 {
            warn!(
                "Skipped {} malformed journal record(s)",
                self.skipped_on_replay
            );
        }
        if dropped_for_capacity > 0 {
            warn!(
                "Journal held {} more unsent record(s) than fit; oldest dropped",
                dropped_for_capacity
            );
        }

        kept.into()
    }

    /// Remove every record. A no-op once the journal is unavailable.
    pub fn truncate(&mut self) {
        let Some(medium) = self.medium.as_mut() else {
            return;
        };

        match medium.truncate() {
            Ok(()) => debug!("Journal truncated"),
            Err(e) => self.degrade("truncate", e),
        }
    }

    fn degrade(&mut self, operation: &str, error: std::io::Error) {
        if let Some(medium) = self.medium.take() {
            warn!(
                "Journal {} on {} failed: {}. Continuing memory-only",
                operation,
                medium.describe(),
                error
            );
        }
    }
}

/// Encode a sample as one newline-terminated journal line.
pub fn encode_record(sample: &Sample) -> Result<Vec<u8>> {
    let mut line = serde_json::to_vec(&SampleRecord::from(sample))?;
    line.push(b'\n');
    Ok(line)
}

/// Decode one journal line.
fn decode_record(line: &str) -> std::result::Result<Sample, String> {
    let record: SampleRecord = serde_json::from_str(line).map_err(|e| e.to_string())?;
    Sample::try_from(record).map_err(|e| e.to_string())
}
