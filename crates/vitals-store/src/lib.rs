//! Offline buffering for vitals samples.
//!
//! Two cooperating pieces keep samples safe while the node is offline:
//!
//! - [`OfflineStore`], a bounded ring in memory that decides what is kept
//!   and what is still pending delivery
//! - [`DurableJournal`], an append-only JSON-lines log on a
//!   [`PersistenceMedium`] that lets the pending set survive a reboot
//!
//! # Example
//!
//! ```
//! use vitals_store::{DurableJournal, MemoryMedium, OfflineStore};
//! use vitals_types::Sample;
//!
//! let mut store = OfflineStore::new(100)?;
//! let mut journal = DurableJournal::new(MemoryMedium::new()).with_replay_limit(100);
//!
//! let sample = Sample::new(36.7, 50.0, 71, 5_000);
//! let slot = store.admit(sample)?;
//! journal.append(&sample);
//!
//! store.mark_sent(slot);
//! if store.is_fully_synced() {
//!     store.purge_all()?;
//!     journal.truncate();
//! }
//! # Ok::<(), vitals_store::Error>(())
//! ```

mod error;
mod journal;
mod medium;
mod offline;

pub use error::{Error, Result};
pub use journal::{DurableJournal, encode_record};
pub use medium::{FileMedium, MemoryMedium, PersistenceMedium};
pub use offline::{DEFAULT_CAPACITY, OfflineStore, SlotRef};

/// Default journal path following platform conventions.
///
/// - Linux: `~/.local/share/vitals/sensor_data.jsonl`
/// - macOS: `~/Library/Application Support/vitals/sensor_data.jsonl`
/// - Windows: `C:\Users\<user>\AppData\Local\vitals\sensor_data.jsonl`
pub fn default_journal_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("vitals")
        .join("sensor_data.jsonl")
}
