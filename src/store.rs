//! Two-tier disk cache for per-date plan snapshots.
//!
//! Each calendar date maps to at most one file per tier inside a single
//! data directory: `temp_<date>.json` for the refreshable tier and
//! `data_<date>.json` for the daily backup tier. Writes go through a
//! temp-file-then-rename sequence so readers never observe a torn
//! snapshot. Corrupt records are logged and treated as absent.

use crate::error::{PlanError, Result};
use crate::types::DaySnapshot;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// Storage tier for a snapshot.
///
/// `Temporary` entries are rewritten every refresh cycle and pruned when
/// their date leaves the active window. `Backup` entries are written once
/// per calendar day and never pruned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Temporary,
    Backup,
}

impl Tier {
    /// File name prefix for this tier.
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Tier::Temporary => "temp",
            Tier::Backup => "data",
        }
    }

    /// File name for a snapshot of `date` in this tier.
    #[must_use]
    pub fn file_name(self, date: NaiveDate) -> String {
        format!("{}_{}.json", self.prefix(), date.format("%Y-%m-%d"))
    }
}

/// Disk-backed snapshot store rooted at one data directory.
#[derive(Debug, Clone)]
pub struct PlanStore {
    dir: PathBuf,
}

impl PlanStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Storage`] if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            PlanError::Storage(format!(
                "failed to create data directory {}: {e}",
                dir.display()
            ))
        })?;
        Ok(Self { dir })
    }

    /// Root directory of the store.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// On-disk path of the `date` snapshot in `tier`.
    #[must_use]
    pub fn path_for(&self, tier: Tier, date: NaiveDate) -> PathBuf {
        self.dir.join(tier.file_name(date))
    }

    /// Read the snapshot for `date` from `tier`.
    ///
    /// A missing file and a file that fails to decode both yield
    /// `Ok(None)`; the decode failure is logged so a corrupt record
    /// degrades to a cache miss instead of poisoning the tier.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Storage`] only for I/O failures other than
    /// the file being absent.
    pub fn read(&self, tier: Tier, date: NaiveDate) -> Result<Option<DaySnapshot>> {
        let path = self.path_for(tier, date);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PlanError::Storage(format!(
                    "failed to read snapshot {}: {e}",
                    path.display()
                )));
            }
        };

        match serde_json::from_slice::<DaySnapshot>(&bytes) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                tracing::warn!(
                    "ignoring malformed snapshot at {}: {e}",
                    path.display()
                );
                Ok(None)
            }
        }
    }

    /// Write the snapshot for `date` into `tier`, replacing any previous
    /// record. The write is atomic: serialize to a sibling temp file,
    /// then rename over the target.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Storage`] if serialization or any file
    /// operation fails.
    pub fn write(&self, tier: Tier, date: NaiveDate, snapshot: &DaySnapshot) -> Result<()> {
        let path = self.path_for(tier, date);
        let tmp_path = path.with_extension("json.tmp");

        let json = serde_json::to_vec(snapshot)
            .map_err(|e| PlanError::Storage(format!("failed to serialize snapshot: {e}")))?;
        std::fs::write(&tmp_path, json).map_err(|e| {
            PlanError::Storage(format!(
                "failed to write snapshot temp file {}: {e}",
                tmp_path.display()
            ))
        })?;
        std::fs::rename(&tmp_path, &path).map_err(|e| {
            PlanError::Storage(format!(
                "failed to finalize snapshot {}: {e}",
                path.display()
            ))
        })?;
        Ok(())
    }

    /// Delete the snapshot for `date` from `tier`. Deleting a snapshot
    /// that does not exist is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Storage`] for I/O failures other than the
    /// file being absent.
    pub fn delete(&self, tier: Tier, date: NaiveDate) -> Result<()> {
        let path = self.path_for(tier, date);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PlanError::Storage(format!(
                "failed to delete snapshot {}: {e}",
                path.display()
            ))),
        }
    }

    /// List the dates stored in `tier`, sorted ascending. Files whose
    /// names do not match the tier's `<prefix>_<date>.json` pattern are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Storage`] if the data directory cannot be
    /// enumerated.
    pub fn list_dates(&self, tier: Tier) -> Result<Vec<NaiveDate>> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| {
            PlanError::Storage(format!(
                "failed to list data directory {}: {e}",
                self.dir.display()
            ))
        })?;

        let mut dates = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                PlanError::Storage(format!("failed to read directory entry: {e}"))
            })?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(date) = parse_tier_file_name(tier, name) {
                dates.push(date);
            }
        }
        dates.sort_unstable();
        Ok(dates)
    }

    /// Delete every temporary snapshot whose date is not in `keep`.
    /// Backup snapshots are never touched. Returns the number of
    /// snapshots removed.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Storage`] if listing or deleting fails.
    pub fn prune_temporary(&self, keep: &[NaiveDate]) -> Result<usize> {
        let mut removed = 0;
        for date in self.list_dates(Tier::Temporary)? {
            if keep.contains(&date) {
                continue;
            }
            self.delete(Tier::Temporary, date)?;
            tracing::debug!(date = %date, "pruned stale temporary snapshot");
            removed += 1;
        }
        Ok(removed)
    }
}

/// Extract the date from a `<prefix>_<date>.json` file name, if it
/// belongs to `tier` and the date part parses.
fn parse_tier_file_name(tier: Tier, name: &str) -> Option<NaiveDate> {
    let rest = name.strip_prefix(tier.prefix())?.strip_prefix('_')?;
    let stem = rest.strip_suffix(".json")?;
    NaiveDate::parse_from_str(stem, "%Y-%m-%d").ok()
}
