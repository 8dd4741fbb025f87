//! Write-ahead journal: typed log entries, a fixed pipe-delimited
//! on-disk line format, an in-memory staging list (TJT), and the
//! append-only on-disk file (FJT).

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use log::{debug, info};

use crate::error::{EngineError, EngineResult};
use crate::record::RECORD_SIZE;

pub const CHECKPOINT_TX_ID: i64 = -1;
pub const NO_RECORD_ID: i64 = -1;
pub const NO_COUNT_SNAPSHOT: i64 = -1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEntry {
    Begin {
        tx_id: i64,
    },
    Update {
        tx_id: i64,
        record_id: i64,
        before_image: Vec<u8>,
        after_image: Vec<u8>,
    },
    Insert {
        tx_id: i64,
        record_id: i64,
        after_image: Vec<u8>,
        record_count_snapshot: i64,
    },
    Delete {
        tx_id: i64,
        record_id: i64,
        before_image: Vec<u8>,
    },
    Commit {
        tx_id: i64,
    },
    Rollback {
        tx_id: i64,
    },
    Checkpoint,
}

impl LogEntry {
    pub fn tx_id(&self) -> i64 {
        match self {
            LogEntry::Begin { tx_id }
            | LogEntry::Update { tx_id, .. }
            | LogEntry::Insert { tx_id, .. }
            | LogEntry::Delete { tx_id, .. }
            | LogEntry::Commit { tx_id }
            | LogEntry::Rollback { tx_id } => *tx_id,
            LogEntry::Checkpoint => CHECKPOINT_TX_ID,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            LogEntry::Begin { .. } => "BEGIN",
            LogEntry::Update { .. } => "UPDATE",
            LogEntry::Insert { .. } => "INSERT",
            LogEntry::Delete { .. } => "DELETE",
            LogEntry::Commit { .. } => "COMMIT",
            LogEntry::Rollback { .. } => "ROLLBACK",
            LogEntry::Checkpoint => "CHECKPOINT",
        }
    }

    /// Serialize to the fixed `tx_id|record_id|before|after|TYPE|count_snapshot`
    /// line format. `before`/`after` are base64, or the literal `NULL`.
    pub fn serialize(&self) -> String {
        let (tx_id, record_id, before, after, count_snapshot) = match self {
            LogEntry::Begin { tx_id } => (*tx_id, NO_RECORD_ID, None, None, NO_COUNT_SNAPSHOT),
            LogEntry::Update {
                tx_id,
                record_id,
                before_image,
                after_image,
            } => (
                *tx_id,
                *record_id,
                Some(before_image.as_slice()),
                Some(after_image.as_slice()),
                NO_COUNT_SNAPSHOT,
            ),
            LogEntry::Insert {
                tx_id,
                record_id,
                after_image,
                record_count_snapshot,
            } => (
                *tx_id,
                *record_id,
                None,
                Some(after_image.as_slice()),
                *record_count_snapshot,
            ),
            LogEntry::Delete {
                tx_id,
                record_id,
                before_image,
            } => (
                *tx_id,
                *record_id,
                Some(before_image.as_slice()),
                None,
                NO_COUNT_SNAPSHOT,
            ),
            LogEntry::Commit { tx_id } => (*tx_id, NO_RECORD_ID, None, None, NO_COUNT_SNAPSHOT),
            LogEntry::Rollback { tx_id } => (*tx_id, NO_RECORD_ID, None, None, NO_COUNT_SNAPSHOT),
            LogEntry::Checkpoint => (CHECKPOINT_TX_ID, NO_RECORD_ID, None, None, NO_COUNT_SNAPSHOT),
        };

        format!(
            "{}|{}|{}|{}|{}|{}",
            tx_id,
            record_id,
            before.map(|b| BASE64.encode(b)).unwrap_or_else(|| "NULL".to_string()),
            after.map(|b| BASE64.encode(b)).unwrap_or_else(|| "NULL".to_string()),
            self.type_name(),
            count_snapshot,
        )
    }

    /// Parse a single serialized line back into a `LogEntry`.
    pub fn deserialize(line: &str) -> EngineResult<Self> {
        let fields: Vec<&str> = line.split('|').collect();
        if fields.len() != 6 {
            return Err(EngineError::corrupted_file(format!(
                "malformed journal line (expected 6 fields, got {}): {}",
                fields.len(),
                line
            )));
        }
        let tx_id: i64 = fields[0]
            .parse()
            .map_err(|_| EngineError::corrupted_file(format!("bad tx_id in: {}", line)))?;
        let record_id: i64 = fields[1]
            .parse()
            .map_err(|_| EngineError::corrupted_file(format!("bad record_id in: {}", line)))?;
        let before = decode_image(fields[2])?;
        let after = decode_image(fields[3])?;
        let count_snapshot: i64 = fields[5]
            .parse()
            .map_err(|_| EngineError::corrupted_file(format!("bad count_snapshot in: {}", line)))?;

        let entry = match fields[4] {
            "BEGIN" => LogEntry::Begin { tx_id },
            "UPDATE" => LogEntry::Update {
                tx_id,
                record_id,
                before_image: before
                    .ok_or_else(|| EngineError::corrupted_file("UPDATE missing before image"))?,
                after_image: after
                    .ok_or_else(|| EngineError::corrupted_file("UPDATE missing after image"))?,
            },
            "INSERT" => LogEntry::Insert {
                tx_id,
                record_id,
                after_image: after
                    .ok_or_else(|| EngineError::corrupted_file("INSERT missing after image"))?,
                record_count_snapshot: count_snapshot,
            },
            "DELETE" => LogEntry::Delete {
                tx_id,
                record_id,
                before_image: before
                    .ok_or_else(|| EngineError::corrupted_file("DELETE missing before image"))?,
            },
            "COMMIT" => LogEntry::Commit { tx_id },
            "ROLLBACK" => LogEntry::Rollback { tx_id },
            "CHECKPOINT" => LogEntry::Checkpoint,
            other => {
                return Err(EngineError::corrupted_file(format!(
                    "unknown journal entry type: {}",
                    other
                )))
            }
        };
        Ok(entry)
    }
}

fn decode_image(field: &str) -> EngineResult<Option<Vec<u8>>> {
    if field == "NULL" {
        return Ok(None);
    }
    let bytes = BASE64
        .decode(field)
        .map_err(|e| EngineError::corrupted_file(format!("bad base64 image: {}", e)))?;
    if bytes.len() != RECORD_SIZE {
        return Err(EngineError::corrupted_file(format!(
            "image has {} bytes, expected {}",
            bytes.len(),
            RECORD_SIZE
        )));
    }
    Ok(Some(bytes))
}

/// The write-ahead journal: an in-memory staging list (TJT) plus the
/// append-only on-disk file (FJT) it eventually flushes to.
pub struct Journal {
    path: PathBuf,
    staging: Vec<LogEntry>,
}

impl Journal {
    pub fn open<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref().to_path_buf();
        OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            staging: Vec::new(),
        })
    }

    pub fn stage(&mut self, entry: LogEntry) {
        self.staging.push(entry);
    }

    /// Drop the in-memory staging list (TJT) without touching the
    /// on-disk file, used by crash simulation: anything never flushed
    /// never happened as far as durability is concerned.
    pub fn discard_staging(&mut self) {
        self.staging.clear();
    }

    /// Append every staged entry to the on-disk journal, in order,
    /// then clear the staging list.
    pub fn flush(&mut self) -> EngineResult<()> {
        if self.staging.is_empty() {
            return Ok(());
        }
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        for entry in &self.staging {
            writeln!(file, "{}", entry.serialize())?;
        }
        file.flush()?;
        debug!("flushed {} staged journal entries to disk", self.staging.len());
        self.staging.clear();
        Ok(())
    }

    /// Append a CHECKPOINT entry directly to disk, bypassing the
    /// staging list: a checkpoint must be immediately durable.
    pub fn append_checkpoint_direct(&mut self) -> EngineResult<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        writeln!(file, "{}", LogEntry::Checkpoint.serialize())?;
        file.flush()?;
        info!("checkpoint entry appended to journal");
        Ok(())
    }

    /// Read and parse every entry currently on disk, in append order.
    pub fn read_all(&self) -> EngineResult<Vec<LogEntry>> {
        let file = OpenOptions::new().read(true).open(&self.path)?;
        let reader = BufReader::new(file);
        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            entries.push(LogEntry::deserialize(&line)?);
        }
        Ok(entries)
    }

    /// Print the journal to the log, grouped by transaction id so a
    /// reader can follow one transaction's entries together.
    pub fn print(&self) -> EngineResult<()> {
        use itertools::Itertools;

        let entries = self.read_all()?;
        info!("journal at {:?} has {} entries", self.path, entries.len());
        let sorted = entries.iter().enumerate().sorted_by_key(|(_, e)| e.tx_id());
        let grouped = sorted.into_iter().group_by(|(_, e)| e.tx_id());
        for (tx_id, group) in &grouped {
            let line = group.map(|(i, e)| format!("[{}] {:?}", i, e)).join(", ");
            info!("tx {}: {}", tx_id, line);
        }
        Ok(())
    }

    /// Truncate the journal file to empty. Test-only escape hatch;
    /// not part of normal operation.
    pub fn clear(&mut self) -> EngineResult<()> {
        self.staging.clear();
        OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entries() -> Vec<LogEntry> {
        let zero = vec![0u8; RECORD_SIZE];
        let mut full = vec![0u8; RECORD_SIZE];
        for (i, b) in full.iter_mut().enumerate() {
            *b = i as u8;
        }
        vec![
            LogEntry::Begin { tx_id: 1 },
            LogEntry::Update {
                tx_id: 1,
                record_id: 3,
                before_image: zero.clone(),
                after_image: full.clone(),
            },
            LogEntry::Insert {
                tx_id: 1,
                record_id: 10,
                after_image: full.clone(),
                record_count_snapshot: 9,
            },
            LogEntry::Delete {
                tx_id: 2,
                record_id: 4,
                before_image: zero.clone(),
            },
            LogEntry::Commit { tx_id: 1 },
            LogEntry::Rollback { tx_id: 2 },
            LogEntry::Checkpoint,
        ]
    }

    #[test]
    fn round_trips_every_entry_kind() {
        for entry in sample_entries() {
            let line = entry.serialize();
            let parsed = LogEntry::deserialize(&line).unwrap();
            assert_eq!(entry, parsed);
        }
    }

    #[test]
    fn checkpoint_carries_sentinel_tx_id() {
        assert_eq!(LogEntry::Checkpoint.tx_id(), CHECKPOINT_TX_ID);
    }

    #[test]
    fn deserialize_rejects_malformed_line() {
        assert!(LogEntry::deserialize("not-enough-fields").is_err());
    }

    #[test]
    fn deserialize_rejects_wrong_image_length() {
        let bad = format!("1|0|{}|NULL|DELETE|-1", BASE64.encode(b"short"));
        assert!(LogEntry::deserialize(&bad).is_err());
    }
}
