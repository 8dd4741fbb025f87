//! Heap file layout: maps record ids to (page id, intra-page offset)
//! and owns the record-count-bounded disk I/O rules that keep the
//! data file tight against the logical record count.
//!
//! The data file and journal file are opened freshly for each I/O
//! (no long-held descriptors), matching the single-mutex resource
//! model: there is never more than one in-flight operation to race
//! against.

use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{EngineError, EngineResult};
use crate::record::{PAGE_SIZE, RECORDS_PER_PAGE, RECORD_SIZE};

pub struct HeapFile {
    path: PathBuf,
    pub record_count: i64,
}

impl HeapFile {
    /// Open (creating if absent) the data file at `path` and validate
    /// its size is a whole number of records.
    pub fn open<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;
        let len = file.metadata()?.len();
        if len % RECORD_SIZE as u64 != 0 {
            return Err(EngineError::corrupted_file(format!(
                "data file length {} is not a multiple of RECORD_SIZE ({})",
                len, RECORD_SIZE
            )));
        }
        let record_count = (len / RECORD_SIZE as u64) as i64;
        debug!(
            "opened heap file {:?}, {} bytes, {} records on disk",
            path, len, record_count
        );
        Ok(Self { path, record_count })
    }

    /// Read the full `RECORD_SIZE * RECORDS_PER_PAGE` content of
    /// `page_id` from disk, zero-padding any tail the file is too
    /// short to supply.
    pub fn read_page(&self, page_id: i64) -> EngineResult<Vec<u8>> {
        let mut buf = vec![0u8; PAGE_SIZE];
        let start = page_id as u64 * (RECORDS_PER_PAGE * RECORD_SIZE) as u64;

        let mut file = OpenOptions::new().read(true).open(&self.path)?;
        let file_len = file.metadata()?.len();
        if start >= file_len {
            return Ok(buf);
        }
        file.seek(SeekFrom::Start(start))?;
        let want = (RECORDS_PER_PAGE * RECORD_SIZE) as u64;
        let available = (file_len - start).min(want) as usize;
        file.read_exact(&mut buf[..available])?;
        debug!(
            "read page {} from disk ({} live bytes, leading bytes {})",
            page_id,
            available,
            hex::encode(&buf[..available.min(16)])
        );
        Ok(buf)
    }

    /// Write `page_bytes` back to disk, bounded by `record_count`:
    /// never write a full page for a tail page, never write anything
    /// for a page entirely beyond `record_count`.
    pub fn write_page_bounded(&self, page_id: i64, page_bytes: &[u8]) -> EngineResult<()> {
        let first_record = page_id * RECORDS_PER_PAGE as i64;
        if first_record >= self.record_count {
            debug!(
                "skip writing page {} (first record {} >= record_count {})",
                page_id, first_record, self.record_count
            );
            return Ok(());
        }
        let live_records = (RECORDS_PER_PAGE as i64).min(self.record_count - first_record);
        let live_bytes = live_records as usize * RECORD_SIZE;

        let mut file = OpenOptions::new().write(true).create(true).open(&self.path)?;
        let start = page_id as u64 * (RECORDS_PER_PAGE * RECORD_SIZE) as u64;
        file.seek(SeekFrom::Start(start))?;
        file.write_all(&page_bytes[..live_bytes])?;
        debug!("wrote page {} to disk ({} live bytes)", page_id, live_bytes);
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn open_rejects_corrupt_length() {
        let tmp = NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), vec![0u8; RECORD_SIZE + 1]).unwrap();
        let result = HeapFile::open(tmp.path());
        assert!(matches!(result, Err(EngineError::CorruptedFile(_))));
    }

    #[test]
    fn read_page_beyond_file_is_zero_filled() {
        let tmp = NamedTempFile::new().unwrap();
        let heap = HeapFile::open(tmp.path()).unwrap();
        let page = heap.read_page(3).unwrap();
        assert_eq!(page.len(), PAGE_SIZE);
        assert!(page.iter().all(|&b| b == 0));
    }

    #[test]
    fn write_page_bounded_never_exceeds_record_count() {
        let tmp = NamedTempFile::new().unwrap();
        let mut heap = HeapFile::open(tmp.path()).unwrap();
        heap.record_count = 5;
        let page = vec![0xAB; PAGE_SIZE];
        heap.write_page_bounded(0, &page).unwrap();
        let len = std::fs::metadata(tmp.path()).unwrap().len();
        assert_eq!(len, 5 * RECORD_SIZE as u64);
    }
}
