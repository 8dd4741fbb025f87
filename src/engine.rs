//! The storage engine: wires the heap file, buffer pool, journal, and
//! transaction state together behind a single coarse mutex, per the
//! single-threaded, strictly-ordered resource model.

use std::sync::Mutex;

use log::{info, warn};

use crate::buffer_pool::BufferPool;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::heap_file::HeapFile;
use crate::journal::{Journal, LogEntry};
use crate::record::{self, RECORD_SIZE};
use crate::recovery;
use crate::transaction::TransactionState;

/// The mutable state guarded by the engine's single coarse mutex.
pub(crate) struct EngineInner {
    pub heap: HeapFile,
    pub pool: BufferPool,
    pub journal: Journal,
    pub tx: TransactionState,
}

pub struct Engine {
    inner: Mutex<EngineInner>,
}

impl Engine {
    pub fn open<P: AsRef<std::path::Path>>(data_path: P) -> EngineResult<Self> {
        Self::open_with_config(EngineConfig::new(data_path))
    }

    pub fn open_with_config(config: EngineConfig) -> EngineResult<Self> {
        let heap = HeapFile::open(&config.data_path)?;
        let journal = Journal::open(&config.journal_path)?;
        let inner = EngineInner {
            heap,
            pool: BufferPool::new(),
            journal,
            tx: TransactionState::new(),
        };
        Ok(Self {
            inner: Mutex::new(inner),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, EngineInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ---- heap / buffer manager surface -----------------------------------

    pub fn get_record_count(&self) -> i64 {
        self.lock().heap.record_count
    }

    pub fn fix(&self, page_id: i64) -> EngineResult<Vec<u8>> {
        let mut inner = self.lock();
        let bytes = inner.pool.fix(page_id, &inner.heap)?.to_vec();
        Ok(bytes)
    }

    pub fn unfix(&self, page_id: i64) -> EngineResult<()> {
        self.lock().pool.unfix(page_id)
    }

    pub fn use_page(&self, page_id: i64) -> EngineResult<()> {
        let mut inner = self.lock();
        let in_transaction = inner.tx.in_transaction;
        inner.pool.use_page(page_id, in_transaction)
    }

    pub fn force(&self, page_id: i64) -> EngineResult<()> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        inner.pool.force(page_id, &inner.heap, inner.tx.in_transaction)
    }

    // ---- record-level read/write -------------------------------------

    pub fn is_locked(&self, record_id: i64) -> bool {
        self.lock().tx.is_locked(record_id)
    }

    pub fn read_record(&self, record_id: i64) -> EngineResult<Vec<u8>> {
        let mut inner = self.lock();
        read_record_locked(&mut inner, record_id)
    }

    pub fn get_page(&self, page_number: i64) -> EngineResult<Vec<Vec<u8>>> {
        let mut inner = self.lock();
        if page_number < 0 {
            return Err(EngineError::invalid_argument("page number must be non-negative"));
        }
        let first = page_number * record::RECORDS_PER_PAGE as i64;
        let last_exclusive = (first + record::RECORDS_PER_PAGE as i64).min(inner.heap.record_count);
        let mut out = Vec::new();
        let mut record_id = first;
        while record_id < last_exclusive {
            out.push(read_record_locked(&mut inner, record_id)?);
            record_id += 1;
        }
        Ok(out)
    }

    pub fn insert_record(&self, payload: &[u8]) -> EngineResult<i64> {
        self.insert_record_impl(payload, false)
    }

    pub fn insert_record_sync(&self, payload: &[u8]) -> EngineResult<i64> {
        self.insert_record_impl(payload, true)
    }

    fn insert_record_impl(&self, payload: &[u8], sync: bool) -> EngineResult<i64> {
        if payload.len() > RECORD_SIZE {
            return Err(EngineError::invalid_argument(format!(
                "payload of {} bytes exceeds RECORD_SIZE ({})",
                payload.len(),
                RECORD_SIZE
            )));
        }
        let padded = record::pad(payload);
        let mut inner = self.lock();

        let record_id = inner.heap.record_count;
        let page_id = record::page_of(record_id);
        let offset = record::offset_of(record_id);
        let count_snapshot = inner.heap.record_count;

        let page_bytes = inner.pool.fix(page_id, &inner.heap)?.to_vec();
        let in_transaction = inner.tx.in_transaction;
        if in_transaction && !inner.tx.has_before_image(page_id) {
            inner.tx.snapshot_page(page_id, page_bytes);
        }
        inner.pool.write_slot(page_id, offset, &padded)?;
        inner.pool.use_page(page_id, in_transaction)?;

        inner.heap.record_count += 1;

        if in_transaction {
            inner.journal.stage(LogEntry::Insert {
                tx_id: inner.tx.current_tx_id,
                record_id,
                after_image: padded,
                record_count_snapshot: count_snapshot,
            });
        }

        inner.pool.unfix(page_id)?;
        if sync {
            inner.pool.force(page_id, &inner.heap, in_transaction)?;
        }

        Ok(record_id)
    }

    pub fn update_record(&self, record_id: i64, new_payload: &[u8]) -> EngineResult<()> {
        if new_payload.len() > RECORD_SIZE {
            return Err(EngineError::invalid_argument(format!(
                "payload of {} bytes exceeds RECORD_SIZE ({})",
                new_payload.len(),
                RECORD_SIZE
            )));
        }
        let mut inner = self.lock();
        if record_id < 0 || record_id >= inner.heap.record_count {
            return Err(EngineError::out_of_bounds(format!(
                "record id {} outside [0, {})",
                record_id, inner.heap.record_count
            )));
        }
        if inner.tx.is_locked(record_id) {
            warn!("update of record {} rejected: already locked by this transaction", record_id);
            return Err(EngineError::RecordLocked(record_id));
        }

        let padded = record::pad(new_payload);
        let page_id = record::page_of(record_id);
        let offset = record::offset_of(record_id);

        let page_bytes = inner.pool.fix(page_id, &inner.heap)?.to_vec();
        let before_image = page_bytes[offset..offset + RECORD_SIZE].to_vec();

        let in_transaction = inner.tx.in_transaction;
        if in_transaction {
            if !inner.tx.has_before_image(page_id) {
                inner.tx.snapshot_page(page_id, page_bytes);
            }
            inner.tx.lock(record_id);
        }

        inner.pool.write_slot(page_id, offset, &padded)?;
        inner.pool.use_page(page_id, in_transaction)?;

        if in_transaction {
            inner.journal.stage(LogEntry::Update {
                tx_id: inner.tx.current_tx_id,
                record_id,
                before_image,
                after_image: padded,
            });
        }

        inner.pool.unfix(page_id)?;
        Ok(())
    }

    // ---- transaction manager -------------------------------------------

    pub fn begin(&self) -> EngineResult<i64> {
        let mut inner = self.lock();
        if inner.tx.in_transaction {
            info!("begin: implicitly committing the open transaction first");
            commit_locked(&mut inner)?;
        }
        let record_count = inner.heap.record_count;
        let tx_id = inner.tx.begin(record_count);
        inner.journal.stage(LogEntry::Begin { tx_id });
        info!("begin: started transaction {}", tx_id);
        Ok(tx_id)
    }

    pub fn commit(&self) -> EngineResult<()> {
        commit_locked(&mut self.lock())
    }

    pub fn rollback(&self) -> EngineResult<()> {
        rollback_locked(&mut self.lock())
    }

    // ---- recovery manager -------------------------------------------

    pub fn checkpoint(&self) -> EngineResult<()> {
        recovery::checkpoint(&mut self.lock())
    }

    pub fn crash(&self) {
        let mut inner = self.lock();
        recovery::crash(&mut inner);
    }

    pub fn recover(&self) -> EngineResult<()> {
        recovery::recover(&mut self.lock())
    }

    pub fn print_journal(&self) -> EngineResult<()> {
        self.lock().journal.print()
    }

    pub fn clear_journal(&self) -> EngineResult<()> {
        self.lock().journal.clear()
    }
}

fn read_record_locked(inner: &mut EngineInner, record_id: i64) -> EngineResult<Vec<u8>> {
    if record_id < 0 || record_id >= inner.heap.record_count {
        return Err(EngineError::out_of_bounds(format!(
            "record id {} outside [0, {})",
            record_id, inner.heap.record_count
        )));
    }
    let page_id = record::page_of(record_id);
    let offset = record::offset_of(record_id);

    if inner.tx.in_transaction && inner.tx.is_locked(record_id) {
        if let Some(snapshot) = inner.tx.before_image(page_id) {
            return Ok(record::unpad(&snapshot[offset..offset + RECORD_SIZE]));
        }
    }

    let bytes = inner.pool.fix(page_id, &inner.heap)?.to_vec();
    inner.pool.unfix(page_id)?;
    Ok(record::unpad(&bytes[offset..offset + RECORD_SIZE]))
}

pub(crate) fn commit_locked(inner: &mut EngineInner) -> EngineResult<()> {
    if !inner.tx.in_transaction {
        return Ok(());
    }
    let tx_id = inner.tx.current_tx_id;
    inner.journal.stage(LogEntry::Commit { tx_id });
    inner.journal.flush()?;
    inner.pool.clear_transactional_flags();
    inner.tx.end();
    info!("commit: transaction {} durable in journal", tx_id);
    Ok(())
}

pub(crate) fn rollback_locked(inner: &mut EngineInner) -> EngineResult<()> {
    if !inner.tx.in_transaction {
        return Ok(());
    }
    let tx_id = inner.tx.current_tx_id;

    inner.heap.record_count = inner.tx.tx_start_record_count;

    let snapshots: Vec<(i64, Vec<u8>)> = inner
        .tx
        .before_images_iter()
        .map(|(pid, bytes)| (*pid, bytes.clone()))
        .collect();
    for (page_id, snapshot) in snapshots {
        inner.pool.restore(page_id, &snapshot);
    }

    // Any frame still transactional here was never snapshotted (the
    // raw fix/use_page surface bypasses BIB) and must be evicted.
    inner.pool.evict_orphan_transactional_frames()?;
    inner.tx.end();

    inner.journal.stage(LogEntry::Rollback { tx_id });
    inner.journal.flush()?;
    info!("rollback: transaction {} undone", tx_id);
    Ok(())
}
