//! Pinned buffer pool: fix/unfix/use/force over in-memory page
//! frames, with dirty and transactional tracking.
//!
//! There is no eviction policy under normal operation: frames remain
//! resident for the life of the engine. The one exception is rollback,
//! which restores before-image-snapshotted frames in place and evicts
//! any frame still marked transactional that was never snapshotted —
//! see `Engine::rollback` and `evict_orphan_transactional_frames`.

use std::collections::HashMap;

use log::debug;

use crate::error::{EngineError, EngineResult};
use crate::heap_file::HeapFile;

pub struct Frame {
    pub bytes: Vec<u8>,
    pub pin_count: u32,
    pub dirty: bool,
    pub transactional: bool,
}

impl Frame {
    fn fresh(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            pin_count: 0,
            dirty: false,
            transactional: false,
        }
    }
}

#[derive(Default)]
pub struct BufferPool {
    frames: HashMap<i64, Frame>,
}

impl BufferPool {
    pub fn new() -> Self {
        Self {
            frames: HashMap::new(),
        }
    }

    pub fn frame(&self, page_id: i64) -> Option<&Frame> {
        self.frames.get(&page_id)
    }

    /// Pin `page_id`, reading it from disk into a fresh frame on
    /// first touch. Returns the page bytes.
    pub fn fix(&mut self, page_id: i64, heap: &HeapFile) -> EngineResult<&[u8]> {
        if page_id < 0 {
            return Err(EngineError::invalid_argument(format!(
                "page id must be non-negative, got {}",
                page_id
            )));
        }

        if !self.frames.contains_key(&page_id) {
            let bytes = heap.read_page(page_id)?;
            debug!("fix: installing fresh frame for page {}", page_id);
            self.frames.insert(page_id, Frame::fresh(bytes));
        }

        let frame = self.frames.get_mut(&page_id).unwrap();
        frame.pin_count += 1;
        Ok(&frame.bytes)
    }

    pub fn unfix(&mut self, page_id: i64) -> EngineResult<()> {
        let frame = self.frames.get_mut(&page_id).ok_or_else(|| {
            EngineError::illegal_state(format!("unfix of non-resident page {}", page_id))
        })?;
        if frame.pin_count == 0 {
            return Err(EngineError::illegal_state(format!(
                "unfix of page {} with pin_count already 0",
                page_id
            )));
        }
        frame.pin_count -= 1;
        Ok(())
    }

    /// Mark `page_id` dirty, and transactional if `in_transaction`.
    pub fn use_page(&mut self, page_id: i64, in_transaction: bool) -> EngineResult<()> {
        let frame = self.frames.get_mut(&page_id).ok_or_else(|| {
            EngineError::illegal_state(format!("use of non-resident page {}", page_id))
        })?;
        frame.dirty = true;
        if in_transaction {
            frame.transactional = true;
        }
        Ok(())
    }

    pub fn write_slot(&mut self, page_id: i64, offset: usize, record: &[u8]) -> EngineResult<()> {
        let frame = self.frames.get_mut(&page_id).ok_or_else(|| {
            EngineError::illegal_state(format!("write to non-resident page {}", page_id))
        })?;
        frame.bytes[offset..offset + record.len()].copy_from_slice(record);
        Ok(())
    }

    /// Conditionally write `page_id` back to disk. No-op if the frame
    /// is absent, not dirty, or is still transactional while a
    /// transaction is open (commit clears `transactional` first).
    pub fn force(&mut self, page_id: i64, heap: &HeapFile, in_transaction: bool) -> EngineResult<()> {
        let should_write = match self.frames.get(&page_id) {
            None => false,
            Some(frame) => frame.dirty && !(frame.transactional && in_transaction),
        };
        if !should_write {
            return Ok(());
        }
        let frame = self.frames.get_mut(&page_id).unwrap();
        heap.write_page_bounded(page_id, &frame.bytes)?;
        frame.dirty = false;
        frame.transactional = false;
        debug!("force: flushed page {} to disk", page_id);
        Ok(())
    }

    pub fn clear_transactional_flags(&mut self) {
        for frame in self.frames.values_mut() {
            frame.transactional = false;
        }
    }

    /// Remove every frame still marked transactional: pages touched
    /// via the raw `fix`/`use_page` surface during an open transaction
    /// without ever going through a before-image snapshot. Fails hard
    /// if such a frame is still pinned — that is a leaked `fix`.
    pub fn evict_orphan_transactional_frames(&mut self) -> EngineResult<()> {
        let orphans: Vec<i64> = self
            .frames
            .iter()
            .filter(|(_, f)| f.transactional)
            .map(|(pid, _)| *pid)
            .collect();
        for page_id in &orphans {
            let frame = self.frames.get(page_id).unwrap();
            if frame.pin_count > 0 {
                return Err(EngineError::illegal_state(format!(
                    "rollback found orphan transactional page {} still pinned",
                    page_id
                )));
            }
        }
        self.frames.retain(|_, f| !f.transactional);
        Ok(())
    }

    pub fn restore(&mut self, page_id: i64, snapshot: &[u8]) {
        if let Some(frame) = self.frames.get_mut(&page_id) {
            frame.bytes.copy_from_slice(snapshot);
            frame.dirty = false;
            frame.transactional = false;
        }
    }

    pub fn dirty_page_ids(&self) -> Vec<i64> {
        self.frames
            .iter()
            .filter(|(_, f)| f.dirty)
            .map(|(pid, _)| *pid)
            .collect()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}
