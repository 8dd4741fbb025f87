//! Before-image store, lock table, and transaction state machine.
//!
//! This module holds the data the transaction manager needs; the
//! state transitions themselves (`begin`/`commit`/`rollback`) live on
//! `Engine`, since they coordinate the buffer pool and journal too.

use std::collections::{HashMap, HashSet};

pub type TxId = i64;

pub struct TransactionState {
    pub in_transaction: bool,
    pub current_tx_id: TxId,
    next_tx_id: TxId,
    pub tx_start_record_count: i64,

    /// Per-transaction snapshot of pages as they were before any
    /// record on them was modified under the open transaction.
    before_images: HashMap<i64, Vec<u8>>,

    /// Record ids locked by the currently open transaction.
    locks: HashSet<i64>,
}

impl TransactionState {
    pub fn new() -> Self {
        Self {
            in_transaction: false,
            current_tx_id: 0,
            next_tx_id: 1,
            tx_start_record_count: 0,
            before_images: HashMap::new(),
            locks: HashSet::new(),
        }
    }

    pub fn begin(&mut self, record_count: i64) -> TxId {
        let tx_id = self.next_tx_id;
        self.next_tx_id += 1;
        self.in_transaction = true;
        self.current_tx_id = tx_id;
        self.tx_start_record_count = record_count;
        tx_id
    }

    pub fn end(&mut self) {
        self.in_transaction = false;
        self.before_images.clear();
        self.locks.clear();
    }

    pub fn is_locked(&self, record_id: i64) -> bool {
        self.locks.contains(&record_id)
    }

    pub fn lock(&mut self, record_id: i64) {
        self.locks.insert(record_id);
    }

    pub fn has_before_image(&self, page_id: i64) -> bool {
        self.before_images.contains_key(&page_id)
    }

    pub fn before_image(&self, page_id: i64) -> Option<&[u8]> {
        self.before_images.get(&page_id).map(|v| v.as_slice())
    }

    pub fn snapshot_page(&mut self, page_id: i64, bytes: Vec<u8>) {
        self.before_images.entry(page_id).or_insert(bytes);
    }

    pub fn before_images_iter(&self) -> impl Iterator<Item = (&i64, &Vec<u8>)> {
        self.before_images.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_assigns_monotonic_ids() {
        let mut tx = TransactionState::new();
        assert_eq!(tx.begin(0), 1);
        tx.end();
        assert_eq!(tx.begin(0), 2);
    }

    #[test]
    fn snapshot_page_is_first_write_wins() {
        let mut tx = TransactionState::new();
        tx.snapshot_page(1, vec![1, 2, 3]);
        tx.snapshot_page(1, vec![9, 9, 9]);
        assert_eq!(tx.before_image(1), Some([1u8, 2, 3].as_slice()));
    }

    #[test]
    fn lock_and_is_locked() {
        let mut tx = TransactionState::new();
        assert!(!tx.is_locked(5));
        tx.lock(5);
        assert!(tx.is_locked(5));
    }

    #[test]
    fn end_clears_locks_and_images() {
        let mut tx = TransactionState::new();
        tx.begin(0);
        tx.lock(1);
        tx.snapshot_page(0, vec![0u8; 4]);
        tx.end();
        assert!(!tx.is_locked(1));
        assert!(!tx.has_before_image(0));
        assert!(!tx.in_transaction);
    }
}
