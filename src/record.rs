//! Record and page sizing contract. These constants are part of the
//! on-disk format; changing them creates a different, incompatible
//! engine.

/// Raw byte length of a single record slot, padding included.
pub const RECORD_SIZE: usize = 100;

/// Byte length of a buffered page.
pub const PAGE_SIZE: usize = 4096;

/// Number of record slots that fit in one page.
pub const RECORDS_PER_PAGE: usize = PAGE_SIZE / RECORD_SIZE;

/// Bytes of a page left unused on disk (never read or written).
pub const PAGE_TAIL_SLACK: usize = PAGE_SIZE - RECORDS_PER_PAGE * RECORD_SIZE;

/// Page id containing `record_id`.
pub fn page_of(record_id: i64) -> i64 {
    record_id / RECORDS_PER_PAGE as i64
}

/// Intra-page byte offset of `record_id`.
pub fn offset_of(record_id: i64) -> usize {
    (record_id as usize % RECORDS_PER_PAGE) * RECORD_SIZE
}

/// Pad `payload` with trailing zero bytes to exactly `RECORD_SIZE`.
pub fn pad(payload: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; RECORD_SIZE];
    buf[..payload.len()].copy_from_slice(payload);
    buf
}

/// Strip the trailing zero-byte suffix a padded record was stored
/// with, returning the original payload.
pub fn unpad(record: &[u8]) -> Vec<u8> {
    let end = record.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    record[..end].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_and_offset_arithmetic() {
        assert_eq!(page_of(0), 0);
        assert_eq!(page_of(39), 0);
        assert_eq!(page_of(40), 1);
        assert_eq!(offset_of(0), 0);
        assert_eq!(offset_of(39), 39 * RECORD_SIZE);
        assert_eq!(offset_of(40), 0);
    }

    #[test]
    fn pad_and_unpad_round_trip() {
        let payload = b"hello".to_vec();
        let padded = pad(&payload);
        assert_eq!(padded.len(), RECORD_SIZE);
        assert_eq!(unpad(&padded), payload);
    }

    #[test]
    fn unpad_all_zero_is_empty() {
        let padded = vec![0u8; RECORD_SIZE];
        assert!(unpad(&padded).is_empty());
    }

    #[test]
    fn pad_full_length_payload() {
        let payload = vec![7u8; RECORD_SIZE];
        let padded = pad(&payload);
        assert_eq!(unpad(&padded), payload);
    }
}
