//! Persisted form of the queue: a JSON list of records under `queue`.

use tracing::warn;

use crate::record::VerificationRecord;

#[derive(Debug, PartialEq, Eq)]
pub struct DecodedQueue {
    pub records: Vec<VerificationRecord>,
    /// The stored value was not a list; it was read as one record or dropped.
    pub degraded: bool,
}

pub fn encode_queue<'a>(records: impl IntoIterator<Item = &'a VerificationRecord>) -> Vec<u8> {
    let list: Vec<&VerificationRecord> = records.into_iter().collect();
    serde_json::to_vec(&list).unwrap_or_else(|_| b"[]".to_vec())
}

/// Parse the persisted queue.
///
/// Never fails: a lone record is accepted as a one-entry queue and anything
/// else reads as empty.
pub fn decode_queue(bytes: &[u8]) -> DecodedQueue {
    if let Ok(records) = serde_json::from_slice::<Vec<VerificationRecord>>(bytes) {
        return DecodedQueue {
            records,
            degraded: false,
        };
    }
    if let Ok(record) = serde_json::from_slice::<VerificationRecord>(bytes) {
        warn!(address = %record.address, "queue is not a list; reading it as a single record");
        return DecodedQueue {
            records: vec![record],
            degraded: true,
        };
    }
    warn!(bytes = bytes.len(), "queue is unreadable; starting empty");
    DecodedQueue {
        records: Vec::new(),
        degraded: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use starreg_types::{Timestamp, WalletAddress};

    fn record(address: &str) -> VerificationRecord {
        VerificationRecord::issue(WalletAddress::new(address), Timestamp::new(1), 300_000, "t")
    }

    #[test]
    fn list_round_trips() {
        let records = vec![record("a"), record("b")];
        let decoded = decode_queue(&encode_queue(&records));
        assert_eq!(decoded.records, records);
        assert!(!decoded.degraded);
    }

    #[test]
    fn lone_record_is_one_entry_queue() {
        let bytes = serde_json::to_vec(&record("a")).unwrap();
        let decoded = decode_queue(&bytes);
        assert_eq!(decoded.records, vec![record("a")]);
        assert!(decoded.degraded);
    }

    #[test]
    fn stored_queue_with_wire_names_decodes() {
        let bytes = br#"[
            {"address":"addr1","message":"addr1:1000:starRegistry","requestTimeStamp":1000,
             "validationWindow":300000,"signature":"sig","signatureValid":true},
            {"address":"addr2","message":"addr2:2000:starRegistry","requestTimeStamp":2000,
             "validationWindow":300000}
        ]"#;
        let decoded = decode_queue(bytes);
        assert!(!decoded.degraded);
        assert_eq!(decoded.records.len(), 2);
        assert_eq!(decoded.records[0].request_timestamp, Timestamp::new(1000));
        assert_eq!(decoded.records[0].validation_window_ms, 300_000);
        assert_eq!(decoded.records[0].signature_valid, Some(true));
        assert_eq!(decoded.records[1].signature, None);
        assert_eq!(decoded.records[1].signature_valid, None);
    }

    #[test]
    fn garbage_is_empty_queue() {
        let decoded = decode_queue(b"\xff\x00 nope");
        assert!(decoded.records.is_empty());
        assert!(decoded.degraded);
    }
}
