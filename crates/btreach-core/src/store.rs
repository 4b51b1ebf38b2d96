//! In-memory cache of the latest probe result per device.
//!
//! The store is split into a cloneable read handle ([`DeviceStore`]) and a
//! single write handle ([`StoreWriter`]). Only the scanner holds the writer, so
//! two writes for the same address can never race.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::address::MacAddress;
use crate::probe::ProbeOutcome;

/// The last observation for one device. Always replaced as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceRecord {
    /// Device the observation belongs to.
    pub address: MacAddress,

    /// What the probe reported.
    pub outcome: ProbeOutcome,

    /// When the probe completed.
    pub observed_at: DateTime<Utc>,
}

type Records = Arc<RwLock<HashMap<MacAddress, DeviceRecord>>>;

/// Read handle to the device cache.
#[derive(Debug, Clone)]
pub struct DeviceStore {
    records: Records,
}

/// The only handle that can modify the device cache.
#[derive(Debug)]
pub struct StoreWriter {
    records: Records,
}

impl DeviceStore {
    /// Create an empty store together with its single writer.
    #[must_use]
    pub fn new_with_writer() -> (Self, StoreWriter) {
        let records = Records::default();
        (
            Self {
                records: Arc::clone(&records),
            },
            StoreWriter { records },
        )
    }

    /// Latest record for `address`, or `None` if it has never been probed.
    pub async fn get(&self, address: &MacAddress) -> Option<DeviceRecord> {
        self.records.read().await.get(address).copied()
    }

    /// Every record currently held, ordered by address.
    pub async fn snapshot(&self) -> Vec<DeviceRecord> {
        let mut records: Vec<DeviceRecord> = self.records.read().await.values().copied().collect();
        records.sort_by_key(|record| record.address);
        records
    }

    /// Number of devices with at least one completed probe.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

impl StoreWriter {
    /// Record `outcome` for `address`, stamped with the current time.
    ///
    /// The stamp never goes backwards for an address, even if the wall clock
    /// does.
    pub async fn put(&self, address: MacAddress, outcome: ProbeOutcome) -> DeviceRecord {
        let mut records = self.records.write().await;
        let now = Utc::now();
        let observed_at = records
            .get(&address)
            .map_or(now, |previous| previous.observed_at.max(now));

        let record = DeviceRecord {
            address,
            outcome,
            observed_at,
        };
        records.insert(address, record);
        record
    }

    /// Store a pre-stamped record.
    ///
    /// Returns `false` and keeps the existing record if `record` is older than
    /// what is already stored.
    pub async fn put_record(&self, record: DeviceRecord) -> bool {
        let mut records = self.records.write().await;
        if let Some(previous) = records.get(&record.address) {
            if previous.observed_at > record.observed_at {
                return false;
            }
        }
        records.insert(record.address, record);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn addr(s: &str) -> MacAddress {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_get_unprobed_is_none() {
        let (store, _writer) = DeviceStore::new_with_writer();
        assert!(store.get(&addr("AA:BB:CC:DD:EE:FF")).await.is_none());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let (store, writer) = DeviceStore::new_with_writer();
        let address = addr("AA:BB:CC:DD:EE:FF");

        let before = Utc::now();
        writer.put(address, ProbeOutcome::Reachable).await;

        let record = store.get(&address).await.unwrap();
        assert_eq!(record.address, address);
        assert_eq!(record.outcome, ProbeOutcome::Reachable);
        assert!(record.observed_at >= before);
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let (store, writer) = DeviceStore::new_with_writer();
        let address = addr("AA:BB:CC:DD:EE:FF");

        let first = writer.put(address, ProbeOutcome::Reachable).await;
        let second = writer
            .put(address, ProbeOutcome::Unreachable { code: 1 })
            .await;

        let record = store.get(&address).await.unwrap();
        assert_eq!(record.outcome, ProbeOutcome::Unreachable { code: 1 });
        assert!(second.observed_at >= first.observed_at);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_put_never_moves_timestamp_backwards() {
        let (store, writer) = DeviceStore::new_with_writer();
        let address = addr("AA:BB:CC:DD:EE:FF");
        let future = Utc::now() + TimeDelta::hours(1);

        assert!(
            writer
                .put_record(DeviceRecord {
                    address,
                    outcome: ProbeOutcome::Reachable,
                    observed_at: future,
                })
                .await
        );

        let record = writer
            .put(address, ProbeOutcome::Unreachable { code: 1 })
            .await;
        assert_eq!(record.observed_at, future);
        assert_eq!(store.get(&address).await.unwrap(), record);
    }

    #[tokio::test]
    async fn test_put_record_rejects_older_observation() {
        let (store, writer) = DeviceStore::new_with_writer();
        let address = addr("AA:BB:CC:DD:EE:FF");
        let now = Utc::now();

        assert!(
            writer
                .put_record(DeviceRecord {
                    address,
                    outcome: ProbeOutcome::Reachable,
                    observed_at: now,
                })
                .await
        );
        assert!(
            !writer
                .put_record(DeviceRecord {
                    address,
                    outcome: ProbeOutcome::Unreachable { code: 1 },
                    observed_at: now - TimeDelta::seconds(5),
                })
                .await
        );

        let record = store.get(&address).await.unwrap();
        assert_eq!(record.outcome, ProbeOutcome::Reachable);
        assert_eq!(record.observed_at, now);
    }

    #[tokio::test]
    async fn test_snapshot_is_sorted() {
        let (store, writer) = DeviceStore::new_with_writer();
        writer
            .put(addr("22:00:00:00:00:00"), ProbeOutcome::Reachable)
            .await;
        writer
            .put(addr("11:00:00:00:00:00"), ProbeOutcome::Reachable)
            .await;

        let addresses: Vec<String> = store
            .snapshot()
            .await
            .iter()
            .map(|r| r.address.to_string())
            .collect();
        assert_eq!(addresses, vec!["11:00:00:00:00:00", "22:00:00:00:00:00"]);
    }

    /// Readers racing a writer only ever see whole records: the outcome code
    /// and the timestamp are written together, so they must always agree.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_readers_see_whole_records() {
        const WRITES: i32 = 2_000;

        let (store, writer) = DeviceStore::new_with_writer();
        let address = addr("AA:BB:CC:DD:EE:FF");
        let base = Utc::now();

        let mut readers = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            readers.push(tokio::spawn(async move {
                let mut seen = 0u32;
                loop {
                    if let Some(record) = store.get(&address).await {
                        let code = record.outcome.diagnostic_code().unwrap();
                        assert_eq!(record.observed_at, base + TimeDelta::milliseconds(code.into()));
                        seen += 1;
                        if code == WRITES {
                            return seen;
                        }
                    }
                    tokio::task::yield_now().await;
                }
            }));
        }

        for code in 1..=WRITES {
            let accepted = writer
                .put_record(DeviceRecord {
                    address,
                    outcome: ProbeOutcome::Unreachable { code },
                    observed_at: base + TimeDelta::milliseconds(code.into()),
                })
                .await;
            assert!(accepted);
        }

        for reader in readers {
            assert!(reader.await.unwrap() > 0);
        }
    }
}
