//! In-Memory Ledger Adapter
//!
//! Implements the `LedgerAdapter` port for tests and local runs. In
//! production this would submit to the real ledger network.

use crate::domain::TraceError;
use crate::ports::outbound::LedgerAdapter;
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{LedgerReceipt, LedgerRecord, Timestamp};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// In-memory ledger with idempotency-key deduplication and an injectable
/// failure window for exercising retry paths.
pub struct InMemoryLedger {
    /// Committed records by transaction id.
    records: RwLock<HashMap<String, LedgerRecord>>,
    /// Idempotency key -> receipt of the original write.
    by_key: RwLock<HashMap<String, LedgerReceipt>>,
    /// Simulated commit clock.
    current_time: RwLock<Timestamp>,
    /// Remaining writes that will fail with `LedgerUnavailable`.
    fail_remaining: AtomicU32,
    /// Artificial latency applied to every write, for widening race windows.
    write_delay: RwLock<Duration>,
}

impl InMemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            by_key: RwLock::new(HashMap::new()),
            current_time: RwLock::new(1_700_000_000),
            fail_remaining: AtomicU32::new(0),
            write_delay: RwLock::new(Duration::ZERO),
        }
    }

    /// Delay every write by `delay`. Test hook for concurrency coverage.
    pub fn set_write_delay(&self, delay: Duration) {
        *self.write_delay.write() = delay;
    }

    /// Make the next `n` writes fail transiently. Test hook.
    pub fn fail_next(&self, n: u32) {
        self.fail_remaining.store(n, Ordering::SeqCst);
    }

    /// Set the commit clock. Test hook.
    pub fn set_time(&self, time: Timestamp) {
        *self.current_time.write() = time;
    }

    /// Number of committed records.
    pub fn record_count(&self) -> usize {
        self.records.read().len()
    }

    /// Overwrite a committed record's fingerprint. Test hook simulating
    /// post-hoc tampering; `validate_integrity` must detect this.
    pub fn tamper_fingerprint(&self, tx_id: &str, fingerprint: &str) -> bool {
        match self.records.write().get_mut(tx_id) {
            Some(record) => {
                record.fingerprint = Some(fingerprint.to_string());
                true
            }
            None => false,
        }
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerAdapter for InMemoryLedger {
    async fn write(&self, record: LedgerRecord) -> Result<LedgerReceipt, TraceError> {
        let delay = *self.write_delay.read();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            debug!("[ht] ledger write failing transiently (injected)");
            return Err(TraceError::LedgerUnavailable {
                detail: "injected transient failure".to_string(),
            });
        }

        // Exactly-once over the idempotency key: a retried write returns the
        // original receipt instead of committing a duplicate record.
        if let Some(receipt) = self.by_key.read().get(&record.idempotency_key) {
            debug!(
                "[ht] ledger replaying receipt {} for key {}",
                receipt.tx_id, record.idempotency_key
            );
            return Ok(receipt.clone());
        }

        let receipt = LedgerReceipt {
            tx_id: Uuid::new_v4().to_string(),
            timestamp: *self.current_time.read(),
        };
        info!(
            "[ht] ledger commit {:?} for {} as {}",
            record.kind, record.entity_id, receipt.tx_id
        );
        self.by_key
            .write()
            .insert(record.idempotency_key.clone(), receipt.clone());
        self.records.write().insert(receipt.tx_id.clone(), record);
        Ok(receipt)
    }

    async fn read(&self, tx_id: &str) -> Result<Option<LedgerRecord>, TraceError> {
        Ok(self.records.read().get(tx_id).cloned())
    }
}
