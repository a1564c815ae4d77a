//! # Batch Event Log
//!
//! The underlying history of a batch is an append-only event sequence;
//! "current status" is a projection rebuilt by folding the events in order.
//! Services append events only after a ledger receipt is in hand, so a
//! reader never observes a half-applied mutation.

use super::entities::{Batch, CollectionEvent};
use super::value_objects::{BatchStatus, Verdict};
use serde::{Deserialize, Serialize};
use shared_types::{FormulationId, LedgerReceipt, ParticipantId, StepId, TestId, Timestamp};

/// One entry in a batch's append-only history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum BatchEvent {
    /// The batch came into existence from a field collection. Always first.
    Collected {
        /// The full collection record.
        event: CollectionEvent,
    },
    /// The lifecycle status changed.
    StatusChanged {
        /// Status before.
        from: BatchStatus,
        /// Status after.
        to: BatchStatus,
        /// When the change was committed.
        at: Timestamp,
        /// Ledger receipt for the mutation that carried this change.
        receipt: LedgerReceipt,
    },
    /// A processing step was appended to the chain.
    StepLinked {
        /// The new step.
        step_id: StepId,
        /// Facility taking custody.
        facility_id: ParticipantId,
        /// When the step was recorded.
        at: Timestamp,
    },
    /// A quality test was recorded.
    TestRecorded {
        /// The new test.
        test_id: TestId,
        /// Its derived verdict.
        verdict: Verdict,
        /// When the test was recorded.
        at: Timestamp,
    },
    /// The batch was consumed into a formulation.
    Consumed {
        /// The consuming formulation.
        formulation_id: FormulationId,
        /// Manufacturer taking custody.
        manufacturer_id: ParticipantId,
        /// When consumption was committed.
        at: Timestamp,
    },
}

impl Batch {
    /// Fold an event log into the current projection.
    ///
    /// Returns `None` when the log is empty or does not begin with
    /// `Collected`; such a log cannot describe a reachable batch.
    pub fn replay(events: &[BatchEvent]) -> Option<Batch> {
        let mut iter = events.iter();
        let mut batch = match iter.next()? {
            BatchEvent::Collected { event } => Batch {
                id: event.batch_id.clone(),
                species: event.species.clone(),
                quantity_kg: event.quantity_kg,
                collector_id: event.collector_id.clone(),
                current_owner_id: event.collector_id.clone(),
                status: BatchStatus::Collected,
                collection_event_id: event.id.clone(),
                step_ids: Vec::new(),
                test_ids: Vec::new(),
                receipts: vec![event.receipt.clone()],
                consumed_in: None,
            },
            _ => return None,
        };

        for event in iter {
            match event {
                BatchEvent::Collected { .. } => return None, // only ever first
                BatchEvent::StatusChanged { to, receipt, .. } => {
                    batch.status = *to;
                    batch.receipts.push(receipt.clone());
                }
                BatchEvent::StepLinked {
                    step_id,
                    facility_id,
                    ..
                } => {
                    batch.step_ids.push(step_id.clone());
                    batch.current_owner_id = facility_id.clone();
                }
                BatchEvent::TestRecorded { test_id, .. } => {
                    batch.test_ids.push(test_id.clone());
                }
                BatchEvent::Consumed {
                    formulation_id,
                    manufacturer_id,
                    ..
                } => {
                    batch.consumed_in = Some(formulation_id.clone());
                    batch.current_owner_id = manufacturer_id.clone();
                }
            }
        }
        Some(batch)
    }
}
