//! # Ledger Resilience
//!
//! Transient ledger failures, the bounded retry loop, and idempotency-key
//! replay across every mutating operation.

#[cfg(test)]
mod tests {
    use crate::support::*;
    use ht_traceability::{TraceError, TraceabilityApi};

    #[tokio::test]
    async fn test_transient_failures_are_retried_internally() {
        let rig = rig();
        rig.ledger.fail_next(2);
        let batch = rig
            .service
            .record_collection(collection_req("B-001"))
            .await
            .unwrap();
        assert_eq!(batch.id, "B-001");
        assert_eq!(rig.ledger.record_count(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_leave_no_trace() {
        let rig = rig();
        rig.ledger.fail_next(3);
        let err = rig
            .service
            .record_collection(collection_req("B-001"))
            .await
            .unwrap_err();
        assert_eq!(err, TraceError::LedgerWriteFailed { attempts: 3 });
        assert!(rig.service.batch("B-001").await.is_err());
        assert_eq!(rig.ledger.record_count(), 0);

        // The ledger recovered; the same request now goes through.
        let batch = rig
            .service
            .record_collection(collection_req("B-001"))
            .await
            .unwrap();
        assert_eq!(batch.id, "B-001");
    }

    #[tokio::test]
    async fn test_replayed_collection_returns_original_batch() {
        let rig = rig();
        let first = rig
            .service
            .record_collection(collection_req("B-001"))
            .await
            .unwrap();
        let second = rig
            .service
            .record_collection(collection_req("B-001"))
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(rig.ledger.record_count(), 1);
    }

    #[tokio::test]
    async fn test_replay_must_match_original_request() {
        let rig = rig();
        rig.service
            .record_collection(collection_req("B-001"))
            .await
            .unwrap();

        // Same key, edited quantity: the original batch must not be handed
        // back as if this request had been applied.
        let mut edited = collection_req("B-001");
        edited.quantity_kg += 1.0;
        let err = rig.service.record_collection(edited).await.unwrap_err();
        assert!(err.to_string().contains("different request"), "{err}");
        assert_eq!(rig.ledger.record_count(), 1);
    }

    #[tokio::test]
    async fn test_replayed_step_does_not_duplicate() {
        let rig = rig();
        rig.service
            .record_collection(collection_req("B-001"))
            .await
            .unwrap();
        let first = rig
            .service
            .add_step(drying_req("B-001", "P-1"))
            .await
            .unwrap();
        let second = rig
            .service
            .add_step(drying_req("B-001", "P-1"))
            .await
            .unwrap();
        assert_eq!(first, second);
        let batch = rig.service.batch("B-001").await.unwrap();
        assert_eq!(batch.step_ids, vec!["P-1".to_string()]);
    }

    #[tokio::test]
    async fn test_replayed_formulation_consumes_once() {
        let rig = rig();
        collect_to_tested(&rig, "B-001").await;
        let first = rig
            .service
            .create_formulation(formulation_req("F-001", &["B-001"]))
            .await
            .unwrap();
        let second = rig
            .service
            .create_formulation(formulation_req("F-001", &["B-001"]))
            .await
            .unwrap();
        assert_eq!(first, second);

        // The batch saw exactly one consumption.
        let batch = rig.service.batch("B-001").await.unwrap();
        assert_eq!(batch.consumed_in, Some("F-001".to_string()));
    }

    #[tokio::test]
    async fn test_replayed_transition_is_applied_once() {
        let rig = rig();
        rig.service
            .record_collection(collection_req("B-001"))
            .await
            .unwrap();
        let first = rig
            .service
            .transition("B-001", ht_traceability::BatchStatus::ProcessedSorting, "t-1")
            .await
            .unwrap();
        let second = rig
            .service
            .transition("B-001", ht_traceability::BatchStatus::ProcessedSorting, "t-1")
            .await
            .unwrap();
        assert_eq!(first, second);
        // A repeat with a fresh key is a real (and illegal) repeat move.
        assert!(rig
            .service
            .transition("B-001", ht_traceability::BatchStatus::ProcessedSorting, "t-2")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_failed_step_write_rolls_back_nothing() {
        let rig = rig();
        rig.service
            .record_collection(collection_req("B-001"))
            .await
            .unwrap();
        rig.ledger.fail_next(3);
        assert!(rig
            .service
            .add_step(drying_req("B-001", "P-1"))
            .await
            .is_err());

        let batch = rig.service.batch("B-001").await.unwrap();
        assert_eq!(batch.status, ht_traceability::BatchStatus::Collected);
        assert!(batch.step_ids.is_empty());
        assert!(rig.service.processing_chain("B-001").await.unwrap().is_empty());
    }
}
