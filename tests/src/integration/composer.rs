//! # Formulation Composer
//!
//! All-or-nothing consumption, input bounds, and exactly-once guarantees
//! under concurrent contention.

#[cfg(test)]
mod tests {
    use crate::support::*;
    use ht_traceability::{BatchStatus, TraceError, TraceabilityApi};

    #[tokio::test]
    async fn test_single_input_formulation() {
        let rig = rig();
        collect_to_tested(&rig, "B-001").await;
        let formulation = rig
            .service
            .create_formulation(formulation_req("F-001", &["B-001"]))
            .await
            .unwrap();
        assert_eq!(formulation.input_batch_ids, vec!["B-001".to_string()]);
        assert_eq!(
            rig.service.batch("B-001").await.unwrap().consumed_in,
            Some("F-001".to_string())
        );
    }

    #[tokio::test]
    async fn test_input_bounds_enforced() {
        let rig = rig();
        let empty = rig
            .service
            .create_formulation(formulation_req("F-001", &[]))
            .await
            .unwrap_err();
        assert!(matches!(empty, TraceError::Validation { .. }));

        let ids: Vec<String> = (0..11).map(|i| format!("B-{i:03}")).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let over = rig
            .service
            .create_formulation(formulation_req("F-002", &refs))
            .await
            .unwrap_err();
        assert!(over.to_string().contains("1..=10"), "{over}");
    }

    #[tokio::test]
    async fn test_duplicate_inputs_rejected() {
        let rig = rig();
        collect_to_tested(&rig, "B-001").await;
        let err = rig
            .service
            .create_formulation(formulation_req("F-001", &["B-001", "B-001"]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("distinct"), "{err}");
    }

    #[tokio::test]
    async fn test_one_ineligible_input_consumes_nothing() {
        let rig = rig();
        collect_to_tested(&rig, "B-001").await;
        // B-002 never faced the quality gate.
        rig.service
            .record_collection(collection_req("B-002"))
            .await
            .unwrap();

        let err = rig
            .service
            .create_formulation(formulation_req("F-001", &["B-001", "B-002"]))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            TraceError::NotEligible {
                batch_id: "B-002".to_string(),
                status: BatchStatus::Collected,
            }
        );

        // The eligible input is untouched and still consumable.
        let eligible = rig.service.batch("B-001").await.unwrap();
        assert_eq!(eligible.status, BatchStatus::QualityTested);
        assert_eq!(eligible.consumed_in, None);
        assert!(rig
            .service
            .create_formulation(formulation_req("F-002", &["B-001"]))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_consumed_batch_names_its_formulation() {
        let rig = rig();
        collect_to_tested(&rig, "B-001").await;
        rig.service
            .create_formulation(formulation_req("F-001", &["B-001"]))
            .await
            .unwrap();

        let err = rig
            .service
            .create_formulation(formulation_req("F-002", &["B-001"]))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            TraceError::AlreadyConsumed {
                batch_id: "B-001".to_string(),
                formulation_id: "F-001".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_duplicate_formulation_id_rejected() {
        let rig = rig();
        collect_to_tested(&rig, "B-001").await;
        collect_to_tested(&rig, "B-002").await;
        rig.service
            .create_formulation(formulation_req("F-001", &["B-001"]))
            .await
            .unwrap();
        let mut second = formulation_req("F-001", &["B-002"]);
        second.idempotency_key = "form-F-001-second".to_string();
        let err = rig.service.create_formulation(second).await.unwrap_err();
        assert!(err.to_string().contains("already exists"), "{err}");
    }

    #[tokio::test]
    async fn test_reused_key_with_different_request_rejected() {
        let rig = rig();
        collect_to_tested(&rig, "B-001").await;
        collect_to_tested(&rig, "B-002").await;
        rig.service
            .create_formulation(formulation_req("F-001", &["B-001"]))
            .await
            .unwrap();

        // Same key, different body: not a replay, and nothing to return.
        let mut second = formulation_req("F-002", &["B-002"]);
        second.idempotency_key = formulation_req("F-001", &["B-001"]).idempotency_key;
        let err = rig.service.create_formulation(second).await.unwrap_err();
        assert!(err.to_string().contains("different request"), "{err}");
        assert_eq!(
            rig.service.batch("B-002").await.unwrap().consumed_in,
            None
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_with_same_id_commit_once() {
        let rig = rig();
        collect_to_tested(&rig, "B-001").await;
        collect_to_tested(&rig, "B-002").await;
        // The delayed ledger write keeps the first create in flight while
        // the second one runs its duplicate check.
        rig.ledger
            .set_write_delay(std::time::Duration::from_millis(50));

        let service_a = rig.service.clone();
        let service_b = rig.service.clone();
        let a = tokio::spawn(async move {
            let mut req = formulation_req("F-001", &["B-001"]);
            req.idempotency_key = "form-F-001-a".to_string();
            service_a.create_formulation(req).await
        });
        let b = tokio::spawn(async move {
            let mut req = formulation_req("F-001", &["B-002"]);
            req.idempotency_key = "form-F-001-b".to_string();
            service_b.create_formulation(req).await
        });
        let (a, b) = (a.await.unwrap(), b.await.unwrap());

        assert!(
            a.is_ok() != b.is_ok(),
            "exactly one must win: a={a:?} b={b:?}"
        );
        let (winner, loser_input) = if a.is_ok() {
            (a.unwrap(), "B-002")
        } else {
            (b.unwrap(), "B-001")
        };
        assert_eq!(winner.id, "F-001");
        assert_eq!(winner.input_batch_ids.len(), 1);

        // The loser's input was never consumed.
        let untouched = rig.service.batch(loser_input).await.unwrap();
        assert_eq!(untouched.status, BatchStatus::QualityTested);
        assert_eq!(untouched.consumed_in, None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_contended_batch_is_consumed_exactly_once() {
        let rig = rig();
        collect_to_tested(&rig, "B-001").await;
        collect_to_tested(&rig, "B-002").await;
        collect_to_tested(&rig, "B-003").await;

        // Two concurrent formulations both want B-002.
        let service_a = rig.service.clone();
        let service_b = rig.service.clone();
        let a = tokio::spawn(async move {
            service_a
                .create_formulation(formulation_req("F-A", &["B-001", "B-002"]))
                .await
        });
        let b = tokio::spawn(async move {
            service_b
                .create_formulation(formulation_req("F-B", &["B-002", "B-003"]))
                .await
        });
        let (a, b) = (a.await.unwrap(), b.await.unwrap());

        assert!(
            a.is_ok() != b.is_ok(),
            "exactly one must win: a={a:?} b={b:?}"
        );
        let loser = if a.is_err() { a } else { b };
        assert!(matches!(
            loser.unwrap_err(),
            TraceError::AlreadyConsumed { .. } | TraceError::NotEligible { .. }
        ));

        let contended = rig.service.batch("B-002").await.unwrap();
        assert_eq!(contended.status, BatchStatus::UsedInFormulation);
        assert!(contended.consumed_in.is_some());
    }
}
