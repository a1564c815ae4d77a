//! # Lifecycle Flows
//!
//! Field collection through processing, quality testing, and formulation,
//! exercised through the public API against in-memory adapters.

#[cfg(test)]
mod tests {
    use crate::support::*;
    use ht_traceability::{
        BatchStatus, StepParams, TraceError, TraceabilityApi,
    };
    use shared_types::EntityRef;

    // =========================================================================
    // COLLECTION
    // =========================================================================

    #[tokio::test]
    async fn test_collection_creates_batch_at_collected() {
        let rig = rig();
        let batch = rig
            .service
            .record_collection(collection_req("B-001"))
            .await
            .unwrap();
        assert_eq!(batch.status, BatchStatus::Collected);
        assert_eq!(batch.species, "Ashwagandha");
        assert_eq!(batch.current_owner_id, "FARMER-001");
        assert_eq!(batch.receipts.len(), 1);
        assert!(batch.step_ids.is_empty());
    }

    #[tokio::test]
    async fn test_collection_outside_geofence_rejected() {
        let rig = rig();
        let mut req = collection_req("B-001");
        // Delhi coordinates, far outside the Jaipur-area fence.
        req.lat = 28.6;
        req.long = 77.2;
        let err = rig.service.record_collection(req).await.unwrap_err();
        assert!(matches!(err, TraceError::Validation { .. }), "{err}");
        // Nothing was created.
        assert!(rig.service.batch("B-001").await.is_err());
    }

    #[tokio::test]
    async fn test_collection_out_of_season_rejected() {
        let rig = rig();
        let mut req = collection_req("B-001");
        req.timestamp = JUN_2024;
        let err = rig.service.record_collection(req).await.unwrap_err();
        assert!(err.to_string().contains("month"), "{err}");
    }

    #[tokio::test]
    async fn test_collection_unknown_species_rejected() {
        let rig = rig();
        let mut req = collection_req("B-001");
        req.species = "Moonflower".to_string();
        let err = rig.service.record_collection(req).await.unwrap_err();
        assert!(matches!(err, TraceError::NotFound { kind: "species", .. }));
    }

    #[tokio::test]
    async fn test_duplicate_batch_id_rejected() {
        let rig = rig();
        rig.service
            .record_collection(collection_req("B-001"))
            .await
            .unwrap();
        let mut again = collection_req("B-001");
        again.idempotency_key = "a-different-key".to_string();
        let err = rig.service.record_collection(again).await.unwrap_err();
        assert!(err.to_string().contains("already exists"), "{err}");
    }

    // =========================================================================
    // PROCESSING CHAIN
    // =========================================================================

    #[tokio::test]
    async fn test_steps_link_and_move_status() {
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
        assert_eq!(first.predecessor_step_id, None);

        let mut grind = drying_req("B-001", "P-2");
        grind.params = StepParams::Grinding {
            mesh_size: 80,
            extra: Default::default(),
        };
        grind.idempotency_key = "step-P-2".to_string();
        let second = rig.service.add_step(grind).await.unwrap();
        assert_eq!(second.predecessor_step_id, Some("P-1".to_string()));

        let batch = rig.service.batch("B-001").await.unwrap();
        assert_eq!(batch.status, BatchStatus::ProcessedGrinding);
        assert_eq!(batch.current_owner_id, "PROC-001");

        let chain = rig.service.processing_chain("B-001").await.unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].id, "P-1");
        assert_eq!(chain[1].id, "P-2");
    }

    #[tokio::test]
    async fn test_repeating_a_stage_is_rejected() {
        let rig = rig();
        rig.service
            .record_collection(collection_req("B-001"))
            .await
            .unwrap();
        rig.service
            .add_step(drying_req("B-001", "P-1"))
            .await
            .unwrap();
        let mut again = drying_req("B-001", "P-2");
        again.idempotency_key = "step-P-2".to_string();
        let err = rig.service.add_step(again).await.unwrap_err();
        assert!(
            matches!(
                err,
                TraceError::InvalidTransition {
                    from: BatchStatus::ProcessedDrying,
                    to: BatchStatus::ProcessedDrying,
                    ..
                }
            ),
            "{err}"
        );
    }

    #[tokio::test]
    async fn test_invalid_step_params_leave_state_untouched() {
        let rig = rig();
        rig.service
            .record_collection(collection_req("B-001"))
            .await
            .unwrap();
        let mut bad = drying_req("B-001", "P-1");
        bad.params = StepParams::Drying {
            temperature_c: -5.0,
            duration_hours: 8.0,
            method: "shade".to_string(),
            extra: Default::default(),
        };
        assert!(rig.service.add_step(bad).await.is_err());
        let batch = rig.service.batch("B-001").await.unwrap();
        assert_eq!(batch.status, BatchStatus::Collected);
        assert!(batch.step_ids.is_empty());
    }

    // =========================================================================
    // BARE TRANSITIONS
    // =========================================================================

    #[tokio::test]
    async fn test_bare_transition_applies_and_anchors() {
        let rig = rig();
        rig.service
            .record_collection(collection_req("B-001"))
            .await
            .unwrap();
        let batch = rig
            .service
            .transition("B-001", BatchStatus::ProcessedCleaning, "t-1")
            .await
            .unwrap();
        assert_eq!(batch.status, BatchStatus::ProcessedCleaning);
        assert_eq!(batch.receipts.len(), 2);
    }

    #[tokio::test]
    async fn test_illegal_transition_names_both_statuses() {
        let rig = rig();
        rig.service
            .record_collection(collection_req("B-001"))
            .await
            .unwrap();
        let err = rig
            .service
            .transition("B-001", BatchStatus::UsedInFormulation, "t-1")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            TraceError::InvalidTransition {
                batch_id: "B-001".to_string(),
                from: BatchStatus::Collected,
                to: BatchStatus::UsedInFormulation,
            }
        );
    }

    #[tokio::test]
    async fn test_valid_transitions_lookup() {
        let rig = rig();
        assert!(rig
            .service
            .valid_transitions(BatchStatus::QualityFail)
            .is_empty());
        assert_eq!(
            rig.service.valid_transitions(BatchStatus::QualityTested),
            vec![BatchStatus::QualityFail, BatchStatus::UsedInFormulation]
        );
    }

    // =========================================================================
    // END TO END
    // =========================================================================

    #[tokio::test]
    async fn test_full_path_collection_to_provenance() {
        let rig = rig();
        for id in ["B-001", "B-002"] {
            collect_to_tested(&rig, id).await;
        }
        let formulation = rig
            .service
            .create_formulation(formulation_req("F-001", &["B-001", "B-002"]))
            .await
            .unwrap();

        for id in ["B-001", "B-002"] {
            let batch = rig.service.batch(id).await.unwrap();
            assert_eq!(batch.status, BatchStatus::UsedInFormulation);
            assert_eq!(batch.consumed_in, Some("F-001".to_string()));
            assert_eq!(batch.current_owner_id, "MFG-001");
        }

        let bundle = rig
            .service
            .build_provenance(&EntityRef::Formulation(formulation.id.clone()))
            .await
            .unwrap();
        match bundle {
            ht_traceability::ProvenanceBundle::Formulation(p) => {
                assert_eq!(p.inputs.len(), 2);
                for input in &p.inputs {
                    assert_eq!(input.steps.len(), 1);
                    assert_eq!(input.tests.len(), 1);
                    assert_eq!(input.quality, ht_traceability::QualityStatus::Passed);
                }
            }
            other => panic!("expected formulation bundle, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_provenance_is_stable_across_reads() {
        let rig = rig();
        collect_to_tested(&rig, "B-001").await;
        let entity = EntityRef::Batch("B-001".to_string());
        let first = rig.service.build_provenance(&entity).await.unwrap();
        let second = rig.service.build_provenance(&entity).await.unwrap();
        assert_eq!(first, second);
    }
}
