//! # QR Tokens
//!
//! Minting, idempotent reuse, consumer-view redaction, and revocation.

#[cfg(test)]
mod tests {
    use crate::support::*;
    use ht_traceability::{TraceError, TraceabilityApi};
    use shared_types::EntityRef;

    #[tokio::test]
    async fn test_token_requires_existing_entity() {
        let rig = rig();
        let err = rig
            .service
            .generate_token(EntityRef::Batch("B-missing".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, TraceError::NotFound { kind: "batch", .. }));
    }

    #[tokio::test]
    async fn test_token_is_opaque_and_reused() {
        let rig = rig();
        collect_to_tested(&rig, "B-001").await;
        let entity = EntityRef::Batch("B-001".to_string());

        let first = rig.service.generate_token(entity.clone()).await.unwrap();
        assert_eq!(first.token.len(), 64);
        assert!(hex::decode(&first.token).is_ok());
        assert!(!first.token.contains("B-001"));

        // A second mint for the same entity returns the live token.
        let second = rig.service.generate_token(entity).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_distinct_entities_get_distinct_tokens() {
        let rig = rig();
        collect_to_tested(&rig, "B-001").await;
        collect_to_tested(&rig, "B-002").await;
        let a = rig
            .service
            .generate_token(EntityRef::Batch("B-001".to_string()))
            .await
            .unwrap();
        let b = rig
            .service
            .generate_token(EntityRef::Batch("B-002".to_string()))
            .await
            .unwrap();
        assert_ne!(a.token, b.token);
    }

    #[tokio::test]
    async fn test_resolve_batch_token_redacts_participants() {
        let rig = rig();
        collect_to_tested(&rig, "B-001").await;
        let token = rig
            .service
            .generate_token(EntityRef::Batch("B-001".to_string()))
            .await
            .unwrap();

        let view = rig.service.resolve_token(&token.token).await.unwrap();
        assert!(view.product.is_none());
        assert_eq!(view.batches.len(), 1);
        assert_eq!(view.batches[0].species, "Ashwagandha");
        assert_eq!(view.batches[0].steps.len(), 1);
        assert_eq!(view.batches[0].tests.len(), 1);

        let json = serde_json::to_string(&view).unwrap();
        for secret in ["FARMER-001", "PROC-001", "LAB-001", "26.91", "75.81"] {
            assert!(!json.contains(secret), "{secret} leaked into consumer view");
        }
    }

    #[tokio::test]
    async fn test_resolve_formulation_token_includes_product() {
        let rig = rig();
        collect_to_tested(&rig, "B-001").await;
        collect_to_tested(&rig, "B-002").await;
        let formulation = rig
            .service
            .create_formulation(formulation_req("F-001", &["B-001", "B-002"]))
            .await
            .unwrap();
        let token = rig
            .service
            .generate_token(EntityRef::Formulation(formulation.id))
            .await
            .unwrap();

        let view = rig.service.resolve_token(&token.token).await.unwrap();
        let product = view
            .product
            .as_ref()
            .expect("formulation root carries a product");
        assert_eq!(product.formulation_id, "F-001");
        assert_eq!(view.batches.len(), 2);
        assert!(!serde_json::to_string(&view).unwrap().contains("MFG-001"));
    }

    #[tokio::test]
    async fn test_unknown_token_does_not_resolve() {
        let rig = rig();
        assert_eq!(
            rig.service.resolve_token("not-a-token").await.unwrap_err(),
            TraceError::TokenNotFound
        );
    }

    #[tokio::test]
    async fn test_revocation_and_reissue() {
        let rig = rig();
        collect_to_tested(&rig, "B-001").await;
        let entity = EntityRef::Batch("B-001".to_string());
        let original = rig.service.generate_token(entity.clone()).await.unwrap();

        rig.service.revoke_token(&original.token).await.unwrap();
        assert_eq!(
            rig.service.resolve_token(&original.token).await.unwrap_err(),
            TraceError::TokenRevoked
        );
        assert_eq!(
            rig.service.revoke_token(&original.token).await.unwrap_err(),
            TraceError::TokenRevoked
        );

        // A fresh mint issues a new token; the old one stays dead.
        let reissued = rig.service.generate_token(entity).await.unwrap();
        assert_ne!(reissued.token, original.token);
        assert!(rig.service.resolve_token(&reissued.token).await.is_ok());
        assert_eq!(
            rig.service.resolve_token(&original.token).await.unwrap_err(),
            TraceError::TokenRevoked
        );
    }
}
