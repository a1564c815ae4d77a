//! QR tokens: mint, resolve to the consumer view, revoke.

use super::TraceabilityService;
use crate::domain::{ConsumerView, QrToken, TraceError};
use rand::RngCore;
use sha2::{Digest, Sha256};
use shared_types::{EntityRef, LedgerRecord, RecordKind};
use tracing::info;

impl TraceabilityService {
    /// 64 hex chars of SHA-256 over fresh randomness and the current
    /// nanosecond clock. Unguessable and collision-free in practice.
    fn mint_token_string(&self) -> String {
        let mut entropy = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut entropy);
        let mut hasher = Sha256::new();
        hasher.update(entropy);
        hasher.update(self.clock().now_nanos().to_be_bytes());
        hex::encode(hasher.finalize())
    }

    /// Mint a public token for an entity, or return the live one. Minting
    /// after a revocation issues a fresh token; the revoked one stays dead.
    pub(super) async fn do_generate_token(
        &self,
        entity: EntityRef,
    ) -> Result<QrToken, TraceError> {
        match &entity {
            EntityRef::Batch(id) => {
                self.store().batch(id)?;
            }
            EntityRef::Formulation(id) => {
                self.store().formulation(id)?;
            }
        }
        if let Some(token) = self.store().live_token_for(&entity) {
            return Ok(token);
        }

        let token = self.mint_token_string();
        let minted_at = self.clock().now();
        let payload = serde_json::json!({
            "action": "mint",
            "token": token,
            "bound": entity,
            "minted_at": minted_at,
        });
        let receipt = self
            .write_with_retry(LedgerRecord {
                kind: RecordKind::QrToken,
                entity_id: entity.id().to_string(),
                payload,
                idempotency_key: format!("qr-mint-{token}"),
                fingerprint: None,
            })
            .await?;

        let record = QrToken {
            token,
            bound: entity,
            minted_at,
            revoked: false,
            receipt,
        };
        info!(
            "[ht] minted token for {} {}",
            match &record.bound {
                EntityRef::Batch(_) => "batch",
                EntityRef::Formulation(_) => "formulation",
            },
            record.bound.id()
        );
        self.store().insert_token(record.clone());
        Ok(record)
    }

    /// Resolve a token to the redacted consumer view of its lineage.
    pub(super) fn do_resolve_token(&self, token: &str) -> Result<ConsumerView, TraceError> {
        let record = self.store().token(token).ok_or(TraceError::TokenNotFound)?;
        if record.revoked {
            return Err(TraceError::TokenRevoked);
        }
        let bundle = self.do_build_provenance(&record.bound)?;
        Ok(ConsumerView::from_bundle(&bundle))
    }

    /// Revoke a token. The revocation is anchored before the store marks
    /// the token dead, so a failed ledger write leaves it resolvable.
    pub(super) async fn do_revoke_token(&self, token: &str) -> Result<(), TraceError> {
        let record = self.store().token(token).ok_or(TraceError::TokenNotFound)?;
        if record.revoked {
            return Err(TraceError::TokenRevoked);
        }
        self.write_with_retry(LedgerRecord {
            kind: RecordKind::QrToken,
            entity_id: record.bound.id().to_string(),
            payload: serde_json::json!({
                "action": "revoke",
                "token": token,
            }),
            idempotency_key: format!("qr-revoke-{token}"),
            fingerprint: None,
        })
        .await?;
        info!("[ht] revoked token for {}", record.bound.id());
        self.store().revoke_token(token)
    }
}
