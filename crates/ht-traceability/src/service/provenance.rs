//! Provenance assembler: reconstruct lineage from stored records.

use super::TraceabilityService;
use crate::domain::{
    BatchProvenance, FormulationProvenance, ProvenanceBundle, QualityStatus, TraceError,
};
use shared_types::EntityRef;
use std::collections::HashSet;

impl TraceabilityService {
    /// Reconstruct the full lineage rooted at a batch or formulation.
    ///
    /// Pure read: repeated calls with no intervening writes return the
    /// identical bundle.
    pub(super) fn do_build_provenance(
        &self,
        entity: &EntityRef,
    ) -> Result<ProvenanceBundle, TraceError> {
        match entity {
            EntityRef::Batch(id) => Ok(ProvenanceBundle::Batch(self.batch_provenance(id)?)),
            EntityRef::Formulation(id) => {
                let formulation = self.store().formulation(id)?;
                // Inputs are distinct by construction; the visited set turns
                // a corrupted store into a typed error instead of a loop.
                let mut visited: HashSet<String> = HashSet::new();
                let mut inputs = Vec::with_capacity(formulation.input_batch_ids.len());
                for batch_id in &formulation.input_batch_ids {
                    if !visited.insert(batch_id.clone()) {
                        return Err(TraceError::CycleDetected {
                            id: batch_id.clone(),
                        });
                    }
                    inputs.push(self.batch_provenance(batch_id)?);
                }
                Ok(ProvenanceBundle::Formulation(FormulationProvenance {
                    formulation,
                    inputs,
                }))
            }
        }
    }

    fn batch_provenance(&self, batch_id: &str) -> Result<BatchProvenance, TraceError> {
        let batch = self.store().batch(batch_id)?;
        let collection = self.store().collection(&batch.collection_event_id)?;
        let steps = self.do_processing_chain(batch_id)?;
        let mut tests = Vec::with_capacity(batch.test_ids.len());
        for test_id in &batch.test_ids {
            tests.push(self.store().test(test_id)?);
        }
        let quality = QualityStatus::derive(&tests);
        Ok(BatchProvenance {
            batch,
            collection,
            steps,
            tests,
            quality,
        })
    }
}
