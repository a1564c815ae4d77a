//! # Domain Invariants
//!
//! Business rules checked before any mutation: collection geography and
//! season, formulation input bounds and eligibility.

use super::entities::{Batch, Geofence, SpeciesRules};
use super::errors::TraceError;
use super::value_objects::BatchStatus;
use chrono::{DateTime, Datelike};
use shared_types::{BatchId, Timestamp};
use std::collections::BTreeSet;

/// Formulation input bounds.
pub const MIN_INPUT_BATCHES: usize = 1;
/// Formulation input bounds.
pub const MAX_INPUT_BATCHES: usize = 10;

/// Great-circle distance between two points, in meters (haversine).
pub fn haversine_distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_M: f64 = 6_371_000.0;
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Invariant: collection must fall inside the species geofence.
pub fn check_geofence(fence: &Geofence, lat: f64, long: f64) -> Result<(), TraceError> {
    let dist = haversine_distance_meters(fence.center_lat, fence.center_long, lat, long);
    if dist > fence.radius_meters {
        return Err(TraceError::validation(format!(
            "collection outside geofence by {} meters",
            (dist - fence.radius_meters).round()
        )));
    }
    Ok(())
}

/// Invariant: collection must fall inside the species harvest season.
/// An empty `allowed_months` list means year-round harvest.
pub fn check_harvest_month(rules: &SpeciesRules, timestamp: Timestamp) -> Result<(), TraceError> {
    if rules.allowed_months.is_empty() {
        return Ok(());
    }
    let month = DateTime::from_timestamp(timestamp as i64, 0)
        .ok_or_else(|| TraceError::validation("collection timestamp out of range"))?
        .month();
    if !rules.allowed_months.contains(&month) {
        return Err(TraceError::validation(format!(
            "collection month {month} not allowed for species {}",
            rules.species
        )));
    }
    Ok(())
}

/// Invariant: a formulation consumes between 1 and 10 distinct batches.
pub fn check_input_batch_ids(ids: &[BatchId]) -> Result<(), TraceError> {
    if ids.len() < MIN_INPUT_BATCHES || ids.len() > MAX_INPUT_BATCHES {
        return Err(TraceError::validation(format!(
            "formulation requires {MIN_INPUT_BATCHES}..={MAX_INPUT_BATCHES} input batches, got {}",
            ids.len()
        )));
    }
    let distinct: BTreeSet<&BatchId> = ids.iter().collect();
    if distinct.len() != ids.len() {
        return Err(TraceError::validation(
            "formulation input batches must be distinct",
        ));
    }
    Ok(())
}

/// Invariant: an input batch must be quality-passed and never consumed.
/// Checked for every input before any batch is mutated.
pub fn check_batch_eligible(batch: &Batch) -> Result<(), TraceError> {
    if let Some(formulation_id) = &batch.consumed_in {
        return Err(TraceError::AlreadyConsumed {
            batch_id: batch.id.clone(),
            formulation_id: formulation_id.clone(),
        });
    }
    if batch.status != BatchStatus::QualityTested {
        return Err(TraceError::NotEligible {
            batch_id: batch.id.clone(),
            status: batch.status,
        });
    }
    Ok(())
}
