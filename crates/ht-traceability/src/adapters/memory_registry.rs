//! In-Memory Herb Registry Adapter
//!
//! Species rules and quality thresholds, keyed by species name. Seeded
//! with the standard catalog; additional species can be registered at
//! runtime.

use crate::domain::{Geofence, QualityThresholds, SpeciesRules};
use crate::ports::outbound::HerbRegistry;
use parking_lot::RwLock;
use shared_types::Species;
use std::collections::HashMap;

/// In-memory species catalog.
pub struct InMemoryHerbRegistry {
    rules: RwLock<HashMap<Species, SpeciesRules>>,
}

impl InMemoryHerbRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(HashMap::new()),
        }
    }

    /// Registry seeded with the default species catalog.
    pub fn with_default_species() -> Self {
        let registry = Self::new();
        registry.register(SpeciesRules {
            species: "Ashwagandha".to_string(),
            geofence: Some(Geofence {
                center_lat: 26.9,
                center_long: 75.8,
                radius_meters: 50_000.0,
            }),
            allowed_months: vec![1, 2, 3, 10, 11, 12],
            thresholds: QualityThresholds {
                moisture_max: 10.0,
                pesticide_ppm_max: 2.0,
                active_compound_min: Some(0.3),
            },
        });
        registry.register(SpeciesRules {
            species: "Tulsi".to_string(),
            geofence: Some(Geofence {
                center_lat: 28.6,
                center_long: 77.2,
                radius_meters: 70_000.0,
            }),
            allowed_months: vec![4, 5, 6, 7, 8, 9],
            thresholds: QualityThresholds {
                moisture_max: 12.0,
                pesticide_ppm_max: 1.5,
                active_compound_min: None,
            },
        });
        registry.register(SpeciesRules {
            species: "Amla".to_string(),
            geofence: Some(Geofence {
                center_lat: 25.4,
                center_long: 82.0,
                radius_meters: 60_000.0,
            }),
            allowed_months: vec![9, 10, 11, 12],
            thresholds: QualityThresholds {
                moisture_max: 8.0,
                pesticide_ppm_max: 1.0,
                active_compound_min: None,
            },
        });
        registry
    }

    /// Register or replace the rules for a species.
    pub fn register(&self, rules: SpeciesRules) {
        self.rules.write().insert(rules.species.clone(), rules);
    }
}

impl Default for InMemoryHerbRegistry {
    fn default() -> Self {
        Self::with_default_species()
    }
}

impl HerbRegistry for InMemoryHerbRegistry {
    fn quality_thresholds(&self, species: &str) -> Option<QualityThresholds> {
        self.rules.read().get(species).map(|r| r.thresholds.clone())
    }

    fn species_rules(&self, species: &str) -> Option<SpeciesRules> {
        self.rules.read().get(species).cloned()
    }
}
