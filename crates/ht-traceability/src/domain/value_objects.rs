//! # Domain Value Objects
//!
//! Immutable value types: the batch status machine, tagged processing-step
//! and quality-test parameters, verdicts, and formulation parameters.

use super::errors::TraceError;
use serde::{Deserialize, Serialize};
use shared_types::Species;
use std::collections::BTreeMap;
use std::fmt;

/// Batch lifecycle status.
///
/// The wire names (`processed-drying`, `used_in_formulation`, ...) match the
/// persisted record format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BatchStatus {
    /// Fresh from field collection.
    #[default]
    #[serde(rename = "collected")]
    Collected,
    /// Last processing step was cleaning.
    #[serde(rename = "processed-cleaning")]
    ProcessedCleaning,
    /// Last processing step was drying.
    #[serde(rename = "processed-drying")]
    ProcessedDrying,
    /// Last processing step was grinding.
    #[serde(rename = "processed-grinding")]
    ProcessedGrinding,
    /// Last processing step was sorting.
    #[serde(rename = "processed-sorting")]
    ProcessedSorting,
    /// Last processing step was packaging.
    #[serde(rename = "processed-packaging")]
    ProcessedPackaging,
    /// Latest quality gate passed.
    #[serde(rename = "quality-tested")]
    QualityTested,
    /// A quality gate failed. Terminal.
    #[serde(rename = "quality-fail")]
    QualityFail,
    /// Consumed into a formulation. Terminal.
    #[serde(rename = "used_in_formulation")]
    UsedInFormulation,
}

/// All nine statuses, in lifecycle order.
pub const ALL_STATUSES: [BatchStatus; 9] = [
    BatchStatus::Collected,
    BatchStatus::ProcessedCleaning,
    BatchStatus::ProcessedDrying,
    BatchStatus::ProcessedGrinding,
    BatchStatus::ProcessedSorting,
    BatchStatus::ProcessedPackaging,
    BatchStatus::QualityTested,
    BatchStatus::QualityFail,
    BatchStatus::UsedInFormulation,
];

impl BatchStatus {
    /// True for the five `processed-*` statuses.
    pub fn is_processed(&self) -> bool {
        matches!(
            self,
            Self::ProcessedCleaning
                | Self::ProcessedDrying
                | Self::ProcessedGrinding
                | Self::ProcessedSorting
                | Self::ProcessedPackaging
        )
    }

    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::QualityFail | Self::UsedInFormulation)
    }

    /// The authoritative transition table.
    ///
    /// - `Collected` may enter any processing stage, or face the quality gate
    ///   directly (a field-collected batch can be lab-tested before any
    ///   processing).
    /// - A `processed-*` batch may move to any *other* processing stage or to
    ///   the quality gate outcomes. Repeating the same stage back-to-back is
    ///   not a transition.
    /// - `QualityTested` may be consumed, or demoted by a later failing test.
    /// - `QualityFail` and `UsedInFormulation` are terminal.
    pub fn can_transition_to(&self, next: BatchStatus) -> bool {
        match self {
            Self::Collected => {
                next.is_processed()
                    || matches!(next, Self::QualityTested | Self::QualityFail)
            }
            Self::ProcessedCleaning
            | Self::ProcessedDrying
            | Self::ProcessedGrinding
            | Self::ProcessedSorting
            | Self::ProcessedPackaging => {
                (next.is_processed() && next != *self)
                    || matches!(next, Self::QualityTested | Self::QualityFail)
            }
            Self::QualityTested => {
                matches!(next, Self::UsedInFormulation | Self::QualityFail)
            }
            Self::QualityFail | Self::UsedInFormulation => false,
        }
    }

    /// Every status reachable from `self` in one transition. Pure lookup,
    /// also answers "what can happen next" queries.
    pub fn valid_transitions(&self) -> Vec<BatchStatus> {
        ALL_STATUSES
            .iter()
            .copied()
            .filter(|next| self.can_transition_to(*next))
            .collect()
    }

    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Collected => "collected",
            Self::ProcessedCleaning => "processed-cleaning",
            Self::ProcessedDrying => "processed-drying",
            Self::ProcessedGrinding => "processed-grinding",
            Self::ProcessedSorting => "processed-sorting",
            Self::ProcessedPackaging => "processed-packaging",
            Self::QualityTested => "quality-tested",
            Self::QualityFail => "quality-fail",
            Self::UsedInFormulation => "used_in_formulation",
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Processing step category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepType {
    /// Remove impurities and foreign matter.
    Cleaning,
    /// Reduce moisture content for storage.
    Drying,
    /// Reduce particle size.
    Grinding,
    /// Separate by size, quality, or grade.
    Sorting,
    /// Prepare for storage or the next stage.
    Packaging,
}

impl StepType {
    /// Batch status a step of this type moves the batch into.
    pub fn resulting_status(&self) -> BatchStatus {
        match self {
            Self::Cleaning => BatchStatus::ProcessedCleaning,
            Self::Drying => BatchStatus::ProcessedDrying,
            Self::Grinding => BatchStatus::ProcessedGrinding,
            Self::Sorting => BatchStatus::ProcessedSorting,
            Self::Packaging => BatchStatus::ProcessedPackaging,
        }
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Cleaning => "cleaning",
            Self::Drying => "drying",
            Self::Grinding => "grinding",
            Self::Sorting => "sorting",
            Self::Packaging => "packaging",
        };
        f.write_str(name)
    }
}

/// Free-form auxiliary fields (equipment, operator, notes, ...).
pub type ExtraFields = BTreeMap<String, String>;

/// Tagged processing-step parameters. Each step type enforces its required
/// fields at construction; the rest ride along as free-form strings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step_type", rename_all = "lowercase")]
pub enum StepParams {
    /// Cleaning accepts only free-form fields.
    Cleaning {
        /// Optional method/duration/equipment details.
        #[serde(default)]
        fields: ExtraFields,
    },
    /// Drying requires temperature, duration, and method.
    Drying {
        /// Drying temperature in degrees Celsius.
        temperature_c: f64,
        /// Duration in hours.
        duration_hours: f64,
        /// Drying method (shade, sun, mechanical, ...).
        method: String,
        /// Optional humidity/equipment details.
        #[serde(default)]
        extra: ExtraFields,
    },
    /// Grinding requires a mesh size.
    Grinding {
        /// Target mesh size.
        mesh_size: u32,
        /// Optional temperature/equipment details.
        #[serde(default)]
        extra: ExtraFields,
    },
    /// Sorting accepts only free-form fields.
    Sorting {
        /// Optional method/criteria details.
        #[serde(default)]
        fields: ExtraFields,
    },
    /// Packaging accepts only free-form fields.
    Packaging {
        /// Optional container/seal details.
        #[serde(default)]
        fields: ExtraFields,
    },
}

impl StepParams {
    /// The step type this parameter set belongs to.
    pub fn step_type(&self) -> StepType {
        match self {
            Self::Cleaning { .. } => StepType::Cleaning,
            Self::Drying { .. } => StepType::Drying,
            Self::Grinding { .. } => StepType::Grinding,
            Self::Sorting { .. } => StepType::Sorting,
            Self::Packaging { .. } => StepType::Packaging,
        }
    }

    /// Range-check required fields. Callers see `Validation` with the field
    /// named; nothing is mutated on failure.
    pub fn validate(&self) -> Result<(), TraceError> {
        match self {
            Self::Drying {
                temperature_c,
                duration_hours,
                method,
                ..
            } => {
                if !temperature_c.is_finite() || *temperature_c <= 0.0 {
                    return Err(TraceError::validation("drying temperature_c must be > 0"));
                }
                if !duration_hours.is_finite() || *duration_hours <= 0.0 {
                    return Err(TraceError::validation("drying duration_hours must be > 0"));
                }
                if method.trim().is_empty() {
                    return Err(TraceError::validation("drying method must not be empty"));
                }
                Ok(())
            }
            Self::Grinding { mesh_size, .. } => {
                if *mesh_size == 0 {
                    return Err(TraceError::validation("grinding mesh_size must be >= 1"));
                }
                Ok(())
            }
            Self::Cleaning { .. } | Self::Sorting { .. } | Self::Packaging { .. } => Ok(()),
        }
    }
}

/// Quality test category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestType {
    /// Moisture content measurement.
    #[serde(rename = "moisturetest")]
    Moisture,
    /// Pesticide residue measurement.
    #[serde(rename = "pesticidetest")]
    Pesticide,
    /// Active compound assay (withanolides, curcumin, ...).
    #[serde(rename = "activecompound")]
    ActiveCompound,
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Moisture => "moisturetest",
            Self::Pesticide => "pesticidetest",
            Self::ActiveCompound => "activecompound",
        };
        f.write_str(name)
    }
}

/// Tagged quality-test results.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "test_type")]
pub enum TestResults {
    /// Moisture content measurement.
    #[serde(rename = "moisturetest")]
    Moisture {
        /// Measured moisture, percent by weight.
        moisture_pct: f64,
        /// Measurement method.
        method: String,
        /// Oven/ambient temperature during measurement, Celsius.
        temperature_c: f64,
    },
    /// Pesticide residue measurement.
    #[serde(rename = "pesticidetest")]
    Pesticide {
        /// Total residue in parts per million.
        pesticide_ppm: f64,
        /// Compounds screened for.
        compounds_tested: Vec<String>,
        /// Measurement method.
        method: String,
    },
    /// Active compound assay.
    #[serde(rename = "activecompound")]
    ActiveCompound {
        /// Compound assayed (withanolides, curcumin, ...).
        compound: String,
        /// Measured level, percent by weight.
        level_pct: f64,
        /// Assay method.
        method: String,
    },
}

impl TestResults {
    /// The test type these results belong to.
    pub fn test_type(&self) -> TestType {
        match self {
            Self::Moisture { .. } => TestType::Moisture,
            Self::Pesticide { .. } => TestType::Pesticide,
            Self::ActiveCompound { .. } => TestType::ActiveCompound,
        }
    }

    /// Range-check the measurements themselves, independent of thresholds.
    pub fn validate(&self) -> Result<(), TraceError> {
        match self {
            Self::Moisture {
                moisture_pct,
                method,
                ..
            } => {
                if !(0.0..=100.0).contains(moisture_pct) {
                    return Err(TraceError::validation(
                        "moisture_pct must be between 0 and 100",
                    ));
                }
                if method.trim().is_empty() {
                    return Err(TraceError::validation("moisture method must not be empty"));
                }
                Ok(())
            }
            Self::Pesticide {
                pesticide_ppm,
                compounds_tested,
                method,
            } => {
                if !pesticide_ppm.is_finite() || *pesticide_ppm < 0.0 {
                    return Err(TraceError::validation("pesticide_ppm must be >= 0"));
                }
                if compounds_tested.is_empty() {
                    return Err(TraceError::validation(
                        "compounds_tested must name at least one compound",
                    ));
                }
                if method.trim().is_empty() {
                    return Err(TraceError::validation("pesticide method must not be empty"));
                }
                Ok(())
            }
            Self::ActiveCompound {
                compound,
                level_pct,
                method,
            } => {
                if compound.trim().is_empty() {
                    return Err(TraceError::validation("compound must not be empty"));
                }
                if !level_pct.is_finite() || *level_pct < 0.0 {
                    return Err(TraceError::validation("level_pct must be >= 0"));
                }
                if method.trim().is_empty() {
                    return Err(TraceError::validation("assay method must not be empty"));
                }
                Ok(())
            }
        }
    }

    /// Evaluate these results against species thresholds.
    ///
    /// Pure: identical inputs always yield the identical outcome.
    pub fn evaluate(&self, thresholds: &QualityThresholds) -> VerdictOutcome {
        let mut reasons = Vec::new();
        match self {
            Self::Moisture { moisture_pct, .. } => {
                if *moisture_pct > thresholds.moisture_max {
                    reasons.push(format!(
                        "moisture {moisture_pct}% exceeds maximum {}%",
                        thresholds.moisture_max
                    ));
                }
            }
            Self::Pesticide { pesticide_ppm, .. } => {
                if *pesticide_ppm > thresholds.pesticide_ppm_max {
                    reasons.push(format!(
                        "pesticide {pesticide_ppm} PPM exceeds maximum {} PPM",
                        thresholds.pesticide_ppm_max
                    ));
                }
            }
            Self::ActiveCompound {
                compound,
                level_pct,
                ..
            } => {
                if let Some(min) = thresholds.active_compound_min {
                    if *level_pct < min {
                        reasons.push(format!(
                            "{compound} level {level_pct}% below minimum {min}%"
                        ));
                    }
                }
            }
        }
        if reasons.is_empty() {
            VerdictOutcome {
                verdict: Verdict::Pass,
                reasons: vec!["all parameters within acceptable limits".to_string()],
            }
        } else {
            VerdictOutcome {
                verdict: Verdict::Fail,
                reasons,
            }
        }
    }
}

/// Derived pass/fail verdict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// All measured values within the species thresholds.
    Pass,
    /// At least one threshold violated.
    Fail,
}

/// Verdict plus the human-readable reasons behind it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerdictOutcome {
    /// Derived verdict.
    pub verdict: Verdict,
    /// Threshold comparisons that produced the verdict.
    pub reasons: Vec<String>,
}

/// Species quality thresholds from the Herb Registry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QualityThresholds {
    /// Maximum allowed moisture, percent by weight.
    pub moisture_max: f64,
    /// Maximum allowed pesticide residue, parts per million.
    pub pesticide_ppm_max: f64,
    /// Minimum active compound level, percent, where the species defines one.
    pub active_compound_min: Option<f64>,
}

/// Finished product category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    /// Encapsulated powder.
    Capsules,
    /// Compressed tablets.
    Tablets,
    /// Loose powder.
    Powder,
    /// Liquid syrup.
    Syrup,
    /// Infused oil.
    Oil,
}

/// Parameters describing a manufactured formulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FormulationParams {
    /// Product category.
    pub product_type: ProductType,
    /// Dosage description, e.g. `500mg twice daily`.
    pub dosage: String,
    /// Number of units in the product batch.
    pub batch_size: u32,
    /// Optional per-herb blend ratio (species -> share).
    pub herb_ratio: Option<BTreeMap<Species, f64>>,
}

impl FormulationParams {
    /// Range-check the parameters.
    pub fn validate(&self) -> Result<(), TraceError> {
        if self.dosage.trim().is_empty() {
            return Err(TraceError::validation("dosage must not be empty"));
        }
        if self.batch_size == 0 {
            return Err(TraceError::validation("batch_size must be >= 1"));
        }
        if let Some(ratio) = &self.herb_ratio {
            if ratio.values().any(|share| !share.is_finite() || *share <= 0.0) {
                return Err(TraceError::validation("herb_ratio shares must be > 0"));
            }
        }
        Ok(())
    }
}
