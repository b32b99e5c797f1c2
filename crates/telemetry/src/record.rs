use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dispenser_core::{DispenseId, Entity, ValueObject};

/// One ingredient's share of a dispense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientPour {
    pub ingredient_name: String,
    pub volume_ml: f64,
    pub time_taken_s: f64,
}

impl ValueObject for IngredientPour {}

/// Immutable record of a committed dispense.
///
/// Built once, after every ingredient has been poured and deducted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispenseRecord {
    id: DispenseId,
    profile_name: String,
    requested_volume_ml: f64,
    timestamp: DateTime<Utc>,
    per_ingredient_log: Vec<IngredientPour>,
}

impl DispenseRecord {
    pub fn new(
        id: DispenseId,
        profile_name: impl Into<String>,
        requested_volume_ml: f64,
        timestamp: DateTime<Utc>,
        per_ingredient_log: Vec<IngredientPour>,
    ) -> Self {
        Self {
            id,
            profile_name: profile_name.into(),
            requested_volume_ml,
            timestamp,
            per_ingredient_log,
        }
    }

    pub fn id_typed(&self) -> DispenseId {
        self.id
    }

    pub fn profile_name(&self) -> &str {
        &self.profile_name
    }

    pub fn requested_volume_ml(&self) -> f64 {
        self.requested_volume_ml
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn per_ingredient_log(&self) -> &[IngredientPour] {
        &self.per_ingredient_log
    }

    /// Sum of poured volumes (equals the requested volume up to rounding).
    pub fn dispensed_volume_ml(&self) -> f64 {
        self.per_ingredient_log.iter().map(|p| p.volume_ml).sum()
    }

    /// Wall time the pour sequence took.
    pub fn total_time_s(&self) -> f64 {
        self.per_ingredient_log.iter().map(|p| p.time_taken_s).sum()
    }
}

impl Entity for DispenseRecord {
    type Id = DispenseId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
