use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;

use dispenser_inventory::{IngredientRegistry, RegistryError};

use crate::record::DispenseRecord;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TelemetryError {
    #[error("telemetry log lock poisoned")]
    Poisoned,

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Append-only dispense history.
///
/// Records are stored in commit order and handed out as clones; nothing in
/// the log is ever edited or removed.
#[derive(Debug)]
pub struct TelemetryLog {
    registry: Arc<IngredientRegistry>,
    records: RwLock<Vec<DispenseRecord>>,
}

impl TelemetryLog {
    pub fn new(registry: Arc<IngredientRegistry>) -> Self {
        Self {
            registry,
            records: RwLock::new(Vec::new()),
        }
    }

    pub fn record(&self, record: DispenseRecord) -> Result<(), TelemetryError> {
        let mut records = self.records.write().map_err(|_| TelemetryError::Poisoned)?;
        info!(
            dispense_id = %record.id_typed(),
            profile = record.profile_name(),
            volume_ml = record.requested_volume_ml(),
            pours = record.per_ingredient_log().len(),
            "dispense recorded"
        );
        records.push(record);
        Ok(())
    }

    pub fn all(&self) -> Result<Vec<DispenseRecord>, TelemetryError> {
        let records = self.records.read().map_err(|_| TelemetryError::Poisoned)?;
        Ok(records.clone())
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn by_profile(&self, profile_name: &str) -> Result<Vec<DispenseRecord>, TelemetryError> {
        self.filtered(|r| r.profile_name() == profile_name)
    }

    /// Records with `from <= timestamp < to`.
    pub fn in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<DispenseRecord>, TelemetryError> {
        self.filtered(|r| r.timestamp() >= from && r.timestamp() < to)
    }

    /// Millilitres poured per ingredient across every recorded dispense.
    pub fn dispensed_by_ingredient(&self) -> Result<BTreeMap<String, f64>, TelemetryError> {
        let records = self.records.read().map_err(|_| TelemetryError::Poisoned)?;
        let mut totals = BTreeMap::new();
        for pour in records.iter().flat_map(|r| r.per_ingredient_log()) {
            *totals.entry(pour.ingredient_name.clone()).or_insert(0.0) += pour.volume_ml;
        }
        Ok(totals)
    }

    pub fn total_dispensed_ml(&self) -> Result<f64, TelemetryError> {
        let records = self.records.read().map_err(|_| TelemetryError::Poisoned)?;
        Ok(records.iter().map(DispenseRecord::dispensed_volume_ml).sum())
    }

    /// Live levels, straight from the registry.
    pub fn current_levels(&self) -> Result<BTreeMap<String, f64>, TelemetryError> {
        Ok(self.registry.levels_snapshot()?)
    }

    fn filtered(
        &self,
        keep: impl Fn(&DispenseRecord) -> bool,
    ) -> Result<Vec<DispenseRecord>, TelemetryError> {
        let records = self.records.read().map_err(|_| TelemetryError::Poisoned)?;
        Ok(records.iter().filter(|r| keep(r)).cloned().collect())
    }
}
