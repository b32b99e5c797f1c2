use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dispenser_events::Event;

use crate::record::DispenseRecord;

/// Facts published on the dispenser event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DispenseEvent {
    /// A drink was fully poured and its deductions committed.
    Dispensed(DispenseRecord),
    /// A dispense was undone after some ingredients were already deducted.
    RolledBack {
        profile_name: String,
        reason: String,
        occurred_at: DateTime<Utc>,
    },
}

impl Event for DispenseEvent {
    fn event_type(&self) -> &'static str {
        match self {
            DispenseEvent::Dispensed(_) => "dispenser.drink.dispensed",
            DispenseEvent::RolledBack { .. } => "dispenser.drink.rolled_back",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DispenseEvent::Dispensed(record) => record.timestamp(),
            DispenseEvent::RolledBack { occurred_at, .. } => *occurred_at,
        }
    }
}
