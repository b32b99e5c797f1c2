use thiserror::Error;

use dispenser_core::DomainError;
use dispenser_inventory::RegistryError;
use dispenser_profiles::ProfileError;
use dispenser_telemetry::TelemetryError;

use crate::state::RequestState;

/// Why a dispense did not commit.
///
/// Whatever the variant, inventory is left exactly as it was before the request.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DispenseError {
    #[error("profile not found: {0}")]
    ProfileNotFound(String),

    #[error("invalid volume: {0}ml")]
    InvalidVolume(f64),

    #[error("insufficient {name}: required {required}ml, available {available}ml")]
    InsufficientIngredient {
        name: String,
        required: f64,
        available: f64,
    },

    /// Stock vanished between pre-flight and commit; this request's deductions were reversed.
    #[error("{name} was depleted by a concurrent request (required {required}ml, available {available}ml)")]
    ConcurrentDepletion {
        name: String,
        required: f64,
        available: f64,
    },

    #[error("dispense cancelled (rolled back: {rolled_back})")]
    Cancelled { rolled_back: bool },

    #[error(transparent)]
    Registry(RegistryError),

    #[error(transparent)]
    Profile(ProfileError),

    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl DispenseError {
    /// Stock-related failures may succeed later (e.g. after a refill).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DispenseError::InsufficientIngredient { .. } | DispenseError::ConcurrentDepletion { .. }
        )
    }
}

impl From<ProfileError> for DispenseError {
    fn from(value: ProfileError) -> Self {
        match value {
            ProfileError::NotFound(name) => DispenseError::ProfileNotFound(name),
            other => DispenseError::Profile(other),
        }
    }
}

impl From<RegistryError> for DispenseError {
    fn from(value: RegistryError) -> Self {
        match value {
            RegistryError::InsufficientStock {
                name,
                required,
                available,
            } => DispenseError::InsufficientIngredient {
                name,
                required,
                available,
            },
            other => DispenseError::Registry(other),
        }
    }
}

/// Terminal state a failed request ends in, given where it failed.
pub(crate) fn failure_state(error: &DispenseError, reached: RequestState) -> RequestState {
    match (error, reached) {
        (DispenseError::Cancelled { .. }, RequestState::Dispensing) => RequestState::RolledBack,
        (DispenseError::Cancelled { .. }, _) => RequestState::Cancelled,
        (_, RequestState::Validating) => RequestState::Rejected,
        (_, RequestState::Reserving) => RequestState::AbortedInsufficient,
        _ => RequestState::RolledBack,
    }
}
