use thiserror::Error;

use dispenser_engine::DispenseError;
use dispenser_infra::ConfigError;
use dispenser_inventory::RegistryError;
use dispenser_profiles::{InvalidComposition, ProfileError};
use dispenser_telemetry::TelemetryError;

/// Any failure surfaced by [`crate::Dispenser`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DispenserError {
    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Dispense(#[from] DispenseError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl DispenserError {
    /// Stable machine-readable code for the failure.
    pub fn code(&self) -> &'static str {
        match self {
            DispenserError::Profile(e) => match e {
                ProfileError::NotFound(_) => "not_found",
                ProfileError::AlreadyExists(_) => "already_exists",
                ProfileError::InvalidName(_) => "invalid_name",
                ProfileError::InvalidComposition(_) => "invalid_composition",
                ProfileError::Repository(_) => "io_error",
                ProfileError::Poisoned => "internal",
            },
            DispenserError::Dispense(e) => match e {
                DispenseError::ProfileNotFound(_) => "not_found",
                DispenseError::InvalidVolume(_) => "invalid_volume",
                DispenseError::InsufficientIngredient { .. } => "insufficient_ingredient",
                DispenseError::ConcurrentDepletion { .. } => "concurrent_depletion",
                DispenseError::Cancelled { .. } => "cancelled",
                DispenseError::Registry(RegistryError::NotFound(_)) => "not_found",
                DispenseError::Profile(ProfileError::Repository(_)) => "io_error",
                DispenseError::Registry(_)
                | DispenseError::Profile(_)
                | DispenseError::Telemetry(_)
                | DispenseError::Domain(_) => "internal",
            },
            DispenserError::Registry(e) => match e {
                RegistryError::NotFound(_) => "not_found",
                RegistryError::InvalidAmount { .. } => "invalid_amount",
                RegistryError::InsufficientStock { .. } => "insufficient_ingredient",
                RegistryError::AlreadyRegistered(_) => "already_exists",
                RegistryError::Poisoned => "internal",
            },
            DispenserError::Telemetry(_) => "internal",
            DispenserError::Config(_) => "invalid_config",
        }
    }

    /// Whether the same request might succeed later (e.g. after a refill).
    pub fn is_retryable(&self) -> bool {
        matches!(self, DispenserError::Dispense(e) if e.is_retryable())
    }

    /// The composition problem, when the failure was a rejected recipe.
    pub fn invalid_composition(&self) -> Option<&InvalidComposition> {
        match self {
            DispenserError::Profile(ProfileError::InvalidComposition(reason)) => Some(reason),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_the_failure_taxonomy() {
        let missing: DispenserError = DispenseError::ProfileNotFound("chai".into()).into();
        assert_eq!(missing.code(), "not_found");

        let short: DispenserError = DispenseError::InsufficientIngredient {
            name: "water".into(),
            required: 8000.0,
            available: 1000.0,
        }
        .into();
        assert_eq!(short.code(), "insufficient_ingredient");
        assert!(short.is_retryable());

        let bad: DispenserError =
            ProfileError::InvalidComposition(InvalidComposition::EmptyComposition).into();
        assert_eq!(bad.code(), "invalid_composition");
        assert_eq!(bad.invalid_composition(), Some(&InvalidComposition::EmptyComposition));
        assert!(!bad.is_retryable());
    }
}
