//! Dispense execution.
//!
//! ```text
//! dispense(profile, volume)
//!   ↓
//! 1. Validate: profile lookup, volume > 0
//!   ↓
//! 2. Pre-flight: every ingredient checked, nothing mutated
//!   ↓
//! 3. Commit: per ingredient, in composition order
//!      pour (await clock) → deduct → log
//!   ↓
//! 4. Record in telemetry, publish on the bus
//! ```
//!
//! A failure after the first deduction reverses every deduction this request
//! made before returning, so a drink is never left half-dispensed.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};

use dispenser_core::DispenseId;
use dispenser_events::EventBus;
use dispenser_inventory::{IngredientRegistry, RegistryError};
use dispenser_profiles::{ProfileRepository, ProfileStore};
use dispenser_telemetry::{DispenseEvent, DispenseRecord, IngredientPour, TelemetryLog};

use crate::cancel::CancelHandle;
use crate::clock::DeliveryClock;
use crate::error::{DispenseError, failure_state};
use crate::state::{RequestState, RequestTracker};

/// Pours drinks against a shared ingredient registry.
///
/// The engine itself does not serialize callers; concurrent calls stay safe
/// (deductions are atomic and failures roll back) but may interleave pours.
/// Put a [`crate::RequestGateway`] in front of it for one-at-a-time service.
pub struct DispensingEngine<R, B>
where
    R: ProfileRepository,
    B: EventBus<DispenseEvent>,
{
    registry: Arc<IngredientRegistry>,
    profiles: Arc<ProfileStore<R>>,
    telemetry: Arc<TelemetryLog>,
    bus: B,
    clock: Arc<dyn DeliveryClock>,
}

impl<R, B> DispensingEngine<R, B>
where
    R: ProfileRepository,
    B: EventBus<DispenseEvent>,
{
    pub fn new(
        registry: Arc<IngredientRegistry>,
        profiles: Arc<ProfileStore<R>>,
        telemetry: Arc<TelemetryLog>,
        bus: B,
        clock: Arc<dyn DeliveryClock>,
    ) -> Self {
        Self {
            registry,
            profiles,
            telemetry,
            bus,
            clock,
        }
    }

    pub fn registry(&self) -> &Arc<IngredientRegistry> {
        &self.registry
    }

    pub fn profiles(&self) -> &Arc<ProfileStore<R>> {
        &self.profiles
    }

    pub fn telemetry(&self) -> &Arc<TelemetryLog> {
        &self.telemetry
    }

    pub async fn dispense(
        &self,
        profile_name: &str,
        total_volume_ml: f64,
    ) -> Result<DispenseRecord, DispenseError> {
        let mut tracker = RequestTracker::new();
        self.dispense_tracked(profile_name, total_volume_ml, &CancelHandle::new(), &mut tracker)
            .await
    }

    /// Run one request, driving `tracker` to a terminal state.
    pub async fn dispense_tracked(
        &self,
        profile_name: &str,
        total_volume_ml: f64,
        cancel: &CancelHandle,
        tracker: &mut RequestTracker,
    ) -> Result<DispenseRecord, DispenseError> {
        let result = self.run(profile_name, total_volume_ml, cancel, tracker).await;

        if let Err(e) = &result {
            if !tracker.state().is_terminal() {
                tracker.advance(failure_state(e, tracker.state()))?;
            }
            warn!(
                profile = profile_name,
                volume_ml = total_volume_ml,
                state = ?tracker.state(),
                error = %e,
                "dispense did not commit"
            );
        }

        result
    }

    async fn run(
        &self,
        profile_name: &str,
        total_volume_ml: f64,
        cancel: &CancelHandle,
        tracker: &mut RequestTracker,
    ) -> Result<DispenseRecord, DispenseError> {
        checkpoint(cancel)?;
        tracker.advance(RequestState::Validating)?;

        if !total_volume_ml.is_finite() || total_volume_ml <= 0.0 {
            return Err(DispenseError::InvalidVolume(total_volume_ml));
        }
        let profile = self.profiles.get(profile_name)?;
        let volumes = profile.composition().volumes_for(total_volume_ml);

        checkpoint(cancel)?;
        tracker.advance(RequestState::Reserving)?;

        for (ingredient, volume_ml) in &volumes {
            self.registry.check_available(ingredient, *volume_ml)?;
        }

        checkpoint(cancel)?;
        tracker.advance(RequestState::Dispensing)?;

        let mut pending = PendingDeductions::new(self, profile.name());
        let outcome = match self.pour_all(&volumes, cancel, &mut pending).await {
            Ok(pours) => {
                let record = DispenseRecord::new(
                    DispenseId::new(),
                    profile.name(),
                    total_volume_ml,
                    Utc::now(),
                    pours,
                );
                self.telemetry
                    .record(record.clone())
                    .map(|()| record)
                    .map_err(DispenseError::from)
            }
            Err(e) => Err(e),
        };

        let record = match outcome {
            Ok(record) => {
                pending.commit();
                record
            }
            Err(e) => {
                pending.roll_back(&e);
                return Err(e);
            }
        };

        tracker.advance(RequestState::Committed)?;
        info!(
            dispense_id = %record.id_typed(),
            profile = record.profile_name(),
            volume_ml = total_volume_ml,
            time_s = record.total_time_s(),
            "dispense committed"
        );

        if let Err(e) = self.bus.publish(DispenseEvent::Dispensed(record.clone())) {
            warn!(error = ?e, "failed to publish dispense event");
        }

        Ok(record)
    }

    /// Commit pass. `pending` collects every successful deduction so the
    /// caller can reverse them if this returns an error.
    async fn pour_all(
        &self,
        volumes: &[(String, f64)],
        cancel: &CancelHandle,
        pending: &mut PendingDeductions<'_, R, B>,
    ) -> Result<Vec<IngredientPour>, DispenseError> {
        let mut pours = Vec::with_capacity(volumes.len());

        for (idx, (name, volume_ml)) in volumes.iter().enumerate() {
            if idx > 0 && cancel.is_cancelled() {
                return Err(DispenseError::Cancelled { rolled_back: true });
            }

            let ingredient = self.registry.get(name)?;
            let time_taken_s = ingredient.pour_time_s(*volume_ml);
            let duration = Duration::try_from_secs_f64(time_taken_s)
                .map_err(|_| DispenseError::InvalidVolume(*volume_ml))?;

            self.clock.deliver(name, duration).await;

            match self.registry.reserve_and_deduct(name, *volume_ml) {
                Ok(remaining_ml) => {
                    tracing::debug!(ingredient = %name, volume_ml, time_taken_s, remaining_ml, "poured");
                }
                Err(RegistryError::InsufficientStock {
                    name,
                    required,
                    available,
                }) => {
                    return Err(DispenseError::ConcurrentDepletion {
                        name,
                        required,
                        available,
                    });
                }
                Err(other) => return Err(other.into()),
            }

            pending.push(name, *volume_ml);
            pours.push(IngredientPour {
                ingredient_name: name.clone(),
                volume_ml: *volume_ml,
                time_taken_s,
            });
        }

        Ok(pours)
    }

    /// Compensating credits, newest first.
    fn roll_back(&self, profile_name: &str, deducted: &[(String, f64)], reason: &DispenseError) {
        if deducted.is_empty() {
            return;
        }

        for (name, volume_ml) in deducted.iter().rev() {
            if let Err(e) = self.registry.restore(name, *volume_ml) {
                error!(ingredient = %name, volume_ml, error = %e, "rollback credit failed");
            }
        }
        warn!(
            profile = profile_name,
            reversed = deducted.len(),
            reason = %reason,
            "dispense rolled back"
        );

        let event = DispenseEvent::RolledBack {
            profile_name: profile_name.to_string(),
            reason: reason.to_string(),
            occurred_at: Utc::now(),
        };
        if let Err(e) = self.bus.publish(event) {
            warn!(error = ?e, "failed to publish rollback event");
        }
    }
}

/// Deductions made by one request that has not committed yet.
///
/// Dropping it without [`PendingDeductions::commit`] reverses them, which
/// covers a caller that drops the dispense future mid-pour.
struct PendingDeductions<'a, R, B>
where
    R: ProfileRepository,
    B: EventBus<DispenseEvent>,
{
    engine: &'a DispensingEngine<R, B>,
    profile_name: &'a str,
    deducted: Vec<(String, f64)>,
}

impl<'a, R, B> PendingDeductions<'a, R, B>
where
    R: ProfileRepository,
    B: EventBus<DispenseEvent>,
{
    fn new(engine: &'a DispensingEngine<R, B>, profile_name: &'a str) -> Self {
        Self {
            engine,
            profile_name,
            deducted: Vec::new(),
        }
    }

    fn push(&mut self, ingredient: &str, volume_ml: f64) {
        self.deducted.push((ingredient.to_string(), volume_ml));
    }

    fn commit(mut self) {
        self.deducted.clear();
    }

    fn roll_back(mut self, reason: &DispenseError) {
        let deducted = std::mem::take(&mut self.deducted);
        self.engine.roll_back(self.profile_name, &deducted, reason);
    }
}

impl<R, B> Drop for PendingDeductions<'_, R, B>
where
    R: ProfileRepository,
    B: EventBus<DispenseEvent>,
{
    fn drop(&mut self) {
        if self.deducted.is_empty() {
            return;
        }
        let deducted = std::mem::take(&mut self.deducted);
        self.engine.roll_back(
            self.profile_name,
            &deducted,
            &DispenseError::Cancelled { rolled_back: true },
        );
    }
}

fn checkpoint(cancel: &CancelHandle) -> Result<(), DispenseError> {
    if cancel.is_cancelled() {
        return Err(DispenseError::Cancelled { rolled_back: false });
    }
    Ok(())
}
