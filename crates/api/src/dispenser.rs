//! The `Dispenser` facade and its builder.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use dispenser_engine::{
    CancelHandle, DeliveryClock, DispensingEngine, GatewayStats, RequestGateway, TokioClock,
    VirtualClock,
};
use dispenser_events::{EventBus, InMemoryEventBus, Subscription};
use dispenser_infra::{ClockMode, DispenserConfig, JsonFileProfileRepository};
use dispenser_inventory::IngredientRegistry;
use dispenser_profiles::{Composition, LoadOutcome, Profile, ProfileRepository, ProfileStore};
use dispenser_telemetry::{DispenseEvent, DispenseRecord, TelemetryLog};

use crate::error::DispenserError;

pub type DispenserBus = Arc<InMemoryEventBus<DispenseEvent>>;

pub const DEFAULT_VOLUME_ML: f64 = 300.0;

/// One dispensing machine: containers, recipes, history, and a single pouring head.
pub struct Dispenser<R: ProfileRepository> {
    registry: Arc<IngredientRegistry>,
    profiles: Arc<ProfileStore<R>>,
    telemetry: Arc<TelemetryLog>,
    bus: DispenserBus,
    gateway: RequestGateway<R, DispenserBus>,
    default_volume_ml: f64,
    load_outcome: LoadOutcome,
}

impl<R: ProfileRepository> Dispenser<R> {
    pub fn builder(repository: R) -> DispenserBuilder<R> {
        DispenserBuilder::new(repository)
    }

    /// How the profile set was obtained at startup.
    pub fn load_outcome(&self) -> &LoadOutcome {
        &self.load_outcome
    }

    pub fn default_volume_ml(&self) -> f64 {
        self.default_volume_ml
    }

    // Profiles

    pub fn create_profile(
        &self,
        name: &str,
        composition: Composition,
        description: &str,
    ) -> Result<Profile, DispenserError> {
        Ok(self.profiles.create(name, composition, description)?)
    }

    pub fn update_profile(
        &self,
        name: &str,
        composition: Composition,
        description: &str,
    ) -> Result<Profile, DispenserError> {
        Ok(self.profiles.update(name, composition, description)?)
    }

    pub fn get_profile(&self, name: &str) -> Result<Profile, DispenserError> {
        Ok(self.profiles.get(name)?)
    }

    pub fn list_profiles(&self) -> Result<Vec<Profile>, DispenserError> {
        Ok(self.profiles.list()?)
    }

    pub fn delete_profile(&self, name: &str) -> Result<Profile, DispenserError> {
        Ok(self.profiles.delete(name)?)
    }

    // Dispensing

    /// Queue a dispense and wait for it to finish.
    pub async fn dispense(
        &self,
        profile_name: &str,
        total_volume_ml: f64,
    ) -> Result<DispenseRecord, DispenserError> {
        Ok(self.gateway.dispense(profile_name, total_volume_ml).await?)
    }

    /// Dispense the configured default size.
    pub async fn dispense_default(&self, profile_name: &str) -> Result<DispenseRecord, DispenserError> {
        self.dispense(profile_name, self.default_volume_ml).await
    }

    /// Like [`Dispenser::dispense`], but `cancel` can abort the request while it
    /// is queued or between ingredients.
    pub async fn dispense_with_cancel(
        &self,
        profile_name: &str,
        total_volume_ml: f64,
        cancel: &CancelHandle,
    ) -> Result<DispenseRecord, DispenserError> {
        Ok(self
            .gateway
            .dispense_with_cancel(profile_name, total_volume_ml, cancel)
            .await?)
    }

    // Inventory

    pub fn get_levels(&self) -> Result<BTreeMap<String, f64>, DispenserError> {
        Ok(self.registry.levels_snapshot()?)
    }

    /// Top up a container. Returns the new level.
    pub fn refill(&self, ingredient: &str, amount_ml: f64) -> Result<f64, DispenserError> {
        Ok(self.registry.refill(ingredient, amount_ml)?)
    }

    // History

    pub fn history(&self) -> Result<Vec<DispenseRecord>, DispenserError> {
        Ok(self.telemetry.all()?)
    }

    pub fn history_for(&self, profile_name: &str) -> Result<Vec<DispenseRecord>, DispenserError> {
        Ok(self.telemetry.by_profile(profile_name)?)
    }

    /// Records with `from <= timestamp < to`.
    pub fn history_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<DispenseRecord>, DispenserError> {
        Ok(self.telemetry.in_range(from, to)?)
    }

    /// Total volume poured per ingredient across all committed dispenses.
    pub fn usage(&self) -> Result<BTreeMap<String, f64>, DispenserError> {
        Ok(self.telemetry.dispensed_by_ingredient()?)
    }

    /// Receive every dispense event published from now on.
    pub fn subscribe(&self) -> Subscription<DispenseEvent> {
        self.bus.subscribe()
    }

    pub fn stats(&self) -> GatewayStats {
        self.gateway.stats()
    }

    pub fn registry(&self) -> &Arc<IngredientRegistry> {
        &self.registry
    }
}

impl Dispenser<JsonFileProfileRepository> {
    /// Default ingredients, profiles persisted at `config.profiles_path`.
    pub fn from_config(config: &DispenserConfig) -> Result<Self, DispenserError> {
        let clock: Arc<dyn DeliveryClock> = match config.clock {
            ClockMode::Real => Arc::new(TokioClock),
            ClockMode::Virtual => Arc::new(VirtualClock::new()),
        };

        Dispenser::builder(JsonFileProfileRepository::new(&config.profiles_path))
            .clock(clock)
            .default_volume_ml(config.default_volume_ml)
            .build()
    }
}

pub struct DispenserBuilder<R> {
    repository: R,
    registry: Option<Arc<IngredientRegistry>>,
    clock: Option<Arc<dyn DeliveryClock>>,
    bus: Option<DispenserBus>,
    default_volume_ml: f64,
}

impl<R: ProfileRepository> DispenserBuilder<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository,
            registry: None,
            clock: None,
            bus: None,
            default_volume_ml: DEFAULT_VOLUME_ML,
        }
    }

    /// Defaults to [`IngredientRegistry::with_defaults`].
    pub fn registry(mut self, registry: Arc<IngredientRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Defaults to [`TokioClock`].
    pub fn clock(mut self, clock: Arc<dyn DeliveryClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn bus(mut self, bus: DispenserBus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn default_volume_ml(mut self, volume_ml: f64) -> Self {
        self.default_volume_ml = volume_ml;
        self
    }

    /// Wire everything up and load the profile set.
    pub fn build(self) -> Result<Dispenser<R>, DispenserError> {
        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(IngredientRegistry::with_defaults()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(TokioClock));
        let bus = self.bus.unwrap_or_default();

        let profiles = Arc::new(ProfileStore::new(registry.clone(), self.repository));
        let load_outcome = profiles.load()?;
        if let LoadOutcome::SeededDefaults { persisted: false, .. } = load_outcome {
            warn!("default profiles are only held in memory");
        }

        let telemetry = Arc::new(TelemetryLog::new(registry.clone()));
        let engine = DispensingEngine::new(
            registry.clone(),
            profiles.clone(),
            telemetry.clone(),
            bus.clone(),
            clock,
        );

        let ingredients = registry.names()?.len();
        info!(ingredients, profiles = profiles.list()?.len(), "dispenser ready");

        Ok(Dispenser {
            registry,
            profiles,
            telemetry,
            bus,
            gateway: RequestGateway::new(engine),
            default_volume_ml: self.default_volume_ml,
            load_outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispenser_infra::InMemoryProfileRepository;
    use dispenser_profiles::InvalidComposition;

    fn dispenser() -> Dispenser<InMemoryProfileRepository> {
        Dispenser::builder(InMemoryProfileRepository::new())
            .clock(Arc::new(VirtualClock::new()))
            .build()
            .unwrap()
    }

    #[test]
    fn fresh_dispenser_seeds_default_profiles() {
        let dispenser = dispenser();
        assert!(matches!(
            dispenser.load_outcome(),
            LoadOutcome::SeededDefaults { persisted: true, .. }
        ));

        let names: Vec<String> = dispenser
            .list_profiles()
            .unwrap()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(names, ["energize", "refresh"]);
    }

    #[test]
    fn profile_lifecycle() {
        let dispenser = dispenser();
        let composition = Composition::new()
            .with("green_tea", 60.0)
            .with("citrus", 30.0)
            .with("vitamin_mix", 10.0);

        dispenser
            .create_profile("custom_mix", composition.clone(), "tea and citrus")
            .unwrap();
        let err = dispenser
            .create_profile("custom_mix", composition, "again")
            .unwrap_err();
        assert_eq!(err.code(), "already_exists");

        let removed = dispenser.delete_profile("custom_mix").unwrap();
        assert_eq!(removed.description(), "tea and citrus");
        assert_eq!(dispenser.get_profile("custom_mix").unwrap_err().code(), "not_found");
    }

    #[test]
    fn unknown_ingredient_is_reported() {
        let dispenser = dispenser();
        let err = dispenser
            .create_profile("mystery", Composition::new().with("mango", 100.0), "")
            .unwrap_err();
        assert_eq!(
            err.invalid_composition(),
            Some(&InvalidComposition::UnknownIngredient("mango".into()))
        );
    }

    #[tokio::test]
    async fn default_dispense_uses_configured_volume() {
        let dispenser = Dispenser::builder(InMemoryProfileRepository::new())
            .clock(Arc::new(VirtualClock::new()))
            .default_volume_ml(200.0)
            .build()
            .unwrap();

        let record = dispenser.dispense_default("refresh").await.unwrap();
        assert_eq!(record.requested_volume_ml(), 200.0);
        assert_eq!(dispenser.get_levels().unwrap()["water"], 840.0);
    }

    #[tokio::test]
    async fn refill_is_capped_and_validated() {
        let dispenser = dispenser();
        dispenser.dispense("energize", 300.0).await.unwrap();

        assert_eq!(dispenser.refill("green_tea", 100.0).unwrap(), 890.0);
        assert_eq!(dispenser.refill("green_tea", 5000.0).unwrap(), 1000.0);
        assert_eq!(dispenser.refill("green_tea", -1.0).unwrap_err().code(), "invalid_amount");
        assert_eq!(dispenser.refill("mango", 10.0).unwrap_err().code(), "not_found");
    }

    #[tokio::test]
    async fn subscribers_see_committed_dispenses() {
        let dispenser = dispenser();
        let events = dispenser.subscribe();

        let record = dispenser.dispense("energize", 300.0).await.unwrap();

        match events.try_recv().unwrap() {
            DispenseEvent::Dispensed(published) => assert_eq!(published, record),
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(dispenser.history_for("energize").unwrap(), vec![record]);
        assert_eq!(dispenser.usage().unwrap()["green_tea"], 210.0);
        assert_eq!(dispenser.stats().committed, 1);
    }
}
