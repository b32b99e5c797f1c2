//! End-to-end dispenser scenarios through the public facade.

use std::collections::BTreeMap;
use std::sync::Arc;

use dispenser_api::{
    CancelHandle, ClockMode, Composition, Dispenser, DispenserConfig, DispenserError,
    JsonFileProfileRepository, LoadOutcome,
};
use dispenser_engine::{DispenseError, VirtualClock};
use dispenser_infra::InMemoryProfileRepository;
use dispenser_profiles::RepositoryError;

fn virtual_dispenser(repository: InMemoryProfileRepository) -> Dispenser<InMemoryProfileRepository> {
    Dispenser::builder(repository)
        .clock(Arc::new(VirtualClock::new()))
        .build()
        .unwrap()
}

fn energize() -> Composition {
    Composition::new()
        .with("green_tea", 70.0)
        .with("berry", 20.0)
        .with("vitamin_mix", 10.0)
}

#[tokio::test]
async fn energize_300ml_deducts_each_ingredient() {
    let dispenser = virtual_dispenser(InMemoryProfileRepository::with_profiles(BTreeMap::new()));
    dispenser
        .create_profile("energize", energize(), "Morning energy boost")
        .unwrap();

    let record = dispenser.dispense("energize", 300.0).await.unwrap();

    let levels = dispenser.get_levels().unwrap();
    assert_eq!(levels["green_tea"], 790.0);
    assert_eq!(levels["berry"], 440.0);
    assert_eq!(levels["vitamin_mix"], 220.0);
    assert_eq!(levels["water"], 1000.0);
    assert_eq!(levels["citrus"], 500.0);

    let log: Vec<(&str, f64, f64)> = record
        .per_ingredient_log()
        .iter()
        .map(|p| (p.ingredient_name.as_str(), p.volume_ml, p.time_taken_s))
        .collect();
    assert_eq!(
        log,
        [("green_tea", 210.0, 4.2), ("berry", 60.0, 3.0), ("vitamin_mix", 30.0, 3.0)]
    );
    assert_eq!(dispenser.history().unwrap(), vec![record]);
}

#[tokio::test]
async fn oversized_refresh_is_refused_without_side_effects() {
    let dispenser = virtual_dispenser(InMemoryProfileRepository::new());
    let before = dispenser.get_levels().unwrap();

    let err = dispenser.dispense("refresh", 10_000.0).await.unwrap_err();

    assert_eq!(
        err,
        DispenserError::Dispense(DispenseError::InsufficientIngredient {
            name: "water".into(),
            required: 8000.0,
            available: 1000.0,
        })
    );
    assert!(err.is_retryable());
    assert_eq!(dispenser.get_levels().unwrap(), before);
    assert!(dispenser.history().unwrap().is_empty());
}

#[tokio::test]
async fn missing_profile_file_is_seeded_and_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("drink_profiles.json");
    let config = DispenserConfig::default()
        .with_profiles_path(&path)
        .with_clock(ClockMode::Virtual);

    let first = Dispenser::from_config(&config).unwrap();
    assert!(matches!(
        first.load_outcome(),
        LoadOutcome::SeededDefaults {
            cause: RepositoryError::NotFound(_),
            persisted: true,
        }
    ));
    assert!(path.exists());

    let second = Dispenser::from_config(&config).unwrap();
    assert_eq!(
        second.load_outcome(),
        &LoadOutcome::Loaded {
            loaded: 2,
            skipped: vec![],
        }
    );
    let energize = second.get_profile("energize").unwrap();
    assert_eq!(energize.description(), "Morning energy boost");
    assert_eq!(energize.composition().percentage_of("green_tea"), Some(70.0));
    assert_eq!(
        second.get_profile("refresh").unwrap().composition(),
        first.get_profile("refresh").unwrap().composition()
    );
}

#[tokio::test]
async fn created_profiles_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("drink_profiles.json");
    let build = || {
        Dispenser::builder(JsonFileProfileRepository::new(&path))
            .clock(Arc::new(VirtualClock::new()))
            .build()
            .unwrap()
    };

    let first = build();
    let composition = Composition::new()
        .with("green_tea", 60.0)
        .with("citrus", 30.0)
        .with("vitamin_mix", 10.0);
    first
        .create_profile("afternoon_boost", composition, "Green tea and citrus")
        .unwrap();
    first.delete_profile("refresh").unwrap();

    let second = build();
    let names: Vec<String> = second
        .list_profiles()
        .unwrap()
        .iter()
        .map(|p| p.name().to_string())
        .collect();
    assert_eq!(names, ["afternoon_boost", "energize"]);

    let order: Vec<String> = second
        .get_profile("afternoon_boost")
        .unwrap()
        .composition()
        .ingredients()
        .map(str::to_string)
        .collect();
    assert_eq!(order, ["green_tea", "citrus", "vitamin_mix"]);

    let record = second.dispense("afternoon_boost", 250.0).await.unwrap();
    assert_eq!(record.per_ingredient_log()[0].ingredient_name, "green_tea");
    assert_eq!(second.get_levels().unwrap()["citrus"], 425.0);
}

#[tokio::test]
async fn corrupt_profile_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("drink_profiles.json");
    std::fs::write(&path, "{ \"energize\": ").unwrap();

    let dispenser = Dispenser::builder(JsonFileProfileRepository::new(&path))
        .clock(Arc::new(VirtualClock::new()))
        .build()
        .unwrap();

    assert!(matches!(
        dispenser.load_outcome(),
        LoadOutcome::SeededDefaults {
            cause: RepositoryError::Corrupt(_),
            ..
        }
    ));
    assert_eq!(dispenser.list_profiles().unwrap().len(), 2);

    let rewritten: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert!(rewritten.get("refresh").is_some());
}

#[tokio::test]
async fn cancelled_request_leaves_inventory_untouched() {
    let dispenser = virtual_dispenser(InMemoryProfileRepository::new());
    let before = dispenser.get_levels().unwrap();

    let cancel = CancelHandle::new();
    cancel.cancel();
    let err = dispenser
        .dispense_with_cancel("energize", 300.0, &cancel)
        .await
        .unwrap_err();

    assert_eq!(err.code(), "cancelled");
    assert_eq!(dispenser.get_levels().unwrap(), before);
    assert_eq!(dispenser.stats().cancelled, 1);
}

#[tokio::test]
async fn refill_makes_a_refused_drink_possible() {
    let dispenser = virtual_dispenser(InMemoryProfileRepository::new());

    // 175ml of green_tea per drink: five fit in a full container.
    for _ in 0..5 {
        dispenser.dispense("energize", 250.0).await.unwrap();
    }
    let err = dispenser.dispense("energize", 250.0).await.unwrap_err();
    assert_eq!(err.code(), "insufficient_ingredient");
    assert_eq!(dispenser.get_levels().unwrap()["green_tea"], 125.0);

    assert_eq!(dispenser.refill("green_tea", 175.0).unwrap(), 300.0);
    dispenser.dispense("energize", 250.0).await.unwrap();
    assert_eq!(dispenser.history().unwrap().len(), 6);
    assert_eq!(dispenser.get_levels().unwrap()["green_tea"], 125.0);
}
