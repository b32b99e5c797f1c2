use std::collections::BTreeMap;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use dispenser_engine::{DispensingEngine, RequestGateway, VirtualClock};
use dispenser_events::InMemoryEventBus;
use dispenser_inventory::{Ingredient, IngredientCategory, IngredientRegistry};
use dispenser_profiles::{Profile, ProfileRepository, ProfileStore, RepositoryError};
use dispenser_telemetry::{DispenseEvent, TelemetryLog};

/// Repository that never persists anything.
struct Discard;

impl ProfileRepository for Discard {
    fn load(&self) -> Result<BTreeMap<String, Profile>, RepositoryError> {
        Err(RepositoryError::NotFound("bench".to_string()))
    }

    fn save(&self, _: &BTreeMap<String, Profile>) -> Result<(), RepositoryError> {
        Ok(())
    }
}

type BenchGateway = RequestGateway<Discard, Arc<InMemoryEventBus<DispenseEvent>>>;

/// Registry with effectively bottomless containers so benchmarks never run dry.
fn bottomless_registry() -> Arc<IngredientRegistry> {
    let ingredients = [
        ("water", IngredientCategory::Base, 50.0),
        ("green_tea", IngredientCategory::Base, 50.0),
        ("berry", IngredientCategory::Flavor, 20.0),
        ("citrus", IngredientCategory::Flavor, 20.0),
        ("vitamin_mix", IngredientCategory::Supplement, 10.0),
    ]
    .into_iter()
    .map(|(name, category, rate)| Ingredient::new(name, category, 1e15, rate).expect("valid ingredient"));

    Arc::new(IngredientRegistry::from_ingredients(ingredients).expect("unique ingredients"))
}

fn setup() -> Arc<BenchGateway> {
    let registry = bottomless_registry();
    let profiles = Arc::new(ProfileStore::new(registry.clone(), Discard));
    profiles.load().expect("seed profiles");
    let telemetry = Arc::new(TelemetryLog::new(registry.clone()));
    let engine = DispensingEngine::new(
        registry,
        profiles,
        telemetry,
        Arc::new(InMemoryEventBus::new()),
        Arc::new(VirtualClock::new()),
    );
    Arc::new(RequestGateway::new(engine))
}

fn bench_single_dispense(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("runtime");
    let gateway = setup();

    c.bench_function("dispense_energize_300ml", |b| {
        b.to_async(&rt).iter(|| {
            let gateway = gateway.clone();
            async move { black_box(gateway.dispense("energize", 300.0).await.expect("dispense")) }
        })
    });
}

fn bench_contended_dispense(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("contended_dispense");

    for callers in [1usize, 4, 16] {
        group.throughput(Throughput::Elements(callers as u64));
        group.bench_with_input(BenchmarkId::from_parameter(callers), &callers, |b, &callers| {
            let gateway = setup();
            b.to_async(&rt).iter(|| {
                let gateway = gateway.clone();
                async move {
                    let handles: Vec<_> = (0..callers)
                        .map(|_| {
                            let gateway = gateway.clone();
                            tokio::spawn(async move { gateway.dispense("refresh", 250.0).await })
                        })
                        .collect();
                    for handle in handles {
                        black_box(handle.await.expect("join").expect("dispense"));
                    }
                }
            })
        });
    }

    group.finish();
}

fn bench_levels_snapshot(c: &mut Criterion) {
    let gateway = setup();
    c.bench_function("levels_snapshot", |b| {
        b.iter(|| black_box(gateway.levels_snapshot().expect("snapshot")))
    });
}

criterion_group!(
    benches,
    bench_single_dispense,
    bench_contended_dispense,
    bench_levels_snapshot
);
criterion_main!(benches);
