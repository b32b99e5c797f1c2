use anyhow::Context;

use dispenser_api::{
    Composition, Dispenser, DispenserConfig, DispenserError, LoadOutcome, ProfileError,
};

const DEMO_PROFILE: &str = "afternoon_boost";
const DEMO_VOLUME_ML: f64 = 250.0;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dispenser_observability::init();

    let config = DispenserConfig::from_env().context("invalid dispenser configuration")?;
    tracing::info!(
        profiles_path = %config.profiles_path.display(),
        clock = %config.clock,
        "starting dispenser demo"
    );

    let dispenser = Dispenser::from_config(&config).context("failed to start dispenser")?;
    if let LoadOutcome::SeededDefaults { cause, .. } = dispenser.load_outcome() {
        tracing::warn!(%cause, "using default profiles");
    }

    let composition = Composition::new()
        .with("green_tea", 60.0)
        .with("citrus", 30.0)
        .with("vitamin_mix", 10.0);
    match dispenser.create_profile(DEMO_PROFILE, composition, "Green tea and citrus pick-me-up") {
        Ok(_) => {}
        Err(DispenserError::Profile(ProfileError::AlreadyExists(_))) => {
            tracing::info!(profile = DEMO_PROFILE, "reusing stored profile");
        }
        Err(e) => return Err(e).context("failed to create demo profile"),
    }

    println!("Dispensing {DEMO_PROFILE}...");
    let record = dispenser
        .dispense(DEMO_PROFILE, DEMO_VOLUME_ML)
        .await
        .with_context(|| format!("failed to dispense {DEMO_VOLUME_ML}ml of {DEMO_PROFILE}"))?;

    println!("\nDispensing log:");
    for pour in record.per_ingredient_log() {
        println!(
            "- Dispensed {}ml of {} in {:.1} seconds",
            pour.volume_ml, pour.ingredient_name, pour.time_taken_s
        );
    }

    println!("\nRemaining ingredient levels:");
    for (ingredient, level) in dispenser.get_levels().context("failed to read levels")? {
        println!("- {ingredient}: {level}ml");
    }

    Ok(())
}
