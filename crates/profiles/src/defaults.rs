use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::composition::Composition;
use crate::profile::Profile;

/// Seed profiles installed when no usable profile source exists.
pub fn default_profiles(created_at: DateTime<Utc>) -> BTreeMap<String, Profile> {
    let energize = Profile::new(
        "energize",
        Composition::new()
            .with("green_tea", 70.0)
            .with("berry", 20.0)
            .with("vitamin_mix", 10.0),
        "Morning energy boost",
        created_at,
    );
    let refresh = Profile::new(
        "refresh",
        Composition::new()
            .with("water", 80.0)
            .with("citrus", 15.0)
            .with("vitamin_mix", 5.0),
        "Afternoon refreshment",
        created_at,
    );

    [energize, refresh]
        .into_iter()
        .map(|p| (p.name().to_string(), p))
        .collect()
}
