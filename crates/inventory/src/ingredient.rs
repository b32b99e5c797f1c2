use serde::{Deserialize, Serialize};

use dispenser_core::{DomainError, DomainResult, Entity};

/// Role an ingredient plays in a drink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngredientCategory {
    Base,
    Flavor,
    Supplement,
}

impl IngredientCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngredientCategory::Base => "base",
            IngredientCategory::Flavor => "flavor",
            IngredientCategory::Supplement => "supplement",
        }
    }
}

impl core::fmt::Display for IngredientCategory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single ingredient container.
///
/// Levels are in millilitres. When a capacity is tracked the level always stays
/// inside `0..=capacity_ml`; without one only the lower bound applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    name: String,
    category: IngredientCategory,
    capacity_ml: Option<f64>,
    current_level_ml: f64,
    dispense_rate_ml_per_s: f64,
}

impl Ingredient {
    /// Build an ingredient without a capacity ceiling.
    pub fn new(
        name: impl Into<String>,
        category: IngredientCategory,
        current_level_ml: f64,
        dispense_rate_ml_per_s: f64,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("ingredient name cannot be empty"));
        }
        if !current_level_ml.is_finite() || current_level_ml < 0.0 {
            return Err(DomainError::validation(format!(
                "ingredient '{name}': level must be a finite value >= 0 (got {current_level_ml})"
            )));
        }
        if !dispense_rate_ml_per_s.is_finite() || dispense_rate_ml_per_s <= 0.0 {
            return Err(DomainError::validation(format!(
                "ingredient '{name}': dispense rate must be > 0 (got {dispense_rate_ml_per_s})"
            )));
        }

        Ok(Self {
            name,
            category,
            capacity_ml: None,
            current_level_ml,
            dispense_rate_ml_per_s,
        })
    }

    /// Track a capacity ceiling. The current level must already fit inside it.
    pub fn with_capacity(mut self, capacity_ml: f64) -> DomainResult<Self> {
        if !capacity_ml.is_finite() || capacity_ml <= 0.0 {
            return Err(DomainError::validation(format!(
                "ingredient '{}': capacity must be > 0 (got {capacity_ml})",
                self.name
            )));
        }
        if self.current_level_ml > capacity_ml {
            return Err(DomainError::invariant(format!(
                "ingredient '{}': level {} exceeds capacity {capacity_ml}",
                self.name, self.current_level_ml
            )));
        }
        self.capacity_ml = Some(capacity_ml);
        Ok(self)
    }

    /// Ingredient that starts full: capacity equals the initial level.
    pub fn full(
        name: impl Into<String>,
        category: IngredientCategory,
        level_ml: f64,
        dispense_rate_ml_per_s: f64,
    ) -> DomainResult<Self> {
        Self::new(name, category, level_ml, dispense_rate_ml_per_s)?.with_capacity(level_ml)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> IngredientCategory {
        self.category
    }

    pub fn capacity_ml(&self) -> Option<f64> {
        self.capacity_ml
    }

    pub fn current_level_ml(&self) -> f64 {
        self.current_level_ml
    }

    pub fn dispense_rate_ml_per_s(&self) -> f64 {
        self.dispense_rate_ml_per_s
    }

    /// Seconds needed to pour `volume_ml` at this ingredient's rate.
    pub fn pour_time_s(&self, volume_ml: f64) -> f64 {
        volume_ml / self.dispense_rate_ml_per_s
    }

    /// Room left before the container is full (`None` when capacity is untracked).
    pub fn headroom_ml(&self) -> Option<f64> {
        self.capacity_ml.map(|cap| cap - self.current_level_ml)
    }

    /// Set the level, clamping into the valid range.
    ///
    /// Callers are responsible for rejecting overdrafts beforehand; clamping
    /// only absorbs floating point dust.
    pub(crate) fn set_level(&mut self, level_ml: f64) {
        let floor = level_ml.max(0.0);
        self.current_level_ml = match self.capacity_ml {
            Some(cap) => floor.min(cap),
            None => floor,
        };
    }
}

impl Entity for Ingredient {
    type Id = str;

    fn id(&self) -> &Self::Id {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_blank_name() {
        let err = Ingredient::new("  ", IngredientCategory::Base, 10.0, 1.0).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn new_rejects_negative_level_and_zero_rate() {
        assert!(Ingredient::new("water", IngredientCategory::Base, -1.0, 1.0).is_err());
        assert!(Ingredient::new("water", IngredientCategory::Base, 1.0, 0.0).is_err());
        assert!(Ingredient::new("water", IngredientCategory::Base, f64::NAN, 1.0).is_err());
    }

    #[test]
    fn capacity_must_hold_current_level() {
        let water = Ingredient::new("water", IngredientCategory::Base, 500.0, 50.0).unwrap();
        let err = water.with_capacity(400.0).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn set_level_clamps_into_bounds() {
        let mut berry = Ingredient::full("berry", IngredientCategory::Flavor, 500.0, 20.0).unwrap();
        berry.set_level(-0.5);
        assert_eq!(berry.current_level_ml(), 0.0);
        berry.set_level(900.0);
        assert_eq!(berry.current_level_ml(), 500.0);
    }

    #[test]
    fn pour_time_uses_dispense_rate() {
        let vitamin = Ingredient::new("vitamin_mix", IngredientCategory::Supplement, 250.0, 10.0).unwrap();
        assert_eq!(vitamin.pour_time_s(30.0), 3.0);
        assert_eq!(vitamin.id(), "vitamin_mix");
    }

    #[test]
    fn category_displays_lowercase() {
        assert_eq!(IngredientCategory::Supplement.to_string(), "supplement");
        assert_eq!(IngredientCategory::Base.as_str(), "base");
    }
}
