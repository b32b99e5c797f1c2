use std::collections::BTreeMap;
use std::sync::RwLock;

use thiserror::Error;
use tracing::{debug, info};

use dispenser_core::Entity;

use crate::ingredient::{Ingredient, IngredientCategory};

/// Tolerance applied when comparing a requested volume against a level.
///
/// Percentages of a volume rarely land on exact binary fractions; a request for
/// the whole remaining level must not fail because of rounding dust.
pub const LEVEL_EPSILON_ML: f64 = 1e-9;

pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegistryError {
    #[error("ingredient not found: {0}")]
    NotFound(String),

    #[error("insufficient {name}: required {required}ml, available {available}ml")]
    InsufficientStock {
        name: String,
        required: f64,
        available: f64,
    },

    #[error("ingredient already registered: {0}")]
    AlreadyRegistered(String),

    #[error("invalid amount for {name}: {amount}ml")]
    InvalidAmount { name: String, amount: f64 },

    #[error("ingredient registry lock poisoned")]
    Poisoned,
}

impl RegistryError {
    /// Millilitres missing for an `InsufficientStock` error.
    pub fn shortfall(&self) -> Option<f64> {
        match self {
            RegistryError::InsufficientStock {
                required,
                available,
                ..
            } => Some(required - available),
            _ => None,
        }
    }
}

/// Live ingredient levels.
///
/// A single `RwLock` guards the whole map: every check-then-act is one write
/// critical section, and readers always observe a level that some committed
/// operation produced.
#[derive(Debug, Default)]
pub struct IngredientRegistry {
    ingredients: RwLock<BTreeMap<String, Ingredient>>,
}

impl IngredientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a list of ingredients; names must be unique.
    pub fn from_ingredients(
        ingredients: impl IntoIterator<Item = Ingredient>,
    ) -> RegistryResult<Self> {
        let registry = Self::new();
        for ingredient in ingredients {
            registry.register(ingredient)?;
        }
        Ok(registry)
    }

    /// The standard five-container setup, every container full.
    pub fn with_defaults() -> Self {
        let map = default_ingredients()
            .into_iter()
            .map(|ingredient| (ingredient.name().to_string(), ingredient))
            .collect();
        Self {
            ingredients: RwLock::new(map),
        }
    }

    pub fn register(&self, ingredient: Ingredient) -> RegistryResult<()> {
        let mut map = self.ingredients.write().map_err(|_| RegistryError::Poisoned)?;
        if map.contains_key(ingredient.id()) {
            return Err(RegistryError::AlreadyRegistered(ingredient.name().to_string()));
        }
        debug!(
            ingredient = ingredient.name(),
            category = %ingredient.category(),
            level_ml = ingredient.current_level_ml(),
            "ingredient registered"
        );
        map.insert(ingredient.name().to_string(), ingredient);
        Ok(())
    }

    /// Point-in-time copy of one ingredient.
    pub fn get(&self, name: &str) -> RegistryResult<Ingredient> {
        let map = self.ingredients.read().map_err(|_| RegistryError::Poisoned)?;
        map.get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ingredients
            .read()
            .map(|map| map.contains_key(name))
            .unwrap_or(false)
    }

    pub fn names(&self) -> RegistryResult<Vec<String>> {
        let map = self.ingredients.read().map_err(|_| RegistryError::Poisoned)?;
        Ok(map.keys().cloned().collect())
    }

    /// Read-only availability check (no mutation).
    pub fn check_available(&self, name: &str, volume_ml: f64) -> RegistryResult<()> {
        let map = self.ingredients.read().map_err(|_| RegistryError::Poisoned)?;
        let ingredient = map
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        ensure_covers(ingredient, volume_ml)
    }

    /// Atomically check `level >= volume_ml` and deduct.
    ///
    /// Returns the remaining level. On failure nothing changes.
    pub fn reserve_and_deduct(&self, name: &str, volume_ml: f64) -> RegistryResult<f64> {
        validate_amount(name, volume_ml)?;
        let mut map = self.ingredients.write().map_err(|_| RegistryError::Poisoned)?;
        let ingredient = map
            .get_mut(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;

        ensure_covers(ingredient, volume_ml)?;
        ingredient.set_level(ingredient.current_level_ml() - volume_ml);

        debug!(
            ingredient = name,
            deducted_ml = volume_ml,
            remaining_ml = ingredient.current_level_ml(),
            "ingredient deducted"
        );
        Ok(ingredient.current_level_ml())
    }

    /// Compensating credit for a deduction that has to be undone.
    ///
    /// Capped at capacity like a refill, but logged separately so rollbacks
    /// stay visible.
    pub fn restore(&self, name: &str, volume_ml: f64) -> RegistryResult<f64> {
        let level = self.credit(name, volume_ml)?;
        debug!(ingredient = name, restored_ml = volume_ml, level_ml = level, "ingredient restored");
        Ok(level)
    }

    /// Top up an ingredient, capped at its capacity. Returns the new level.
    pub fn refill(&self, name: &str, amount_ml: f64) -> RegistryResult<f64> {
        let level = self.credit(name, amount_ml)?;
        info!(ingredient = name, amount_ml, level_ml = level, "ingredient refilled");
        Ok(level)
    }

    /// Consistent point-in-time view of every level.
    pub fn levels_snapshot(&self) -> RegistryResult<BTreeMap<String, f64>> {
        let map = self.ingredients.read().map_err(|_| RegistryError::Poisoned)?;
        Ok(map
            .iter()
            .map(|(name, ingredient)| (name.clone(), ingredient.current_level_ml()))
            .collect())
    }

    fn credit(&self, name: &str, amount_ml: f64) -> RegistryResult<f64> {
        validate_amount(name, amount_ml)?;
        let mut map = self.ingredients.write().map_err(|_| RegistryError::Poisoned)?;
        let ingredient = map
            .get_mut(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        ingredient.set_level(ingredient.current_level_ml() + amount_ml);
        Ok(ingredient.current_level_ml())
    }
}

fn ensure_covers(ingredient: &Ingredient, volume_ml: f64) -> RegistryResult<()> {
    let available = ingredient.current_level_ml();
    if volume_ml > available + LEVEL_EPSILON_ML {
        return Err(RegistryError::InsufficientStock {
            name: ingredient.name().to_string(),
            required: volume_ml,
            available,
        });
    }
    Ok(())
}

fn validate_amount(name: &str, amount_ml: f64) -> RegistryResult<()> {
    if !amount_ml.is_finite() || amount_ml <= 0.0 {
        return Err(RegistryError::InvalidAmount {
            name: name.to_string(),
            amount: amount_ml,
        });
    }
    Ok(())
}

/// Standard container set: `(name, category, level_ml, rate_ml_per_s)`.
const DEFAULT_INGREDIENTS: [(&str, IngredientCategory, f64, f64); 5] = [
    ("water", IngredientCategory::Base, 1000.0, 50.0),
    ("green_tea", IngredientCategory::Base, 1000.0, 50.0),
    ("berry", IngredientCategory::Flavor, 500.0, 20.0),
    ("citrus", IngredientCategory::Flavor, 500.0, 20.0),
    ("vitamin_mix", IngredientCategory::Supplement, 250.0, 10.0),
];

fn default_ingredients() -> Vec<Ingredient> {
    DEFAULT_INGREDIENTS
        .iter()
        .filter_map(|(name, category, level, rate)| {
            Ingredient::full(*name, *category, *level, *rate).ok()
        })
        .collect()
}
