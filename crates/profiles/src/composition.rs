//! Percentage composition of a drink.

use std::collections::HashSet;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use dispenser_core::ValueObject;

/// Allowed deviation of the percentage sum from 100.
pub const PERCENT_EPSILON: f64 = 0.01;

/// Why a composition was rejected.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InvalidComposition {
    #[error("composition is empty")]
    EmptyComposition,

    #[error("unknown ingredient: {0}")]
    UnknownIngredient(String),

    #[error("ingredient listed more than once: {0}")]
    DuplicateIngredient(String),

    #[error("percentage for {ingredient} must be in (0, 100], got {percentage}")]
    PercentageOutOfRange { ingredient: String, percentage: f64 },

    #[error("ingredient percentages must sum to 100, got {0}")]
    PercentagesNotSumTo100(f64),
}

/// Ordered `ingredient -> percentage` mapping.
///
/// Insertion order is significant: it is the order ingredients are poured in.
/// Serialized as a JSON object whose key order is preserved on both ends.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Composition(Vec<(String, f64)>);

impl ValueObject for Composition {}

impl Composition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style push; validation happens separately.
    pub fn with(mut self, ingredient: impl Into<String>, percentage: f64) -> Self {
        self.0.push((ingredient.into(), percentage));
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, pct)| (name.as_str(), *pct))
    }

    pub fn ingredients(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn percentage_of(&self, ingredient: &str) -> Option<f64> {
        self.0
            .iter()
            .find(|(name, _)| name == ingredient)
            .map(|(_, pct)| *pct)
    }

    pub fn total_percentage(&self) -> f64 {
        self.0.iter().map(|(_, pct)| pct).sum()
    }

    /// Split `total_ml` across every ingredient, in pour order.
    pub fn volumes_for(&self, total_ml: f64) -> Vec<(String, f64)> {
        self.0
            .iter()
            .map(|(name, pct)| (name.clone(), pct * total_ml / 100.0))
            .collect()
    }
}

impl<S, I> FromIterator<(S, I)> for Composition
where
    S: Into<String>,
    I: Into<f64>,
{
    fn from_iter<T: IntoIterator<Item = (S, I)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, pct)| (name.into(), pct.into()))
                .collect(),
        )
    }
}

/// Check a composition against the set of known ingredients.
///
/// Checks run in a fixed order: emptiness, per-entry rules, then the sum.
pub fn validate_composition(
    composition: &Composition,
    is_known: impl Fn(&str) -> bool,
) -> Result<(), InvalidComposition> {
    if composition.is_empty() {
        return Err(InvalidComposition::EmptyComposition);
    }

    let mut seen = HashSet::with_capacity(composition.len());
    for (ingredient, percentage) in composition.iter() {
        if !seen.insert(ingredient) {
            return Err(InvalidComposition::DuplicateIngredient(ingredient.to_string()));
        }
        if !is_known(ingredient) {
            return Err(InvalidComposition::UnknownIngredient(ingredient.to_string()));
        }
        if !percentage.is_finite() || percentage <= 0.0 || percentage > 100.0 {
            return Err(InvalidComposition::PercentageOutOfRange {
                ingredient: ingredient.to_string(),
                percentage,
            });
        }
    }

    let total = composition.total_percentage();
    if (total - 100.0).abs() > PERCENT_EPSILON {
        return Err(InvalidComposition::PercentagesNotSumTo100(total));
    }

    Ok(())
}

impl Serialize for Composition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, pct) in &self.0 {
            map.serialize_entry(name, pct)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Composition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CompositionVisitor;

        impl<'de> Visitor<'de> for CompositionVisitor {
            type Value = Composition;

            fn expecting(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str("a map of ingredient name to percentage")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, pct)) = access.next_entry::<String, f64>()? {
                    entries.push((name, pct));
                }
                Ok(Composition(entries))
            }
        }

        deserializer.deserialize_map(CompositionVisitor)
    }
}
