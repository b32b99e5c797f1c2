use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dispenser_core::Entity;

use crate::composition::Composition;

/// A named drink recipe.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    name: String,
    composition: Composition,
    description: String,
    created_at: DateTime<Utc>,
}

impl Profile {
    /// Assemble a profile. Validation is the store's job; this only carries data.
    pub fn new(
        name: impl Into<String>,
        composition: Composition,
        description: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            composition,
            description: description.into(),
            created_at,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn composition(&self) -> &Composition {
        &self.composition
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn to_entry(&self) -> ProfileEntry {
        ProfileEntry {
            ingredients: self.composition.clone(),
            description: self.description.clone(),
            created_at: Some(self.created_at),
        }
    }

    /// Rebuild from a stored entry; entries written without a timestamp get `fallback_created_at`.
    pub fn from_entry(
        name: impl Into<String>,
        entry: ProfileEntry,
        fallback_created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            composition: entry.ingredients,
            description: entry.description,
            created_at: entry.created_at.unwrap_or(fallback_created_at),
        }
    }
}

impl Entity for Profile {
    type Id = str;

    fn id(&self) -> &Self::Id {
        &self.name
    }
}

/// Durable form of one profile (the value under its name in a [`ProfileDocument`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileEntry {
    pub ingredients: Composition,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Durable form of the whole profile set: name -> entry.
pub type ProfileDocument = BTreeMap<String, ProfileEntry>;
