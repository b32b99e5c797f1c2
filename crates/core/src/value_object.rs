//! Value object trait: equality by value, not identity.
//!
//! Value objects are domain objects that have **no identity** - they are defined entirely
//! by their attribute values. A profile's composition or a single dispense log entry are
//! value objects: two entries with the same ingredient, volume and duration are equal.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one, build a
/// new one with the new values.
///
/// ## Value Object vs Entity
///
/// - **Value Object**: No identity (two value objects with same values are equal)
/// - **Entity**: Has identity (two entities with same name are the same entity)
///
/// Example:
/// - `Composition [("water", 80.0), ("citrus", 20.0)]` is a value object
/// - `Ingredient { name: "water", .. }` is an entity
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
