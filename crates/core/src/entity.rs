//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Ingredients and profiles are keyed by their unique name, so the identifier
/// is usually a string borrowed from the entity itself.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: ?Sized + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
