//! Entity trait: records with a stable identity.

/// Something stored and addressed by id (principals, topics).
pub trait Entity {
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> Self::Id;
}
