// src/domain/mod.rs
//
// Domain Root
//
// Declares the domain modules and re-exports their public API.
// Other modules import from `crate::domain::*`.

pub mod entity;
pub mod pet;

// Entity base model
pub use entity::{
    DirtyTrackable, Entity, EntityState, FieldDescriptor, FieldKind, LifecycleAction,
    Serializable,
};

// Pet Domain
pub use pet::{ImageInput, Pet, PetPatch};
