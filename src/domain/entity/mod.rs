// src/domain/entity/mod.rs
//
// Entity base model: dirty tracking, lifecycle bookkeeping and the
// serialization contract shared by every storable domain object.

pub mod field;
pub mod state;
pub mod traits;

pub use field::{FieldDescriptor, FieldKind};
pub use state::{
    format_timestamp, parse_timestamp, EntityState, LifecycleAction, CREATED_AT_KEY, ID_KEY,
    NATIVE_ID_KEY, UPDATED_AT_KEY, VERSION_KEY,
};
pub use traits::{DirtyTrackable, Entity, Serializable};
