pub mod entity;
pub mod images;

pub use entity::{Pet, PetPatch, IMAGES_KEY, LEGACY_IMAGE_KEY, PET_FIELDS};
pub use images::ImageInput;
