// src/application/dto/mod.rs
//
// Data Transfer Objects
//
// CRITICAL PRINCIPLES:
// - DTOs are caller-friendly representations
// - DTOs are simple, serializable structs
// - Conversion FROM domain entities only (never TO)

use serde::{Deserialize, Serialize};

use crate::domain::entity::format_timestamp;
use crate::domain::{Entity, Pet};

/// Success envelope returned by every command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

// ============================================================================
// PET DTOs
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetDto {
    pub id: String,
    pub name: String,
    pub owner_name: String,
    pub species: String,
    pub age: Option<f64>,
    pub poddy_trained: Option<bool>,
    pub diet: Vec<String>,
    pub images: Vec<String>,
    /// Same list as `images`, for readers of the legacy field
    pub image_url: Vec<String>,
    pub likes: Vec<String>,
    pub dislikes: Vec<String>,
    #[serde(rename = "createdAt")]
    pub created_at: Option<String>,
    #[serde(rename = "updatedAt")]
    pub updated_at: Option<String>,
}

impl From<&Pet> for PetDto {
    fn from(pet: &Pet) -> Self {
        Self {
            id: pet.id().to_string(),
            name: pet.name().to_string(),
            owner_name: pet.owner_name().to_string(),
            species: pet.species().to_string(),
            age: pet.age(),
            poddy_trained: pet.poddy_trained(),
            diet: pet.diet().to_vec(),
            images: pet.images().to_vec(),
            image_url: pet.images().to_vec(),
            likes: pet.likes().to_vec(),
            dislikes: pet.dislikes().to_vec(),
            created_at: pet.created_at().map(|t| format_timestamp(&t)),
            updated_at: pet.updated_at().map(|t| format_timestamp(&t)),
        }
    }
}

impl From<Pet> for PetDto {
    fn from(pet: Pet) -> Self {
        Self::from(&pet)
    }
}

/// Paging parameters for `list_pets`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListPetsQuery {
    pub limit: Option<usize>,
    pub skip: Option<usize>,
    /// 1-based page number; replaces `skip` when set
    pub page: Option<usize>,
    /// Token from a previous page's `cursor`
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedDto {
    pub deleted: u64,
}
