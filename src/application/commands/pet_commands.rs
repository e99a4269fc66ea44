// src/application/commands/pet_commands.rs
//
// Pet Command Handlers
//
// RULES:
// - Accept ids and raw JSON bodies
// - Call the pet repository
// - Return DTOs in the ApiResponse envelope
// - Never contain business logic

use serde_json::{Map, Value};

use crate::application::{
    dto::*,
    error_handling::{ErrorResponse, ToErrorResponse},
    state::AppState,
};
use crate::db::ObjectId;
use crate::domain::{DirtyTrackable, Entity, Pet};
use crate::error::{AppError, AppResult};
use crate::repositories::{
    Page, PageCursor, Pagination, Repository, SearchOptions, DEFAULT_PAGE_SIZE,
};

type CommandResult<T> = Result<ApiResponse<T>, ErrorResponse>;

fn parse_id(pet_id: &str) -> Result<ObjectId, ErrorResponse> {
    ObjectId::parse(pet_id).ok_or_else(|| ErrorResponse::validation("Invalid ID".to_string()))
}

fn parse_body(body: Value) -> Result<Map<String, Value>, ErrorResponse> {
    match body {
        Value::Object(fields) => Ok(fields),
        other => Err(ErrorResponse::from_app_error(AppError::InvalidInput(format!(
            "Expected a JSON object, got {}",
            other
        )))),
    }
}

fn found(pet: Option<Pet>) -> AppResult<Pet> {
    pet.ok_or_else(|| AppError::NotFound(Pet::ENTITY_NAME.to_string()))
}

/// List pets, one page at a time
pub async fn list_pets(state: &AppState, query: ListPetsQuery) -> CommandResult<Page<PetDto>> {
    let mut options = SearchOptions::new();
    if let Some(page) = query.page {
        let page_size = query.limit.filter(|&n| n > 0).unwrap_or(DEFAULT_PAGE_SIZE);
        options = options.paginate(Pagination { page, page_size });
    } else {
        if let Some(limit) = query.limit {
            options = options.limit(limit);
        }
        if let Some(skip) = query.skip {
            options = options.skip(skip);
        }
    }
    if let Some(token) = query.cursor {
        let cursor = token
            .parse::<PageCursor>()
            .map_err(ErrorResponse::validation)?;
        options = options.cursor(cursor);
    }

    let page = state.pets().to_error_response()?.find(options).await.to_error_response()?;

    Ok(ApiResponse::ok(page.map(PetDto::from)))
}

/// Get a single pet by ID
pub async fn get_pet(state: &AppState, pet_id: &str) -> CommandResult<PetDto> {
    let id = parse_id(pet_id)?;

    let pet = state
        .pets()
        .to_error_response()?
        .find_by_key(id.as_str())
        .await
        .and_then(found)
        .to_error_response()?;

    Ok(ApiResponse::ok(PetDto::from(pet)))
}

/// Create a pet from a request body; `image_url` may be a string or a list
pub async fn create_pet(state: &AppState, body: Value) -> CommandResult<PetDto> {
    let mut pet = Pet::from_record(parse_body(body)?);

    let created = state
        .pets()
        .to_error_response()?
        .create(&mut pet)
        .await
        .to_error_response()?;

    log::info!("Pet {} created", created.id());
    Ok(ApiResponse::ok(PetDto::from(created)))
}

/// Apply a partial body to an existing pet
pub async fn update_pet(state: &AppState, pet_id: &str, body: Value) -> CommandResult<PetDto> {
    let id = parse_id(pet_id)?;
    let patch = parse_body(body)?;
    let repository = state.pets().to_error_response()?;

    let mut pet = repository
        .find_by_key(id.as_str())
        .await
        .and_then(found)
        .to_error_response()?;

    if !pet.update(patch) {
        log::debug!("Pet {} unchanged", pet.id());
    }

    let updated = repository.update(&mut pet).await.to_error_response()?;
    Ok(ApiResponse::ok(PetDto::from(updated)))
}

/// Delete a pet by ID
pub async fn delete_pet(state: &AppState, pet_id: &str) -> CommandResult<DeletedDto> {
    let id = parse_id(pet_id)?;

    let mut filter = Map::new();
    filter.insert("id".to_string(), Value::String(id.to_string()));

    let deleted = state
        .pets()
        .to_error_response()?
        .delete(filter, false)
        .await
        .to_error_response()?;

    Ok(ApiResponse::ok(DeletedDto { deleted }))
}
