use actix_web::{delete, get, post, put, web, HttpResponse};
use serde::Deserialize;

use super::created;
use crate::cache::FoodCache;
use crate::error::{ApiError, StoreError, ValidationError};
use crate::models::{Food, FoodDraft};
use crate::state::AppState;
use crate::validation::validate_food;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default, rename = "nombre")]
    name: Option<String>,
}

fn invalidate(cache: &Option<FoodCache>) {
    if let Some(cache) = cache {
        cache.invalidate();
    }
}

fn food_not_found(id: i32) -> ApiError {
    ApiError::NotFound(format!("no food with identifier {id}"))
}

#[get("/api/alimentos")]
pub async fn list_foods(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let foods = state.repos.foods.clone();
    let cache = state.cache.clone();

    let listing = web::block(move || -> Result<Vec<Food>, StoreError> {
        if let Some(hit) = cache.as_ref().and_then(FoodCache::get_all) {
            return Ok(hit);
        }
        let listing = foods.list_foods()?;
        if let Some(cache) = &cache {
            cache.put_all(&listing);
        }
        Ok(listing)
    })
    .await??;

    Ok(HttpResponse::Ok().json(listing))
}

#[get("/api/alimentos/buscar")]
pub async fn search_foods(
    state: web::Data<AppState>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, ApiError> {
    let fragment = query
        .into_inner()
        .name
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("query parameter 'nombre' is required".into()))?;
    let foods = state.repos.foods.clone();

    let matches = web::block(move || foods.search_foods(&fragment)).await??;
    Ok(HttpResponse::Ok().json(matches))
}

#[get("/api/alimentos/{id}")]
pub async fn get_food(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let foods = state.repos.foods.clone();

    let food = web::block(move || foods.get_food(id))
        .await??
        .ok_or_else(|| food_not_found(id))?;
    Ok(HttpResponse::Ok().json(food))
}

#[post("/api/alimentos")]
pub async fn create_food(
    state: web::Data<AppState>,
    body: web::Json<Option<FoodDraft>>,
) -> Result<HttpResponse, ApiError> {
    let draft = body
        .into_inner()
        .ok_or_else(|| ValidationError::invalid("food must not be null"))?;
    let new_food = validate_food(draft)?;
    let foods = state.repos.foods.clone();
    let cache = state.cache.clone();

    let food = web::block(move || -> Result<Food, StoreError> {
        let food = foods.insert_food(new_food)?;
        invalidate(&cache);
        Ok(food)
    })
    .await??;

    log::info!("created food {} ({})", food.id, food.name);
    Ok(created(format!("/api/alimentos/{}", food.id), &food))
}

#[put("/api/alimentos/{id}")]
pub async fn update_food(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    body: web::Json<Option<FoodDraft>>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let draft = body
        .into_inner()
        .ok_or_else(|| ValidationError::invalid("food must not be null"))?;
    if draft.id != id {
        return Err(ApiError::BadRequest(
            "identifier in the URL does not match the food".into(),
        ));
    }
    let food = validate_food(draft)?.with_id(id);
    let foods = state.repos.foods.clone();
    let cache = state.cache.clone();

    web::block(move || -> Result<(), ApiError> {
        if foods.get_food(id)?.is_none() {
            return Err(food_not_found(id));
        }
        if !foods.update_food(&food)? {
            return Err(ApiError::Internal(format!("food {id} could not be updated")));
        }
        invalidate(&cache);
        Ok(())
    })
    .await??;

    log::info!("updated food {id}");
    Ok(HttpResponse::NoContent().finish())
}

#[delete("/api/alimentos/{id}")]
pub async fn delete_food(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let foods = state.repos.foods.clone();
    let cache = state.cache.clone();

    web::block(move || -> Result<(), ApiError> {
        if foods.get_food(id)?.is_none() {
            return Err(food_not_found(id));
        }
        if !foods.delete_food(id)? {
            return Err(ApiError::Internal(format!("food {id} could not be deleted")));
        }
        invalidate(&cache);
        Ok(())
    })
    .await??;

    log::info!("deleted food {id}");
    Ok(HttpResponse::NoContent().finish())
}
