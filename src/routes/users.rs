//! User accounts and credential checks.
//!
//! No session is issued on login; responses never carry the password hash.

use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::Local;
use serde_json::json;

use super::created;
use crate::error::{ApiError, ValidationError};
use crate::models::{LoginRequest, NewUser, User, UserDraft};
use crate::password::{hash_password, verify_password};
use crate::state::AppState;
use crate::validation::{validate_password, validate_user_identity};

fn user_not_found(id: i32) -> ApiError {
    ApiError::NotFound(format!("no user with identifier {id}"))
}

#[get("/api/usuarios")]
pub async fn list_users(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let users = state.repos.users.clone();
    let listing = web::block(move || users.list_users()).await??;
    Ok(HttpResponse::Ok().json(listing))
}

#[get("/api/usuarios/email/{email}")]
pub async fn get_user_by_email(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let email = path.into_inner();
    let users = state.repos.users.clone();

    let lookup = email.clone();
    let user = web::block(move || users.user_by_email(&lookup))
        .await??
        .ok_or_else(|| ApiError::NotFound(format!("no user with email {email}")))?;
    Ok(HttpResponse::Ok().json(user))
}

#[get("/api/usuarios/{id}")]
pub async fn get_user(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let users = state.repos.users.clone();

    let user = web::block(move || users.get_user(id))
        .await??
        .ok_or_else(|| user_not_found(id))?;
    Ok(HttpResponse::Ok().json(user))
}

#[post("/api/usuarios")]
pub async fn create_user(
    state: web::Data<AppState>,
    body: web::Json<Option<UserDraft>>,
) -> Result<HttpResponse, ApiError> {
    let draft = body
        .into_inner()
        .ok_or_else(|| ValidationError::invalid("user must not be null"))?;
    validate_user_identity(&draft.name, &draft.email)?;
    validate_password(&draft.password)?;
    let users = state.repos.users.clone();

    let user = web::block(move || -> Result<User, ApiError> {
        if users.user_by_email(&draft.email)?.is_some() {
            return Err(ApiError::Conflict(format!(
                "a user with email {} already exists",
                draft.email
            )));
        }
        let password_hash = hash_password(&draft.password)?;
        Ok(users.insert_user(NewUser {
            name: draft.name,
            email: draft.email,
            password_hash,
            created_at: draft
                .created_at
                .unwrap_or_else(|| Local::now().naive_local()),
            active: draft.active,
        })?)
    })
    .await??;

    log::info!("created user {} <{}>", user.id, user.email);
    Ok(created(format!("/api/usuarios/{}", user.id), &user))
}

#[put("/api/usuarios/{id}")]
pub async fn update_user(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    body: web::Json<Option<UserDraft>>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let draft = body
        .into_inner()
        .ok_or_else(|| ValidationError::invalid("user must not be null"))?;
    if draft.id != id {
        return Err(ApiError::BadRequest(
            "identifier in the URL does not match the user".into(),
        ));
    }
    validate_user_identity(&draft.name, &draft.email)?;
    let users = state.repos.users.clone();

    web::block(move || -> Result<(), ApiError> {
        let existing = users.get_user(id)?.ok_or_else(|| user_not_found(id))?;

        if let Some(other) = users.user_by_email(&draft.email)? {
            if other.id != id {
                return Err(ApiError::Conflict(format!(
                    "email {} is already used by another user",
                    draft.email
                )));
            }
        }

        // A blank password keeps the stored hash.
        let password_hash = if draft.password.trim().is_empty() {
            existing.password_hash
        } else {
            validate_password(&draft.password)?;
            hash_password(&draft.password)?
        };

        let updated = User {
            id,
            name: draft.name,
            email: draft.email,
            password_hash,
            created_at: existing.created_at,
            active: draft.active,
        };
        if !users.update_user(&updated)? {
            return Err(ApiError::Internal(format!("user {id} could not be updated")));
        }
        Ok(())
    })
    .await??;

    log::info!("updated user {id}");
    Ok(HttpResponse::NoContent().finish())
}

#[delete("/api/usuarios/{id}")]
pub async fn delete_user(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let users = state.repos.users.clone();

    web::block(move || -> Result<(), ApiError> {
        if users.get_user(id)?.is_none() {
            return Err(user_not_found(id));
        }
        if !users.delete_user(id)? {
            return Err(ApiError::Internal(format!("user {id} could not be deleted")));
        }
        Ok(())
    })
    .await??;

    log::info!("deleted user {id}");
    Ok(HttpResponse::NoContent().finish())
}

#[post("/api/auth/login")]
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<Option<LoginRequest>>,
) -> Result<HttpResponse, ApiError> {
    let request = body
        .into_inner()
        .filter(|r| !r.email.trim().is_empty() && !r.password.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("email and password are required".into()))?;
    let users = state.repos.users.clone();

    let user = web::block(move || -> Result<Option<User>, ApiError> {
        let Some(user) = users.user_by_email(&request.email)? else {
            return Ok(None);
        };
        if !user.active {
            return Ok(None);
        }
        Ok(verify_password(&request.password, &user.password_hash)?.then_some(user))
    })
    .await??
    .ok_or_else(|| ApiError::Unauthorized("incorrect email or password".into()))?;

    log::info!("user {} logged in", user.email);
    Ok(HttpResponse::Ok().json(json!({ "message": "login successful", "usuario": user })))
}
