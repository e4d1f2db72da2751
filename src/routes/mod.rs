use actix_web::{http::header, web, HttpResponse};
use serde::Serialize;

use crate::error::ApiError;

pub mod foods;
pub mod meal_log;
pub mod users;

/// Registers every endpoint. Literal paths are registered before the
/// `{id}` patterns they would otherwise collide with.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into()),
    )
    .service(foods::list_foods)
    .service(foods::search_foods)
    .service(foods::get_food)
    .service(foods::create_food)
    .service(foods::update_food)
    .service(foods::delete_food)
    .service(meal_log::today)
    .service(meal_log::by_date)
    .service(meal_log::by_date_range)
    .service(meal_log::get_entry)
    .service(meal_log::create_entry)
    .service(meal_log::delete_entry)
    .service(users::list_users)
    .service(users::get_user_by_email)
    .service(users::get_user)
    .service(users::create_user)
    .service(users::update_user)
    .service(users::delete_user)
    .service(users::login);
}

fn created<T: Serialize>(location: String, body: &T) -> HttpResponse {
    HttpResponse::Created()
        .insert_header((header::LOCATION, location))
        .json(body)
}
