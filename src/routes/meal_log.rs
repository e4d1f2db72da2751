use actix_web::{delete, get, post, web, HttpResponse};
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::Deserialize;

use super::created;
use crate::error::ApiError;
use crate::models::{MealLogDraft, MealLogEntry};
use crate::state::AppState;
use crate::validation::prepare_for_creation;

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    #[serde(default, rename = "fechaInicio")]
    start: Option<String>,
    #[serde(default, rename = "fechaFin")]
    end: Option<String>,
}

/// Accepts `YYYY-MM-DD`, or a full timestamp whose date part is used.
fn parse_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|ts| ts.date()))
        .ok()
}

fn entry_not_found(id: i32) -> ApiError {
    ApiError::NotFound(format!("no meal log entry with identifier {id}"))
}

async fn entries_between(
    state: &AppState,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<HttpResponse, ApiError> {
    let meal_log = state.repos.meal_log.clone();
    let entries = web::block(move || meal_log.entries_between(from, to)).await??;
    Ok(HttpResponse::Ok().json(entries))
}

#[get("/api/registroscomida/hoy")]
pub async fn today(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let today = Local::now().date_naive();
    entries_between(&state, today, today).await
}

#[get("/api/registroscomida/fecha/{fecha}")]
pub async fn by_date(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let day = parse_day(&path).ok_or_else(|| {
        ApiError::BadRequest("invalid date format, expected YYYY-MM-DD".into())
    })?;
    entries_between(&state, day, day).await
}

#[get("/api/registroscomida/rango")]
pub async fn by_date_range(
    state: web::Data<AppState>,
    query: web::Query<RangeQuery>,
) -> Result<HttpResponse, ApiError> {
    let RangeQuery { start, end } = query.into_inner();
    let from = start.as_deref().and_then(parse_day).ok_or_else(|| {
        ApiError::BadRequest("invalid start date format, expected YYYY-MM-DD".into())
    })?;
    let to = end.as_deref().and_then(parse_day).ok_or_else(|| {
        ApiError::BadRequest("invalid end date format, expected YYYY-MM-DD".into())
    })?;
    if from > to {
        return Err(ApiError::BadRequest(
            "start date must be on or before end date".into(),
        ));
    }
    entries_between(&state, from, to).await
}

#[get("/api/registroscomida/{id}")]
pub async fn get_entry(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let meal_log = state.repos.meal_log.clone();

    let entry = web::block(move || meal_log.get_entry(id))
        .await??
        .ok_or_else(|| entry_not_found(id))?;
    Ok(HttpResponse::Ok().json(entry))
}

#[post("/api/registroscomida")]
pub async fn create_entry(
    state: web::Data<AppState>,
    body: web::Json<Option<MealLogDraft>>,
) -> Result<HttpResponse, ApiError> {
    let candidate = body.into_inner();
    let foods = state.repos.foods.clone();
    let meal_log = state.repos.meal_log.clone();

    let entry = web::block(move || -> Result<MealLogEntry, ApiError> {
        let prepared = prepare_for_creation(candidate, |food_id| {
            foods.get_food(food_id).map_err(ApiError::from)
        })?;
        Ok(meal_log.insert_entry(prepared)?)
    })
    .await??;

    log::info!(
        "logged {} g of food {} as entry {}",
        entry.grams_consumed,
        entry.food_id,
        entry.id
    );
    Ok(created(format!("/api/registroscomida/{}", entry.id), &entry))
}

#[delete("/api/registroscomida/{id}")]
pub async fn delete_entry(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let meal_log = state.repos.meal_log.clone();

    web::block(move || -> Result<(), ApiError> {
        if meal_log.get_entry(id)?.is_none() {
            return Err(entry_not_found(id));
        }
        if !meal_log.delete_entry(id)? {
            return Err(ApiError::Internal(format!(
                "meal log entry {id} could not be deleted"
            )));
        }
        Ok(())
    })
    .await??;

    log::info!("deleted meal log entry {id}");
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_dates_and_timestamps() {
        let day = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        assert_eq!(parse_day("2025-03-09"), Some(day));
        assert_eq!(parse_day("2025-03-09T18:30:00"), Some(day));
        assert_eq!(parse_day("invalid-date"), None);
        assert_eq!(parse_day("2025-13-01"), None);
    }
}
