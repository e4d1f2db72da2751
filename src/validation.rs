//! Rules applied to client input before anything is stored.

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::ValidationError;
use crate::glycemic::compute_glycemic_load;
use crate::models::{Food, FoodDraft, MealLogDraft, MealType, NewFood, NewMealLogEntry};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Largest portion the `DECIMAL(12,4)` grams column holds.
pub const MAX_GRAMS: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 4); // 99_999_999.9999

/// Largest computed load the `DECIMAL(12,4)` load column holds.
pub const MAX_GLYCEMIC_LOAD: Decimal = MAX_GRAMS;

/// Largest value, and the scale, of the `DECIMAL(10,2)` carbs column.
pub const MAX_CARBS_PER_100G: Decimal = Decimal::from_parts(0x540B_E3FF, 0x2, 0, false, 2); // 99_999_999.99
pub const CARBS_DECIMAL_PLACES: u32 = 2;

/// Validates a candidate log entry and fills in its derived fields.
///
/// Checks run in a fixed order and the first failure is returned: missing
/// entry, unknown food, grams not positive or above [`MAX_GRAMS`], unknown
/// meal type, computed load out of range. Errors from
/// `lookup` itself are returned unchanged. On success an unset timestamp
/// becomes the current local time and a missing glycemic load is computed;
/// a load supplied by the caller is kept as is.
pub fn prepare_for_creation<E, F>(
    candidate: Option<MealLogDraft>,
    lookup: F,
) -> Result<NewMealLogEntry, E>
where
    F: FnOnce(i32) -> Result<Option<Food>, E>,
    E: From<ValidationError>,
{
    let draft = candidate.ok_or_else(|| ValidationError::invalid("entry must not be null"))?;

    let food = lookup(draft.food_id)?.ok_or_else(|| {
        ValidationError::ReferenceNotFound(format!("no food with identifier {}", draft.food_id))
    })?;

    if draft.grams_consumed <= Decimal::ZERO {
        return Err(ValidationError::invalid("grams consumed must be greater than zero").into());
    }
    if draft.grams_consumed > MAX_GRAMS {
        return Err(ValidationError::invalid(format!(
            "grams consumed must not exceed {MAX_GRAMS}"
        ))
        .into());
    }

    let meal_type = MealType::try_from(draft.meal_type)
        .map_err(|_| ValidationError::invalid("meal type not recognized"))?;

    let consumed_at = draft
        .consumed_at
        .filter(|ts| !is_unset(ts))
        .unwrap_or_else(|| Local::now().naive_local());

    let glycemic_load = match draft.glycemic_load {
        Some(load) => load,
        None => compute_glycemic_load(&food, draft.grams_consumed)
            .filter(|load| load.abs() <= MAX_GLYCEMIC_LOAD)
            .ok_or_else(|| ValidationError::invalid("glycemic load is out of range"))?,
    };

    Ok(NewMealLogEntry {
        food_id: food.id,
        consumed_at,
        grams_consumed: draft.grams_consumed,
        meal_type,
        glycemic_load,
    })
}

// Legacy clients send 0001-01-01T00:00:00 for "no timestamp".
fn is_unset(ts: &NaiveDateTime) -> bool {
    NaiveDate::from_ymd_opt(1, 1, 1) == Some(ts.date())
        && NaiveTime::from_hms_opt(0, 0, 0) == Some(ts.time())
}

pub fn validate_food(draft: FoodDraft) -> Result<NewFood, ValidationError> {
    if draft.name.trim().is_empty() {
        return Err(ValidationError::invalid("food name is required"));
    }
    if draft.glycemic_index < 0 {
        return Err(ValidationError::invalid(
            "glycemic index must be zero or greater",
        ));
    }
    if draft.carbs_per_100g < Decimal::ZERO {
        return Err(ValidationError::invalid(
            "carbohydrates per 100g must be zero or greater",
        ));
    }
    // stored as DECIMAL(10,2)
    let carbs_per_100g = draft
        .carbs_per_100g
        .round_dp_with_strategy(CARBS_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero);
    if carbs_per_100g > MAX_CARBS_PER_100G {
        return Err(ValidationError::invalid(format!(
            "carbohydrates per 100g must not exceed {MAX_CARBS_PER_100G}"
        )));
    }

    Ok(NewFood {
        name: draft.name,
        glycemic_index: draft.glycemic_index,
        carbs_per_100g,
        data_source: draft.data_source,
    })
}

/// Name and email rules shared by user creation and update.
pub fn validate_user_identity(name: &str, email: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::invalid("user name is required"));
    }
    if email.trim().is_empty() {
        return Err(ValidationError::invalid("user email is required"));
    }
    if !email.contains('@') || !email.contains('.') {
        return Err(ValidationError::invalid("email format is not valid"));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.trim().is_empty() {
        return Err(ValidationError::invalid("password is required"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::invalid(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}
