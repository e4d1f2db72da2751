//! Domain types and their JSON wire format.
//!
//! Field names on the wire match the existing client (`nombre`,
//! `gramosConsumidos`, ...). Decimals travel as JSON numbers.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Food {
    pub id: i32,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "indiceGlucemico")]
    pub glycemic_index: i32,
    #[serde(rename = "carbsPor100g", with = "rust_decimal::serde::float")]
    pub carbs_per_100g: Decimal,
    #[serde(rename = "fuenteDatos")]
    pub data_source: Option<String>,
}

/// Food as submitted by a client, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FoodDraft {
    pub id: i32,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "indiceGlucemico")]
    pub glycemic_index: i32,
    #[serde(rename = "carbsPor100g", with = "rust_decimal::serde::float")]
    pub carbs_per_100g: Decimal,
    #[serde(rename = "fuenteDatos")]
    pub data_source: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewFood {
    pub name: String,
    pub glycemic_index: i32,
    pub carbs_per_100g: Decimal,
    pub data_source: Option<String>,
}

impl NewFood {
    pub fn with_id(self, id: i32) -> Food {
        Food {
            id,
            name: self.name,
            glycemic_index: self.glycemic_index,
            carbs_per_100g: self.carbs_per_100g,
            data_source: self.data_source,
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown meal type {0}")]
pub struct UnknownMealType(pub i32);

/// Closed set of meal classifications, stored and sent as 1..=4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum MealType {
    Breakfast = 1,
    Lunch = 2,
    Dinner = 3,
    Snack = 4,
}

impl TryFrom<i32> for MealType {
    type Error = UnknownMealType;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(MealType::Breakfast),
            2 => Ok(MealType::Lunch),
            3 => Ok(MealType::Dinner),
            4 => Ok(MealType::Snack),
            other => Err(UnknownMealType(other)),
        }
    }
}

impl From<MealType> for i32 {
    fn from(meal_type: MealType) -> Self {
        meal_type as i32
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealLogEntry {
    pub id: i32,
    #[serde(rename = "alimentoId")]
    pub food_id: i32,
    #[serde(rename = "fechaHora")]
    pub consumed_at: NaiveDateTime,
    #[serde(rename = "gramosConsumidos", with = "rust_decimal::serde::float")]
    pub grams_consumed: Decimal,
    #[serde(rename = "tipoComida")]
    pub meal_type: MealType,
    #[serde(
        rename = "cargaGlucemicaCalculada",
        with = "rust_decimal::serde::float_option"
    )]
    pub glycemic_load: Option<Decimal>,
    /// The referenced food, attached on reads while it still exists.
    #[serde(rename = "alimento")]
    pub food: Option<Food>,
}

/// Candidate log entry as deserialized from a request.
///
/// Every field defaults so that missing values are reported by the validator
/// in its own order instead of by the deserializer. `meal_type` stays raw.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MealLogDraft {
    #[serde(rename = "alimentoId")]
    pub food_id: i32,
    #[serde(rename = "fechaHora")]
    pub consumed_at: Option<NaiveDateTime>,
    #[serde(rename = "gramosConsumidos", with = "rust_decimal::serde::float")]
    pub grams_consumed: Decimal,
    #[serde(rename = "tipoComida")]
    pub meal_type: i32,
    #[serde(
        rename = "cargaGlucemicaCalculada",
        with = "rust_decimal::serde::float_option"
    )]
    pub glycemic_load: Option<Decimal>,
}

/// A validated entry ready to be stored; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMealLogEntry {
    pub food_id: i32,
    pub consumed_at: NaiveDateTime,
    pub grams_consumed: Decimal,
    pub meal_type: MealType,
    pub glycemic_load: Decimal,
}

impl NewMealLogEntry {
    pub fn with_id(self, id: i32) -> MealLogEntry {
        MealLogEntry {
            id,
            food_id: self.food_id,
            consumed_at: self.consumed_at,
            grams_consumed: self.grams_consumed,
            meal_type: self.meal_type,
            glycemic_load: Some(self.glycemic_load),
            food: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i32,
    #[serde(rename = "nombre")]
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    #[serde(rename = "fechaCreacion")]
    pub created_at: NaiveDateTime,
    #[serde(rename = "activo")]
    pub active: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserDraft {
    pub id: i32,
    #[serde(rename = "nombre")]
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "fechaCreacion")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(rename = "activo")]
    pub active: bool,
}

impl Default for UserDraft {
    fn default() -> Self {
        Self {
            id: 0,
            name: String::new(),
            email: String::new(),
            password: String::new(),
            created_at: None,
            active: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: NaiveDateTime,
    pub active: bool,
}

impl NewUser {
    pub fn with_id(self, id: i32) -> User {
        User {
            id,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            created_at: self.created_at,
            active: self.active,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn meal_type_accepts_only_known_codes() {
        assert_eq!(MealType::try_from(1).unwrap(), MealType::Breakfast);
        assert_eq!(MealType::try_from(4).unwrap(), MealType::Snack);
        assert!(MealType::try_from(0).is_err());
        assert!(MealType::try_from(5).is_err());
        assert_eq!(i32::from(MealType::Dinner), 3);
    }

    #[test]
    fn draft_fields_default_when_missing() {
        let draft: MealLogDraft = serde_json::from_str(r#"{"alimentoId": 7}"#).unwrap();
        assert_eq!(draft.food_id, 7);
        assert_eq!(draft.grams_consumed, Decimal::ZERO);
        assert_eq!(draft.meal_type, 0);
        assert!(draft.consumed_at.is_none());
        assert!(draft.glycemic_load.is_none());
    }

    #[test]
    fn draft_reads_client_field_names() {
        let draft: MealLogDraft = serde_json::from_str(
            r#"{
                "alimentoId": 1,
                "fechaHora": "2025-03-01T08:30:00",
                "gramosConsumidos": 150.5,
                "tipoComida": 2,
                "cargaGlucemicaCalculada": 9.99
            }"#,
        )
        .unwrap();
        assert_eq!(draft.grams_consumed, Decimal::from_str("150.5").unwrap());
        assert_eq!(draft.meal_type, 2);
        assert_eq!(draft.glycemic_load, Some(Decimal::from_str("9.99").unwrap()));
        assert_eq!(
            draft.consumed_at.unwrap().to_string(),
            "2025-03-01 08:30:00"
        );
    }

    #[test]
    fn user_serialization_omits_password_hash() {
        let user = User {
            id: 3,
            name: "Ana".into(),
            email: "ana@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            created_at: NaiveDateTime::default(),
            active: true,
        };
        let body = serde_json::to_string(&user).unwrap();
        assert!(!body.contains("argon2"));
        assert!(body.contains(r#""nombre":"Ana""#));
        assert!(body.contains(r#""activo":true"#));
    }

    #[test]
    fn user_draft_is_active_by_default() {
        let draft: UserDraft = serde_json::from_str(r#"{"nombre": "Ana"}"#).unwrap();
        assert!(draft.active);
    }
}
