//! MySQL-backed repositories.
//!
//! Every call checks out a pooled connection and runs behind a circuit breaker;
//! rejected calls surface as [`StoreError::Unavailable`].

use std::collections::HashMap;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::{BigInt, Unsigned};
use failsafe::backoff::EqualJittered;
use failsafe::failure_policy::{ConsecutiveFailures, OrElse, SuccessRateOverTimeWindow};
use failsafe::{CircuitBreaker, Config as BreakerConfig, StateMachine};
use rust_decimal::Decimal;

use crate::error::StoreError;
use crate::models::{Food, MealLogEntry, MealType, NewFood, NewMealLogEntry, NewUser, User};
use crate::schema::{self, foods, meal_log_entries, users};
use crate::store::{FoodRepository, MealLogRepository, UserRepository};

pub type DbPool = r2d2::Pool<ConnectionManager<MysqlConnection>>;

type CircuitBreakerType = StateMachine<
    OrElse<SuccessRateOverTimeWindow<EqualJittered>, ConsecutiveFailures<EqualJittered>>,
    (),
>;

diesel::define_sql_function!(fn last_insert_id() -> Unsigned<BigInt>);

#[derive(Queryable, Selectable)]
#[diesel(table_name = foods)]
#[diesel(check_for_backend(diesel::mysql::Mysql))]
struct FoodRow {
    id: i32,
    name: String,
    glycemic_index: i32,
    carbs_per_100g: Decimal,
    data_source: Option<String>,
}

impl From<FoodRow> for Food {
    fn from(row: FoodRow) -> Self {
        Food {
            id: row.id,
            name: row.name,
            glycemic_index: row.glycemic_index,
            carbs_per_100g: row.carbs_per_100g,
            data_source: row.data_source,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = foods)]
struct NewFoodRow<'a> {
    name: &'a str,
    glycemic_index: i32,
    carbs_per_100g: Decimal,
    data_source: Option<&'a str>,
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = meal_log_entries)]
#[diesel(check_for_backend(diesel::mysql::Mysql))]
struct MealLogRow {
    id: i32,
    food_id: i32,
    consumed_at: NaiveDateTime,
    grams_consumed: Decimal,
    meal_type: i32,
    glycemic_load: Option<Decimal>,
}

impl TryFrom<MealLogRow> for MealLogEntry {
    type Error = StoreError;

    fn try_from(row: MealLogRow) -> Result<Self, Self::Error> {
        let meal_type = MealType::try_from(row.meal_type)
            .map_err(|e| StoreError::CorruptRow(format!("meal log entry {}: {e}", row.id)))?;

        Ok(MealLogEntry {
            id: row.id,
            food_id: row.food_id,
            consumed_at: row.consumed_at,
            grams_consumed: row.grams_consumed,
            meal_type,
            glycemic_load: row.glycemic_load,
            food: None,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = meal_log_entries)]
struct NewMealLogRow {
    food_id: i32,
    consumed_at: NaiveDateTime,
    grams_consumed: Decimal,
    meal_type: i32,
    glycemic_load: Option<Decimal>,
}

impl From<&NewMealLogEntry> for NewMealLogRow {
    fn from(entry: &NewMealLogEntry) -> Self {
        NewMealLogRow {
            food_id: entry.food_id,
            consumed_at: entry.consumed_at,
            grams_consumed: entry.grams_consumed,
            meal_type: entry.meal_type.into(),
            glycemic_load: Some(entry.glycemic_load),
        }
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::mysql::Mysql))]
struct UserRow {
    id: i32,
    name: String,
    email: String,
    password_hash: String,
    created_at: NaiveDateTime,
    active: bool,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            created_at: row.created_at,
            active: row.active,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = users)]
struct NewUserRow<'a> {
    name: &'a str,
    email: &'a str,
    password_hash: &'a str,
    created_at: NaiveDateTime,
    active: bool,
}

#[derive(Clone)]
pub struct MysqlStore {
    pool: DbPool,
    circuit_breaker: CircuitBreakerType,
}

impl MysqlStore {
    pub fn connect(database_url: &str, max_size: u32) -> Result<Self, StoreError> {
        let manager = ConnectionManager::<MysqlConnection>::new(database_url);
        let pool = r2d2::Pool::builder().max_size(max_size).build(manager)?;

        Ok(Self {
            pool,
            circuit_breaker: BreakerConfig::new().build(),
        })
    }

    /// Creates any missing tables.
    pub fn ensure_schema(&self) -> Result<(), StoreError> {
        self.call(|conn| {
            for statement in schema::CREATE_TABLES {
                diesel::sql_query(*statement).execute(conn)?;
            }
            Ok(())
        })
    }

    fn call<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut MysqlConnection) -> Result<T, StoreError>,
    {
        let result = self.circuit_breaker.call(|| -> Result<T, StoreError> {
            let mut conn = self.pool.get()?;
            f(&mut conn)
        });

        match result {
            Ok(value) => Ok(value),
            Err(failsafe::Error::Rejected) => {
                log::warn!("circuit breaker open, rejecting database call");
                Err(StoreError::Unavailable)
            }
            Err(failsafe::Error::Inner(e)) => Err(e),
        }
    }
}

fn inserted_id(conn: &mut MysqlConnection) -> Result<i32, StoreError> {
    let id: u64 = diesel::select(last_insert_id()).get_result(conn)?;
    i32::try_from(id).map_err(|_| StoreError::CorruptRow(format!("inserted id {id} out of range")))
}

// uk_users_email
fn email_conflict(err: DieselError, email: &str) -> StoreError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            StoreError::Duplicate(format!("a user with email {email} already exists"))
        }
        other => StoreError::Query(other),
    }
}

/// Half-open `[start, end)` timestamps covering the days `from..=to`.
fn day_bounds(from: NaiveDate, to: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let start = from.and_time(NaiveTime::MIN);
    let end = to
        .and_time(NaiveTime::MIN)
        .checked_add_signed(Duration::days(1))
        .unwrap_or(NaiveDateTime::MAX);
    (start, end)
}

fn attach_foods(
    conn: &mut MysqlConnection,
    rows: Vec<MealLogRow>,
) -> Result<Vec<MealLogEntry>, StoreError> {
    let mut food_ids: Vec<i32> = rows.iter().map(|row| row.food_id).collect();
    food_ids.sort_unstable();
    food_ids.dedup();

    let by_id: HashMap<i32, Food> = foods::table
        .filter(foods::id.eq_any(food_ids))
        .select(FoodRow::as_select())
        .load::<FoodRow>(conn)?
        .into_iter()
        .map(|row| (row.id, Food::from(row)))
        .collect();

    rows.into_iter()
        .map(|row| {
            let mut entry = MealLogEntry::try_from(row)?;
            entry.food = by_id.get(&entry.food_id).cloned();
            Ok(entry)
        })
        .collect()
}

impl FoodRepository for MysqlStore {
    fn get_food(&self, id: i32) -> Result<Option<Food>, StoreError> {
        self.call(|conn| {
            let row = foods::table
                .find(id)
                .select(FoodRow::as_select())
                .first::<FoodRow>(conn)
                .optional()?;
            Ok(row.map(Food::from))
        })
    }

    fn list_foods(&self) -> Result<Vec<Food>, StoreError> {
        self.call(|conn| {
            let rows = foods::table
                .order(foods::name.asc())
                .select(FoodRow::as_select())
                .load::<FoodRow>(conn)?;
            Ok(rows.into_iter().map(Food::from).collect())
        })
    }

    fn search_foods(&self, fragment: &str) -> Result<Vec<Food>, StoreError> {
        let pattern = format!("%{fragment}%");
        self.call(|conn| {
            let rows = foods::table
                .filter(foods::name.like(pattern))
                .order(foods::name.asc())
                .select(FoodRow::as_select())
                .load::<FoodRow>(conn)?;
            Ok(rows.into_iter().map(Food::from).collect())
        })
    }

    fn insert_food(&self, food: NewFood) -> Result<Food, StoreError> {
        self.call(|conn| {
            conn.transaction::<_, StoreError, _>(|conn| {
                diesel::insert_into(foods::table)
                    .values(NewFoodRow {
                        name: &food.name,
                        glycemic_index: food.glycemic_index,
                        carbs_per_100g: food.carbs_per_100g,
                        data_source: food.data_source.as_deref(),
                    })
                    .execute(conn)?;
                let id = inserted_id(conn)?;
                Ok(food.with_id(id))
            })
        })
    }

    fn update_food(&self, food: &Food) -> Result<bool, StoreError> {
        self.call(|conn| {
            let updated = diesel::update(foods::table.find(food.id))
                .set((
                    foods::name.eq(&food.name),
                    foods::glycemic_index.eq(food.glycemic_index),
                    foods::carbs_per_100g.eq(food.carbs_per_100g),
                    foods::data_source.eq(food.data_source.as_deref()),
                ))
                .execute(conn)?;
            Ok(updated > 0)
        })
    }

    fn delete_food(&self, id: i32) -> Result<bool, StoreError> {
        self.call(|conn| Ok(diesel::delete(foods::table.find(id)).execute(conn)? > 0))
    }
}

impl MealLogRepository for MysqlStore {
    fn get_entry(&self, id: i32) -> Result<Option<MealLogEntry>, StoreError> {
        self.call(|conn| {
            let row = meal_log_entries::table
                .find(id)
                .select(MealLogRow::as_select())
                .first::<MealLogRow>(conn)
                .optional()?;
            match row {
                Some(row) => Ok(attach_foods(conn, vec![row])?.pop()),
                None => Ok(None),
            }
        })
    }

    fn entries_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<MealLogEntry>, StoreError> {
        let (start, end) = day_bounds(from, to);
        self.call(|conn| {
            let rows = meal_log_entries::table
                .filter(meal_log_entries::consumed_at.ge(start))
                .filter(meal_log_entries::consumed_at.lt(end))
                .order((meal_log_entries::consumed_at.desc(), meal_log_entries::id.desc()))
                .select(MealLogRow::as_select())
                .load::<MealLogRow>(conn)?;
            attach_foods(conn, rows)
        })
    }

    fn insert_entry(&self, entry: NewMealLogEntry) -> Result<MealLogEntry, StoreError> {
        self.call(|conn| {
            conn.transaction::<_, StoreError, _>(|conn| {
                diesel::insert_into(meal_log_entries::table)
                    .values(NewMealLogRow::from(&entry))
                    .execute(conn)?;
                let id = inserted_id(conn)?;
                Ok(entry.with_id(id))
            })
        })
    }

    fn delete_entry(&self, id: i32) -> Result<bool, StoreError> {
        self.call(|conn| Ok(diesel::delete(meal_log_entries::table.find(id)).execute(conn)? > 0))
    }
}

impl UserRepository for MysqlStore {
    fn get_user(&self, id: i32) -> Result<Option<User>, StoreError> {
        self.call(|conn| {
            let row = users::table
                .find(id)
                .select(UserRow::as_select())
                .first::<UserRow>(conn)
                .optional()?;
            Ok(row.map(User::from))
        })
    }

    fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.call(|conn| {
            let row = users::table
                .filter(users::email.eq(email))
                .select(UserRow::as_select())
                .first::<UserRow>(conn)
                .optional()?;
            Ok(row.map(User::from))
        })
    }

    fn list_users(&self) -> Result<Vec<User>, StoreError> {
        self.call(|conn| {
            let rows = users::table
                .order(users::name.asc())
                .select(UserRow::as_select())
                .load::<UserRow>(conn)?;
            Ok(rows.into_iter().map(User::from).collect())
        })
    }

    fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        self.call(|conn| {
            conn.transaction::<_, StoreError, _>(|conn| {
                diesel::insert_into(users::table)
                    .values(NewUserRow {
                        name: &user.name,
                        email: &user.email,
                        password_hash: &user.password_hash,
                        created_at: user.created_at,
                        active: user.active,
                    })
                    .execute(conn)
                    .map_err(|e| email_conflict(e, &user.email))?;
                let id = inserted_id(conn)?;
                Ok(user.with_id(id))
            })
        })
    }

    fn update_user(&self, user: &User) -> Result<bool, StoreError> {
        self.call(|conn| {
            let updated = diesel::update(users::table.find(user.id))
                .set((
                    users::name.eq(&user.name),
                    users::email.eq(&user.email),
                    users::password_hash.eq(&user.password_hash),
                    users::active.eq(user.active),
                ))
                .execute(conn)
                .map_err(|e| email_conflict(e, &user.email))?;
            Ok(updated > 0)
        })
    }

    fn delete_user(&self, id: i32) -> Result<bool, StoreError> {
        self.call(|conn| Ok(diesel::delete(users::table.find(id)).execute(conn)? > 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(meal_type: i32) -> MealLogRow {
        MealLogRow {
            id: 12,
            food_id: 3,
            consumed_at: NaiveDate::from_ymd_opt(2025, 2, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            grams_consumed: Decimal::from(80),
            meal_type,
            glycemic_load: None,
        }
    }

    #[test]
    fn rows_map_meal_type_codes() {
        let entry = MealLogEntry::try_from(row(3)).unwrap();
        assert_eq!(entry.meal_type, MealType::Dinner);
        assert_eq!(entry.glycemic_load, None);
        assert!(entry.food.is_none());
    }

    #[test]
    fn unknown_meal_type_code_is_a_corrupt_row() {
        let err = MealLogEntry::try_from(row(7)).unwrap_err();
        assert!(matches!(err, StoreError::CorruptRow(msg) if msg.contains("entry 12")));
    }

    #[test]
    fn new_rows_store_meal_type_code_and_load() {
        let entry = NewMealLogEntry {
            food_id: 3,
            consumed_at: row(1).consumed_at,
            grams_consumed: Decimal::from(80),
            meal_type: MealType::Snack,
            glycemic_load: Decimal::from(5),
        };
        let new_row = NewMealLogRow::from(&entry);
        assert_eq!(new_row.meal_type, 4);
        assert_eq!(new_row.glycemic_load, Some(Decimal::from(5)));
    }

    #[test]
    fn unique_violations_become_duplicates() {
        let violation = DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new("Duplicate entry 'ana@example.com' for key 'uk_users_email'".to_string()),
        );
        let err = email_conflict(violation, "ana@example.com");
        assert!(matches!(err, StoreError::Duplicate(msg) if msg.contains("ana@example.com")));

        let other = email_conflict(DieselError::NotFound, "ana@example.com");
        assert!(matches!(other, StoreError::Query(DieselError::NotFound)));
    }

    #[test]
    fn day_bounds_cover_whole_days() {
        let from = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2025, 2, 3).unwrap();
        let (start, end) = day_bounds(from, to);
        assert_eq!(start.to_string(), "2025-02-01 00:00:00");
        assert_eq!(end.to_string(), "2025-02-04 00:00:00");
    }
}
