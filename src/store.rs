//! Repository seams between the HTTP handlers and storage.
//!
//! Every method blocks; handlers call them inside `web::block`.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::error::StoreError;
use crate::memory::MemoryStore;
use crate::models::{Food, MealLogEntry, NewFood, NewMealLogEntry, NewUser, User};
use crate::query::MysqlStore;

pub trait FoodRepository: Send + Sync {
    fn get_food(&self, id: i32) -> Result<Option<Food>, StoreError>;

    /// All foods ordered by name.
    fn list_foods(&self) -> Result<Vec<Food>, StoreError>;

    /// Foods whose name contains `fragment`, ordered by name.
    fn search_foods(&self, fragment: &str) -> Result<Vec<Food>, StoreError>;

    fn insert_food(&self, food: NewFood) -> Result<Food, StoreError>;

    /// Returns false when no food has `food.id`.
    fn update_food(&self, food: &Food) -> Result<bool, StoreError>;

    /// Returns false when nothing was deleted. Log entries referencing the
    /// food are deleted with it.
    fn delete_food(&self, id: i32) -> Result<bool, StoreError>;
}

pub trait MealLogRepository: Send + Sync {
    /// The entry with its food attached.
    fn get_entry(&self, id: i32) -> Result<Option<MealLogEntry>, StoreError>;

    /// Entries consumed on any day in `from..=to`, newest first, foods attached.
    fn entries_between(&self, from: NaiveDate, to: NaiveDate)
        -> Result<Vec<MealLogEntry>, StoreError>;

    fn insert_entry(&self, entry: NewMealLogEntry) -> Result<MealLogEntry, StoreError>;

    fn delete_entry(&self, id: i32) -> Result<bool, StoreError>;
}

pub trait UserRepository: Send + Sync {
    fn get_user(&self, id: i32) -> Result<Option<User>, StoreError>;

    fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// All users ordered by name.
    fn list_users(&self) -> Result<Vec<User>, StoreError>;

    fn insert_user(&self, user: NewUser) -> Result<User, StoreError>;

    /// Overwrites name, email, password hash and active flag.
    fn update_user(&self, user: &User) -> Result<bool, StoreError>;

    fn delete_user(&self, id: i32) -> Result<bool, StoreError>;
}

#[derive(Clone)]
pub struct Repositories {
    pub foods: Arc<dyn FoodRepository>,
    pub meal_log: Arc<dyn MealLogRepository>,
    pub users: Arc<dyn UserRepository>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::default());
        Self {
            foods: store.clone(),
            meal_log: store.clone(),
            users: store,
        }
    }

    pub fn mysql(store: MysqlStore) -> Self {
        let store = Arc::new(store);
        Self {
            foods: store.clone(),
            meal_log: store.clone(),
            users: store,
        }
    }
}
