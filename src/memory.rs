//! In-process store, used when no database is configured.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::NaiveDate;

use crate::error::StoreError;
use crate::models::{Food, MealLogEntry, NewFood, NewMealLogEntry, NewUser, User};
use crate::store::{FoodRepository, MealLogRepository, UserRepository};

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    foods: BTreeMap<i32, Food>,
    entries: BTreeMap<i32, MealLogEntry>,
    users: BTreeMap<i32, User>,
    last_food_id: i32,
    last_entry_id: i32,
    last_user_id: i32,
}

impl Tables {
    fn with_food(&self, entry: &MealLogEntry) -> MealLogEntry {
        MealLogEntry {
            food: self.foods.get(&entry.food_id).cloned(),
            ..entry.clone()
        }
    }
}

fn next_id(last: &mut i32) -> i32 {
    *last += 1;
    *last
}

// Name ordering and matching follow the case-insensitive MySQL collation.
fn name_key(name: &str) -> String {
    name.to_lowercase()
}

impl MemoryStore {
    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FoodRepository for MemoryStore {
    fn get_food(&self, id: i32) -> Result<Option<Food>, StoreError> {
        Ok(self.read().foods.get(&id).cloned())
    }

    fn list_foods(&self) -> Result<Vec<Food>, StoreError> {
        let mut foods: Vec<Food> = self.read().foods.values().cloned().collect();
        foods.sort_by_key(|food| (name_key(&food.name), food.id));
        Ok(foods)
    }

    fn search_foods(&self, fragment: &str) -> Result<Vec<Food>, StoreError> {
        let needle = name_key(fragment);
        let mut foods: Vec<Food> = self
            .read()
            .foods
            .values()
            .filter(|food| name_key(&food.name).contains(&needle))
            .cloned()
            .collect();
        foods.sort_by_key(|food| (name_key(&food.name), food.id));
        Ok(foods)
    }

    fn insert_food(&self, food: NewFood) -> Result<Food, StoreError> {
        let mut tables = self.write();
        let food = food.with_id(next_id(&mut tables.last_food_id));
        tables.foods.insert(food.id, food.clone());
        Ok(food)
    }

    fn update_food(&self, food: &Food) -> Result<bool, StoreError> {
        let mut tables = self.write();
        match tables.foods.get_mut(&food.id) {
            Some(stored) => {
                *stored = food.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_food(&self, id: i32) -> Result<bool, StoreError> {
        let mut tables = self.write();
        if tables.foods.remove(&id).is_none() {
            return Ok(false);
        }
        tables.entries.retain(|_, entry| entry.food_id != id);
        Ok(true)
    }
}

impl MealLogRepository for MemoryStore {
    fn get_entry(&self, id: i32) -> Result<Option<MealLogEntry>, StoreError> {
        let tables = self.read();
        Ok(tables.entries.get(&id).map(|entry| tables.with_food(entry)))
    }

    fn entries_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<MealLogEntry>, StoreError> {
        let tables = self.read();
        let mut entries: Vec<MealLogEntry> = tables
            .entries
            .values()
            .filter(|entry| (from..=to).contains(&entry.consumed_at.date()))
            .map(|entry| tables.with_food(entry))
            .collect();
        entries.sort_by(|a, b| b.consumed_at.cmp(&a.consumed_at).then(b.id.cmp(&a.id)));
        Ok(entries)
    }

    fn insert_entry(&self, entry: NewMealLogEntry) -> Result<MealLogEntry, StoreError> {
        let mut tables = self.write();
        if !tables.foods.contains_key(&entry.food_id) {
            return Err(StoreError::CorruptRow(format!(
                "meal log entry references missing food {}",
                entry.food_id
            )));
        }
        let entry = entry.with_id(next_id(&mut tables.last_entry_id));
        tables.entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    fn delete_entry(&self, id: i32) -> Result<bool, StoreError> {
        Ok(self.write().entries.remove(&id).is_some())
    }
}

fn email_taken(tables: &Tables, email: &str, except: Option<i32>) -> bool {
    tables
        .users
        .values()
        .any(|user| Some(user.id) != except && user.email.eq_ignore_ascii_case(email))
}

fn duplicate_email(email: &str) -> StoreError {
    StoreError::Duplicate(format!("a user with email {email} already exists"))
}

impl UserRepository for MemoryStore {
    fn get_user(&self, id: i32) -> Result<Option<User>, StoreError> {
        Ok(self.read().users.get(&id).cloned())
    }

    fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .read()
            .users
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.read().users.values().cloned().collect();
        users.sort_by_key(|user| (name_key(&user.name), user.id));
        Ok(users)
    }

    fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.write();
        if email_taken(&tables, &user.email, None) {
            return Err(duplicate_email(&user.email));
        }
        let user = user.with_id(next_id(&mut tables.last_user_id));
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn update_user(&self, user: &User) -> Result<bool, StoreError> {
        let mut tables = self.write();
        if email_taken(&tables, &user.email, Some(user.id)) {
            return Err(duplicate_email(&user.email));
        }
        match tables.users.get_mut(&user.id) {
            Some(stored) => {
                stored.name = user.name.clone();
                stored.email = user.email.clone();
                stored.password_hash = user.password_hash.clone();
                stored.active = user.active;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_user(&self, id: i32) -> Result<bool, StoreError> {
        Ok(self.write().users.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MealType;
    use chrono::NaiveDateTime;
    use rust_decimal::Decimal;

    fn new_food(name: &str) -> NewFood {
        NewFood {
            name: name.into(),
            glycemic_index: 50,
            carbs_per_100g: Decimal::from(20),
            data_source: None,
        }
    }

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn new_entry(food_id: i32, consumed_at: NaiveDateTime) -> NewMealLogEntry {
        NewMealLogEntry {
            food_id,
            consumed_at,
            grams_consumed: Decimal::from(100),
            meal_type: MealType::Lunch,
            glycemic_load: Decimal::from(10),
        }
    }

    #[test]
    fn foods_get_sequential_ids_and_sort_by_name() {
        let store = MemoryStore::default();
        let pera = store.insert_food(new_food("pera")).unwrap();
        let arroz = store.insert_food(new_food("Arroz")).unwrap();
        assert_eq!((pera.id, arroz.id), (1, 2));

        let names: Vec<String> = store.list_foods().unwrap().into_iter().map(|f| f.name).collect();
        assert_eq!(names, ["Arroz", "pera"]);
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let store = MemoryStore::default();
        store.insert_food(new_food("Manzana (Roja)")).unwrap();
        store.insert_food(new_food("Manzana (Verde)")).unwrap();
        store.insert_food(new_food("Pan")).unwrap();

        assert_eq!(store.search_foods("manzana").unwrap().len(), 2);
        assert_eq!(store.search_foods("ROJA").unwrap().len(), 1);
        assert!(store.search_foods("leche").unwrap().is_empty());
    }

    #[test]
    fn update_and_delete_report_missing_rows() {
        let store = MemoryStore::default();
        let mut food = store.insert_food(new_food("Pan")).unwrap();
        food.glycemic_index = 75;
        assert!(store.update_food(&food).unwrap());
        assert_eq!(store.get_food(food.id).unwrap().unwrap().glycemic_index, 75);

        food.id = 99;
        assert!(!store.update_food(&food).unwrap());
        assert!(!store.delete_food(99).unwrap());
    }

    #[test]
    fn entries_between_is_inclusive_and_newest_first() {
        let store = MemoryStore::default();
        let food = store.insert_food(new_food("Pan")).unwrap();
        store.insert_entry(new_entry(food.id, at(1, 8))).unwrap();
        store.insert_entry(new_entry(food.id, at(2, 8))).unwrap();
        store.insert_entry(new_entry(food.id, at(2, 20))).unwrap();
        store.insert_entry(new_entry(food.id, at(4, 8))).unwrap();

        let day = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let entries = store.entries_between(day, day).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].consumed_at, at(2, 20));
        assert_eq!(entries[0].food.as_ref().map(|f| f.id), Some(food.id));

        let range = store
            .entries_between(
                NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2025, 1, 3).unwrap(),
            )
            .unwrap();
        assert_eq!(range.len(), 3);
    }

    #[test]
    fn deleting_food_cascades_to_entries() {
        let store = MemoryStore::default();
        let food = store.insert_food(new_food("Pan")).unwrap();
        let entry = store.insert_entry(new_entry(food.id, at(1, 8))).unwrap();

        assert!(store.delete_food(food.id).unwrap());
        assert!(store.get_entry(entry.id).unwrap().is_none());
    }

    #[test]
    fn entry_for_missing_food_is_refused() {
        let store = MemoryStore::default();
        assert!(store.insert_entry(new_entry(5, at(1, 8))).is_err());
    }

    #[test]
    fn users_are_found_by_email_ignoring_case() {
        let store = MemoryStore::default();
        let user = store
            .insert_user(NewUser {
                name: "Ana".into(),
                email: "Ana@Example.com".into(),
                password_hash: "hash".into(),
                created_at: at(1, 8),
                active: true,
            })
            .unwrap();
        let found = store.user_by_email("ana@example.com").unwrap().unwrap();
        assert_eq!(found.id, user.id);
    }

    #[test]
    fn duplicate_emails_are_refused_at_insert_and_update() {
        let store = MemoryStore::default();
        let new_user = |name: &str, email: &str| NewUser {
            name: name.into(),
            email: email.into(),
            password_hash: "hash".into(),
            created_at: at(1, 8),
            active: true,
        };
        store.insert_user(new_user("Ana", "ana@example.com")).unwrap();
        let luis = store.insert_user(new_user("Luis", "luis@example.com")).unwrap();

        let err = store
            .insert_user(new_user("Otra", "ANA@example.com"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));

        let renamed = User {
            email: "ana@example.com".into(),
            ..luis.clone()
        };
        assert!(matches!(store.update_user(&renamed), Err(StoreError::Duplicate(_))));

        // keeping one's own email is not a conflict
        assert!(store.update_user(&luis).unwrap());
        assert_eq!(store.list_users().unwrap().len(), 2);
    }
}
