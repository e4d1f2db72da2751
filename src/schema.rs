diesel::table! {
    foods (id) {
        id -> Integer,
        name -> Varchar,
        glycemic_index -> Integer,
        carbs_per_100g -> Numeric,
        data_source -> Nullable<Varchar>,
    }
}

diesel::table! {
    meal_log_entries (id) {
        id -> Integer,
        food_id -> Integer,
        consumed_at -> Timestamp,
        grams_consumed -> Numeric,
        meal_type -> Integer,
        glycemic_load -> Nullable<Numeric>,
    }
}

diesel::table! {
    users (id) {
        id -> Integer,
        name -> Varchar,
        email -> Varchar,
        password_hash -> Varchar,
        created_at -> Timestamp,
        active -> Bool,
    }
}

diesel::joinable!(meal_log_entries -> foods (food_id));

diesel::allow_tables_to_appear_in_same_query!(foods, meal_log_entries, users);

/// Statements run at start-up against MySQL; every one is idempotent.
pub const CREATE_TABLES: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS foods (
        id INT NOT NULL AUTO_INCREMENT,
        name VARCHAR(255) NOT NULL,
        glycemic_index INT NOT NULL,
        carbs_per_100g DECIMAL(10, 2) NOT NULL,
        data_source VARCHAR(100) NULL,
        PRIMARY KEY (id),
        INDEX idx_foods_name (name)
    ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci",
    "CREATE TABLE IF NOT EXISTS users (
        id INT NOT NULL AUTO_INCREMENT,
        name VARCHAR(255) NOT NULL,
        email VARCHAR(255) NOT NULL,
        password_hash VARCHAR(255) NOT NULL,
        created_at DATETIME NOT NULL,
        active BOOLEAN NOT NULL DEFAULT TRUE,
        PRIMARY KEY (id),
        UNIQUE KEY uk_users_email (email)
    ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci",
    "CREATE TABLE IF NOT EXISTS meal_log_entries (
        id INT NOT NULL AUTO_INCREMENT,
        food_id INT NOT NULL,
        consumed_at DATETIME NOT NULL,
        grams_consumed DECIMAL(12, 4) NOT NULL,
        meal_type INT NOT NULL,
        glycemic_load DECIMAL(12, 4) NULL,
        PRIMARY KEY (id),
        INDEX idx_meal_log_consumed_at (consumed_at),
        CONSTRAINT fk_meal_log_food
            FOREIGN KEY (food_id) REFERENCES foods (id)
            ON DELETE CASCADE ON UPDATE CASCADE
    ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci",
];
