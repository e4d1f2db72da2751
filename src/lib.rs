//! Glycemic load tracker.
//!
//! REST service over a food catalog, user accounts and a meal log. Each logged
//! meal carries a glycemic load derived from the food's glycemic index and the
//! carbohydrates in the portion eaten (see [`glycemic`] and [`validation`]).

pub mod cache;
pub mod config;
pub mod error;
pub mod glycemic;
pub mod memory;
pub mod models;
pub mod password;
pub mod query;
pub mod routes;
pub mod schema;
pub mod state;
pub mod store;
pub mod validation;

pub use routes::configure;
pub use state::AppState;
