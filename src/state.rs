use crate::cache::FoodCache;
use crate::store::Repositories;

/// Shared by every worker through `web::Data`.
#[derive(Clone)]
pub struct AppState {
    pub repos: Repositories,
    pub cache: Option<FoodCache>,
}

impl AppState {
    pub fn new(repos: Repositories, cache: Option<FoodCache>) -> Self {
        Self { repos, cache }
    }

    /// In-memory repositories and no cache.
    pub fn in_memory() -> Self {
        Self::new(Repositories::in_memory(), None)
    }
}
