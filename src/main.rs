use std::io;

use actix_web::{middleware, web, App, HttpServer};

use glycemic_tracker::cache::FoodCache;
use glycemic_tracker::config::Config;
use glycemic_tracker::query::MysqlStore;
use glycemic_tracker::store::Repositories;
use glycemic_tracker::AppState;

fn startup_error(e: impl std::error::Error + Send + Sync + 'static) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e)
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env().map_err(startup_error)?;

    // set up the repositories: MySQL when configured, otherwise in memory
    let repos = match &config.database_url {
        Some(database_url) => {
            let store =
                MysqlStore::connect(database_url, config.db_pool_max_size).map_err(startup_error)?;
            store.ensure_schema().map_err(startup_error)?;
            Repositories::mysql(store)
        }
        None => {
            log::warn!("DATABASE_URL not set, keeping all data in memory");
            Repositories::in_memory()
        }
    };

    let cache = config
        .cache
        .as_ref()
        .and_then(|cache_config| match FoodCache::connect(cache_config) {
            Ok(cache) => Some(cache),
            Err(e) => {
                log::warn!("food cache disabled: {e}");
                None
            }
        });

    let state = web::Data::new(AppState::new(repos, cache));

    log::info!("starting HTTP server at http://{}:{}", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            .configure(glycemic_tracker::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
