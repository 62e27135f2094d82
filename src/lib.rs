pub mod db;
pub mod extractors;
pub mod game;
pub mod handlers;
pub mod models;
pub mod names;
pub mod rejections;
pub mod services;

use axum::{routing::post, Router};

#[derive(Clone)]
pub struct AppState {
    pub db: db::Db,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(names::RESULT_URL, post(handlers::result::record_result))
        .route(names::REWARD_SETTLE_URL, post(handlers::reward::settle_reward))
        .with_state(state)
}
