use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
pub mod repo;
pub mod token;
pub(crate) mod extractors;
mod password;
mod services;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
