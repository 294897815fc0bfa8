use crate::state::AppState;
use axum::Router;

pub mod cookies;
mod dto;
pub(crate) mod extractors;
pub mod handlers;
pub mod password;
pub mod session;
pub mod store;
pub mod tokens;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::me_routes())
}
