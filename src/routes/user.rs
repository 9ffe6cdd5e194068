//! User route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::user::{create_user, delete_user, get_user, list_users, login, update_user};
use crate::state::AppState;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user/", get(list_users).post(create_user))
        .route(
            "/user/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

/// Login stays reachable whatever the user group's auth setting
pub fn login_routes() -> Router<AppState> {
    Router::new().route("/user/login/", post(login))
}
