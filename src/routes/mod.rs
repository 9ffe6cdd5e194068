//! Route definitions for the loan fund API

mod loan;
mod loan_fund;
mod user;

use axum::{http::HeaderValue, http::Method, middleware, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{Config, RouteAuth};
use crate::handlers::{health_check, root};
use crate::middleware::{request_tracing, require_auth};
use crate::state::AppState;

pub use loan::loan_routes;
pub use loan_fund::loan_fund_routes;
pub use user::{login_routes, user_routes};

/// Build the full application router
pub fn app_router(state: AppState, config: &Config) -> Router {
    let RouteAuth {
        loan_funds,
        loans,
        users,
    } = config.route_auth;

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(gated(loan_fund_routes(), loan_funds, &state))
        .merge(gated(loan_routes(), loans, &state))
        .merge(gated(user_routes(), users, &state))
        .merge(login_routes())
        .with_state(state)
        .layer(middleware::from_fn(request_tracing))
        .layer(TraceLayer::new_for_http())
        .layer(configure_cors(config.cors_allowed_origins.as_deref()))
}

/// Put a route group behind bearer authentication when `required`
fn gated(routes: Router<AppState>, required: bool, state: &AppState) -> Router<AppState> {
    if required {
        routes.route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
    } else {
        routes
    }
}

fn configure_cors(allowed_origins: Option<&str>) -> CorsLayer {
    let Some(allowed_origins) = allowed_origins.filter(|s| !s.is_empty()) else {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    };

    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}
