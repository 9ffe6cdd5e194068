//! Loan route definitions

use axum::{
    routing::{delete, get, put},
    Router,
};

use crate::handlers::*;
use crate::state::AppState;

pub fn loan_routes() -> Router<AppState> {
    Router::new()
        .route("/loan/", get(list_loans).post(create_loan))
        .route("/loan/approve/:id", put(approve_loan))
        .route("/loan/reject/:id", put(reject_loan))
        .route("/loan/delete/:id", delete(delete_loan))
        .route("/loan/:customer_name/", get(list_loans_by_customer))
}
