//! Loan fund route definitions

use axum::{routing::get, Router};

use crate::handlers::*;
use crate::state::AppState;

pub fn loan_fund_routes() -> Router<AppState> {
    Router::new()
        .route("/loanFund/", get(list_loan_funds).post(create_loan_fund))
        .route(
            "/loanFund/:id",
            get(get_loan_fund)
                .put(top_up_loan_fund)
                .delete(delete_loan_fund),
        )
}
