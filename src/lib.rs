//! Loan Fund Backend Library
//!
//! Loan funds, the loans drawn against them, and the users allowed to manage both.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod loan;
pub mod loan_fund;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod store;
pub mod validation;

pub use config::Config;
pub use routes::app_router;
pub use state::AppState;
