//! Loan module
//!
//! Loans drawn against a loan fund and their approval lifecycle.

pub mod model;
pub mod service;

pub use model::*;
pub use service::LoanService;
