//! Loan fund module
//!
//! Pools of lendable money that loans draw against.

pub mod model;
pub mod service;

pub use model::*;
pub use service::LoanFundService;
