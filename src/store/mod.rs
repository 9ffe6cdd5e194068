//! Record store abstraction
//!
//! Services talk to storage through a unit of work: [`RecordStore::begin`] hands out a
//! [`StoreTx`], every read and write goes through it, and nothing is visible to other
//! transactions until [`StoreTx::commit`]. Dropping a transaction without committing
//! discards its writes.
//!
//! [`StoreTx::lock_fund`] must block concurrent lockers of the same fund until the holder
//! commits or rolls back, which is what keeps two debits from reading the same balance.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::auth::{NewUser, User, UserChanges};
use crate::loan::{Loan, LoanStatus, NewLoan};
use crate::loan_fund::{LoanFund, NewLoanFund};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Storage errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Unique constraint violated: {0}")]
    Duplicate(String),

    #[error("Record not found: {0}")]
    Missing(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable store handing out transactions
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>>;

    /// Cheap connectivity check for health endpoints
    async fn ping(&self) -> StoreResult<()>;
}

/// One open transaction
#[async_trait]
pub trait StoreTx: Send {
    // Loan funds

    async fn insert_fund(&mut self, fund: &NewLoanFund) -> StoreResult<LoanFund>;

    async fn find_fund(&mut self, id: i64) -> StoreResult<Option<LoanFund>>;

    /// Like `find_fund`, but holds the fund until this transaction ends
    async fn lock_fund(&mut self, id: i64) -> StoreResult<Option<LoanFund>>;

    async fn list_funds(&mut self) -> StoreResult<Vec<LoanFund>>;

    async fn set_fund_amount(&mut self, id: i64, amount: Decimal) -> StoreResult<LoanFund>;

    /// Delete a fund and its loans. `None` when the fund does not exist, otherwise the
    /// number of loans removed with it.
    async fn delete_fund(&mut self, id: i64) -> StoreResult<Option<u64>>;

    // Loans

    async fn insert_loan(&mut self, loan: &NewLoan) -> StoreResult<Loan>;

    async fn find_loan(&mut self, id: i64) -> StoreResult<Option<Loan>>;

    /// Every loan ordered by id, optionally restricted to an exact customer name
    async fn list_loans(&mut self, customer_name: Option<&str>) -> StoreResult<Vec<Loan>>;

    async fn set_loan_status(
        &mut self,
        id: i64,
        status: LoanStatus,
        date_approved: Option<NaiveDate>,
        date_rejected: Option<NaiveDate>,
    ) -> StoreResult<Loan>;

    async fn delete_loan(&mut self, id: i64) -> StoreResult<bool>;

    // Users

    async fn insert_user(&mut self, user: &NewUser) -> StoreResult<User>;

    async fn find_user(&mut self, id: i64) -> StoreResult<Option<User>>;

    async fn find_user_by_username(&mut self, username: &str) -> StoreResult<Option<User>>;

    async fn list_users(&mut self) -> StoreResult<Vec<User>>;

    async fn update_user(&mut self, id: i64, changes: &UserChanges) -> StoreResult<User>;

    async fn delete_user(&mut self, id: i64) -> StoreResult<bool>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::Missing("row".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Duplicate(db.constraint().unwrap_or("unique").to_string())
            }
            other => StoreError::Database(other.to_string()),
        }
    }
}
