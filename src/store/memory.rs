//! In-process record store
//!
//! A transaction owns the state lock for its whole lifetime and works on a staged copy,
//! so transactions run one at a time and an uncommitted one leaves nothing behind.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{RecordStore, StoreError, StoreResult, StoreTx};
use crate::auth::{NewUser, User, UserChanges};
use crate::loan::{Loan, LoanStatus, NewLoan};
use crate::loan_fund::{LoanFund, NewLoanFund};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    funds: BTreeMap<i64, LoanFund>,
    loans: BTreeMap<i64, Loan>,
    users: BTreeMap<i64, User>,
    last_fund_id: i64,
    last_loan_id: i64,
    last_user_id: i64,
}

fn next_id(last: &mut i64) -> i64 {
    *last += 1;
    *last
}

/// Record store kept in memory, shared by clones
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTx { guard, staged }))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

impl MemoryTx {
    fn username_taken(&self, username: &str, except: Option<i64>) -> bool {
        self.staged
            .users
            .values()
            .any(|u| u.username == username && Some(u.id) != except)
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn insert_fund(&mut self, fund: &NewLoanFund) -> StoreResult<LoanFund> {
        let id = next_id(&mut self.staged.last_fund_id);
        let record = LoanFund {
            id,
            name: fund.name.clone(),
            amount: fund.amount,
            max_loan_amount: fund.max_loan_amount,
            min_loan_amount: fund.min_loan_amount,
            interest_rate: fund.interest_rate,
            loan_duration: fund.loan_duration,
        };
        self.staged.funds.insert(id, record.clone());
        Ok(record)
    }

    async fn find_fund(&mut self, id: i64) -> StoreResult<Option<LoanFund>> {
        Ok(self.staged.funds.get(&id).cloned())
    }

    async fn lock_fund(&mut self, id: i64) -> StoreResult<Option<LoanFund>> {
        // the whole store is already held by this transaction
        self.find_fund(id).await
    }

    async fn list_funds(&mut self) -> StoreResult<Vec<LoanFund>> {
        Ok(self.staged.funds.values().cloned().collect())
    }

    async fn set_fund_amount(&mut self, id: i64, amount: Decimal) -> StoreResult<LoanFund> {
        let fund = self
            .staged
            .funds
            .get_mut(&id)
            .ok_or_else(|| StoreError::Missing(format!("loan fund {id}")))?;
        fund.amount = amount;
        Ok(fund.clone())
    }

    async fn delete_fund(&mut self, id: i64) -> StoreResult<Option<u64>> {
        if self.staged.funds.remove(&id).is_none() {
            return Ok(None);
        }
        let before = self.staged.loans.len();
        self.staged.loans.retain(|_, loan| loan.loan_fund_id != id);
        Ok(Some((before - self.staged.loans.len()) as u64))
    }

    async fn insert_loan(&mut self, loan: &NewLoan) -> StoreResult<Loan> {
        if !self.staged.funds.contains_key(&loan.loan_fund_id) {
            return Err(StoreError::Missing(format!(
                "loan fund {}",
                loan.loan_fund_id
            )));
        }
        let id = next_id(&mut self.staged.last_loan_id);
        let record = Loan {
            id,
            customer_name: loan.customer_name.clone(),
            loan_fund_id: loan.loan_fund_id,
            loan_amount: loan.loan_amount,
            interest_rate: loan.interest_rate,
            duration: loan.duration,
            status: loan.status,
            date_requested: loan.date_requested,
            date_approved: None,
            date_rejected: None,
            monthly_installment: loan.monthly_installment,
        };
        self.staged.loans.insert(id, record.clone());
        Ok(record)
    }

    async fn find_loan(&mut self, id: i64) -> StoreResult<Option<Loan>> {
        Ok(self.staged.loans.get(&id).cloned())
    }

    async fn list_loans(&mut self, customer_name: Option<&str>) -> StoreResult<Vec<Loan>> {
        Ok(self
            .staged
            .loans
            .values()
            .filter(|loan| customer_name.map_or(true, |name| loan.customer_name == name))
            .cloned()
            .collect())
    }

    async fn set_loan_status(
        &mut self,
        id: i64,
        status: LoanStatus,
        date_approved: Option<NaiveDate>,
        date_rejected: Option<NaiveDate>,
    ) -> StoreResult<Loan> {
        let loan = self
            .staged
            .loans
            .get_mut(&id)
            .ok_or_else(|| StoreError::Missing(format!("loan {id}")))?;
        loan.status = status;
        loan.date_approved = date_approved;
        loan.date_rejected = date_rejected;
        Ok(loan.clone())
    }

    async fn delete_loan(&mut self, id: i64) -> StoreResult<bool> {
        Ok(self.staged.loans.remove(&id).is_some())
    }

    async fn insert_user(&mut self, user: &NewUser) -> StoreResult<User> {
        if self.username_taken(&user.username, None) {
            return Err(StoreError::Duplicate("users_username_key".to_string()));
        }
        let id = next_id(&mut self.staged.last_user_id);
        let record = User {
            id,
            username: user.username.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            date_joined: Utc::now(),
        };
        self.staged.users.insert(id, record.clone());
        Ok(record)
    }

    async fn find_user(&mut self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.staged.users.get(&id).cloned())
    }

    async fn find_user_by_username(&mut self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .staged
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn list_users(&mut self) -> StoreResult<Vec<User>> {
        Ok(self.staged.users.values().cloned().collect())
    }

    async fn update_user(&mut self, id: i64, changes: &UserChanges) -> StoreResult<User> {
        if self.username_taken(&changes.username, Some(id)) {
            return Err(StoreError::Duplicate("users_username_key".to_string()));
        }
        let user = self
            .staged
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::Missing(format!("user {id}")))?;
        user.username = changes.username.clone();
        user.email = changes.email.clone();
        if let Some(hash) = &changes.password_hash {
            user.password_hash = hash.clone();
        }
        Ok(user.clone())
    }

    async fn delete_user(&mut self, id: i64) -> StoreResult<bool> {
        Ok(self.staged.users.remove(&id).is_some())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTx { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}
