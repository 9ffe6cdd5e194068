//! PostgreSQL record store
//!
//! Loans reference their fund with `ON DELETE CASCADE`; fund locking is `FOR UPDATE`.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use super::{RecordStore, StoreResult, StoreTx};
use crate::auth::{NewUser, User, UserChanges};
use crate::loan::{Loan, LoanStatus, NewLoan};
use crate::loan_fund::{LoanFund, NewLoanFund};

const FUND_COLUMNS: &str =
    "id, name, amount, max_loan_amount, min_loan_amount, interest_rate, loan_duration";

const LOAN_COLUMNS: &str = "id, customer_name, loan_fund_id, loan_amount, interest_rate, \
     duration, status, date_requested, date_approved, date_rejected, monthly_installment";

const USER_COLUMNS: &str = "id, username, email, password_hash, date_joined";

/// Record store backed by a Postgres pool
#[derive(Clone)]
pub struct PgStore {
    db_pool: PgPool,
}

impl PgStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let tx = self.db_pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.db_pool).await?;
        Ok(())
    }
}

struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn insert_fund(&mut self, fund: &NewLoanFund) -> StoreResult<LoanFund> {
        let query = format!(
            r#"
            INSERT INTO loan_funds (
                name, amount, max_loan_amount, min_loan_amount, interest_rate, loan_duration
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {FUND_COLUMNS}
            "#
        );
        let record = sqlx::query_as::<_, LoanFund>(&query)
            .bind(&fund.name)
            .bind(fund.amount)
            .bind(fund.max_loan_amount)
            .bind(fund.min_loan_amount)
            .bind(fund.interest_rate)
            .bind(fund.loan_duration)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(record)
    }

    async fn find_fund(&mut self, id: i64) -> StoreResult<Option<LoanFund>> {
        let query = format!("SELECT {FUND_COLUMNS} FROM loan_funds WHERE id = $1");
        let fund = sqlx::query_as::<_, LoanFund>(&query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(fund)
    }

    async fn lock_fund(&mut self, id: i64) -> StoreResult<Option<LoanFund>> {
        let query = format!("SELECT {FUND_COLUMNS} FROM loan_funds WHERE id = $1 FOR UPDATE");
        let fund = sqlx::query_as::<_, LoanFund>(&query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(fund)
    }

    async fn list_funds(&mut self) -> StoreResult<Vec<LoanFund>> {
        let query = format!("SELECT {FUND_COLUMNS} FROM loan_funds ORDER BY id");
        let funds = sqlx::query_as::<_, LoanFund>(&query)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(funds)
    }

    async fn set_fund_amount(&mut self, id: i64, amount: Decimal) -> StoreResult<LoanFund> {
        let query =
            format!("UPDATE loan_funds SET amount = $1 WHERE id = $2 RETURNING {FUND_COLUMNS}");
        let fund = sqlx::query_as::<_, LoanFund>(&query)
            .bind(amount)
            .bind(id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(fund)
    }

    async fn delete_fund(&mut self, id: i64) -> StoreResult<Option<u64>> {
        // count first: the cascade itself does not report affected loans
        let (loans,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM loans WHERE loan_fund_id = $1")
                .bind(id)
                .fetch_one(&mut *self.tx)
                .await?;

        let deleted = sqlx::query("DELETE FROM loan_funds WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        Ok((deleted > 0).then_some(loans as u64))
    }

    async fn insert_loan(&mut self, loan: &NewLoan) -> StoreResult<Loan> {
        let query = format!(
            r#"
            INSERT INTO loans (
                customer_name, loan_fund_id, loan_amount, interest_rate, duration,
                status, date_requested, monthly_installment
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {LOAN_COLUMNS}
            "#
        );
        let record = sqlx::query_as::<_, Loan>(&query)
            .bind(&loan.customer_name)
            .bind(loan.loan_fund_id)
            .bind(loan.loan_amount)
            .bind(loan.interest_rate)
            .bind(loan.duration)
            .bind(loan.status)
            .bind(loan.date_requested)
            .bind(loan.monthly_installment)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(record)
    }

    async fn find_loan(&mut self, id: i64) -> StoreResult<Option<Loan>> {
        let query = format!("SELECT {LOAN_COLUMNS} FROM loans WHERE id = $1");
        let loan = sqlx::query_as::<_, Loan>(&query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(loan)
    }

    async fn list_loans(&mut self, customer_name: Option<&str>) -> StoreResult<Vec<Loan>> {
        let query = format!(
            "SELECT {LOAN_COLUMNS} FROM loans \
             WHERE ($1::TEXT IS NULL OR customer_name = $1) ORDER BY id"
        );
        let loans = sqlx::query_as::<_, Loan>(&query)
            .bind(customer_name)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(loans)
    }

    async fn set_loan_status(
        &mut self,
        id: i64,
        status: LoanStatus,
        date_approved: Option<NaiveDate>,
        date_rejected: Option<NaiveDate>,
    ) -> StoreResult<Loan> {
        let query = format!(
            r#"
            UPDATE loans
            SET status = $1, date_approved = $2, date_rejected = $3
            WHERE id = $4
            RETURNING {LOAN_COLUMNS}
            "#
        );
        let loan = sqlx::query_as::<_, Loan>(&query)
            .bind(status)
            .bind(date_approved)
            .bind(date_rejected)
            .bind(id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(loan)
    }

    async fn delete_loan(&mut self, id: i64) -> StoreResult<bool> {
        let deleted = sqlx::query("DELETE FROM loans WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }

    async fn insert_user(&mut self, user: &NewUser) -> StoreResult<User> {
        let query = format!(
            r#"
            INSERT INTO users (username, email, password_hash, date_joined)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        );
        let record = sqlx::query_as::<_, User>(&query)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(Utc::now())
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(record)
    }

    async fn find_user(&mut self, id: i64) -> StoreResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(user)
    }

    async fn find_user_by_username(&mut self, username: &str) -> StoreResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let user = sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(user)
    }

    async fn list_users(&mut self) -> StoreResult<Vec<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id");
        let users = sqlx::query_as::<_, User>(&query)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(users)
    }

    async fn update_user(&mut self, id: i64, changes: &UserChanges) -> StoreResult<User> {
        let query = format!(
            r#"
            UPDATE users
            SET username = $1, email = $2, password_hash = COALESCE($3, password_hash)
            WHERE id = $4
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(&changes.username)
            .bind(&changes.email)
            .bind(&changes.password_hash)
            .bind(id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(user)
    }

    async fn delete_user(&mut self, id: i64) -> StoreResult<bool> {
        let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
