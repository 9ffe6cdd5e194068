//! Loan service layer - Business logic for loan management

use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::error::{ApiError, ApiResult, Entity};
use crate::store::{RecordStore, StoreTx};
use crate::validation::{money, FieldErrors};

use super::model::{
    standing_violations, ApplicationError, CreateLoanRequest, Loan, LoanStatus, NewLoan,
};

pub const FUND_REQUIRED: &str = "loan_fund_id must be provided.";
pub const FUND_MISSING: &str = "LoanFund with the provided id does not exist.";
pub const EXCEEDS_FUNDS: &str = "Amount Exceeds Funds";
pub const BELOW_MINIMUM: &str = "Amount less than Min Loan Amount";
pub const LOAN_MISSING: &str = "Loan with the provided id does not exist.";
pub const NO_LOANS_FOR_CUSTOMER: &str = "No loans found for the provided customer name.";

/// Loan service for managing loan lifecycle
#[derive(Clone)]
pub struct LoanService {
    store: Arc<dyn RecordStore>,
}

impl LoanService {
    /// Create a new loan service instance
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Draw a new loan from its fund.
    ///
    /// The fund stays locked from the balance check until the debit commits, so two
    /// requests against one fund cannot both spend the same balance.
    pub async fn create_loan(&self, request: &CreateLoanRequest) -> ApiResult<Loan> {
        let draw = request.draw().map_err(|err| match err {
            ApplicationError::MissingFund => ApiError::invalid(Entity::Loan, FUND_REQUIRED),
            ApplicationError::Fields(errors) => ApiError::invalid_fields(Entity::Loan, errors),
        })?;

        let mut tx = self.store.begin().await?;

        let fund = tx
            .lock_fund(draw.loan_fund_id)
            .await?
            .ok_or_else(|| ApiError::invalid(Entity::Loan, FUND_MISSING))?;

        if draw.amount > fund.amount {
            return Err(ApiError::invalid(Entity::Loan, EXCEEDS_FUNDS));
        }
        if draw.amount < fund.min_loan_amount {
            return Err(ApiError::invalid(Entity::Loan, BELOW_MINIMUM));
        }

        // malformed terms and standing violations are reported together
        let terms = request.terms();
        let (mut violations, customer_name) = match &terms {
            Ok(terms) => (FieldErrors::new(), terms.customer_name.as_str()),
            Err(errors) => (errors.clone(), ""),
        };
        violations.absorb(standing_violations(
            customer_name,
            draw.amount,
            fund.interest_rate,
            &fund,
        ));
        let terms = match terms {
            Ok(terms) if violations.is_empty() => terms,
            _ => return Err(ApiError::invalid_fields(Entity::Loan, violations)),
        };

        // a zero installment counts as "not supplied"
        let installment_override = terms
            .monthly_installment
            .filter(|installment| !installment.is_zero());

        let new_loan = NewLoan::draw(
            &fund,
            terms.customer_name,
            draw.amount,
            terms.status,
            installment_override,
            today(),
        )
        .ok_or_else(|| {
            ApiError::Internal(format!(
                "Loan fund {} has a non-positive duration",
                fund.id
            ))
        })?;

        let loan = tx.insert_loan(&new_loan).await?;
        let fund = tx
            .set_fund_amount(fund.id, money(fund.amount - loan.loan_amount))
            .await?;
        tx.commit().await?;

        tracing::info!(
            loan_id = loan.id,
            fund_id = fund.id,
            customer = %loan.customer_name,
            loan_amount = %loan.loan_amount,
            fund_balance = %fund.amount,
            "Loan created"
        );
        Ok(loan)
    }

    pub async fn approve(&self, id: i64) -> ApiResult<Loan> {
        self.transition(id, LoanStatus::Approved).await
    }

    pub async fn reject(&self, id: i64) -> ApiResult<Loan> {
        self.transition(id, LoanStatus::Rejected).await
    }

    async fn transition(&self, id: i64, status: LoanStatus) -> ApiResult<Loan> {
        let mut tx = self.store.begin().await?;
        let mut loan = find_loan(tx.as_mut(), id).await?;

        match status {
            LoanStatus::Approved => loan.approve(today()),
            LoanStatus::Rejected => loan.reject(today()),
            LoanStatus::Requested => {}
        }

        if let Some(fund) = tx.find_fund(loan.loan_fund_id).await? {
            let violations = loan.standing_violations(&fund);
            if !violations.is_empty() {
                return Err(ApiError::invalid_fields(Entity::Loan, violations));
            }
        }

        let loan = tx
            .set_loan_status(id, loan.status, loan.date_approved, loan.date_rejected)
            .await?;
        tx.commit().await?;

        tracing::info!(loan_id = id, status = loan.status.as_str(), "Loan status changed");
        Ok(loan)
    }

    /// Delete a loan. The drawn amount is not returned to the fund.
    pub async fn delete(&self, id: i64) -> ApiResult<()> {
        let mut tx = self.store.begin().await?;
        if !tx.delete_loan(id).await? {
            return Err(ApiError::not_found(Entity::Loan, LOAN_MISSING));
        }
        tx.commit().await?;

        tracing::info!(loan_id = id, "Loan deleted");
        Ok(())
    }

    pub async fn get(&self, id: i64) -> ApiResult<Loan> {
        let mut tx = self.store.begin().await?;
        find_loan(tx.as_mut(), id).await
    }

    pub async fn list_all(&self) -> ApiResult<Vec<Loan>> {
        let mut tx = self.store.begin().await?;
        Ok(tx.list_loans(None).await?)
    }

    /// Exact-match lookup; an empty result is an error
    pub async fn list_by_customer_name(&self, customer_name: &str) -> ApiResult<Vec<Loan>> {
        let mut tx = self.store.begin().await?;
        let loans = tx.list_loans(Some(customer_name)).await?;
        if loans.is_empty() {
            return Err(ApiError::EmptyLookup {
                entity: Entity::Loan,
                message: NO_LOANS_FOR_CUSTOMER.to_string(),
            });
        }
        Ok(loans)
    }
}

async fn find_loan(tx: &mut dyn StoreTx, id: i64) -> ApiResult<Loan> {
    tx.find_loan(id)
        .await?
        .ok_or_else(|| ApiError::not_found(Entity::Loan, LOAN_MISSING))
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}
