//! Loan fund service layer - balance bookkeeping for funding pools

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::error::{ApiError, ApiResult, Entity};
use crate::store::RecordStore;
use crate::validation::{fits, money, FieldErrors, MONEY};

use super::model::{LoanFund, NewLoanFund, TopUpPolicy};

pub const FUND_NOT_FOUND: &str = "LoanFund not found.";
pub const OUT_OF_RANGE: &str = "The updated amount is not within the allowed range.";

/// Loan fund service
#[derive(Clone)]
pub struct LoanFundService {
    store: Arc<dyn RecordStore>,
    top_up_policy: TopUpPolicy,
}

impl LoanFundService {
    pub fn new(store: Arc<dyn RecordStore>, top_up_policy: TopUpPolicy) -> Self {
        Self {
            store,
            top_up_policy,
        }
    }

    /// Persist an already validated fund
    pub async fn create(&self, fund: NewLoanFund) -> ApiResult<LoanFund> {
        let mut tx = self.store.begin().await?;
        let fund = tx.insert_fund(&fund).await?;
        tx.commit().await?;

        tracing::info!(
            fund_id = fund.id,
            name = %fund.name,
            amount = %fund.amount,
            "Loan fund created"
        );
        Ok(fund)
    }

    pub async fn get(&self, id: i64) -> ApiResult<LoanFund> {
        let mut tx = self.store.begin().await?;
        tx.find_fund(id)
            .await?
            .ok_or_else(|| ApiError::not_found(Entity::LoanFund, FUND_NOT_FOUND))
    }

    pub async fn list(&self) -> ApiResult<Vec<LoanFund>> {
        let mut tx = self.store.begin().await?;
        Ok(tx.list_funds().await?)
    }

    /// Add `delta` to the fund balance under the configured policy
    pub async fn top_up(&self, id: i64, delta: Decimal) -> ApiResult<LoanFund> {
        if delta <= Decimal::ZERO {
            let mut errors = FieldErrors::new();
            errors.reject_with("amount", "The top-up amount must be greater than 0.");
            return Err(ApiError::invalid_fields(Entity::LoanFund, errors));
        }

        let mut tx = self.store.begin().await?;
        let fund = tx
            .lock_fund(id)
            .await?
            .ok_or_else(|| ApiError::not_found(Entity::LoanFund, FUND_NOT_FOUND))?;

        let new_amount = money(fund.amount + delta);
        if !fits(new_amount, MONEY) || !self.top_up_policy.permits(&fund, new_amount) {
            tracing::debug!(
                fund_id = id,
                new_amount = %new_amount,
                policy = self.top_up_policy.as_str(),
                "Top-up rejected"
            );
            return Err(ApiError::invalid(Entity::LoanFund, OUT_OF_RANGE));
        }

        let fund = tx.set_fund_amount(id, new_amount).await?;
        tx.commit().await?;

        tracing::info!(fund_id = id, delta = %delta, amount = %fund.amount, "Loan fund topped up");
        Ok(fund)
    }

    /// Delete a fund together with every loan drawn from it
    pub async fn delete(&self, id: i64) -> ApiResult<()> {
        let mut tx = self.store.begin().await?;
        let removed_loans = tx
            .delete_fund(id)
            .await?
            .ok_or_else(|| ApiError::not_found(Entity::LoanFund, FUND_NOT_FOUND))?;
        tx.commit().await?;

        tracing::info!(fund_id = id, removed_loans, "Loan fund deleted");
        Ok(())
    }
}
