//! Loan models
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::loan_fund::LoanFund;
use crate::validation::{money, parse_decimal, parse_integer, parse_text, FieldErrors, MONEY};

pub const CUSTOMER_NAME_MAX_LEN: usize = 100;

/// Loan status enum
#[derive(Debug, Default, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "loan_status")]
pub enum LoanStatus {
    #[default]
    Requested,
    Approved,
    Rejected,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Requested => "Requested",
            LoanStatus::Approved => "Approved",
            LoanStatus::Rejected => "Rejected",
        }
    }
}

impl FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Requested" => Ok(LoanStatus::Requested),
            "Approved" => Ok(LoanStatus::Approved),
            "Rejected" => Ok(LoanStatus::Rejected),
            other => Err(format!("\"{}\" is not a valid choice.", other)),
        }
    }
}

/// Loan model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Loan {
    pub id: i64,
    #[serde(rename = "customerName")]
    pub customer_name: String,
    #[serde(rename = "loan_fund_ID")]
    pub loan_fund_id: i64,
    pub loan_amount: Decimal,
    pub interest_rate: Decimal, // snapshot of the fund rate
    pub duration: i32,          // snapshot of the fund duration, months
    pub status: LoanStatus,
    pub date_requested: NaiveDate,
    pub date_approved: Option<NaiveDate>,
    pub date_rejected: Option<NaiveDate>,
    pub monthly_installment: Decimal,
}

impl Loan {
    /// Mark approved as of `today`; repeating just re-stamps the date
    pub fn approve(&mut self, today: NaiveDate) {
        self.status = LoanStatus::Approved;
        self.date_approved = Some(today);
    }

    /// Mark rejected as of `today`; repeating just re-stamps the date
    pub fn reject(&mut self, today: NaiveDate) {
        self.status = LoanStatus::Rejected;
        self.date_rejected = Some(today);
    }

    pub fn standing_violations(&self, fund: &LoanFund) -> FieldErrors {
        standing_violations(
            &self.customer_name,
            self.loan_amount,
            self.interest_rate,
            fund,
        )
    }
}

/// A loan about to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLoan {
    pub customer_name: String,
    pub loan_fund_id: i64,
    pub loan_amount: Decimal,
    pub interest_rate: Decimal,
    pub duration: i32,
    pub status: LoanStatus,
    pub date_requested: NaiveDate,
    pub monthly_installment: Decimal,
}

impl NewLoan {
    /// Draw `loan_amount` from `fund`, snapshotting its rate and duration.
    ///
    /// The installment is computed unless `installment_override` is given.
    pub fn draw(
        fund: &LoanFund,
        customer_name: String,
        loan_amount: Decimal,
        status: LoanStatus,
        installment_override: Option<Decimal>,
        today: NaiveDate,
    ) -> Option<Self> {
        let monthly_installment = match installment_override {
            Some(installment) => installment,
            None => monthly_installment(loan_amount, fund.interest_rate, fund.loan_duration)?,
        };

        Some(Self {
            customer_name,
            loan_fund_id: fund.id,
            loan_amount,
            interest_rate: fund.interest_rate,
            duration: fund.loan_duration,
            status,
            date_requested: today,
            monthly_installment,
        })
    }
}

/// Flat-rate installment: principal plus one period of interest on the full principal,
/// spread evenly over `duration` months, rounded half-to-even to cents.
pub fn monthly_installment(
    loan_amount: Decimal,
    interest_rate: Decimal,
    duration: i32,
) -> Option<Decimal> {
    if duration <= 0 {
        return None;
    }
    let factor = Decimal::ONE + interest_rate / Decimal::ONE_HUNDRED;
    let installment = (loan_amount * factor).checked_div(Decimal::from(duration))?;
    Some(money(installment.round_dp(2)))
}

/// Checks every loan save must pass against the owning fund's fixed policy bounds
pub fn standing_violations(
    customer_name: &str,
    loan_amount: Decimal,
    interest_rate: Decimal,
    fund: &LoanFund,
) -> FieldErrors {
    let mut errors = FieldErrors::new();

    if customer_name.trim().is_empty() {
        errors.reject("customerName");
    }
    if interest_rate <= Decimal::ZERO {
        errors.reject("interest_rate");
    }
    if loan_amount.is_sign_negative() && !loan_amount.is_zero() {
        errors.reject("loan_amount");
    }
    if loan_amount < fund.min_loan_amount || loan_amount > fund.max_loan_amount {
        errors.reject("loan_amount");
    }

    errors
}

/// Request DTO for creating a loan
#[derive(Debug, Default, Deserialize)]
pub struct CreateLoanRequest {
    #[serde(rename = "customerName")]
    pub customer_name: Option<Value>,
    pub loan_fund_id: Option<Value>,
    pub amount: Option<Value>,
    pub status: Option<Value>,
    pub monthly_installment: Option<Value>,
}

/// Fund reference and amount, the parts of a request checked against the fund balance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoanDraw {
    pub loan_fund_id: i64,
    pub amount: Decimal,
}

/// Remaining loan terms, validated once the balance checks have passed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanTerms {
    pub customer_name: String,
    pub status: LoanStatus,
    pub monthly_installment: Option<Decimal>,
}

/// Why a request could not name a fund and amount
#[derive(Debug, PartialEq, Eq)]
pub enum ApplicationError {
    MissingFund,
    Fields(FieldErrors),
}

impl CreateLoanRequest {
    /// Parse the fund reference and the requested amount.
    ///
    /// An absent amount defaults to zero.
    pub fn draw(&self) -> Result<LoanDraw, ApplicationError> {
        let fund_value = self
            .loan_fund_id
            .as_ref()
            .filter(|v| !v.is_null() && v.as_str() != Some(""));
        let Some(fund_value) = fund_value else {
            return Err(ApplicationError::MissingFund);
        };

        let mut errors = FieldErrors::new();

        let loan_fund_id = parse_integer(fund_value);
        if loan_fund_id.is_none() {
            errors.reject("loan_fund_id");
        }

        let amount = match self.amount.as_ref().filter(|v| !v.is_null()) {
            None => Some(money(Decimal::ZERO)),
            Some(v) => parse_decimal(v, MONEY),
        };
        if amount.is_none() {
            errors.reject_with("amount", "A valid number is required.");
        }

        match (loan_fund_id, amount) {
            (Some(loan_fund_id), Some(amount)) => Ok(LoanDraw {
                loan_fund_id,
                amount,
            }),
            _ => Err(ApplicationError::Fields(errors)),
        }
    }

    /// Parse customer name, status and installment, collecting every bad field
    pub fn terms(&self) -> Result<LoanTerms, FieldErrors> {
        let mut errors = FieldErrors::new();

        let customer_name = self
            .customer_name
            .as_ref()
            .and_then(|v| parse_text(v, CUSTOMER_NAME_MAX_LEN));
        if customer_name.is_none() {
            errors.reject("customerName");
        }

        let status = match self.status.as_ref().filter(|v| !v.is_null()) {
            None => Ok(LoanStatus::default()),
            Some(Value::String(s)) => s.parse::<LoanStatus>(),
            Some(other) => Err(format!("\"{}\" is not a valid choice.", other)),
        };
        if let Err(message) = &status {
            errors.reject_with("status", message.clone());
        }

        let monthly_installment = match self.monthly_installment.as_ref().filter(|v| !v.is_null())
        {
            None => Ok(None),
            Some(v) => parse_decimal(v, MONEY)
                .filter(|d| !d.is_sign_negative() || d.is_zero())
                .map(Some)
                .ok_or(()),
        };
        if monthly_installment.is_err() {
            errors.reject("monthly_installment");
        }

        match (customer_name, status, monthly_installment) {
            (Some(customer_name), Ok(status), Ok(monthly_installment)) => Ok(LoanTerms {
                customer_name,
                status,
                monthly_installment,
            }),
            _ => Err(errors),
        }
    }
}

/// Message body for status transitions
#[derive(Debug, Serialize, Deserialize)]
pub struct LoanActionResponse {
    pub message: String,
}
