//! Loan fund models

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::validation::{
    money, parse_decimal, parse_integer, parse_text, FieldErrors, MONEY, RATE,
};

pub const NAME_MAX_LEN: usize = 100;
pub const MIN_LOAN_DURATION: i32 = 2;

/// Smallest interest rate a fund may carry, in percent
pub fn min_interest_rate() -> Decimal {
    Decimal::new(1, 2)
}

/// Loan fund model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LoanFund {
    pub id: i64,
    pub name: String,
    pub amount: Decimal, // available balance
    pub max_loan_amount: Decimal,
    pub min_loan_amount: Decimal,
    pub interest_rate: Decimal, // percent
    pub loan_duration: i32,     // months
}

/// Validated fund parameters ready to be stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLoanFund {
    pub name: String,
    pub amount: Decimal,
    pub max_loan_amount: Decimal,
    pub min_loan_amount: Decimal,
    pub interest_rate: Decimal,
    pub loan_duration: i32,
}

/// Request DTO for creating a loan fund
#[derive(Debug, Default, Deserialize)]
pub struct CreateLoanFundRequest {
    pub name: Option<Value>,
    pub amount: Option<Value>,
    pub max_loan_amount: Option<Value>,
    pub min_loan_amount: Option<Value>,
    pub interest_rate: Option<Value>,
    pub loan_duration: Option<Value>,
}

impl CreateLoanFundRequest {
    /// Validate every field and collect all violations
    pub fn validate(&self) -> Result<NewLoanFund, FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = self
            .name
            .as_ref()
            .and_then(|v| parse_text(v, NAME_MAX_LEN));
        if name.is_none() {
            errors.reject("name");
        }

        let amount = match self.amount.as_ref().filter(|v| !v.is_null()) {
            None => Some(money(Decimal::ZERO)),
            Some(v) => non_negative(v),
        };
        if amount.is_none() {
            errors.reject("amount");
        }

        let max_loan_amount = self.max_loan_amount.as_ref().and_then(non_negative);
        if max_loan_amount.is_none() {
            errors.reject("max_loan_amount");
        }

        let min_loan_amount = self.min_loan_amount.as_ref().and_then(non_negative);
        if min_loan_amount.is_none() {
            errors.reject("min_loan_amount");
        }

        let interest_rate = self
            .interest_rate
            .as_ref()
            .and_then(|v| parse_decimal(v, RATE))
            .filter(|rate| *rate >= min_interest_rate());
        if interest_rate.is_none() {
            errors.reject("interest_rate");
        }

        let loan_duration = self
            .loan_duration
            .as_ref()
            .and_then(parse_integer)
            .and_then(|d| i32::try_from(d).ok())
            .filter(|d| *d >= MIN_LOAN_DURATION);
        if loan_duration.is_none() {
            errors.reject("loan_duration");
        }

        if let (Some(max), Some(min)) = (max_loan_amount, min_loan_amount) {
            if max < min {
                errors.reject("non_field_errors");
            }
        }

        match (
            name,
            amount,
            max_loan_amount,
            min_loan_amount,
            interest_rate,
            loan_duration,
        ) {
            (Some(name), Some(amount), Some(max), Some(min), Some(rate), Some(duration))
                if errors.is_empty() =>
            {
                Ok(NewLoanFund {
                    name,
                    amount,
                    max_loan_amount: max,
                    min_loan_amount: min,
                    interest_rate: rate,
                    loan_duration: duration,
                })
            }
            _ => Err(errors),
        }
    }
}

fn non_negative(value: &Value) -> Option<Decimal> {
    parse_decimal(value, MONEY).filter(|d| !d.is_sign_negative() || d.is_zero())
}

/// Request DTO for topping up a fund
#[derive(Debug, Default, Deserialize)]
pub struct TopUpRequest {
    pub amount: Option<Value>,
}

impl TopUpRequest {
    pub fn delta(&self) -> Result<Decimal, FieldErrors> {
        self.amount
            .as_ref()
            .and_then(|v| parse_decimal(v, MONEY))
            .ok_or_else(|| {
                let mut errors = FieldErrors::new();
                errors.reject_with("amount", "A valid number is required.");
                errors
            })
    }
}

/// Which balances a top-up may produce
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TopUpPolicy {
    /// `min_loan_amount <= new balance <= max_loan_amount`
    #[default]
    Bounded,
    /// `min_loan_amount <= new balance`
    FloorOnly,
}

impl TopUpPolicy {
    pub fn permits(&self, fund: &LoanFund, new_amount: Decimal) -> bool {
        let above_floor = new_amount >= fund.min_loan_amount;
        match self {
            TopUpPolicy::Bounded => above_floor && new_amount <= fund.max_loan_amount,
            TopUpPolicy::FloorOnly => above_floor,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TopUpPolicy::Bounded => "bounded",
            TopUpPolicy::FloorOnly => "floor_only",
        }
    }
}

impl FromStr for TopUpPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bounded" => Ok(TopUpPolicy::Bounded),
            "floor_only" | "floor-only" | "unbounded" => Ok(TopUpPolicy::FloorOnly),
            other => Err(format!(
                "Invalid top-up policy: '{}'. Expected: bounded or floor_only",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn request(body: Value) -> CreateLoanFundRequest {
        serde_json::from_value(body).unwrap()
    }

    fn fund() -> LoanFund {
        LoanFund {
            id: 1,
            name: "Test Fund".to_string(),
            amount: dec!(10000.00),
            max_loan_amount: dec!(50000.00),
            min_loan_amount: dec!(1000.00),
            interest_rate: dec!(4.00),
            loan_duration: 12,
        }
    }

    #[test]
    fn test_valid_fund_defaults_amount_to_zero() {
        let new_fund = request(json!({
            "name": "Test Fund",
            "max_loan_amount": 50000,
            "min_loan_amount": 1000,
            "interest_rate": 4,
            "loan_duration": 12
        }))
        .validate()
        .unwrap();

        assert_eq!(new_fund.amount, Decimal::ZERO);
        assert_eq!(new_fund.amount.to_string(), "0.00");
        assert_eq!(new_fund.interest_rate, dec!(4));
    }

    #[test]
    fn test_decimal_values_accepted() {
        let new_fund = request(json!({
            "name": "Decimal Fund",
            "amount": 1234.56,
            "max_loan_amount": 5000.75,
            "min_loan_amount": 200.50,
            "interest_rate": 2.75,
            "loan_duration": 24
        }))
        .validate()
        .unwrap();

        assert_eq!(new_fund.amount, dec!(1234.56));
        assert_eq!(new_fund.min_loan_amount, dec!(200.50));
    }

    #[test]
    fn test_every_violated_field_is_reported() {
        let errors = request(json!({
            "name": "Test Fund",
            "amount": "invalid",
            "max_loan_amount": -50000,
            "min_loan_amount": "invalid",
            "interest_rate": "invalid",
            "loan_duration": 1
        }))
        .validate()
        .unwrap_err();

        let fields: Vec<String> = errors.into_map().into_keys().collect();
        assert_eq!(
            fields,
            vec![
                "amount",
                "interest_rate",
                "loan_duration",
                "max_loan_amount",
                "min_loan_amount"
            ]
        );
    }

    #[test]
    fn test_rate_duration_and_name_bounds() {
        let errors = request(json!({
            "name": "",
            "max_loan_amount": 50000,
            "min_loan_amount": 1000,
            "interest_rate": -4,
            "loan_duration": 1
        }))
        .validate()
        .unwrap_err();

        assert!(errors.contains("name"));
        assert!(errors.contains("interest_rate"));
        assert!(errors.contains("loan_duration"));
        assert!(!errors.contains("amount"));

        let ok = request(json!({
            "name": "Edge",
            "max_loan_amount": 10,
            "min_loan_amount": 10,
            "interest_rate": 0.01,
            "loan_duration": 2
        }))
        .validate();
        assert!(ok.is_ok());
    }

    #[test]
    fn test_max_below_min_rejected() {
        let errors = request(json!({
            "name": "Inverted",
            "max_loan_amount": 100,
            "min_loan_amount": 1000,
            "interest_rate": 4,
            "loan_duration": 12
        }))
        .validate()
        .unwrap_err();

        assert_eq!(
            errors.into_map().into_keys().collect::<Vec<_>>(),
            vec!["non_field_errors"]
        );
    }

    #[test]
    fn test_top_up_delta_parsing() {
        let delta = TopUpRequest {
            amount: Some(json!(2000)),
        }
        .delta()
        .unwrap();
        assert_eq!(delta, dec!(2000));

        assert!(TopUpRequest {
            amount: Some(json!("invalid"))
        }
        .delta()
        .is_err());
        assert!(TopUpRequest::default().delta().is_err());
    }

    #[test]
    fn test_top_up_policies() {
        let fund = fund();
        assert!(TopUpPolicy::Bounded.permits(&fund, dec!(12000)));
        assert!(!TopUpPolicy::Bounded.permits(&fund, dec!(60000)));
        assert!(!TopUpPolicy::Bounded.permits(&fund, dec!(500)));

        assert!(TopUpPolicy::FloorOnly.permits(&fund, dec!(60000)));
        assert!(!TopUpPolicy::FloorOnly.permits(&fund, dec!(500)));
    }

    #[test]
    fn test_top_up_policy_from_str() {
        assert_eq!("bounded".parse::<TopUpPolicy>().unwrap(), TopUpPolicy::Bounded);
        assert_eq!(
            "FLOOR_ONLY".parse::<TopUpPolicy>().unwrap(),
            TopUpPolicy::FloorOnly
        );
        assert!("sometimes".parse::<TopUpPolicy>().is_err());
        assert_eq!(TopUpPolicy::default(), TopUpPolicy::Bounded);
    }
}
