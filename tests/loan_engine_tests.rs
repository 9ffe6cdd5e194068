//! Loan engine tests against the in-memory store
//!
//! Balance bookkeeping between loans and the funds they draw from.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use serde_json::{json, Value};

    use loanfund_server::error::ErrorDetail;
    use loanfund_server::loan::{CreateLoanRequest, LoanService, LoanStatus};
    use loanfund_server::loan_fund::{LoanFundService, NewLoanFund, TopUpPolicy};
    use loanfund_server::store::{MemoryStore, RecordStore};

    struct Engine {
        funds: LoanFundService,
        loans: LoanService,
    }

    /// Helper to create both services over one fresh store
    fn setup() -> Engine {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        Engine {
            funds: LoanFundService::new(store.clone(), TopUpPolicy::Bounded),
            loans: LoanService::new(store),
        }
    }

    fn test_fund(amount: Decimal) -> NewLoanFund {
        NewLoanFund {
            name: "Test Fund".to_string(),
            amount,
            max_loan_amount: dec!(50000.00),
            min_loan_amount: dec!(1000.00),
            interest_rate: dec!(4.00),
            loan_duration: 12,
        }
    }

    fn loan_request(fund_id: i64, customer: &str, amount: Value) -> CreateLoanRequest {
        serde_json::from_value(json!({
            "customerName": customer,
            "loan_fund_id": fund_id,
            "amount": amount
        }))
        .unwrap()
    }

    fn message(text: &str) -> ErrorDetail {
        ErrorDetail::Message(text.to_string())
    }

    // =========================================================================
    // Loan creation
    // =========================================================================

    #[tokio::test]
    async fn test_create_loan_debits_fund() {
        let engine = setup();
        let fund = engine.funds.create(test_fund(dec!(10000.00))).await.unwrap();

        let loan = engine
            .loans
            .create_loan(&loan_request(fund.id, "John Doe", json!(1000)))
            .await
            .unwrap();

        assert_eq!(loan.loan_amount, dec!(1000.00));
        assert_eq!(loan.interest_rate, dec!(4.00));
        assert_eq!(loan.duration, 12);
        assert_eq!(loan.status, LoanStatus::Requested);
        assert_eq!(loan.monthly_installment, dec!(86.67));
        assert!(loan.date_approved.is_none());
        assert!(loan.date_rejected.is_none());

        let fund = engine.funds.get(fund.id).await.unwrap();
        assert_eq!(fund.amount, dec!(9000.00));
    }

    #[tokio::test]
    async fn test_amount_exceeding_balance_rejected() {
        let engine = setup();
        let fund = engine.funds.create(test_fund(dec!(5000.00))).await.unwrap();

        let err = engine
            .loans
            .create_loan(&loan_request(fund.id, "John Doe", json!(6000)))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.detail(), message("Amount Exceeds Funds"));
        assert_eq!(
            engine.funds.get(fund.id).await.unwrap().amount,
            dec!(5000.00)
        );
    }

    #[tokio::test]
    async fn test_amount_below_minimum_rejected() {
        let engine = setup();
        let fund = engine.funds.create(test_fund(dec!(5000.00))).await.unwrap();

        let err = engine
            .loans
            .create_loan(&loan_request(fund.id, "John Doe", json!(500)))
            .await
            .unwrap_err();
        assert_eq!(err.detail(), message("Amount less than Min Loan Amount"));

        // an absent amount counts as zero
        let request: CreateLoanRequest =
            serde_json::from_value(json!({ "customerName": "John", "loan_fund_id": fund.id }))
                .unwrap();
        let err = engine.loans.create_loan(&request).await.unwrap_err();
        assert_eq!(err.detail(), message("Amount less than Min Loan Amount"));
    }

    #[tokio::test]
    async fn test_amount_above_fund_maximum_leaves_fund_unchanged() {
        let engine = setup();
        let fund = engine
            .funds
            .create(test_fund(dec!(100000.00)))
            .await
            .unwrap();

        let err = engine
            .loans
            .create_loan(&loan_request(fund.id, "John Doe", json!(60000)))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        match err.detail() {
            ErrorDetail::Fields(fields) => assert!(fields.contains_key("loan_amount")),
            other => panic!("expected field errors, got {:?}", other),
        }
        assert_eq!(
            engine.funds.get(fund.id).await.unwrap().amount,
            dec!(100000.00)
        );
        assert!(engine.loans.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_loan_keeps_rate_snapshot() {
        let engine = setup();
        let fund = engine.funds.create(test_fund(dec!(10000.00))).await.unwrap();
        let loan = engine
            .loans
            .create_loan(&loan_request(fund.id, "John Doe", json!("2500.50")))
            .await
            .unwrap();

        assert_eq!(loan.interest_rate, fund.interest_rate);
        assert_eq!(loan.duration, fund.loan_duration);
        // 2500.50 * 1.04 / 12 = 216.71
        assert_eq!(loan.monthly_installment, dec!(216.71));

        let stored = engine.loans.get(loan.id).await.unwrap();
        assert_eq!(stored.interest_rate, dec!(4.00));
        assert_eq!(stored.duration, 12);
        assert_eq!(stored, loan);
    }

    // =========================================================================
    // Concurrency
    // =========================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_loans_never_overdraw() {
        let engine = setup();
        let fund = engine.funds.create(test_fund(dec!(10000.00))).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..20 {
            let loans = engine.loans.clone();
            let request = loan_request(fund.id, &format!("Customer {i}"), json!(1000));
            handles.push(tokio::spawn(async move {
                loans.create_loan(&request).await
            }));
        }

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(err) => assert_eq!(err.detail(), message("Amount Exceeds Funds")),
            }
        }

        assert_eq!(created, 10);
        assert_eq!(engine.funds.get(fund.id).await.unwrap().amount, dec!(0.00));
        assert_eq!(engine.loans.list_all().await.unwrap().len(), 10);
    }

    // =========================================================================
    // Lifecycle and deletion
    // =========================================================================

    #[tokio::test]
    async fn test_delete_loan_does_not_refund() {
        let engine = setup();
        let fund = engine.funds.create(test_fund(dec!(10000.00))).await.unwrap();
        let loan = engine
            .loans
            .create_loan(&loan_request(fund.id, "John Doe", json!(1000)))
            .await
            .unwrap();

        engine.loans.delete(loan.id).await.unwrap();

        assert_eq!(
            engine.funds.get(fund.id).await.unwrap().amount,
            dec!(9000.00)
        );
        assert!(engine.loans.get(loan.id).await.is_err());
    }

    #[tokio::test]
    async fn test_fund_delete_cascades_to_loans() {
        let engine = setup();
        let doomed = engine.funds.create(test_fund(dec!(10000.00))).await.unwrap();
        let kept = engine.funds.create(test_fund(dec!(10000.00))).await.unwrap();

        for fund_id in [doomed.id, doomed.id, kept.id] {
            engine
                .loans
                .create_loan(&loan_request(fund_id, "John Doe", json!(1000)))
                .await
                .unwrap();
        }

        engine.funds.delete(doomed.id).await.unwrap();

        let remaining = engine.loans.list_all().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].loan_fund_id, kept.id);
    }

    #[tokio::test]
    async fn test_customer_lookup_is_exact() {
        let engine = setup();
        let fund = engine.funds.create(test_fund(dec!(10000.00))).await.unwrap();
        for customer in ["John Doe", "John Doe", "Jane Doe"] {
            engine
                .loans
                .create_loan(&loan_request(fund.id, customer, json!(1000)))
                .await
                .unwrap();
        }

        assert_eq!(
            engine
                .loans
                .list_by_customer_name("John Doe")
                .await
                .unwrap()
                .len(),
            2
        );

        let err = engine
            .loans
            .list_by_customer_name("john doe")
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_all_on_empty_store() {
        let engine = setup();
        assert!(engine.loans.list_all().await.unwrap().is_empty());
    }
}
