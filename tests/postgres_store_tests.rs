//! Record store tests against a real PostgreSQL database
//!
//! Run with `TEST_DATABASE_URL` pointing at a scratch database and `--ignored`.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal_macros::dec;
    use serde_json::json;
    use sqlx::PgPool;

    use loanfund_server::db;
    use loanfund_server::loan::{CreateLoanRequest, LoanService};
    use loanfund_server::loan_fund::{LoanFundService, NewLoanFund, TopUpPolicy};
    use loanfund_server::store::{PgStore, RecordStore};

    /// Helper to create a migrated test database pool
    async fn setup_test_db() -> PgPool {
        let database_url = std::env::var("TEST_DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/loanfund_test".to_string());

        let pool = db::create_pool(&database_url, 5)
            .await
            .expect("Failed to connect to test database");
        db::run_migrations(&pool)
            .await
            .expect("Failed to migrate test database");
        pool
    }

    fn test_fund() -> NewLoanFund {
        NewLoanFund {
            name: "Postgres Fund".to_string(),
            amount: dec!(10000.00),
            max_loan_amount: dec!(50000.00),
            min_loan_amount: dec!(1000.00),
            interest_rate: dec!(4.00),
            loan_duration: 12,
        }
    }

    fn loan_request(fund_id: i64) -> CreateLoanRequest {
        serde_json::from_value(json!({
            "customerName": "Postgres Customer",
            "loan_fund_id": fund_id,
            "amount": 1000
        }))
        .unwrap()
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_loan_round_trip() {
        let store: Arc<dyn RecordStore> = Arc::new(PgStore::new(setup_test_db().await));
        let funds = LoanFundService::new(store.clone(), TopUpPolicy::Bounded);
        let loans = LoanService::new(store.clone());

        let fund = funds.create(test_fund()).await.unwrap();
        let loan = loans.create_loan(&loan_request(fund.id)).await.unwrap();

        assert_eq!(loan.monthly_installment.to_string(), "86.67");
        assert_eq!(funds.get(fund.id).await.unwrap().amount, dec!(9000.00));

        let approved = loans.approve(loan.id).await.unwrap();
        assert!(approved.date_approved.is_some());

        funds.delete(fund.id).await.unwrap();
        assert!(loans.get(loan.id).await.is_err());
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_concurrent_debits_serialize_on_fund_row() {
        let store: Arc<dyn RecordStore> = Arc::new(PgStore::new(setup_test_db().await));
        let funds = LoanFundService::new(store.clone(), TopUpPolicy::Bounded);
        let loans = LoanService::new(store.clone());

        let fund = funds.create(test_fund()).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..15 {
            let loans = loans.clone();
            let request = loan_request(fund.id);
            handles.push(tokio::spawn(async move { loans.create_loan(&request).await }));
        }

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                created += 1;
            }
        }

        assert_eq!(created, 10);
        assert_eq!(funds.get(fund.id).await.unwrap().amount, dec!(0.00));

        funds.delete(fund.id).await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_fund_delete_cascades_to_loans() {
        let store: Arc<dyn RecordStore> = Arc::new(PgStore::new(setup_test_db().await));
        let funds = LoanFundService::new(store.clone(), TopUpPolicy::Bounded);
        let loans = LoanService::new(store.clone());

        let fund = funds.create(test_fund()).await.unwrap();
        let first = loans.create_loan(&loan_request(fund.id)).await.unwrap();
        let second = loans.create_loan(&loan_request(fund.id)).await.unwrap();

        let other = funds.create(test_fund()).await.unwrap();
        let kept = loans.create_loan(&loan_request(other.id)).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.delete_fund(fund.id).await.unwrap(), Some(2));
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert!(tx.find_fund(fund.id).await.unwrap().is_none());
        assert!(tx.find_loan(first.id).await.unwrap().is_none());
        assert!(tx.find_loan(second.id).await.unwrap().is_none());
        assert_eq!(tx.find_loan(kept.id).await.unwrap(), Some(kept));
        assert_eq!(tx.delete_fund(fund.id).await.unwrap(), None);
        drop(tx);

        funds.delete(other.id).await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_uncommitted_transaction_rolls_back() {
        let store = PgStore::new(setup_test_db().await);

        let mut tx = store.begin().await.unwrap();
        let fund = tx.insert_fund(&test_fund()).await.unwrap();
        drop(tx);

        let mut tx = store.begin().await.unwrap();
        assert!(tx.find_fund(fund.id).await.unwrap().is_none());
    }
}
