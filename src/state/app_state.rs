//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::AuthService;
use crate::config::Config;
use crate::loan::LoanService;
use crate::loan_fund::LoanFundService;
use crate::store::RecordStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub loan_fund_service: Arc<LoanFundService>,
    pub loan_service: Arc<LoanService>,
    pub auth_service: Arc<AuthService>,
}

impl AppState {
    /// Wire every service onto one record store
    pub fn new(store: Arc<dyn RecordStore>, config: &Config) -> Self {
        let loan_fund_service = Arc::new(LoanFundService::new(
            store.clone(),
            config.top_up_policy,
        ));
        let loan_service = Arc::new(LoanService::new(store.clone()));
        let auth_service = Arc::new(AuthService::new(
            store.clone(),
            config.jwt_secret.clone(),
            config.jwt_ttl_seconds,
            config.bcrypt_cost,
        ));

        Self {
            store,
            loan_fund_service,
            loan_service,
            auth_service,
        }
    }
}

impl FromRef<AppState> for Arc<dyn RecordStore> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.store.clone()
    }
}

impl FromRef<AppState> for Arc<LoanFundService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.loan_fund_service.clone()
    }
}

impl FromRef<AppState> for Arc<LoanService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.loan_service.clone()
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.auth_service.clone()
    }
}
