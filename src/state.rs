use std::sync::Arc;

use crate::{
    auth::{AuthGuard, TokenIssuer},
    directory::Directory,
    ledger::OperationLedger,
    report::ReportEngine,
    scope::AccessScope,
    store::Store,
};

/// Components shared by every request, all built on one injected store.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub guard: AuthGuard,
    pub scope: AccessScope,
    pub ledger: OperationLedger,
    pub directory: Directory,
    pub reports: ReportEngine,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, tokens: TokenIssuer) -> Self {
        Self {
            guard: AuthGuard::new(store.clone(), tokens),
            scope: AccessScope::new(store.clone()),
            ledger: OperationLedger::new(store.clone()),
            directory: Directory::new(store.clone()),
            reports: ReportEngine::new(store.clone()),
            store,
        }
    }
}
