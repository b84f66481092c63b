use std::{fmt, sync::Arc};

use rollcall_core::AccountService;

#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
}

impl AppState {
    pub fn new(accounts: AccountService) -> Self {
        Self {
            accounts: Arc::new(accounts),
        }
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("backend", &self.accounts.store().backend_name())
            .finish_non_exhaustive()
    }
}
