use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rollcall_model::{Account, AccountId};
use uuid::Uuid;

use super::{ColumnFamilies, TokenColumn};
use crate::error::{AccountError, Result};

/// Table operation that can be made to fail once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableOp {
    GetRecord,
    PutRecord,
    DeleteRecord,
    GetEmail,
    PutEmail,
    DeleteEmail,
    FindByToken,
    Scan,
}

/// In-process column tables.
///
/// Records are keyed by id in a `BTreeMap`, so scans walk ascending id
/// order. Used for local development and for exercising the wide-column
/// write ordering with injected failures.
#[derive(Debug, Default)]
pub struct MemoryColumnFamilies {
    records: RwLock<BTreeMap<Uuid, Account>>,
    emails: RwLock<HashMap<String, AccountId>>,
    faults: Mutex<Vec<TableOp>>,
}

impl MemoryColumnFamilies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call of `op` fail with a backend error.
    pub fn fail_next(&self, op: TableOp) {
        self.faults.lock().push(op);
    }

    pub fn record_count(&self) -> usize {
        self.records.read().len()
    }

    pub fn email_count(&self) -> usize {
        self.emails.read().len()
    }

    pub fn email_entry(&self, email: &str) -> Option<AccountId> {
        self.emails.read().get(email).copied()
    }

    /// Write an index entry directly, bypassing the store's ordering.
    pub fn insert_email_entry(&self, email: &str, id: AccountId) {
        self.emails.write().insert(email.to_string(), id);
    }

    fn check(&self, op: TableOp) -> Result<()> {
        let mut faults = self.faults.lock();
        if let Some(pos) = faults.iter().position(|f| *f == op) {
            faults.remove(pos);
            return Err(AccountError::Backend(format!(
                "injected failure: {op:?}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ColumnFamilies for MemoryColumnFamilies {
    fn driver_name(&self) -> &'static str {
        "memory"
    }

    async fn get_record(&self, id: AccountId) -> Result<Option<Account>> {
        self.check(TableOp::GetRecord)?;
        Ok(self.records.read().get(id.as_uuid()).cloned())
    }

    async fn put_record(&self, account: &Account) -> Result<()> {
        self.check(TableOp::PutRecord)?;
        self.records
            .write()
            .insert(account.id.to_uuid(), account.clone());
        Ok(())
    }

    async fn delete_record(&self, id: AccountId) -> Result<()> {
        self.check(TableOp::DeleteRecord)?;
        self.records.write().remove(id.as_uuid());
        Ok(())
    }

    async fn get_email(&self, email: &str) -> Result<Option<AccountId>> {
        self.check(TableOp::GetEmail)?;
        Ok(self.email_entry(email))
    }

    async fn put_email(&self, email: &str, id: AccountId) -> Result<()> {
        self.check(TableOp::PutEmail)?;
        self.insert_email_entry(email, id);
        Ok(())
    }

    async fn delete_email(&self, email: &str) -> Result<()> {
        self.check(TableOp::DeleteEmail)?;
        self.emails.write().remove(email);
        Ok(())
    }

    async fn find_by_token(
        &self,
        column: TokenColumn,
        token: &str,
    ) -> Result<Option<Account>> {
        self.check(TableOp::FindByToken)?;
        Ok(self
            .records
            .read()
            .values()
            .find(|account| column.value(account) == Some(token))
            .cloned())
    }

    async fn scan(
        &self,
        after: Option<AccountId>,
        limit: u32,
    ) -> Result<Vec<Account>> {
        self.check(TableOp::Scan)?;
        let records = self.records.read();
        let rows = match after {
            Some(after) => records
                .range((
                    std::ops::Bound::Excluded(after.to_uuid()),
                    std::ops::Bound::Unbounded,
                ))
                .map(|(_, account)| account.clone())
                .take(limit as usize)
                .collect(),
            None => records.values().take(limit as usize).cloned().collect(),
        };
        Ok(rows)
    }

    async fn create_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn truncate(&self) -> Result<()> {
        self.records.write().clear();
        self.emails.write().clear();
        Ok(())
    }

    async fn close(&self) {}
}
