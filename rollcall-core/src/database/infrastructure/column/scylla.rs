use std::{collections::HashMap, fmt, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rollcall_model::{Account, AccountId, AccountImage};
use scylla::{
    client::{session::Session, session_builder::SessionBuilder},
    statement::{Consistency, unprepared::Statement},
};
use tracing::{debug, error, info};
use uuid::Uuid;

use super::{ColumnFamilies, TokenColumn};
use crate::error::{AccountError, Result};

pub const DEFAULT_HOSTS: &str = "127.0.0.1:9042";

const RECORD_COLUMNS: &str = "id, name, email, hashed_password, \
     confirmation_token, password_reset_token, images, metadata, created_at";

type RecordRow = (
    Uuid,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<HashMap<String, String>>,
    DateTime<Utc>,
);

fn backend_err(action: &str, err: impl fmt::Display) -> AccountError {
    error!("Cassandra {} failed: {}", action, err);
    AccountError::Backend(format!("Failed to {}: {}", action, err))
}

fn account_from_row(row: RecordRow) -> Result<Account> {
    let (
        id,
        name,
        email,
        hashed_password,
        confirmation_token,
        password_reset_token,
        images,
        metadata,
        created_at,
    ) = row;

    let images: Vec<AccountImage> = match images.as_deref() {
        None | Some("") => Vec::new(),
        Some(raw) => serde_json::from_str(raw).map_err(|e| {
            AccountError::Backend(format!("Corrupt images column: {}", e))
        })?,
    };

    Ok(Account {
        id: AccountId(id),
        name,
        email,
        hashed_password,
        confirmation_token,
        password_reset_token,
        images,
        metadata: metadata.unwrap_or_default(),
        created_at,
    })
}

/// Parse a consistency level name such as `quorum` or `LOCAL_ONE`.
pub fn parse_consistency(value: &str) -> Result<Consistency> {
    let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
    let consistency = match normalized.as_str() {
        "any" => Consistency::Any,
        "one" => Consistency::One,
        "two" => Consistency::Two,
        "three" => Consistency::Three,
        "quorum" => Consistency::Quorum,
        "all" => Consistency::All,
        "local_quorum" => Consistency::LocalQuorum,
        "each_quorum" => Consistency::EachQuorum,
        "local_one" => Consistency::LocalOne,
        _ => {
            return Err(AccountError::Backend(format!(
                "Unknown Cassandra consistency level: {}",
                value
            )));
        }
    };
    Ok(consistency)
}

/// Connection settings for the CQL driver.
#[derive(Debug, Clone)]
pub struct ScyllaSettings {
    pub keyspace: String,
    pub hosts: Vec<String>,
    pub consistency: Consistency,
    pub replication_factor: u32,
}

impl ScyllaSettings {
    /// `hosts` is a comma separated `host:port` list; empty means
    /// [`DEFAULT_HOSTS`].
    pub fn new(keyspace: impl Into<String>, hosts: &str) -> Result<Self> {
        let keyspace = keyspace.into();
        let valid = !keyspace.is_empty()
            && keyspace.len() <= 48
            && keyspace.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            && keyspace.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
        if !valid {
            return Err(AccountError::Backend(format!(
                "Invalid Cassandra keyspace name: {:?}",
                keyspace
            )));
        }

        let mut hosts: Vec<String> = hosts
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_string)
            .collect();
        if hosts.is_empty() {
            hosts.push(DEFAULT_HOSTS.to_string());
        }

        Ok(Self {
            keyspace,
            hosts,
            consistency: Consistency::LocalQuorum,
            replication_factor: 1,
        })
    }

    pub fn with_consistency(mut self, consistency: Consistency) -> Self {
        self.consistency = consistency;
        self
    }

    pub fn with_replication_factor(mut self, replication_factor: u32) -> Self {
        self.replication_factor = replication_factor.max(1);
        self
    }
}

/// CQL driver for the two account tables.
///
/// Tables are addressed by fully qualified name so the session can be
/// opened before `migrate` has created the keyspace.
pub struct ScyllaColumnFamilies {
    session: RwLock<Option<Arc<Session>>>,
    settings: ScyllaSettings,
}

impl fmt::Debug for ScyllaColumnFamilies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScyllaColumnFamilies")
            .field("keyspace", &self.settings.keyspace)
            .field("hosts", &self.settings.hosts)
            .field("consistency", &self.settings.consistency)
            .field("connected", &self.session.read().is_some())
            .finish()
    }
}

impl ScyllaColumnFamilies {
    pub async fn connect(settings: ScyllaSettings) -> Result<Self> {
        let session = SessionBuilder::new()
            .known_nodes(&settings.hosts)
            .build()
            .await
            .map_err(|e| backend_err("connect to Cassandra", e))?;

        info!(
            "Cassandra session established (keyspace={}, hosts={})",
            settings.keyspace,
            settings.hosts.join(",")
        );

        Ok(Self {
            session: RwLock::new(Some(Arc::new(session))),
            settings,
        })
    }

    fn session(&self) -> Result<Arc<Session>> {
        self.session.read().clone().ok_or_else(|| {
            AccountError::Backend("Cassandra session is closed".to_string())
        })
    }

    fn statement(&self, cql: String) -> Statement {
        let mut statement = Statement::new(cql);
        statement.set_consistency(self.settings.consistency);
        statement
    }

    fn id_table(&self) -> String {
        format!("{}.accounts_map_id", self.settings.keyspace)
    }

    fn email_table(&self) -> String {
        format!("{}.accounts_map_email", self.settings.keyspace)
    }

    async fn fetch_records(
        &self,
        action: &str,
        cql: String,
        values: impl scylla::serialize::row::SerializeRow + Send,
    ) -> Result<Vec<Account>> {
        let session = self.session()?;
        let result = session
            .query_unpaged(self.statement(cql), values)
            .await
            .map_err(|e| backend_err(action, e))?
            .into_rows_result()
            .map_err(|e| backend_err(action, e))?;

        let rows = result
            .rows::<RecordRow>()
            .map_err(|e| backend_err(action, e))?;

        let mut accounts = Vec::new();
        for row in rows {
            let row = row.map_err(|e| backend_err(action, e))?;
            accounts.push(account_from_row(row)?);
        }
        Ok(accounts)
    }

    async fn execute(
        &self,
        action: &str,
        cql: String,
        values: impl scylla::serialize::row::SerializeRow + Send,
    ) -> Result<()> {
        let session = self.session()?;
        session
            .query_unpaged(self.statement(cql), values)
            .await
            .map_err(|e| backend_err(action, e))?;
        Ok(())
    }
}

#[async_trait]
impl ColumnFamilies for ScyllaColumnFamilies {
    fn driver_name(&self) -> &'static str {
        "cassandra"
    }

    async fn get_record(&self, id: AccountId) -> Result<Option<Account>> {
        let cql = format!(
            "SELECT {RECORD_COLUMNS} FROM {} WHERE id = ?",
            self.id_table()
        );
        let mut rows = self
            .fetch_records("read account", cql, (id.to_uuid(),))
            .await?;
        Ok(rows.pop())
    }

    async fn put_record(&self, account: &Account) -> Result<()> {
        let images = serde_json::to_string(&account.images).map_err(|e| {
            AccountError::Internal(format!("Failed to encode images: {}", e))
        })?;

        let cql = format!(
            "INSERT INTO {} ({RECORD_COLUMNS}) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            self.id_table()
        );
        self.execute(
            "write account",
            cql,
            (
                account.id.to_uuid(),
                account.name.as_str(),
                account.email.as_str(),
                account.hashed_password.as_str(),
                account.confirmation_token.as_deref(),
                account.password_reset_token.as_deref(),
                images.as_str(),
                &account.metadata,
                account.created_at,
            ),
        )
        .await
    }

    async fn delete_record(&self, id: AccountId) -> Result<()> {
        let cql = format!("DELETE FROM {} WHERE id = ?", self.id_table());
        self.execute("delete account", cql, (id.to_uuid(),)).await
    }

    async fn get_email(&self, email: &str) -> Result<Option<AccountId>> {
        let session = self.session()?;
        let cql =
            format!("SELECT id FROM {} WHERE email = ?", self.email_table());
        let row = session
            .query_unpaged(self.statement(cql), (email,))
            .await
            .map_err(|e| backend_err("read email index", e))?
            .into_rows_result()
            .map_err(|e| backend_err("read email index", e))?
            .maybe_first_row::<(Uuid,)>()
            .map_err(|e| backend_err("read email index", e))?;

        Ok(row.map(|(id,)| AccountId(id)))
    }

    async fn put_email(&self, email: &str, id: AccountId) -> Result<()> {
        let cql = format!(
            "INSERT INTO {} (email, id) VALUES (?, ?)",
            self.email_table()
        );
        self.execute("write email index", cql, (email, id.to_uuid()))
            .await
    }

    async fn delete_email(&self, email: &str) -> Result<()> {
        let cql = format!("DELETE FROM {} WHERE email = ?", self.email_table());
        self.execute("delete email index", cql, (email,)).await
    }

    async fn find_by_token(
        &self,
        column: TokenColumn,
        token: &str,
    ) -> Result<Option<Account>> {
        let cql = format!(
            "SELECT {RECORD_COLUMNS} FROM {} WHERE {} = ?",
            self.id_table(),
            column.column_name()
        );
        let mut rows =
            self.fetch_records("look up token", cql, (token,)).await?;
        Ok(rows.pop())
    }

    async fn scan(
        &self,
        after: Option<AccountId>,
        limit: u32,
    ) -> Result<Vec<Account>> {
        let limit = i32::try_from(limit).unwrap_or(i32::MAX);
        match after {
            Some(after) => {
                debug!("Scanning accounts after token({})", after);
                let cql = format!(
                    "SELECT {RECORD_COLUMNS} FROM {} \
                     WHERE token(id) > token(?) LIMIT ?",
                    self.id_table()
                );
                self.fetch_records(
                    "list accounts",
                    cql,
                    (after.to_uuid(), limit),
                )
                .await
            }
            None => {
                let cql = format!(
                    "SELECT {RECORD_COLUMNS} FROM {} LIMIT ?",
                    self.id_table()
                );
                self.fetch_records("list accounts", cql, (limit,)).await
            }
        }
    }

    async fn create_schema(&self) -> Result<()> {
        let keyspace = &self.settings.keyspace;
        let statements = [
            format!(
                "CREATE KEYSPACE IF NOT EXISTS {keyspace} WITH replication = \
                 {{'class': 'SimpleStrategy', 'replication_factor': {}}}",
                self.settings.replication_factor
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {} (\
                     id uuid PRIMARY KEY, \
                     name text, \
                     email text, \
                     hashed_password text, \
                     confirmation_token text, \
                     password_reset_token text, \
                     images text, \
                     metadata map<text, text>, \
                     created_at timestamp)",
                self.id_table()
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {} \
                 (email text PRIMARY KEY, id uuid)",
                self.email_table()
            ),
            format!(
                "CREATE INDEX IF NOT EXISTS accounts_confirmation_token_idx \
                 ON {} (confirmation_token)",
                self.id_table()
            ),
            format!(
                "CREATE INDEX IF NOT EXISTS accounts_password_reset_token_idx \
                 ON {} (password_reset_token)",
                self.id_table()
            ),
        ];

        for cql in statements {
            self.execute("create schema", cql, ()).await?;
        }

        info!("Cassandra schema ready in keyspace {}", keyspace);
        Ok(())
    }

    async fn truncate(&self) -> Result<()> {
        for table in [self.id_table(), self.email_table()] {
            self.execute("truncate", format!("TRUNCATE {table}"), ()).await?;
        }
        Ok(())
    }

    async fn close(&self) {
        if self.session.write().take().is_some() {
            info!("Cassandra session closed");
        }
    }
}
