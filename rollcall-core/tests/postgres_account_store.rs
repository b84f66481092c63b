use std::collections::{HashMap, HashSet};

use anyhow::Result;
use rollcall_core::{
    AccountError,
    database::{AccountStore, PageCursor, PostgresAccountStore},
};
use rollcall_model::{Account, AccountId, AccountImage, NewAccount};
use sqlx::PgPool;

fn new_account(name: &str, email: &str) -> NewAccount {
    NewAccount {
        name: name.to_string(),
        email: email.to_string(),
        hashed_password: "$argon2id$stub".to_string(),
        confirmation_token: Some(format!("confirm-{name}")),
        images: vec![AccountImage {
            variant: "thumbnail".into(),
            url: format!("https://img.local/{name}.png"),
            filename: format!("{name}.png"),
        }],
        metadata: HashMap::from([("source".to_string(), "test".to_string())]),
    }
}

#[sqlx::test(migrator = "rollcall_core::MIGRATOR")]
async fn create_and_read_back(pool: PgPool) -> Result<()> {
    let store = PostgresAccountStore::new(pool);

    let created = store.create(new_account("alex", "Alex@Example.com")).await?;
    assert_eq!(created.email, "Alex@Example.com");
    assert_eq!(created.id.to_uuid().get_version_num(), 7);
    assert_eq!(created.created_at.timestamp_subsec_nanos() % 1_000_000, 0);
    assert_eq!(created.images.len(), 1);

    let by_id = store.read_by_id(created.id).await?;
    assert_eq!(by_id, created);

    let by_email = store.read_by_email("  alex@example.COM").await?;
    assert_eq!(by_email.id, created.id);
    assert_eq!(
        by_email.metadata.get("source").map(String::as_str),
        Some("test")
    );
    Ok(())
}

#[sqlx::test(migrator = "rollcall_core::MIGRATOR")]
async fn email_uniqueness_is_case_insensitive(pool: PgPool) -> Result<()> {
    let store = PostgresAccountStore::new(pool);
    store.create(new_account("a", "a@x.com")).await?;

    let err = store.create(new_account("b", "A@X.com")).await.unwrap_err();
    assert!(matches!(err, AccountError::EmailExists));

    let b = store.create(new_account("b", "b@x.com")).await?;
    let mut moved = b.clone();
    moved.email = " A@x.COM".into();
    assert!(matches!(
        store.update(&moved).await,
        Err(AccountError::EmailExists)
    ));
    Ok(())
}

#[sqlx::test(migrator = "rollcall_core::MIGRATOR")]
async fn unknown_keys_are_not_found(pool: PgPool) -> Result<()> {
    let store = PostgresAccountStore::new(pool);
    assert!(not_found(store.read_by_id(AccountId::generate()).await));
    assert!(not_found(store.read_by_email("nobody@x.com").await));
    assert!(not_found(store.delete(AccountId::generate()).await));
    Ok(())
}

#[sqlx::test(migrator = "rollcall_core::MIGRATOR")]
async fn delete_frees_the_address(pool: PgPool) -> Result<()> {
    let store = PostgresAccountStore::new(pool);
    let created = store.create(new_account("a", "a@x.com")).await?;

    store.delete(created.id).await?;
    assert!(not_found(store.read_by_id(created.id).await));
    assert!(not_found(store.read_by_email("a@x.com").await));

    store.create(new_account("a", "a@x.com")).await?;
    Ok(())
}

#[sqlx::test(migrator = "rollcall_core::MIGRATOR")]
async fn offset_pages_cover_every_row_once(pool: PgPool) -> Result<()> {
    let store = PostgresAccountStore::new(pool);
    let mut expected = HashSet::new();
    for i in 0..5 {
        let account = store
            .create(new_account(&format!("u{i}"), &format!("u{i}@x.com")))
            .await?;
        expected.insert(account.id);
    }

    let mut sizes = Vec::new();
    let mut seen = HashSet::new();
    let mut cursor = String::new();
    loop {
        let page = store.list(2, &cursor).await?;
        sizes.push(page.accounts.len());
        for account in &page.accounts {
            assert!(seen.insert(account.id), "account listed twice");
        }
        if page.is_last() {
            break;
        }
        cursor = page.next_cursor;
    }

    assert_eq!(sizes, vec![2, 2, 1]);
    assert_eq!(seen, expected);

    let keyset = PageCursor::After(AccountId::generate()).encode();
    assert!(matches!(
        store.list(2, &keyset).await,
        Err(AccountError::Validation(_))
    ));
    Ok(())
}

#[sqlx::test(migrator = "rollcall_core::MIGRATOR")]
async fn tokens_redeem_once(pool: PgPool) -> Result<()> {
    let store = PostgresAccountStore::new(pool);
    let created = store.create(new_account("a", "a@x.com")).await?;

    let confirmed = store.redeem_confirmation_token("confirm-a").await?;
    assert!(confirmed.is_confirmed());
    assert!(not_found(store.redeem_confirmation_token("confirm-a").await));

    store.issue_password_reset_token("A@X.COM", "reset-me").await?;
    let reset = store
        .redeem_password_reset_token("reset-me", "$argon2id$new")
        .await?;
    assert_eq!(reset.id, created.id);
    assert_eq!(reset.hashed_password, "$argon2id$new");
    assert!(not_found(
        store
            .redeem_password_reset_token("reset-me", "$argon2id$again")
            .await
    ));
    Ok(())
}

#[sqlx::test(migrator = "rollcall_core::MIGRATOR")]
async fn migrate_is_idempotent_and_truncate_empties(
    pool: PgPool,
) -> Result<()> {
    let store = PostgresAccountStore::new(pool);
    store.migrate().await?;
    store.create(new_account("a", "a@x.com")).await?;
    store.truncate().await?;
    assert!(store.list(10, "").await?.accounts.is_empty());
    Ok(())
}

fn not_found<T: std::fmt::Debug>(result: rollcall_core::Result<T>) -> bool {
    result.unwrap_err().is_not_found()
}

fn exactly_one_email_conflict(
    results: [rollcall_core::Result<Account>; 2],
) -> bool {
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(AccountError::EmailExists)))
        .count();
    let successes = results.iter().filter(|r| r.is_ok()).count();
    conflicts == 1 && successes == 1
}

#[sqlx::test(migrator = "rollcall_core::MIGRATOR")]
async fn concurrent_creates_claim_an_address_once(pool: PgPool) -> Result<()> {
    let store = PostgresAccountStore::new(pool);

    let (first, second) = tokio::join!(
        store.create(new_account("a", "race@x.com")),
        store.create(new_account("b", "RACE@x.com ")),
    );
    assert!(exactly_one_email_conflict([first, second]));
    assert_eq!(store.list(10, "").await?.accounts.len(), 1);
    Ok(())
}

#[sqlx::test(migrator = "rollcall_core::MIGRATOR")]
async fn concurrent_updates_claim_an_address_once(pool: PgPool) -> Result<()> {
    let store = PostgresAccountStore::new(pool);
    let mut a = store.create(new_account("a", "a@x.com")).await?;
    let mut b = store.create(new_account("b", "b@x.com")).await?;
    a.email = "shared@x.com".into();
    b.email = "Shared@X.com".into();

    let (first, second) = tokio::join!(store.update(&a), store.update(&b));
    assert!(exactly_one_email_conflict([first, second]));

    let owner = store.read_by_email("shared@x.com").await?;
    assert!(owner.id == a.id || owner.id == b.id);
    Ok(())
}

#[sqlx::test(migrator = "rollcall_core::MIGRATOR")]
async fn profile_update_leaves_credentials_alone(pool: PgPool) -> Result<()> {
    let store = PostgresAccountStore::new(pool);
    let created = store.create(new_account("a", "a@x.com")).await?;
    store.issue_password_reset_token("a@x.com", "tok").await?;
    let mut stale = store.read_by_id(created.id).await?;

    store.redeem_password_reset_token("tok", "$argon2id$reset").await?;
    store.redeem_confirmation_token("confirm-a").await?;
    store.issue_password_reset_token("a@x.com", "tok-2").await?;

    stale.name = "renamed".into();
    let updated = store.update(&stale).await?;
    assert_eq!(updated.name, "renamed");
    assert_eq!(updated.hashed_password, "$argon2id$reset");
    assert_eq!(updated.password_reset_token.as_deref(), Some("tok-2"));
    assert!(updated.is_confirmed());
    assert_eq!(updated.created_at, created.created_at);

    assert!(not_found(
        store
            .redeem_password_reset_token("tok", "$argon2id$again")
            .await
    ));
    Ok(())
}
