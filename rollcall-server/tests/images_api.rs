use std::{sync::Arc, time::Duration};

use anyhow::Result;
use axum::http::StatusCode;
use base64::{Engine, engine::general_purpose::STANDARD};
use rollcall_core::{
    database::TableOp,
    infra::{ImageStoreError, MockImageStore},
};
use rollcall_model::{
    AccountImage,
    api::routes::{utils::replace_param, v1},
};
use serde_json::{Value, json};

#[path = "support/mod.rs"]
mod support;
use support::{
    FakeImageService, TestApp, account_body, build_test_app,
    build_test_app_with_images, data,
};

fn image(filename: &str) -> Value {
    json!({
        "filename": filename,
        "data": STANDARD.encode(b"\x89PNG fake bytes"),
    })
}

fn with_image(name: &str, email: &str, filename: &str) -> Value {
    let mut body = account_body(name, email, "pw");
    body["image"] = image(filename);
    body
}

fn item(id: &str) -> String {
    replace_param(v1::accounts::ITEM, "{id}", id)
}

fn filenames(account: &Value) -> Vec<String> {
    account["images"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .iter()
        .map(|image| image["filename"].as_str().unwrap_or_default().to_string())
        .collect()
}

async fn app_with_fake_images() -> Result<(TestApp, FakeImageService)> {
    let images = FakeImageService::spawn().await?;
    let client = images.client(Duration::from_secs(1))?;
    let app = build_test_app_with_images(client)?;
    Ok((app, images))
}

#[tokio::test]
async fn create_stores_every_variant() -> Result<()> {
    let (app, images) = app_with_fake_images().await?;

    let response = app
        .server
        .post(v1::accounts::COLLECTION)
        .json(&with_image("Alex", "alex@example.com", "me.png"))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();

    let variants: Vec<&str> = data(&body)["images"]
        .as_array()
        .map(|images| {
            images.iter().filter_map(|i| i["variant"].as_str()).collect()
        })
        .unwrap_or_default();
    assert_eq!(variants, vec!["thumbnail", "large"]);
    assert_eq!(filenames(data(&body)), images.log.stored());
    Ok(())
}

#[tokio::test]
async fn update_replaces_images_only_when_given() -> Result<()> {
    let (app, images) = app_with_fake_images().await?;

    let created: Value = app
        .server
        .post(v1::accounts::COLLECTION)
        .json(&with_image("Alex", "alex@example.com", "old.png"))
        .await
        .json();
    let id = data(&created)["id"].as_str().unwrap_or_default().to_string();
    let old = filenames(data(&created));

    let kept: Value = app
        .server
        .put(&item(&id))
        .json(&json!({
            "account": { "name": "Alex", "email": "alex@example.com" }
        }))
        .await
        .json();
    assert_eq!(filenames(data(&kept)), old);
    assert!(images.log.deleted().is_empty());

    let response = app
        .server
        .put(&item(&id))
        .json(&json!({
            "account": { "name": "Alex", "email": "alex@example.com" },
            "image": image("new.png"),
        }))
        .await;
    response.assert_status_ok();
    let replaced: Value = response.json();

    let new = filenames(data(&replaced));
    assert_eq!(new.len(), 2);
    assert!(new.iter().all(|name| name.ends_with("new.png")));
    assert_eq!(images.log.deleted(), old);
    assert_eq!(images.log.stored(), new);
    Ok(())
}

#[tokio::test]
async fn delete_releases_images() -> Result<()> {
    let (app, images) = app_with_fake_images().await?;
    let created: Value = app
        .server
        .post(v1::accounts::COLLECTION)
        .json(&with_image("Alex", "alex@example.com", "me.png"))
        .await
        .json();
    let id = data(&created)["id"].as_str().unwrap_or_default().to_string();

    app.server
        .delete(&item(&id))
        .await
        .assert_status(StatusCode::NO_CONTENT);
    assert!(images.log.stored().is_empty());
    assert_eq!(images.log.deleted(), filenames(data(&created)));
    Ok(())
}

#[tokio::test]
async fn failed_upload_persists_nothing() -> Result<()> {
    let (app, images) = app_with_fake_images().await?;
    images.log.fail_store(true);

    app.server
        .post(v1::accounts::COLLECTION)
        .json(&with_image("Alex", "alex@example.com", "me.png"))
        .await
        .assert_status(StatusCode::BAD_GATEWAY);
    assert_eq!(app.tables().record_count(), 0);
    assert_eq!(app.tables().email_count(), 0);
    Ok(())
}

#[tokio::test]
async fn failed_persist_releases_uploaded_images() -> Result<()> {
    let (app, images) = app_with_fake_images().await?;
    app.tables().fail_next(TableOp::PutRecord);

    app.server
        .post(v1::accounts::COLLECTION)
        .json(&with_image("Alex", "alex@example.com", "me.png"))
        .await
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert!(images.log.stored().is_empty());
    assert_eq!(images.log.deleted().len(), 2);
    Ok(())
}

#[tokio::test]
async fn slow_image_service_times_out() -> Result<()> {
    let images = FakeImageService::spawn().await?;
    images.log.delay_responses(Duration::from_millis(500));
    let client = images.client(Duration::from_millis(100))?;
    let app = build_test_app_with_images(client)?;

    app.server
        .post(v1::accounts::COLLECTION)
        .json(&with_image("Alex", "alex@example.com", "me.png"))
        .await
        .assert_status(StatusCode::BAD_GATEWAY);
    assert_eq!(app.tables().record_count(), 0);
    Ok(())
}

#[tokio::test]
async fn images_need_a_configured_service() -> Result<()> {
    let app = build_test_app()?;
    app.server
        .post(v1::accounts::COLLECTION)
        .json(&with_image("Alex", "alex@example.com", "me.png"))
        .await
        .assert_status(StatusCode::BAD_GATEWAY);
    assert_eq!(app.tables().record_count(), 0);
    Ok(())
}

#[tokio::test]
async fn failed_image_delete_keeps_the_account() -> Result<()> {
    let mut mock = MockImageStore::new();
    mock.expect_store().times(1).returning(|upload| {
        Ok(vec![AccountImage {
            variant: "thumbnail".into(),
            url: format!("http://img.local/{}", upload.filename),
            filename: upload.filename.clone(),
        }])
    });
    mock.expect_delete()
        .times(1)
        .returning(|_| Err(ImageStoreError::Timeout));
    let app = build_test_app_with_images(Arc::new(mock))?;

    let created: Value = app
        .server
        .post(v1::accounts::COLLECTION)
        .json(&with_image("Alex", "alex@example.com", "me.png"))
        .await
        .json();
    let id = data(&created)["id"].as_str().unwrap_or_default().to_string();

    app.server
        .delete(&item(&id))
        .await
        .assert_status(StatusCode::BAD_GATEWAY);
    app.server.get(&item(&id)).await.assert_status_ok();
    Ok(())
}
