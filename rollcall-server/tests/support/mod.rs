#![allow(dead_code)]

use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use anyhow::{Context, Result, anyhow};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, post},
};
use axum_test::TestServer;
use parking_lot::Mutex;
use rollcall_core::{
    AccountService, CredentialManager,
    database::{AccountStore, MemoryColumnFamilies, WideColumnAccountStore},
    infra::{AccountEventBus, HttpImageStore, ImageStore},
};
use rollcall_server::{AppState, create_app};
use serde_json::{Value, json};

pub type MemoryStore = WideColumnAccountStore<MemoryColumnFamilies>;

/// Cheap Argon2 cost so the suite stays fast.
pub fn test_credentials() -> Arc<CredentialManager> {
    Arc::new(
        CredentialManager::with_cost("test-pepper", 8, 1)
            .expect("valid argon2 params"),
    )
}

pub struct TestApp {
    pub server: TestServer,
    pub store: Arc<MemoryStore>,
    pub events: Arc<AccountEventBus>,
}

impl TestApp {
    pub fn tables(&self) -> &MemoryColumnFamilies {
        self.store.tables()
    }
}

pub fn build_test_app() -> Result<TestApp> {
    build_with(|service| service)
}

pub fn build_test_app_with_images(
    images: Arc<dyn ImageStore>,
) -> Result<TestApp> {
    build_with(move |service| service.with_image_store(images))
}

fn build_with(
    wire: impl FnOnce(AccountService) -> AccountService,
) -> Result<TestApp> {
    let store =
        Arc::new(WideColumnAccountStore::new(MemoryColumnFamilies::new()));
    let events = Arc::new(AccountEventBus::default());

    let dyn_store: Arc<dyn AccountStore> = store.clone();
    let service = AccountService::new(dyn_store, test_credentials())
        .with_event_publisher(events.clone());
    let state = AppState::new(wire(service));

    let make_service = create_app(state)
        .into_make_service_with_connect_info::<SocketAddr>();
    let server = TestServer::builder()
        .http_transport()
        .build(make_service)
        .map_err(|err| anyhow!(err.to_string()))?;

    Ok(TestApp {
        server,
        store,
        events,
    })
}

/// What the fake image service has seen so far.
#[derive(Debug, Default)]
pub struct ImageServiceLog {
    pub stored: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<String>>,
    pub fail_store: AtomicBool,
    pub fail_delete: AtomicBool,
    pub delay: Mutex<Option<Duration>>,
    next_key: AtomicUsize,
}

impl ImageServiceLog {
    pub fn stored(&self) -> Vec<String> {
        self.stored.lock().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().clone()
    }

    pub fn fail_store(&self, fail: bool) {
        self.fail_store.store(fail, Ordering::SeqCst);
    }

    pub fn fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    pub fn delay_responses(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }
}

#[derive(Debug)]
pub struct FakeImageService {
    pub base_url: String,
    pub log: Arc<ImageServiceLog>,
}

impl FakeImageService {
    /// Serve the image-service contract on an ephemeral local port.
    pub async fn spawn() -> Result<Self> {
        let log = Arc::new(ImageServiceLog::default());
        let router = Router::new()
            .route("/images", post(store_image))
            .route("/images/{filename}", delete(delete_image))
            .with_state(log.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind fake image service")?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Ok(Self {
            base_url: format!("http://{addr}"),
            log,
        })
    }

    pub fn client(&self, timeout: Duration) -> Result<Arc<dyn ImageStore>> {
        let client = HttpImageStore::new(&self.base_url, timeout)?;
        Ok(Arc::new(client))
    }
}

async fn pause(log: &ImageServiceLog) {
    let delay = *log.delay.lock();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
}

async fn store_image(
    State(log): State<Arc<ImageServiceLog>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    pause(&log).await;
    if log.fail_store.load(Ordering::SeqCst) {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "storage offline" })),
        );
    }

    let filename = body["filename"].as_str().unwrap_or_default().to_string();
    let mut images = Vec::new();
    let mut stored = log.stored.lock();
    for op in body["ops"].as_array().cloned().unwrap_or_default() {
        let version =
            op["version_name"].as_str().unwrap_or_default().to_string();
        let n = log.next_key.fetch_add(1, Ordering::SeqCst);
        let key = format!("{version}-{n}-{filename}");
        images.push(json!({
            "filename": key,
            "url": format!("http://img.local/{key}"),
            "version_name": version,
        }));
        stored.push(key);
    }

    (StatusCode::OK, Json(json!({ "images": images })))
}

async fn delete_image(
    State(log): State<Arc<ImageServiceLog>>,
    Path(filename): Path<String>,
) -> StatusCode {
    pause(&log).await;
    if log.fail_delete.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }

    let mut stored = log.stored.lock();
    match stored.iter().position(|key| *key == filename) {
        Some(pos) => {
            stored.remove(pos);
            log.deleted.lock().push(filename);
            StatusCode::NO_CONTENT
        }
        None => StatusCode::NOT_FOUND,
    }
}

pub fn account_body(name: &str, email: &str, password: &str) -> Value {
    json!({
        "account": { "name": name, "email": email, "metadata": {} },
        "password": password,
    })
}

pub fn data(body: &Value) -> &Value {
    &body["data"]
}
