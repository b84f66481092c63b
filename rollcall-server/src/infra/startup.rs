use std::sync::Arc;

use anyhow::{Context, Result};
use rollcall_core::{
    AccountService, CredentialManager,
    database::AccountStore,
    infra::{HttpImageStore, RedisEventPublisher},
};
use tracing::{info, warn};

use crate::infra::{app_state::AppState, config::Config};

/// Wire the account service around an already opened store.
///
/// The image service and event publisher are optional; without them image
/// payloads are rejected and events are dropped.
pub async fn wire_app_state(
    config: &Config,
    store: Arc<dyn AccountStore>,
) -> Result<AppState> {
    let credentials = CredentialManager::with_cost(
        &config.password_pepper,
        config.argon2_memory_kib,
        config.argon2_iterations,
    )
    .context("invalid Argon2 parameters")?;

    let mut service = AccountService::new(store, Arc::new(credentials));

    match config.image_service_url.as_deref() {
        Some(url) => {
            let images = HttpImageStore::new(url, config.image_service_timeout)
                .context("failed to build image service client")?;
            info!(
                url,
                timeout = ?config.image_service_timeout,
                "image service configured"
            );
            service = service.with_image_store(Arc::new(images));
        }
        None => warn!(
            "IMAGE_SERVICE_URL not set; requests carrying images will be \
             rejected"
        ),
    }

    if let Some(url) = config.redis_url.as_deref() {
        let publisher = RedisEventPublisher::connect(url)
            .await
            .context("failed to connect to Redis for account events")?;
        info!("publishing account events to Redis");
        service = service.with_event_publisher(Arc::new(publisher));
    }

    Ok(AppState::new(service))
}
