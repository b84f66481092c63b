pub mod events;
pub mod image_store;

pub use events::{
    AccountEventBus, AccountEventPublisher, EventPublishError,
    NullEventPublisher, RedisEventPublisher,
};
#[cfg(any(test, feature = "mocks"))]
pub use image_store::MockImageStore;
pub use image_store::{HttpImageStore, ImageStore, ImageStoreError};
