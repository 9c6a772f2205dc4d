use crate::config::Reaction;
use crate::error::Result;
use crate::message::{Message, MobileDevice, NotificationEvent, User};
use async_trait::async_trait;
use std::collections::HashSet;
use std::time::Duration;

/// Read-only store of configured reactions, scoped per application or per
/// user. A missing scope is an empty list, not an error.
#[async_trait]
pub trait ReactionRepository: Send + Sync {
    async fn reactions_for_application(&self, application_id: &str) -> Result<Vec<Reaction>>;
    async fn reactions_for_user(&self, user_id: &str) -> Result<Vec<Reaction>>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn save_message(&self, message: &Message, retention: Duration) -> Result<()>;
}

#[async_trait]
pub trait InboxRepository: Send + Sync {
    async fn save_message_for_user(
        &self,
        user: &User,
        message: &Message,
        retention: Duration,
    ) -> Result<()>;
}

#[async_trait]
pub trait FollowerRepository: Send + Sync {
    async fn application_followers(&self, application_id: &str) -> Result<Vec<User>>;
}

#[async_trait]
pub trait UserPreferencesRepository: Send + Sync {
    async fn mobile_devices(&self, user_id: &str) -> Result<HashSet<MobileDevice>>;
}

/// Provider gateway for mobile push delivery. Each call may fail with a
/// network error; callers isolate failures per device.
#[async_trait]
pub trait PushNotificationGateway: Send + Sync {
    async fn push(&self, device_token: &[u8], payload: &[u8]) -> Result<()>;
}

/// Internal notification side channel. Dispatch is best-effort; callers log
/// and swallow failures.
#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn send_notification(&self, event: &NotificationEvent) -> Result<()>;
}
