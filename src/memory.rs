//! In-memory collaborator implementations backing the demo binary and the
//! test suite. Each one records what it was asked to do so callers can
//! assert on side effects; a few can be flipped into a failing mode to
//! exercise fault-isolation paths.

use crate::config::Reaction;
use crate::error::{EngineError, Result};
use crate::message::{Message, MobileDevice, NotificationEvent, User};
use crate::traits::{
    FollowerRepository, InboxRepository, MessageRepository, NotificationService,
    PushNotificationGateway, ReactionRepository, UserPreferencesRepository,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
pub struct InMemoryReactions {
    by_application: Mutex<HashMap<String, Vec<Reaction>>>,
    by_user: Mutex<HashMap<String, Vec<Reaction>>>,
}

impl InMemoryReactions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_application_reactions(&self, application_id: &str, reactions: Vec<Reaction>) {
        self.by_application
            .lock()
            .unwrap()
            .insert(application_id.to_string(), reactions);
    }

    pub fn set_user_reactions(&self, user_id: &str, reactions: Vec<Reaction>) {
        self.by_user
            .lock()
            .unwrap()
            .insert(user_id.to_string(), reactions);
    }
}

#[async_trait]
impl ReactionRepository for InMemoryReactions {
    async fn reactions_for_application(&self, application_id: &str) -> Result<Vec<Reaction>> {
        Ok(self
            .by_application
            .lock()
            .unwrap()
            .get(application_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn reactions_for_user(&self, user_id: &str) -> Result<Vec<Reaction>> {
        Ok(self
            .by_user
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct InMemoryMessages {
    saved: Mutex<Vec<(Message, Duration)>>,
    fail: bool,
}

impl InMemoryMessages {
    pub fn new() -> Self {
        Self::default()
    }

    /// A repository whose every save fails; used to exercise the runner's
    /// fault isolation.
    pub fn failing() -> Self {
        InMemoryMessages {
            saved: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn saved_count(&self) -> usize {
        self.saved.lock().unwrap().len()
    }

    pub fn saved_messages(&self) -> Vec<Message> {
        self.saved
            .lock()
            .unwrap()
            .iter()
            .map(|(m, _)| m.clone())
            .collect()
    }

    pub fn saved_message_ids(&self) -> Vec<String> {
        self.saved
            .lock()
            .unwrap()
            .iter()
            .map(|(m, _)| m.message_id.clone())
            .collect()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessages {
    async fn save_message(&self, message: &Message, retention: Duration) -> Result<()> {
        if self.fail {
            return Err(EngineError::failed("message store is unavailable"));
        }
        self.saved
            .lock()
            .unwrap()
            .push((message.clone(), retention));
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryInboxes {
    // user id -> message ids delivered to that inbox
    delivered: Mutex<HashMap<String, Vec<String>>>,
}

impl InMemoryInboxes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages_for(&self, user_id: &str) -> Vec<String> {
        self.delivered
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn total_delivered(&self) -> usize {
        self.delivered.lock().unwrap().values().map(Vec::len).sum()
    }
}

#[async_trait]
impl InboxRepository for InMemoryInboxes {
    async fn save_message_for_user(
        &self,
        user: &User,
        message: &Message,
        _retention: Duration,
    ) -> Result<()> {
        self.delivered
            .lock()
            .unwrap()
            .entry(user.user_id.clone())
            .or_default()
            .push(message.message_id.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryFollowers {
    by_application: Mutex<HashMap<String, Vec<User>>>,
}

impl InMemoryFollowers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_followers(&self, application_id: &str, followers: Vec<User>) {
        self.by_application
            .lock()
            .unwrap()
            .insert(application_id.to_string(), followers);
    }
}

#[async_trait]
impl FollowerRepository for InMemoryFollowers {
    async fn application_followers(&self, application_id: &str) -> Result<Vec<User>> {
        Ok(self
            .by_application
            .lock()
            .unwrap()
            .get(application_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct InMemoryPreferences {
    devices: Mutex<HashMap<String, HashSet<MobileDevice>>>,
}

impl InMemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_devices(&self, user_id: &str, devices: HashSet<MobileDevice>) {
        self.devices
            .lock()
            .unwrap()
            .insert(user_id.to_string(), devices);
    }
}

#[async_trait]
impl UserPreferencesRepository for InMemoryPreferences {
    async fn mobile_devices(&self, user_id: &str) -> Result<HashSet<MobileDevice>> {
        Ok(self
            .devices
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Push gateway that records pushes instead of talking to a provider. Can
/// be configured to fail for a specific device token to exercise per-device
/// isolation.
#[derive(Default)]
pub struct RecordingPushGateway {
    pushes: Mutex<Vec<Vec<u8>>>,
    failing_token: Option<Vec<u8>>,
}

impl RecordingPushGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for_token(token: Vec<u8>) -> Self {
        RecordingPushGateway {
            pushes: Mutex::new(Vec::new()),
            failing_token: Some(token),
        }
    }

    pub fn push_count(&self) -> usize {
        self.pushes.lock().unwrap().len()
    }
}

#[async_trait]
impl PushNotificationGateway for RecordingPushGateway {
    async fn push(&self, device_token: &[u8], _payload: &[u8]) -> Result<()> {
        if self.failing_token.as_deref() == Some(device_token) {
            return Err(EngineError::failed("push provider rejected the device"));
        }
        self.pushes.lock().unwrap().push(device_token.to_vec());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotificationService {
    events: Mutex<Vec<NotificationEvent>>,
    fail: bool,
}

impl RecordingNotificationService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        RecordingNotificationService {
            events: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn event_count(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationService for RecordingNotificationService {
    async fn send_notification(&self, event: &NotificationEvent) -> Result<()> {
        if self.fail {
            return Err(EngineError::failed("notification service is unavailable"));
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}
