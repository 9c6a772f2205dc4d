use crate::config::ReactionDirective;
use crate::error::{EngineError, Result};
use crate::match_algorithm::MatchAlgorithm;
use crate::message::{truncated, Message, NotificationEvent, User};
use crate::traits::{
    FollowerRepository, InboxRepository, MessageRepository, NotificationService,
    PushNotificationGateway, ReactionRepository, UserPreferencesRepository,
};
use crate::webhook::{gitter_payload, parse_webhook_url, slack_channel_payload, WebhookClient};
use base64::Engine as _;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Stored messages are kept for 18 hours.
pub const MESSAGE_RETENTION: Duration = Duration::from_secs(18 * 60 * 60);
/// Inbox entries use the service default of one week.
pub const DEFAULT_INBOX_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);
/// Push payload titles are truncated so provider limits are never hit.
pub const PUSH_TITLE_MAX_LENGTH: usize = 100;

/// An executable unit of work derived from a reaction directive or an
/// implicit default. Each instance closes over exactly the collaborators it
/// needs, is created fresh per dispatch, and is consumed once by the runner.
/// Executing an action may produce follow-up actions, which re-enter the
/// same runner's queue.
pub enum Action {
    DoNothing,
    StoreMessage {
        messages: Arc<dyn MessageRepository>,
    },
    StoreInInbox {
        inboxes: Arc<dyn InboxRepository>,
        user: User,
    },
    RunThroughFollowerInboxes {
        factory: ActionFactory,
    },
    RunThroughInbox {
        factory: ActionFactory,
        user: User,
    },
    SendPushNotification {
        preferences: Arc<dyn UserPreferencesRepository>,
        gateway: Arc<dyn PushNotificationGateway>,
        user_id: String,
    },
    SendNotificationEvent {
        notifications: Arc<dyn NotificationService>,
    },
    ForwardToGitter {
        client: WebhookClient,
        webhook_url: Url,
        include_body: bool,
    },
    ForwardToSlackChannel {
        client: WebhookClient,
        webhook_url: Url,
        channel: String,
        include_body: bool,
    },
    // Not wired to a transport yet; both log and do nothing.
    ForwardToSlackUser {
        username: String,
    },
    SendEmail {
        email_address: String,
    },
}

impl Action {
    /// Short action kind name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::DoNothing => "do-nothing",
            Action::StoreMessage { .. } => "store-message",
            Action::StoreInInbox { .. } => "store-in-inbox",
            Action::RunThroughFollowerInboxes { .. } => "run-through-follower-inboxes",
            Action::RunThroughInbox { .. } => "run-through-inbox",
            Action::SendPushNotification { .. } => "send-push-notification",
            Action::SendNotificationEvent { .. } => "send-notification-event",
            Action::ForwardToGitter { .. } => "forward-to-gitter",
            Action::ForwardToSlackChannel { .. } => "forward-to-slack-channel",
            Action::ForwardToSlackUser { .. } => "forward-to-slack-user",
            Action::SendEmail { .. } => "send-email",
        }
    }

    /// Executes the action against a message and returns any follow-up
    /// actions. The message is validated first; on an invalid message the
    /// action fails with invalid-argument before any side effect happens.
    pub async fn act_on(&self, message: &Message) -> Result<Vec<Action>> {
        message.check_valid()?;

        match self {
            Action::DoNothing => Ok(Vec::new()),

            Action::StoreMessage { messages } => {
                messages.save_message(message, MESSAGE_RETENTION).await?;
                log::debug!("Stored message {}", message.message_id);
                Ok(Vec::new())
            }

            Action::StoreInInbox { inboxes, user } => {
                inboxes
                    .save_message_for_user(user, message, DEFAULT_INBOX_RETENTION)
                    .await?;
                log::debug!(
                    "Stored message {} in inbox of user {}",
                    message.message_id,
                    user.user_id
                );
                Ok(Vec::new())
            }

            Action::RunThroughFollowerInboxes { factory } => {
                let followers = factory
                    .followers
                    .application_followers(&message.application_id)
                    .await?;
                log::debug!(
                    "Application {} has {} followers for message {}",
                    message.application_id,
                    followers.len(),
                    message.message_id
                );
                Ok(followers
                    .into_iter()
                    .map(|user| factory.action_to_run_through_inbox(user))
                    .collect())
            }

            Action::RunThroughInbox { factory, user } => {
                run_through_inbox(factory, user, message).await
            }

            Action::SendPushNotification {
                preferences,
                gateway,
                user_id,
            } => {
                send_push_notifications(preferences, gateway, user_id, message).await;
                Ok(Vec::new())
            }

            Action::SendNotificationEvent { notifications } => {
                let event = NotificationEvent::application_sent_message(message);
                // Best-effort side channel: a failure here must never block
                // the rest of the run.
                if let Err(e) = notifications.send_notification(&event).await {
                    log::warn!(
                        "Failed to dispatch notification event for message {}: {e}",
                        message.message_id
                    );
                }
                Ok(Vec::new())
            }

            Action::ForwardToGitter {
                client,
                webhook_url,
                include_body,
            } => {
                let payload = gitter_payload(message, *include_body);
                match client.post_json(webhook_url, &payload).await {
                    Ok(()) => log::info!(
                        "Forwarded message {} to gitter webhook",
                        message.message_id
                    ),
                    Err(e) => log::warn!(
                        "Gitter forwarding failed for message {}: {e}",
                        message.message_id
                    ),
                }
                Ok(Vec::new())
            }

            Action::ForwardToSlackChannel {
                client,
                webhook_url,
                channel,
                include_body,
            } => {
                let payload = slack_channel_payload(message, channel, *include_body);
                match client.post_json(webhook_url, &payload).await {
                    Ok(()) => log::info!(
                        "Forwarded message {} to slack channel {channel}",
                        message.message_id
                    ),
                    Err(e) => log::warn!(
                        "Slack forwarding to {channel} failed for message {}: {e}",
                        message.message_id
                    ),
                }
                Ok(Vec::new())
            }

            Action::ForwardToSlackUser { username } => {
                log::info!(
                    "Slack direct messages are not wired up; dropping forward of {} to @{username}",
                    message.message_id
                );
                Ok(Vec::new())
            }

            Action::SendEmail { email_address } => {
                log::info!(
                    "Email delivery is not wired up; dropping email of {} to {email_address}",
                    message.message_id
                );
                Ok(Vec::new())
            }
        }
    }
}

/// Evaluates one user's reactions against the message and derives the
/// per-user defaults: store in inbox and send a push notification, both on
/// unless a matched directive turns them off.
async fn run_through_inbox(
    factory: &ActionFactory,
    user: &User,
    message: &Message,
) -> Result<Vec<Action>> {
    let reactions = factory.reactions.reactions_for_user(&user.user_id).await?;
    log::debug!(
        "User {} has {} reactions to consider for message {}",
        user.user_id,
        reactions.len(),
        message.message_id
    );

    let mut store_in_inbox = true;
    let mut send_push = true;
    let mut actions = Vec::new();

    for reaction in &reactions {
        if !factory.match_algorithm.matches(message, &reaction.matchers) {
            continue;
        }
        log::debug!(
            "Reaction '{}' of user {} matched message {}",
            reaction.name,
            user.user_id,
            message.message_id
        );
        for directive in &reaction.actions {
            match directive {
                ReactionDirective::SkipInbox => store_in_inbox = false,
                ReactionDirective::DontSendPushNotification => send_push = false,
                // Push is on by default at inbox scope, so the explicit
                // directive is consumed rather than materialized twice.
                ReactionDirective::SendPushNotification => send_push = true,
                other => actions.push(factory.action_for(Some(other))?),
            }
        }
    }

    if store_in_inbox {
        actions.push(factory.action_to_store_in_inbox(user.clone()));
    }
    if send_push {
        actions.push(factory.action_to_send_push_notification(user.user_id.clone()));
    }
    Ok(actions)
}

/// Pushes to every usable device of one user. A failure on one device is
/// logged and must not block delivery to the remaining devices.
async fn send_push_notifications(
    preferences: &Arc<dyn UserPreferencesRepository>,
    gateway: &Arc<dyn PushNotificationGateway>,
    user_id: &str,
    message: &Message,
) {
    let devices = match preferences.mobile_devices(user_id).await {
        Ok(devices) => devices,
        Err(e) => {
            log::warn!("Could not load devices for user {user_id}: {e}");
            return;
        }
    };

    let payload = json!({
        "application": message.application_name,
        "title": truncated(&message.title, PUSH_TITLE_MAX_LENGTH),
        "correlation": {
            "message_id": message.message_id,
            "application_id": message.application_id,
            "urgency": message.urgency,
        },
    });
    let payload_bytes = payload.to_string().into_bytes();

    for device in devices {
        let Some(token) = device.device_token.as_deref() else {
            log::debug!(
                "Device {} of user {user_id} has no token; skipping",
                device.device_name
            );
            continue;
        };
        let token_bytes = match base64::engine::general_purpose::STANDARD.decode(token) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!(
                    "Device {} of user {user_id} has an undecodable token: {e}",
                    device.device_name
                );
                continue;
            }
        };
        match gateway.push(&token_bytes, &payload_bytes).await {
            Ok(()) => log::debug!(
                "Pushed message {} to device {} of user {user_id}",
                message.message_id,
                device.device_name
            ),
            Err(e) => log::warn!(
                "Push to device {} of user {user_id} failed: {e}",
                device.device_name
            ),
        }
    }
}

/// Builds concrete actions from reaction directives and implicit defaults.
/// Stateless aside from the injected collaborators, which constructed
/// actions close over; cloning the factory clones only handles.
#[derive(Clone)]
pub struct ActionFactory {
    pub(crate) reactions: Arc<dyn ReactionRepository>,
    pub(crate) messages: Arc<dyn MessageRepository>,
    pub(crate) inboxes: Arc<dyn InboxRepository>,
    pub(crate) followers: Arc<dyn FollowerRepository>,
    pub(crate) preferences: Arc<dyn UserPreferencesRepository>,
    pub(crate) push_gateway: Arc<dyn PushNotificationGateway>,
    pub(crate) notifications: Arc<dyn NotificationService>,
    pub(crate) webhooks: WebhookClient,
    pub(crate) match_algorithm: MatchAlgorithm,
}

impl ActionFactory {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        reactions: Arc<dyn ReactionRepository>,
        messages: Arc<dyn MessageRepository>,
        inboxes: Arc<dyn InboxRepository>,
        followers: Arc<dyn FollowerRepository>,
        preferences: Arc<dyn UserPreferencesRepository>,
        push_gateway: Arc<dyn PushNotificationGateway>,
        notifications: Arc<dyn NotificationService>,
        webhooks: WebhookClient,
        match_algorithm: MatchAlgorithm,
    ) -> Self {
        ActionFactory {
            reactions,
            messages,
            inboxes,
            followers,
            preferences,
            push_gateway,
            notifications,
            webhooks,
            match_algorithm,
        }
    }

    /// Materializes a directive into a concrete action. Absent, unset, and
    /// unrecognized directives become do-nothing; a recognized directive
    /// with invalid parameters (a bad webhook URL) fails eagerly with
    /// invalid-argument rather than at execution time.
    pub fn action_for(&self, directive: Option<&ReactionDirective>) -> Result<Action> {
        let Some(directive) = directive else {
            return Ok(self.action_to_do_nothing());
        };
        match directive {
            ReactionDirective::ForwardToGitter {
                webhook_url,
                include_body,
            } => self.action_to_forward_to_gitter(webhook_url, *include_body),
            ReactionDirective::ForwardToSlackChannel {
                webhook_url,
                channel,
                include_body,
            } => self.action_to_forward_to_slack_channel(webhook_url, channel, *include_body),
            ReactionDirective::ForwardToSlackUser { username } => {
                Ok(self.action_to_forward_to_slack_user(username))
            }
            ReactionDirective::SendEmail { email_address } => {
                Ok(self.action_to_send_email(email_address))
            }
            ReactionDirective::SendPushNotification
            | ReactionDirective::SkipInbox
            | ReactionDirective::DontStoreMessage
            | ReactionDirective::DontSendPushNotification => {
                // Scope-level flags are consumed where they apply; one that
                // leaks through materializes as a no-op.
                log::debug!("Directive {directive:?} has no standalone action; doing nothing");
                Ok(self.action_to_do_nothing())
            }
            ReactionDirective::Unset => {
                log::debug!("Unrecognized directive; doing nothing");
                Ok(self.action_to_do_nothing())
            }
        }
    }

    pub fn action_to_do_nothing(&self) -> Action {
        Action::DoNothing
    }

    pub fn action_to_store_message(&self) -> Action {
        Action::StoreMessage {
            messages: Arc::clone(&self.messages),
        }
    }

    pub fn action_to_store_in_inbox(&self, user: User) -> Action {
        Action::StoreInInbox {
            inboxes: Arc::clone(&self.inboxes),
            user,
        }
    }

    pub fn action_to_run_through_follower_inboxes(&self) -> Action {
        Action::RunThroughFollowerInboxes {
            factory: self.clone(),
        }
    }

    pub fn action_to_run_through_inbox(&self, user: User) -> Action {
        Action::RunThroughInbox {
            factory: self.clone(),
            user,
        }
    }

    pub fn action_to_send_push_notification(&self, user_id: String) -> Action {
        Action::SendPushNotification {
            preferences: Arc::clone(&self.preferences),
            gateway: Arc::clone(&self.push_gateway),
            user_id,
        }
    }

    pub fn action_to_send_notification_event(&self) -> Action {
        Action::SendNotificationEvent {
            notifications: Arc::clone(&self.notifications),
        }
    }

    pub fn action_to_forward_to_gitter(
        &self,
        webhook_url: &str,
        include_body: bool,
    ) -> Result<Action> {
        Ok(Action::ForwardToGitter {
            client: self.webhooks.clone(),
            webhook_url: parse_webhook_url(webhook_url)?,
            include_body,
        })
    }

    pub fn action_to_forward_to_slack_channel(
        &self,
        webhook_url: &str,
        channel: &str,
        include_body: bool,
    ) -> Result<Action> {
        if channel.is_empty() {
            return Err(EngineError::invalid("slack channel must not be empty"));
        }
        Ok(Action::ForwardToSlackChannel {
            client: self.webhooks.clone(),
            webhook_url: parse_webhook_url(webhook_url)?,
            channel: channel.to_string(),
            include_body,
        })
    }

    pub fn action_to_forward_to_slack_user(&self, username: &str) -> Action {
        Action::ForwardToSlackUser {
            username: username.to_string(),
        }
    }

    pub fn action_to_send_email(&self, email_address: &str) -> Action {
        Action::SendEmail {
            email_address: email_address.to_string(),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::memory::{
        InMemoryFollowers, InMemoryInboxes, InMemoryMessages, InMemoryPreferences,
        InMemoryReactions, RecordingNotificationService, RecordingPushGateway,
    };

    /// A factory wired to fresh in-memory collaborators, returned alongside
    /// the handles tests assert on.
    pub struct Fixture {
        pub factory: ActionFactory,
        pub reactions: Arc<InMemoryReactions>,
        pub messages: Arc<InMemoryMessages>,
        pub inboxes: Arc<InMemoryInboxes>,
        pub followers: Arc<InMemoryFollowers>,
        pub preferences: Arc<InMemoryPreferences>,
        pub push_gateway: Arc<RecordingPushGateway>,
        pub notifications: Arc<RecordingNotificationService>,
    }

    pub fn fixture() -> Fixture {
        fixture_with(
            Arc::new(InMemoryMessages::new()),
            Arc::new(RecordingPushGateway::new()),
        )
    }

    pub fn fixture_with(
        messages: Arc<InMemoryMessages>,
        push_gateway: Arc<RecordingPushGateway>,
    ) -> Fixture {
        let reactions = Arc::new(InMemoryReactions::new());
        let inboxes = Arc::new(InMemoryInboxes::new());
        let followers = Arc::new(InMemoryFollowers::new());
        let preferences = Arc::new(InMemoryPreferences::new());
        let notifications = Arc::new(RecordingNotificationService::new());
        let factory = ActionFactory::new(
            reactions.clone(),
            messages.clone(),
            inboxes.clone(),
            followers.clone(),
            preferences.clone(),
            push_gateway.clone(),
            notifications.clone(),
            WebhookClient::new(),
            MatchAlgorithm::MatchAll,
        );
        Fixture {
            factory,
            reactions,
            messages,
            inboxes,
            followers,
            preferences,
            push_gateway,
            notifications,
        }
    }

    pub fn user(user_id: &str) -> User {
        User {
            user_id: user_id.to_string(),
            name: None,
        }
    }
}
