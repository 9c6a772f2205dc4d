use crate::actions::ActionFactory;
use crate::error::Result;
use crate::message::{truncated, Message, Urgency, MAX_CHARACTERS_IN_BODY, MAX_TITLE_LENGTH};
use crate::reactor::{MessageReactor, MessageResponse};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// What an authenticated client submits: the application identity has
/// already been resolved by the time the request reaches this layer.
#[derive(Debug, Clone)]
pub struct NewMessageRequest {
    pub application_id: String,
    pub application_name: String,
    pub title: String,
    pub body: Option<String>,
    pub urgency: Urgency,
    pub hostname: Option<String>,
    pub mac_address: Option<String>,
    pub time_of_creation: Option<DateTime<Utc>>,
}

/// The ingestion boundary: builds the immutable message from a request,
/// truncating oversized fields before the reactor ever sees them, then runs
/// the reaction engine. Callers only ever see a failure if the message
/// itself is invalid; downstream action outcomes are fire-and-forget.
pub struct HeraldService {
    factory: ActionFactory,
    reactor: MessageReactor,
}

impl HeraldService {
    pub fn new(factory: ActionFactory, reactor: MessageReactor) -> Self {
        HeraldService { factory, reactor }
    }

    pub async fn send_message(&self, request: NewMessageRequest) -> Result<MessageResponse> {
        let now = Utc::now();
        let message = Message {
            message_id: Uuid::new_v4().to_string(),
            application_id: request.application_id,
            application_name: request.application_name,
            title: truncated(&request.title, MAX_TITLE_LENGTH),
            body: request
                .body
                .map(|b| truncated(&b, MAX_CHARACTERS_IN_BODY)),
            urgency: request.urgency,
            hostname: request.hostname,
            mac_address: request.mac_address,
            time_of_creation: request.time_of_creation.unwrap_or(now),
            time_message_received: now,
        };
        log::info!(
            "Received message {} from application {} ({})",
            message.message_id,
            message.application_name,
            message.application_id
        );

        let response = self.reactor.react_to_message(&message).await?;

        // Best-effort internal event; the action logs and swallows dispatch
        // failures itself.
        self.factory
            .action_to_send_notification_event()
            .act_on(&message)
            .await?;

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::testing::fixture;
    use crate::runner::ActionRunner;

    fn service(fx: &crate::actions::testing::Fixture) -> HeraldService {
        let reactor = MessageReactor::new(fx.factory.clone(), ActionRunner::sequential());
        HeraldService::new(fx.factory.clone(), reactor)
    }

    fn request() -> NewMessageRequest {
        NewMessageRequest {
            application_id: uuid::Uuid::new_v4().to_string(),
            application_name: "inventory-service".to_string(),
            title: "T".to_string(),
            body: Some("B".to_string()),
            urgency: Urgency::Medium,
            hostname: Some("app-host-01".to_string()),
            mac_address: None,
            time_of_creation: None,
        }
    }

    #[tokio::test]
    async fn test_send_message_stores_and_returns_the_new_id() {
        let fx = fixture();
        let service = service(&fx);

        let response = service.send_message(request()).await.unwrap();
        assert_eq!(fx.messages.saved_message_ids(), vec![response.message_id]);
        assert_eq!(fx.notifications.event_count(), 1);
    }

    #[tokio::test]
    async fn test_oversized_title_and_body_are_truncated_before_reacting() {
        let fx = fixture();
        let service = service(&fx);

        let mut oversized = request();
        oversized.title = "T".repeat(MAX_TITLE_LENGTH + 100);
        oversized.body = Some("B".repeat(MAX_CHARACTERS_IN_BODY + 1000));

        service.send_message(oversized).await.unwrap();

        let saved = fx.messages.saved_messages();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].title.chars().count(), MAX_TITLE_LENGTH);
        assert_eq!(
            saved[0].body.as_ref().unwrap().chars().count(),
            MAX_CHARACTERS_IN_BODY
        );
    }

    #[tokio::test]
    async fn test_malformed_application_id_is_rejected() {
        let fx = fixture();
        let service = service(&fx);

        let mut bad = request();
        bad.application_id = "app-1".to_string();
        assert!(service.send_message(bad).await.is_err());
        assert_eq!(fx.messages.saved_count(), 0);
        assert_eq!(fx.notifications.event_count(), 0);
    }
}
