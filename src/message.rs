use crate::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Maximum title length accepted by the ingestion boundary; longer titles
/// are truncated before the reactor ever sees the message.
pub const MAX_TITLE_LENGTH: usize = 500;
/// Maximum body length accepted by the ingestion boundary.
pub const MAX_CHARACTERS_IN_BODY: usize = 4000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl Urgency {
    /// Hex color used by chat webhook payloads to signal severity.
    pub fn color(&self) -> &'static str {
        match self {
            Urgency::Low => "#2eb886",
            Urgency::Medium => "#daa038",
            Urgency::High => "#a30200",
        }
    }

    pub fn level(&self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Medium => "medium",
            Urgency::High => "high",
        }
    }
}

/// An inbound application message. Immutable once constructed; the engine
/// never mutates a message, it only reads fields while matching and
/// executing actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: String,
    pub application_id: String,
    pub application_name: String,
    pub title: String,
    pub body: Option<String>,
    pub urgency: Urgency,
    pub hostname: Option<String>,
    pub mac_address: Option<String>,
    pub time_of_creation: DateTime<Utc>,
    pub time_message_received: DateTime<Utc>,
}

fn identifier_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    // UUID-shaped identifiers, with or without hyphens.
    RE.get_or_init(|| {
        regex::Regex::new(r"^[0-9a-fA-F]{8}-?[0-9a-fA-F]{4}-?[0-9a-fA-F]{4}-?[0-9a-fA-F]{4}-?[0-9a-fA-F]{12}$")
            .unwrap()
    })
}

/// Checks that an identifier is non-empty and UUID-shaped.
pub fn is_valid_identifier(id: &str) -> bool {
    !id.is_empty() && identifier_regex().is_match(id)
}

/// Truncates a string to at most `max` characters, on a character boundary.
pub fn truncated(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

impl Message {
    /// Validates the invariants every action relies on: message id and
    /// application id present and well-formed. Called before any side
    /// effect, so a malformed message fails fast with no partial work.
    pub fn check_valid(&self) -> Result<()> {
        if !is_valid_identifier(&self.message_id) {
            return Err(EngineError::invalid(format!(
                "message id is missing or malformed: {:?}",
                self.message_id
            )));
        }
        if !is_valid_identifier(&self.application_id) {
            return Err(EngineError::invalid(format!(
                "application id is missing or malformed: {:?}",
                self.application_id
            )));
        }
        Ok(())
    }
}

/// A user who owns an inbox and may follow applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// A registered mobile device belonging to a user. Only devices that carry
/// a device token are usable push targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MobileDevice {
    pub device_name: String,
    /// Base64-encoded provider device token; absent for devices that were
    /// registered without push credentials.
    #[serde(default)]
    pub device_token: Option<String>,
}

/// Internal "application sent a message" event dispatched to the
/// notification service as a best-effort side channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub application_id: String,
    pub application_name: String,
    pub message_id: String,
    pub timestamp: DateTime<Utc>,
}

impl NotificationEvent {
    pub fn application_sent_message(message: &Message) -> Self {
        NotificationEvent {
            application_id: message.application_id.clone(),
            application_name: message.application_name.clone(),
            message_id: message.message_id.clone(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    pub fn message() -> Message {
        Message {
            message_id: uuid::Uuid::new_v4().to_string(),
            application_id: uuid::Uuid::new_v4().to_string(),
            application_name: "inventory-service".to_string(),
            title: "Disk usage above 90%".to_string(),
            body: Some("Partition /var is filling up".to_string()),
            urgency: Urgency::High,
            hostname: Some("app-host-01".to_string()),
            mac_address: Some("aa:bb:cc:dd:ee:ff".to_string()),
            time_of_creation: Utc::now(),
            time_message_received: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifier_shapes() {
        assert!(is_valid_identifier(&uuid::Uuid::new_v4().to_string()));
        assert!(is_valid_identifier(
            &uuid::Uuid::new_v4().simple().to_string()
        ));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("app-1"));
        assert!(!is_valid_identifier("not a uuid at all"));
    }

    #[test]
    fn test_check_valid_rejects_malformed_ids() {
        let mut message = testing::message();
        assert!(message.check_valid().is_ok());

        message.message_id = String::new();
        assert!(matches!(
            message.check_valid(),
            Err(EngineError::InvalidArgument(_))
        ));

        let mut message = testing::message();
        message.application_id = "bogus".to_string();
        assert!(matches!(
            message.check_valid(),
            Err(EngineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_urgency_serde_round_trip() {
        let yaml = serde_yaml::to_string(&Urgency::High).unwrap();
        assert_eq!(yaml.trim(), "HIGH");
        let back: Urgency = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, Urgency::High);
    }
}
