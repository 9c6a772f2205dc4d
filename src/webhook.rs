use crate::error::{EngineError, Result};
use crate::message::Message;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Thin JSON-posting client over reqwest shared by the chat-forwarding
/// actions. Success and failure are reported to the caller; the actions
/// themselves treat both as terminal and only log.
#[derive(Clone)]
pub struct WebhookClient {
    http: reqwest::Client,
}

impl Default for WebhookClient {
    fn default() -> Self {
        Self::new()
    }
}

impl WebhookClient {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_default();
        WebhookClient { http }
    }

    pub async fn post_json(&self, url: &Url, body: &Value) -> Result<()> {
        let response = self
            .http
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| EngineError::failed(format!("webhook POST to {url} failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            log::debug!("Webhook POST to {url} succeeded with {status}");
            Ok(())
        } else {
            Err(EngineError::failed(format!(
                "webhook POST to {url} returned {status}"
            )))
        }
    }
}

/// Parses and validates a webhook URL at action construction time, so a bad
/// URL fails with invalid-argument before any message is processed.
pub fn parse_webhook_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| EngineError::invalid(format!("invalid webhook URL {raw:?}: {e}")))
}

/// Gitter activity payload: one formatted line plus an urgency-derived level.
pub fn gitter_payload(message: &Message, include_body: bool) -> Value {
    let mut text = format!("[{}] {}", message.application_name, message.title);
    if include_body {
        if let Some(body) = message.body.as_deref().filter(|b| !b.is_empty()) {
            text.push_str("\n");
            text.push_str(body);
        }
    }
    if let Some(hostname) = message.hostname.as_deref().filter(|h| !h.is_empty()) {
        text.push_str(&format!("\n(from {hostname})"));
    }
    json!({
        "message": text,
        "level": message.urgency.level(),
    })
}

/// Slack incoming-webhook payload with a color-coded attachment.
pub fn slack_channel_payload(message: &Message, channel: &str, include_body: bool) -> Value {
    let text = if include_body {
        message.body.clone().unwrap_or_default()
    } else {
        String::new()
    };
    json!({
        "channel": channel,
        "attachments": [{
            "fallback": format!("[{}] {}", message.application_name, message.title),
            "color": message.urgency.color(),
            "title": message.title,
            "text": text,
            "footer": message.hostname.clone().unwrap_or_default(),
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::testing;
    use crate::message::Urgency;

    #[test]
    fn test_parse_webhook_url_rejects_garbage() {
        assert!(parse_webhook_url("https://webhooks.gitter.im/e/abc123").is_ok());
        assert!(matches!(
            parse_webhook_url("not a url"),
            Err(EngineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_gitter_payload_includes_host_and_level() {
        let mut message = testing::message();
        message.urgency = Urgency::High;
        let payload = gitter_payload(&message, false);
        assert_eq!(payload["level"], "high");
        let text = payload["message"].as_str().unwrap();
        assert!(text.contains("inventory-service"));
        assert!(text.contains("Disk usage above 90%"));
        assert!(text.contains("app-host-01"));
        // Body excluded when not configured.
        assert!(!text.contains("Partition"));
    }

    #[test]
    fn test_gitter_payload_with_body() {
        let message = testing::message();
        let payload = gitter_payload(&message, true);
        assert!(payload["message"]
            .as_str()
            .unwrap()
            .contains("Partition /var is filling up"));
    }

    #[test]
    fn test_slack_payload_color_tracks_urgency() {
        let mut message = testing::message();
        message.urgency = Urgency::Low;
        let payload = slack_channel_payload(&message, "#ops", true);
        assert_eq!(payload["channel"], "#ops");
        assert_eq!(payload["attachments"][0]["color"], Urgency::Low.color());
        assert_eq!(
            payload["attachments"][0]["text"],
            "Partition /var is filling up"
        );
    }
}
