use crate::message::{MobileDevice, Urgency};
use serde::{Deserialize, Serialize};

/// Declarative matcher specification attached to a reaction. Exactly one
/// variant is active per instance; a default/unset instance matches nothing,
/// while the explicit `All` variant matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MatcherSpec {
    All,
    BodyContains {
        substring: String,
    },
    BodyIs {
        expected: String,
    },
    BodyDoesNotContain {
        substring: String,
    },
    TitleContains {
        substring: String,
    },
    TitleIs {
        expected: String,
    },
    TitleDoesNotContain {
        substring: String,
    },
    HostnameContains {
        substring: String,
    },
    HostnameIs {
        expected: String,
    },
    HostnameDoesNotContain {
        substring: String,
    },
    ApplicationIs {
        application_id: String,
    },
    ApplicationIsNot {
        application_id: String,
    },
    UrgencyIsOneOf {
        urgencies: Vec<Urgency>,
    },
    /// Default and catch-all for unrecognized variants; matches nothing.
    #[default]
    #[serde(other)]
    Unset,
}

/// Declarative action directive attached to a reaction. The reactor
/// deduplicates directives across matched reactions, so directives must be
/// equatable and hashable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReactionDirective {
    ForwardToSlackChannel {
        webhook_url: String,
        channel: String,
        #[serde(default)]
        include_body: bool,
    },
    ForwardToSlackUser {
        username: String,
    },
    ForwardToGitter {
        webhook_url: String,
        #[serde(default)]
        include_body: bool,
    },
    SendEmail {
        email_address: String,
    },
    SkipInbox,
    DontStoreMessage,
    DontSendPushNotification,
    SendPushNotification,
    /// Default and catch-all for unrecognized variants; materializes as a
    /// do-nothing action.
    #[default]
    #[serde(other)]
    Unset,
}

/// A stored rule associating matcher specifications with action directives,
/// scoped to an application or a user. Reactions are read-only data fetched
/// per evaluation; the engine never mutates them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub matchers: Vec<MatcherSpec>,
    #[serde(default)]
    pub actions: Vec<ReactionDirective>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchAlgorithmKind {
    #[default]
    And,
    Or,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunnerKind {
    #[default]
    Sequential,
    Parallel,
}

/// One application known to the demo deployment: its identity, the users
/// following it, and the reactions scoped to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    pub application_id: String,
    pub name: String,
    #[serde(default)]
    pub followers: Vec<String>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
}

/// One user known to the demo deployment: per-user reactions and registered
/// mobile devices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    pub user_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    #[serde(default)]
    pub devices: Vec<MobileDevice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub match_algorithm: MatchAlgorithmKind,
    #[serde(default)]
    pub runner: RunnerKind,
    /// Optional guard against runaway action expansion. The engine itself
    /// imposes no bound; leave unset to keep that behavior.
    #[serde(default)]
    pub max_rounds: Option<usize>,
    #[serde(default)]
    pub applications: Vec<ApplicationConfig>,
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            match_algorithm: MatchAlgorithmKind::And,
            runner: RunnerKind::Sequential,
            max_rounds: None,
            applications: vec![ApplicationConfig {
                application_id: "6f2e9c70-43a1-4f0b-9d2e-8b1a7c5d3e21".to_string(),
                name: "inventory-service".to_string(),
                followers: vec!["0b9d4a11-2c3e-4f56-8a7b-1c2d3e4f5a60".to_string()],
                reactions: vec![
                    Reaction {
                        name: "Forward outages to the ops channel".to_string(),
                        matchers: vec![MatcherSpec::UrgencyIsOneOf {
                            urgencies: vec![Urgency::High],
                        }],
                        actions: vec![ReactionDirective::ForwardToSlackChannel {
                            webhook_url: "https://hooks.slack.com/services/T000/B000/XXXX"
                                .to_string(),
                            channel: "#ops".to_string(),
                            include_body: true,
                        }],
                    },
                    Reaction {
                        name: "Drop heartbeat noise".to_string(),
                        matchers: vec![MatcherSpec::TitleContains {
                            substring: "heartbeat".to_string(),
                        }],
                        actions: vec![
                            ReactionDirective::DontStoreMessage,
                            ReactionDirective::SkipInbox,
                        ],
                    },
                ],
            }],
            users: vec![UserConfig {
                user_id: "0b9d4a11-2c3e-4f56-8a7b-1c2d3e4f5a60".to_string(),
                name: Some("On-call".to_string()),
                reactions: vec![],
                devices: vec![MobileDevice {
                    device_name: "oncall-phone".to_string(),
                    device_token: Some("ZGV2aWNlLXRva2Vu".to_string()),
                }],
            }],
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
