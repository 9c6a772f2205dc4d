pub mod actions;
pub mod config;
pub mod error;
pub mod match_algorithm;
pub mod matcher;
pub mod memory;
pub mod message;
pub mod reactor;
pub mod runner;
pub mod service;
pub mod traits;
pub mod webhook;

pub use actions::{Action, ActionFactory};
pub use config::{Config, MatcherSpec, Reaction, ReactionDirective};
pub use error::EngineError;
pub use match_algorithm::MatchAlgorithm;
pub use matcher::{matcher_for, Matcher};
pub use message::{Message, Urgency};
pub use reactor::{MessageReactor, MessageResponse};
pub use runner::ActionRunner;
pub use service::{HeraldService, NewMessageRequest};
