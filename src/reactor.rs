use crate::actions::{Action, ActionFactory};
use crate::config::ReactionDirective;
use crate::error::Result;
use crate::message::Message;
use crate::runner::ActionRunner;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Response returned to the ingestion boundary: the id of the message that
/// was reacted to. Downstream action outcomes are deliberately invisible to
/// the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message_id: String,
}

/// The entry point of the reaction engine. Each call is independent: fetch
/// the owning application's reactions, filter them through the match
/// algorithm, flatten and deduplicate their directives, apply the implicit
/// defaults, and drive the resulting actions to completion.
pub struct MessageReactor {
    factory: ActionFactory,
    runner: ActionRunner,
}

impl MessageReactor {
    pub fn new(factory: ActionFactory, runner: ActionRunner) -> Self {
        MessageReactor { factory, runner }
    }

    pub async fn react_to_message(&self, message: &Message) -> Result<MessageResponse> {
        message.check_valid()?;

        let initial = self.compute_initial_actions(message).await?;
        let total = self
            .runner
            .run_through_actions(message, initial)
            .await;
        log::info!(
            "Executed {total} actions reacting to message {} of application {}",
            message.message_id,
            message.application_id
        );

        Ok(MessageResponse {
            message_id: message.message_id.clone(),
        })
    }

    /// Builds the initial action set: matched, deduplicated directives plus
    /// the store-message and follower-inbox defaults unless a suppression
    /// directive turned them off.
    pub(crate) async fn compute_initial_actions(&self, message: &Message) -> Result<Vec<Action>> {
        let reactions = self
            .factory
            .reactions
            .reactions_for_application(&message.application_id)
            .await?;
        log::debug!(
            "Application {} has {} reactions configured",
            message.application_id,
            reactions.len()
        );

        // Flatten directives from matching reactions, collapsing duplicates
        // to the first occurrence. Two reactions that both say "forward to
        // gitter X" must produce a single action.
        let mut seen = HashSet::new();
        let mut directives = Vec::new();
        for reaction in &reactions {
            if !self
                .factory
                .match_algorithm
                .matches(message, &reaction.matchers)
            {
                continue;
            }
            log::debug!(
                "Reaction '{}' matched message {}",
                reaction.name,
                message.message_id
            );
            for directive in &reaction.actions {
                if seen.insert(directive.clone()) {
                    directives.push(directive.clone());
                }
            }
        }

        let mut store_message = true;
        let mut run_through_inbox = true;
        let mut actions = Vec::new();

        for directive in &directives {
            match directive {
                ReactionDirective::SkipInbox => run_through_inbox = false,
                ReactionDirective::DontStoreMessage => store_message = false,
                other => actions.push(self.factory.action_for(Some(other))?),
            }
        }

        if store_message {
            actions.push(self.factory.action_to_store_message());
        }
        if run_through_inbox {
            actions.push(self.factory.action_to_run_through_follower_inboxes());
        }
        Ok(actions)
    }
}
