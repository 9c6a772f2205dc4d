use crate::actions::Action;
use crate::config::RunnerKind;
use crate::message::Message;
use futures::future::join_all;

/// Drives a queue of actions to completion, breadth-first round by round.
///
/// Each round drains the entire current queue, executes every action, and
/// collects the follow-up actions into the next round; rounds repeat until
/// one produces no follow-ups. A failing action is logged and contributes
/// zero follow-ups; it never aborts the round or the run.
///
/// There is no cycle detection: an action chain that always spawns
/// follow-ups will run forever unless `max_rounds` is set. That bound is
/// off by default and stops the run with a warning when hit.
pub struct ActionRunner {
    kind: RunnerKind,
    max_rounds: Option<usize>,
}

impl ActionRunner {
    pub fn sequential() -> Self {
        ActionRunner {
            kind: RunnerKind::Sequential,
            max_rounds: None,
        }
    }

    pub fn parallel() -> Self {
        ActionRunner {
            kind: RunnerKind::Parallel,
            max_rounds: None,
        }
    }

    pub fn new(kind: RunnerKind, max_rounds: Option<usize>) -> Self {
        ActionRunner { kind, max_rounds }
    }

    /// Runs the initial actions and everything they spawn to completion.
    /// Returns the total number of actions executed across all rounds.
    pub async fn run_through_actions(&self, message: &Message, initial: Vec<Action>) -> usize {
        let mut queue = initial;
        let mut total = 0;
        let mut round = 0;

        while !queue.is_empty() {
            if let Some(max) = self.max_rounds {
                if round >= max {
                    log::warn!(
                        "Stopping after {round} rounds with {} actions still pending for message {}",
                        queue.len(),
                        message.message_id
                    );
                    break;
                }
            }
            round += 1;
            total += queue.len();
            log::debug!(
                "Round {round}: executing {} actions for message {}",
                queue.len(),
                message.message_id
            );

            queue = match self.kind {
                RunnerKind::Sequential => self.run_round_sequential(message, queue).await,
                RunnerKind::Parallel => self.run_round_parallel(message, queue).await,
            };
        }

        log::debug!(
            "Executed {total} actions over {round} rounds for message {}",
            message.message_id
        );
        total
    }

    async fn run_round_sequential(&self, message: &Message, round: Vec<Action>) -> Vec<Action> {
        let mut follow_ups = Vec::new();
        for action in round {
            follow_ups.extend(execute_isolated(&action, message).await);
        }
        follow_ups
    }

    /// Executes one round's actions concurrently. Rounds remain strictly
    /// sequential: the next round starts only after every action in this
    /// one has been attempted.
    async fn run_round_parallel(&self, message: &Message, round: Vec<Action>) -> Vec<Action> {
        let results = join_all(
            round
                .iter()
                .map(|action| execute_isolated(action, message)),
        )
        .await;
        results.into_iter().flatten().collect()
    }
}

/// Executes one action, absorbing any failure. A failed action yields zero
/// follow-ups; the error never reaches the runner's caller.
async fn execute_isolated(action: &Action, message: &Message) -> Vec<Action> {
    match action.act_on(message).await {
        Ok(follow_ups) => follow_ups,
        Err(e) => {
            log::error!(
                "Action {} failed for message {}: {e}",
                action.kind(),
                message.message_id
            );
            Vec::new()
        }
    }
}
