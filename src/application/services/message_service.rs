use std::sync::Arc;
use tokio::task::JoinSet;

use crate::application::messaging::{Dispatcher, Outcome, EXPORT_FAILED_REPLY};
use crate::domain::entities::InboundEvent;
use crate::domain::traits::{Bot, Reply};

/// Bridges a platform adapter and the dispatcher
///
/// Plain messages are stored inline, so they land in the order they were
/// delivered. Commands run on their own task, so a slow `/ai` call never
/// holds up the poll loop or other senders.
pub struct MessageService<B: Bot> {
    bot: Arc<B>,
    dispatcher: Arc<Dispatcher>,
    commands: JoinSet<Outcome>,
}

impl<B: Bot + 'static> MessageService<B> {
    pub fn new(bot: Arc<B>, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            bot,
            dispatcher,
            commands: JoinSet::new(),
        }
    }

    pub fn bot(&self) -> &B {
        &self.bot
    }

    /// Commands still running in the background
    pub fn in_flight(&self) -> usize {
        self.commands.len()
    }

    /// Handle `event`.
    ///
    /// Returns the outcome when it was handled inline, or `None` when a
    /// command was started in the background.
    pub async fn deliver(&mut self, event: InboundEvent) -> Option<Outcome> {
        self.reap();

        if !self.dispatcher.is_command(&event) {
            return Some(Self::process(self.bot.as_ref(), &self.dispatcher, &event).await);
        }

        let bot = Arc::clone(&self.bot);
        let dispatcher = Arc::clone(&self.dispatcher);
        self.commands
            .spawn(async move { Self::process(bot.as_ref(), &dispatcher, &event).await });
        None
    }

    /// Wait for every background command to finish
    pub async fn drain(&mut self) -> Vec<Outcome> {
        let mut outcomes = Vec::with_capacity(self.commands.len());
        while let Some(joined) = self.commands.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => tracing::error!(error = %e, "Command handler failed"),
            }
        }
        outcomes
    }

    fn reap(&mut self) {
        while let Some(joined) = self.commands.try_join_next() {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Command handler failed");
            }
        }
    }

    /// Dispatch one event and send its reply, if any
    pub async fn process(bot: &B, dispatcher: &Dispatcher, event: &InboundEvent) -> Outcome {
        let outcome = dispatcher.dispatch(event).await;

        if let Outcome::Replied(reply) = &outcome {
            if let Err(e) = bot.send_reply(&event.chat_id, reply).await {
                tracing::error!(chat_id = %event.chat_id, error = %e, "Failed to send reply");

                // An undeliverable export still owes the requester an answer.
                if matches!(reply, Reply::Document { .. }) {
                    if let Err(e) = bot.send_message(&event.chat_id, EXPORT_FAILED_REPLY).await {
                        tracing::error!(chat_id = %event.chat_id, error = %e, "Failed to send export failure notice");
                    }
                }
            }
        }

        outcome
    }
}
