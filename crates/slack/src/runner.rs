//! Drains queued envelopes into the event dispatcher.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::events::{EventContext, EventDispatcher, HandlerResult, SlackEnvelope, SlackEvent};

/// Consumer half of the in-process event queue. The HTTP ingress holds the
/// sender; the loop ends once every sender has been dropped.
pub struct EventRunner {
    receiver: mpsc::Receiver<SlackEnvelope>,
    dispatcher: EventDispatcher,
}

pub fn event_queue(
    capacity: usize,
    dispatcher: EventDispatcher,
) -> (mpsc::Sender<SlackEnvelope>, EventRunner) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (sender, EventRunner { receiver, dispatcher })
}

impl EventRunner {
    /// Returns how many envelopes were handled without error.
    pub async fn run(mut self) -> usize {
        info!(event_name = "runner.started", "event runner waiting for envelopes");
        let mut handled = 0;

        while let Some(envelope) = self.receiver.recv().await {
            let (channel_id, user_id) = correlation_fields(&envelope);
            debug!(
                event_name = "ingress.slack.envelope_received",
                envelope_id = %envelope.envelope_id,
                event_type = ?envelope.event.event_type(),
                channel_id = channel_id.unwrap_or("unknown"),
                user_id = user_id.unwrap_or("unknown"),
                "received slack envelope"
            );

            let context = EventContext { correlation_id: envelope.envelope_id.clone() };
            match self.dispatcher.dispatch(&envelope, &context).await {
                Ok(HandlerResult::Ignored) => {}
                Ok(_) => handled += 1,
                Err(error) => warn!(
                    event_name = "runner.dispatch_failed",
                    envelope_id = %envelope.envelope_id,
                    channel_id = channel_id.unwrap_or("unknown"),
                    user_id = user_id.unwrap_or("unknown"),
                    error = %error,
                    "event dispatch failed; continuing"
                ),
            }
        }

        info!(event_name = "runner.stopped", handled, "event queue closed");
        handled
    }
}

fn correlation_fields(envelope: &SlackEnvelope) -> (Option<&str>, Option<&str>) {
    match &envelope.event {
        SlackEvent::Message(event) => (Some(event.channel_id.as_str()), event.user_id.as_deref()),
        SlackEvent::BlockAction(event) => {
            (Some(event.channel_id.as_str()), Some(event.user_id.as_str()))
        }
        SlackEvent::Unsupported { .. } => (None, None),
    }
}
