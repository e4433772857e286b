use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use sasha_core::errors::IntegrationError;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    bot::Sasha,
    commands::{CommandRouteError, DispatchContext, Reply},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlackEnvelope {
    pub envelope_id: String,
    pub event: SlackEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlackEvent {
    Message(MessageEvent),
    BlockAction(BlockActionEvent),
    Unsupported { event_type: String },
}

impl SlackEvent {
    pub fn event_type(&self) -> SlackEventType {
        match self {
            Self::Message(_) => SlackEventType::Message,
            Self::BlockAction(_) => SlackEventType::BlockAction,
            Self::Unsupported { .. } => SlackEventType::Unsupported,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SlackEventType {
    Message,
    BlockAction,
    Unsupported,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct MessageEvent {
    #[serde(rename = "channel", default)]
    pub channel_id: String,
    #[serde(rename = "user", default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub ts: String,
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
}

impl MessageEvent {
    /// Edits, joins, bot posts and our own replies all carry a subtype or a
    /// bot id; only plain human messages are routed.
    pub fn is_from_human(&self) -> bool {
        self.bot_id.is_none() && self.subtype.is_none() && self.user_id.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockActionEvent {
    pub channel_id: String,
    pub user_id: String,
    pub action: BlockAction,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockAction {
    Button { action_id: String, value: String },
    MultiStaticSelect { action_id: String, selected: Vec<String> },
    Other { action_type: String },
}

/// Turns an interactive element back into command text.
///
/// Buttons carry the command in their value with `-` standing in for spaces.
/// Multi-selects build one command: the first option's full text, then the
/// second word of each later option appended. An option mentioning `all`
/// short-circuits to its first word.
pub fn parse_block_action(action: &BlockAction) -> Option<String> {
    match action {
        BlockAction::Button { value, .. } => Some(value.replace('-', " ")),
        BlockAction::MultiStaticSelect { selected, .. } => {
            let mut parsed = String::new();
            for option in selected {
                let value = option.replace('-', " ");
                if value.contains("all") {
                    parsed = value.split_whitespace().next().unwrap_or_default().to_owned();
                    break;
                }
                if parsed.is_empty() {
                    parsed = value;
                } else if let Some(suffix) = value.split_whitespace().nth(1) {
                    parsed.push_str(suffix);
                }
            }
            (!parsed.is_empty()).then_some(parsed)
        }
        BlockAction::Other { .. } => None,
    }
}

#[derive(Deserialize)]
struct RawInteraction {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    user: Option<RawId>,
    #[serde(default)]
    channel: Option<RawId>,
    #[serde(default)]
    actions: Vec<RawAction>,
}

#[derive(Deserialize)]
struct RawId {
    id: String,
}

#[derive(Deserialize)]
struct RawAction {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    action_id: String,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    selected_options: Vec<RawOption>,
}

#[derive(Deserialize)]
struct RawOption {
    value: String,
}

impl From<RawAction> for BlockAction {
    fn from(raw: RawAction) -> Self {
        match raw.kind.as_str() {
            "button" => {
                Self::Button { action_id: raw.action_id, value: raw.value.unwrap_or_default() }
            }
            "multi_static_select" => Self::MultiStaticSelect {
                action_id: raw.action_id,
                selected: raw.selected_options.into_iter().map(|option| option.value).collect(),
            },
            _ => Self::Other { action_type: raw.kind },
        }
    }
}

/// Maps the `event` object of an Events API `event_callback`.
pub fn envelope_from_event(
    envelope_id: impl Into<String>,
    event: &serde_json::Value,
) -> SlackEnvelope {
    let event_type = event.get("type").and_then(serde_json::Value::as_str).unwrap_or("unknown");
    let parsed = match event_type {
        "message" => serde_json::from_value::<MessageEvent>(event.clone())
            .map(SlackEvent::Message)
            .unwrap_or_else(|_| SlackEvent::Unsupported { event_type: event_type.to_owned() }),
        other => SlackEvent::Unsupported { event_type: other.to_owned() },
    };
    SlackEnvelope { envelope_id: envelope_id.into(), event: parsed }
}

/// Maps an interactivity payload; only the first action of `block_actions` is kept.
pub fn envelope_from_interaction(
    envelope_id: impl Into<String>,
    payload: &serde_json::Value,
) -> SlackEnvelope {
    let envelope_id = envelope_id.into();
    let unsupported = |event_type: &str| SlackEnvelope {
        envelope_id: envelope_id.clone(),
        event: SlackEvent::Unsupported { event_type: event_type.to_owned() },
    };

    let Ok(raw) = serde_json::from_value::<RawInteraction>(payload.clone()) else {
        return unsupported("interaction");
    };
    if raw.kind != "block_actions" {
        return unsupported(&raw.kind);
    }
    let (Some(user), Some(action)) = (raw.user, raw.actions.into_iter().next()) else {
        return unsupported("block_actions");
    };

    SlackEnvelope {
        envelope_id,
        event: SlackEvent::BlockAction(BlockActionEvent {
            channel_id: raw.channel.map(|channel| channel.id).unwrap_or_default(),
            user_id: user.id,
            action: action.into(),
        }),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Responded(Reply),
    Processed,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    Route(#[from] CommandRouteError),
    #[error("reply delivery failed: {0}")]
    Delivery(#[source] IntegrationError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> SlackEventType;
    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<SlackEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

pub fn sasha_dispatcher(bot: Arc<Sasha>) -> EventDispatcher {
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(MessageHandler::new(bot));
    dispatcher.register(BlockActionHandler);
    dispatcher
}

pub struct MessageHandler {
    bot: Arc<Sasha>,
}

impl MessageHandler {
    pub fn new(bot: Arc<Sasha>) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl EventHandler for MessageHandler {
    fn event_type(&self) -> SlackEventType {
        SlackEventType::Message
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::Message(message) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };
        if !message.is_from_human() {
            return Ok(HandlerResult::Ignored);
        }
        let Some(user_id) = message.user_id.as_deref() else {
            return Ok(HandlerResult::Ignored);
        };

        let dispatch_ctx = DispatchContext::new(user_id, message.channel_id.as_str());
        let Some(reply) = self.bot.handle_message(&message.text, &dispatch_ctx).await? else {
            return Ok(HandlerResult::Processed);
        };

        self.bot
            .delivery()
            .post_message(&message.channel_id, &reply)
            .await
            .map_err(EventHandlerError::Delivery)?;
        debug!(
            event_name = "egress.slack.reply_posted",
            correlation_id = %ctx.correlation_id,
            channel_id = %message.channel_id,
            "posted command reply"
        );
        Ok(HandlerResult::Responded(reply))
    }
}

/// Parses interactive clicks into command text and logs it. The command is
/// not routed.
pub struct BlockActionHandler;

#[async_trait]
impl EventHandler for BlockActionHandler {
    fn event_type(&self) -> SlackEventType {
        SlackEventType::BlockAction
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::BlockAction(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let Some(command) = parse_block_action(&event.action) else {
            debug!(
                correlation_id = %ctx.correlation_id,
                action = ?event.action,
                "block action carries no command"
            );
            return Ok(HandlerResult::Ignored);
        };
        info!(
            event_name = "ingress.slack.block_action_parsed",
            correlation_id = %ctx.correlation_id,
            channel_id = %event.channel_id,
            user_id = %event.user_id,
            command = %command,
            "parsed block action"
        );
        Ok(HandlerResult::Processed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sasha_core::linguistics::UnconfiguredLinguistics;
    use serde_json::json;

    use super::{
        envelope_from_event, envelope_from_interaction, parse_block_action, sasha_dispatcher,
        BlockAction, EventContext, EventDispatcher, HandlerResult, MessageEvent, SlackEnvelope,
        SlackEvent,
    };
    use crate::bot::{BotSettings, Collaborators, Sasha};
    use crate::commands::Reply;
    use crate::delivery::{Delivered, RecordingDelivery, UnavailableImageSource};

    fn bot(delivery: Arc<RecordingDelivery>) -> Arc<Sasha> {
        let settings = BotSettings {
            log_name: "sasha".to_owned(),
            debug: true,
            triggers: vec!["sasha".to_owned(), "s!".to_owned()],
            test_channel: "CTEST".to_owned(),
            inspiration_url: "https://inspire.example/api".to_owned(),
        };
        let collaborators = Collaborators {
            delivery,
            images: Arc::new(UnavailableImageSource),
            linguistics: Arc::new(UnconfiguredLinguistics),
        };
        Arc::new(Sasha::new(settings, collaborators).expect("bot"))
    }

    fn message(text: &str) -> SlackEnvelope {
        SlackEnvelope {
            envelope_id: "env-1".to_owned(),
            event: SlackEvent::Message(MessageEvent {
                channel_id: "C1".to_owned(),
                user_id: Some("U1".to_owned()),
                text: text.to_owned(),
                ts: "1730000000.1000".to_owned(),
                ..MessageEvent::default()
            }),
        }
    }

    #[tokio::test]
    async fn triggered_message_is_answered_and_delivered() {
        let delivery = Arc::new(RecordingDelivery::new());
        let dispatcher = sasha_dispatcher(bot(delivery.clone()));

        let result = dispatcher
            .dispatch(&message("s! speak"), &EventContext::default())
            .await
            .expect("dispatch");

        assert_eq!(result, HandlerResult::Responded(Reply::Text("woof".to_owned())));
        assert_eq!(
            delivery.delivered(),
            vec![Delivered::Message {
                channel_id: "C1".to_owned(),
                reply: Reply::Text("woof".to_owned())
            }]
        );
    }

    #[tokio::test]
    async fn untriggered_chatter_is_processed_silently() {
        let delivery = Arc::new(RecordingDelivery::new());
        let dispatcher = sasha_dispatcher(bot(delivery.clone()));

        let result = dispatcher
            .dispatch(&message("just chatting"), &EventContext::default())
            .await
            .expect("dispatch");

        assert_eq!(result, HandlerResult::Processed);
        assert!(delivery.delivered().is_empty());
    }

    #[tokio::test]
    async fn bot_and_subtype_messages_are_ignored() {
        let delivery = Arc::new(RecordingDelivery::new());
        let dispatcher = sasha_dispatcher(bot(delivery.clone()));

        let mut from_bot = message("sasha speak");
        if let SlackEvent::Message(event) = &mut from_bot.event {
            event.bot_id = Some("B1".to_owned());
        }
        let mut edited = message("sasha speak");
        if let SlackEvent::Message(event) = &mut edited.event {
            event.subtype = Some("message_changed".to_owned());
        }

        for envelope in [from_bot, edited] {
            let result =
                dispatcher.dispatch(&envelope, &EventContext::default()).await.expect("dispatch");
            assert_eq!(result, HandlerResult::Ignored);
        }
        assert!(delivery.delivered().is_empty());
    }

    #[tokio::test]
    async fn dispatcher_returns_ignored_when_no_handler_registered() {
        let dispatcher = EventDispatcher::new();
        let result =
            dispatcher.dispatch(&message("sasha speak"), &EventContext::default()).await;
        assert_eq!(result, Ok(HandlerResult::Ignored));
    }

    #[test]
    fn sasha_dispatcher_registers_handlers() {
        let dispatcher = sasha_dispatcher(bot(Arc::new(RecordingDelivery::new())));
        assert_eq!(dispatcher.handler_count(), 2);
    }

    #[test]
    fn button_value_dashes_become_spaces() {
        let action =
            BlockAction::Button { action_id: "a".to_owned(), value: "wfh-time".to_owned() };
        assert_eq!(parse_block_action(&action), Some("wfh time".to_owned()));
    }

    #[test]
    fn multi_select_concatenates_second_tokens() {
        let action = BlockAction::MultiStaticSelect {
            action_id: "a".to_owned(),
            selected: vec!["pick-1".to_owned(), "pick-2".to_owned(), "pick-3".to_owned()],
        };
        assert_eq!(parse_block_action(&action), Some("pick 123".to_owned()));

        let all = BlockAction::MultiStaticSelect {
            action_id: "a".to_owned(),
            selected: vec!["pick-1".to_owned(), "randpick-all".to_owned(), "pick-3".to_owned()],
        };
        assert_eq!(parse_block_action(&all), Some("randpick".to_owned()));

        let empty = BlockAction::MultiStaticSelect { action_id: "a".to_owned(), selected: vec![] };
        assert_eq!(parse_block_action(&empty), None);
        let other = BlockAction::Other { action_type: "datepicker".to_owned() };
        assert_eq!(parse_block_action(&other), None);
    }

    #[tokio::test]
    async fn block_actions_are_parsed_but_not_routed() {
        let delivery = Arc::new(RecordingDelivery::new());
        let dispatcher = sasha_dispatcher(bot(delivery.clone()));
        let envelope = envelope_from_interaction(
            "env-2",
            &json!({
                "type": "block_actions",
                "user": {"id": "U2"},
                "channel": {"id": "C2"},
                "actions": [{"type": "button", "action_id": "speak", "value": "speak"}]
            }),
        );

        let result =
            dispatcher.dispatch(&envelope, &EventContext::default()).await.expect("dispatch");
        assert_eq!(result, HandlerResult::Processed);
        assert!(delivery.delivered().is_empty());
    }

    #[test]
    fn event_callback_payloads_map_to_typed_events() {
        let envelope = envelope_from_event(
            "Ev1",
            &json!({
                "type": "message",
                "channel": "C1",
                "user": "U1",
                "text": "s! time",
                "ts": "1.0"
            }),
        );
        assert!(matches!(
            &envelope.event,
            SlackEvent::Message(event) if event.text == "s! time" && event.is_from_human()
        ));

        let reaction = envelope_from_event("Ev2", &json!({"type": "reaction_added"}));
        assert_eq!(
            reaction.event,
            SlackEvent::Unsupported { event_type: "reaction_added".to_owned() }
        );

        let view = envelope_from_interaction("Ev3", &json!({"type": "view_submission"}));
        assert_eq!(
            view.event,
            SlackEvent::Unsupported { event_type: "view_submission".to_owned() }
        );
    }
}
