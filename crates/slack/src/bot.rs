//! Trigger handling and assembly of the default command table.

use std::sync::Arc;

use chrono::Local;
use sasha_core::config::{bot_display_name, AppConfig};
use sasha_core::linguistics::{Linguistics, LookupKind};
use tracing::{debug, info};

use crate::blocks::{bootup_message, help_message, shutdown_message, HelpAvatar, MessageTemplate};
use crate::commands::{
    ActionDescriptor, CommandRouteError, CommandTable, CommandTableBuilder, CommandTableError,
    DispatchContext, Reply,
};
use crate::delivery::{ImageSource, MessageDelivery};
use crate::handlers::{
    GiggleHandler, InspirationalHandler, LookupHandler, TimeHandler, WfhEpochHandler,
};

pub const HELP_PATTERN: &str = "^help";
pub const CATEGORY_BASIC: &str = "basic";
pub const CATEGORY_USEFUL: &str = "useful";
pub const CATEGORY_NOT_SO_USEFUL: &str = "not so useful";
pub const CATEGORY_LANGUAGE: &str = "language";
pub const AVATAR_URL: &str =
    "https://avatars.slack-edge.com/2020-07-10/1219810342855_04c9966e835417fadde7_512.png";

/// Returns the command text when `text` opens with one of `triggers`.
///
/// Triggers compare case-insensitively and must be followed by whitespace or
/// the end of the message, so `sashaspeak` is not addressed to the bot.
pub fn strip_trigger<'a, S>(text: &'a str, triggers: &[S]) -> Option<&'a str>
where
    S: AsRef<str>,
{
    let text = text.trim_start();
    for trigger in triggers {
        let trigger = trigger.as_ref();
        if trigger.is_empty() {
            continue;
        }
        let Some(head) = text.get(..trigger.len()) else {
            continue;
        };
        if !head.eq_ignore_ascii_case(trigger) {
            continue;
        }
        let rest = &text[trigger.len()..];
        match rest.chars().next() {
            None => return Some(""),
            Some(next) if next.is_whitespace() => return Some(rest.trim()),
            Some(_) => {}
        }
    }
    None
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BotSettings {
    pub log_name: String,
    pub debug: bool,
    pub triggers: Vec<String>,
    pub test_channel: String,
    pub inspiration_url: String,
}

impl From<&AppConfig> for BotSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            log_name: config.bot.log_name.clone(),
            debug: config.bot.debug,
            triggers: config.bot.triggers.clone(),
            test_channel: config.bot.test_channel.clone(),
            inspiration_url: config.integrations.inspiration_url.clone(),
        }
    }
}

#[derive(Clone)]
pub struct Collaborators {
    pub delivery: Arc<dyn MessageDelivery>,
    pub images: Arc<dyn ImageSource>,
    pub linguistics: Arc<dyn Linguistics>,
}

pub struct Sasha {
    settings: BotSettings,
    bot_name: String,
    version: &'static str,
    booted_at: String,
    table: Arc<CommandTable>,
    delivery: Arc<dyn MessageDelivery>,
}

impl Sasha {
    pub fn new(
        settings: BotSettings,
        collaborators: Collaborators,
    ) -> Result<Self, CommandTableError> {
        let bot_name = bot_display_name(settings.debug);
        let version = env!("CARGO_PKG_VERSION");
        let booted_at = Local::now().format("%F %T").to_string();
        let about = bootup_message(&bot_name, version, &booted_at);

        let mut table = default_table(&settings, &collaborators, about)?;
        let help = help_message(
            &help_intro(&bot_name, &settings.triggers),
            Some(&HelpAvatar { image_url: AVATAR_URL.to_owned(), alt_text: "avatar".to_owned() }),
            &table.help_sections(),
        );
        table.backfill_help(HELP_PATTERN, help)?;

        info!(
            event_name = "bot.assembled",
            log_name = %settings.log_name,
            bot_name = %bot_name,
            command_count = table.len(),
            "command table ready"
        );

        Ok(Self {
            settings,
            bot_name,
            version,
            booted_at,
            table: Arc::new(table),
            delivery: collaborators.delivery,
        })
    }

    pub fn bot_name(&self) -> &str {
        &self.bot_name
    }

    pub fn settings(&self) -> &BotSettings {
        &self.settings
    }

    pub fn table(&self) -> Arc<CommandTable> {
        Arc::clone(&self.table)
    }

    pub fn delivery(&self) -> Arc<dyn MessageDelivery> {
        Arc::clone(&self.delivery)
    }

    /// `Ok(None)` when the message lacks a trigger or matches no command.
    pub async fn handle_message(
        &self,
        text: &str,
        ctx: &DispatchContext,
    ) -> Result<Option<Reply>, CommandRouteError> {
        let Some(command) = strip_trigger(text, &self.settings.triggers) else {
            debug!(channel_id = %ctx.channel_id, "message not addressed to bot");
            return Ok(None);
        };
        self.table.dispatch(command, ctx).await
    }

    pub fn bootup_message(&self) -> MessageTemplate {
        bootup_message(&self.bot_name, self.version, &self.booted_at)
    }

    pub fn shutdown_message(&self) -> MessageTemplate {
        shutdown_message(&self.bot_name)
    }
}

fn help_intro<S: AsRef<str>>(bot_name: &str, triggers: &[S]) -> String {
    let listed =
        triggers.iter().map(|trigger| format!("*`{}`*", trigger.as_ref())).collect::<Vec<_>>();
    let example = triggers.first().map(|trigger| trigger.as_ref()).unwrap_or("sasha");
    format!(
        "I'm *{bot_name}* (:regional_indicator_s: for short).\n\
         I can help do stuff for you, but you'll need to call my attention first with {}\n \
         Example: *`{example} hello`*\n\
         Here's what I can do:",
        listed.join(" or ")
    )
}

fn default_table(
    settings: &BotSettings,
    collaborators: &Collaborators,
    about: MessageTemplate,
) -> Result<CommandTable, CommandTableError> {
    let mut builder = CommandTableBuilder::new();
    builder.categories(&[
        CATEGORY_BASIC,
        CATEGORY_USEFUL,
        CATEGORY_NOT_SO_USEFUL,
        CATEGORY_LANGUAGE,
    ]);

    builder
        .handler(GiggleHandler)?
        .handler(TimeHandler)?
        .handler(WfhEpochHandler)?
        .handler(InspirationalHandler::new(
            settings.inspiration_url.clone(),
            Arc::clone(&collaborators.images),
            Arc::clone(&collaborators.delivery),
        ))?;
    let lookups =
        [LookupKind::Translation, LookupKind::Examples, LookupKind::Lemma, LookupKind::Etymology];
    for kind in lookups {
        builder.handler(LookupHandler::new(kind, Arc::clone(&collaborators.linguistics)))?;
    }

    builder
        .register(
            HELP_PATTERN,
            "help",
            CATEGORY_BASIC,
            "Description of all the commands I respond to!",
            ActionDescriptor::literal(""),
        )?
        .register(
            "^about$",
            "about",
            CATEGORY_USEFUL,
            "Bootup time of the current instance and the running version",
            ActionDescriptor::blocks(about),
        )?
        .register(
            "good bo[tiy]",
            "good bo[tiy]",
            CATEGORY_BASIC,
            "Did I do something right for once?",
            ActionDescriptor::literal("thanks <@{user}>!"),
        )?
        .register(
            "^time$",
            "time",
            CATEGORY_BASIC,
            "Display current server time",
            ActionDescriptor::invoke("get_time", &[])?,
        )?
        .register(
            "^speak$",
            "speak",
            CATEGORY_BASIC,
            "_Really_ basic response here.",
            ActionDescriptor::literal("woof"),
        )?
        .register(
            ".*inspir.*",
            "<any text with \"inspir\" in it>",
            CATEGORY_NOT_SO_USEFUL,
            "Uploads an inspirational picture",
            ActionDescriptor::invoke("inspirational", &["channel"])?,
        )?
        .register(
            ".*tihi.*",
            "<any text with \"tihi\" in it>",
            CATEGORY_NOT_SO_USEFUL,
            "Giggles",
            ActionDescriptor::invoke("giggle", &[])?,
        )?
        .register(
            r"^e[nt]\s",
            LookupKind::Translation.usage(),
            CATEGORY_LANGUAGE,
            "Offers a translation of an Estonian word into English or vice-versa",
            ActionDescriptor::invoke("translate", &["message", "match_pattern"])?,
        )?
        .register(
            r"^ekss\s",
            LookupKind::Examples.usage(),
            CATEGORY_LANGUAGE,
            "Offers example usage of the given Estonian word",
            ActionDescriptor::invoke("examples", &["message", "match_pattern"])?,
        )?
        .register(
            r"^lemma\s",
            LookupKind::Lemma.usage(),
            CATEGORY_LANGUAGE,
            "Determines the lemma of the Estonian word",
            ActionDescriptor::invoke("lemma", &["message", "match_pattern"])?,
        )?
        .register(
            r"^wfh\s?(time|epoch)",
            "wfh (time|epoch)",
            CATEGORY_USEFUL,
            "Prints the current WFH epoch time",
            ActionDescriptor::invoke("wfh_epoch", &[])?,
        )?
        .register(
            r"^ety\s",
            LookupKind::Etymology.usage(),
            CATEGORY_USEFUL,
            "Gets the etymology of a given word",
            ActionDescriptor::invoke("etymology", &["message", "match_pattern"])?,
        )?;

    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use regex::Regex;
    use sasha_core::linguistics::UnconfiguredLinguistics;

    use super::{strip_trigger, BotSettings, Collaborators, Sasha, HELP_PATTERN};
    use crate::blocks::{Block, TextObject};
    use crate::commands::{DispatchContext, Reply};
    use crate::delivery::{RecordingDelivery, UnavailableImageSource};

    fn settings(debug: bool) -> BotSettings {
        BotSettings {
            log_name: "sasha".to_owned(),
            debug,
            triggers: vec!["sasha".to_owned(), "s!".to_owned()],
            test_channel: "CTEST".to_owned(),
            inspiration_url: "https://inspire.example/api?generate=true".to_owned(),
        }
    }

    fn sasha() -> Sasha {
        Sasha::new(
            settings(false),
            Collaborators {
                delivery: Arc::new(RecordingDelivery::new()),
                images: Arc::new(UnavailableImageSource),
                linguistics: Arc::new(UnconfiguredLinguistics),
            },
        )
        .expect("default table is valid")
    }

    fn ctx() -> DispatchContext {
        DispatchContext::new("U123", "C456")
    }

    #[test]
    fn triggers_are_case_insensitive_and_need_a_word_boundary() {
        let triggers = ["sasha", "s!"];
        assert_eq!(strip_trigger("s! speak", &triggers), Some("speak"));
        assert_eq!(strip_trigger("SASHA   wfh time ", &triggers), Some("wfh time"));
        assert_eq!(strip_trigger("sasha", &triggers), Some(""));
        assert_eq!(strip_trigger("sashaspeak", &triggers), None);
        assert_eq!(strip_trigger("hey sasha speak", &triggers), None);
        assert_eq!(strip_trigger("ü", &triggers), None);
    }

    #[test]
    fn default_table_keeps_registration_order() {
        let bot = sasha();
        let patterns: Vec<String> =
            bot.table().entries().iter().map(|entry| entry.pattern_str().to_owned()).collect();
        assert_eq!(
            patterns,
            [
                HELP_PATTERN,
                "^about$",
                "good bo[tiy]",
                "^time$",
                "^speak$",
                ".*inspir.*",
                ".*tihi.*",
                r"^e[nt]\s",
                r"^ekss\s",
                r"^lemma\s",
                r"^wfh\s?(time|epoch)",
                r"^ety\s",
            ]
        );
    }

    #[test]
    fn bot_name_follows_debug_flag() {
        assert_eq!(sasha().bot_name(), "Sasha Produdnika");
        let debug = Sasha::new(
            settings(true),
            Collaborators {
                delivery: Arc::new(RecordingDelivery::new()),
                images: Arc::new(UnavailableImageSource),
                linguistics: Arc::new(UnconfiguredLinguistics),
            },
        )
        .expect("table");
        assert_eq!(debug.bot_name(), "Sasha Debugnova");
        assert!(debug.shutdown_message().fallback_text.starts_with("Sasha Debugnova died"));
    }

    #[tokio::test]
    async fn speak_with_short_trigger_says_woof() {
        let reply = sasha().handle_message("s! speak", &ctx()).await.expect("dispatch");
        assert_eq!(reply, Some(Reply::Text("woof".to_owned())));
    }

    #[tokio::test]
    async fn good_boy_thanks_the_sender() {
        let reply = sasha().handle_message("sasha good boy", &ctx()).await.expect("dispatch");
        assert_eq!(reply, Some(Reply::Text("thanks <@U123>!".to_owned())));
    }

    #[tokio::test]
    async fn untriggered_and_unknown_messages_are_ignored() {
        let bot = sasha();
        assert_eq!(bot.handle_message("speak", &ctx()).await, Ok(None));
        assert_eq!(bot.handle_message("sasha dance", &ctx()).await, Ok(None));
    }

    #[tokio::test]
    async fn tihi_anywhere_giggles() {
        let reply = sasha().handle_message("sasha well tihi then", &ctx()).await.expect("dispatch");
        let Some(Reply::Text(giggle)) = reply else { panic!("expected giggle text") };
        assert!(Regex::new("^ti(hi)+!$").expect("regex").is_match(&giggle));
    }

    #[tokio::test]
    async fn wfh_time_replies_with_three_blocks() {
        for text in ["sasha wfh time", "sasha wfhepoch"] {
            let reply = sasha().handle_message(text, &ctx()).await.expect("dispatch");
            let Some(Reply::Blocks(template)) = reply else { panic!("expected blocks for {text}") };
            assert_eq!(template.blocks.len(), 3);
            assert!(matches!(
                &template.blocks[0],
                Block::Header { text, .. } if text.text().contains("WFH Epoch")
            ));
        }
    }

    #[tokio::test]
    async fn help_lists_every_category_after_backfill() {
        let reply = sasha().handle_message("sasha help", &ctx()).await.expect("dispatch");
        let Some(Reply::Blocks(template)) = reply else { panic!("expected help blocks") };

        let sections: Vec<&str> = template
            .blocks
            .iter()
            .filter_map(|block| match block {
                Block::Section { text: TextObject::Mrkdwn { text }, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert!(sections[0].contains("*`sasha`* or *`s!`*"));
        assert!(sections[1].starts_with("*basic*"));
        assert!(sections[2].starts_with("*useful*"));
        assert!(sections[3].starts_with("*not so useful*"));
        assert!(sections[4].starts_with("*language*"));
    }

    #[tokio::test]
    async fn about_replays_bootup_card() {
        let bot = sasha();
        let reply = bot.handle_message("sasha about", &ctx()).await.expect("dispatch");
        assert_eq!(reply, Some(Reply::Blocks(bot.bootup_message())));
    }

    #[tokio::test]
    async fn lookup_without_service_degrades_to_text() {
        let reply = sasha().handle_message("sasha ekss tere", &ctx()).await.expect("dispatch");
        let expected = "That lookup isn't set up on this instance.".to_owned();
        assert_eq!(reply, Some(Reply::Text(expected)));
    }
}
