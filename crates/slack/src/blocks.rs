use serde::Serialize;

use sasha_core::wfh::WfhEpoch;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    #[serde(rename = "plain_text")]
    Plain { text: String },
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Plain { text } | Self::Mrkdwn { text } => text,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Accessory {
    Image { image_url: String, alt_text: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header {
        block_id: String,
        text: TextObject,
    },
    Section {
        block_id: String,
        text: TextObject,
        #[serde(skip_serializing_if = "Option::is_none")]
        accessory: Option<Accessory>,
    },
    Context {
        block_id: String,
        elements: Vec<TextObject>,
    },
    Divider {
        block_id: String,
    },
}

impl Block {
    pub fn block_id(&self) -> &str {
        match self {
            Self::Header { block_id, .. }
            | Self::Section { block_id, .. }
            | Self::Context { block_id, .. }
            | Self::Divider { block_id } => block_id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub fallback_text: String,
    pub blocks: Vec<Block>,
}

pub struct MessageBuilder {
    fallback_text: String,
    blocks: Vec<Block>,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self { fallback_text: fallback_text.into(), blocks: Vec::new() }
    }

    pub fn header(mut self, block_id: impl Into<String>, text: impl Into<String>) -> Self {
        let text = TextObject::plain(text);
        self.blocks.push(Block::Header { block_id: block_id.into(), text });
        self
    }

    pub fn section<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut SectionBuilder),
    {
        let mut builder = SectionBuilder::default();
        build(&mut builder);
        let (text, accessory) = builder.build();
        self.blocks.push(Block::Section { block_id: block_id.into(), text, accessory });
        self
    }

    pub fn context<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ContextBuilder),
    {
        let mut builder = ContextBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Context { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn divider(mut self, block_id: impl Into<String>) -> Self {
        self.blocks.push(Block::Divider { block_id: block_id.into() });
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate { fallback_text: self.fallback_text, blocks: self.blocks }
    }
}

#[derive(Default)]
pub struct SectionBuilder {
    text: Option<TextObject>,
    accessory: Option<Accessory>,
}

impl SectionBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::mrkdwn(text));
        self
    }

    pub fn image(
        &mut self,
        image_url: impl Into<String>,
        alt_text: impl Into<String>,
    ) -> &mut Self {
        self.accessory =
            Some(Accessory::Image { image_url: image_url.into(), alt_text: alt_text.into() });
        self
    }

    fn build(self) -> (TextObject, Option<Accessory>) {
        (self.text.unwrap_or_else(|| TextObject::plain("")), self.accessory)
    }
}

#[derive(Default)]
pub struct ContextBuilder {
    elements: Vec<TextObject>,
}

impl ContextBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> Vec<TextObject> {
        self.elements
    }
}

/// One help-card group: category label plus `(usage, description)` rows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HelpSection {
    pub category: String,
    pub commands: Vec<(String, String)>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HelpAvatar {
    pub image_url: String,
    pub alt_text: String,
}

pub fn help_message(
    intro: &str,
    avatar: Option<&HelpAvatar>,
    sections: &[HelpSection],
) -> MessageTemplate {
    let mut builder = MessageBuilder::new("Sasha command help").section("help.intro.v1", |section| {
        section.mrkdwn(intro);
        if let Some(avatar) = avatar {
            section.image(avatar.image_url.clone(), avatar.alt_text.clone());
        }
    });

    for help in sections.iter().filter(|help| !help.commands.is_empty()) {
        let slug = help.category.replace(' ', "_");
        let rows = help
            .commands
            .iter()
            .map(|(usage, description)| format!("• `{usage}`: {description}"))
            .collect::<Vec<_>>()
            .join("\n");
        builder = builder
            .divider(format!("help.{slug}.divider.v1"))
            .section(format!("help.{slug}.commands.v1"), |section| {
                section.mrkdwn(format!("*{}*\n{rows}", help.category));
            });
    }

    builder.build()
}

pub fn bootup_message(bot_name: &str, version: &str, booted_at: &str) -> MessageTemplate {
    MessageBuilder::new(format!("{bot_name} {version} booted up at {booted_at}"))
        .context("bot.bootup.v1", |context| {
            context.mrkdwn(format!(
                "*{bot_name}* *`{version}`* booted up at `{booted_at}`!"
            ));
        })
        .build()
}

pub fn shutdown_message(bot_name: &str) -> MessageTemplate {
    MessageBuilder::new(format!("{bot_name} died."))
        .context("bot.shutdown.v1", |context| {
            context.mrkdwn(format!(
                "{bot_name} died. :death-drops::party-dead::death-drops:"
            ));
        })
        .build()
}

pub fn wfh_epoch_message(epoch: &WfhEpoch) -> MessageTemplate {
    let seconds = epoch.seconds_text();
    MessageBuilder::new(format!("Current WFH epoch time is {seconds}"))
        .header("wfh.header.v1", "WFH Epoch")
        .section("wfh.summary.v1", |section| {
            section.mrkdwn(format!(
                "Current WFH epoch time is *`{seconds}`*.\n ({})",
                epoch.elapsed_text()
            ));
        })
        .context("wfh.units.v1", |context| {
            context.mrkdwn(epoch.unit_lines());
        })
        .build()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use sasha_core::wfh::WfhEpoch;

    use super::{
        bootup_message, help_message, shutdown_message, wfh_epoch_message, Accessory, Block,
        HelpAvatar, HelpSection, MessageBuilder, TextObject,
    };

    #[test]
    fn message_builder_creates_typed_block_structure() {
        let message = MessageBuilder::new("fallback")
            .header("demo.header.v1", "Heading")
            .section("demo.summary.v1", |section| {
                section.mrkdwn("*Summary*").image("https://img.example/a.png", "a");
            })
            .divider("demo.divider.v1")
            .build();

        assert_eq!(message.blocks.len(), 3);
        assert!(matches!(
            &message.blocks[0],
            Block::Header { block_id, text: TextObject::Plain { text } }
                if block_id == "demo.header.v1" && text == "Heading"
        ));
        assert!(matches!(
            &message.blocks[1],
            Block::Section { accessory: Some(Accessory::Image { alt_text, .. }), .. }
                if alt_text == "a"
        ));
        assert_eq!(message.blocks[2].block_id(), "demo.divider.v1");
    }

    #[test]
    fn blocks_serialize_with_slack_type_tags() {
        let message = MessageBuilder::new("fallback")
            .section("demo.v1", |section| {
                section.plain("hi");
            })
            .build();
        let json = serde_json::to_value(&message.blocks).expect("serialize");

        assert_eq!(json[0]["type"], "section");
        assert_eq!(json[0]["text"]["type"], "plain_text");
        assert!(json[0].get("accessory").is_none());
    }

    #[test]
    fn help_message_groups_rows_by_category_and_skips_empty_groups() {
        let avatar = HelpAvatar {
            image_url: "https://img.example/avatar.png".to_owned(),
            alt_text: "avatar".to_owned(),
        };
        let message = help_message(
            "I'm *Sasha*.",
            Some(&avatar),
            &[
                HelpSection {
                    category: "basic".to_owned(),
                    commands: vec![("speak".to_owned(), "Really basic".to_owned())],
                },
                HelpSection { category: "language".to_owned(), commands: vec![] },
            ],
        );

        assert_eq!(message.blocks.len(), 3);
        assert!(matches!(
            &message.blocks[0],
            Block::Section { accessory: Some(_), text: TextObject::Mrkdwn { text }, .. }
                if text == "I'm *Sasha*."
        ));
        assert!(matches!(
            &message.blocks[2],
            Block::Section { text: TextObject::Mrkdwn { text }, .. }
                if text == "*basic*\n• `speak`: Really basic"
        ));
    }

    #[test]
    fn wfh_message_has_header_summary_and_units() {
        let now = NaiveDate::from_ymd_opt(2020, 3, 4)
            .and_then(|date| date.and_hms_opt(19, 15, 0))
            .expect("timestamp");
        let message = wfh_epoch_message(&WfhEpoch::at(now));

        assert_eq!(message.blocks.len(), 3);
        assert!(matches!(
            &message.blocks[0],
            Block::Header { text, .. } if text.text().contains("WFH Epoch")
        ));
        assert!(matches!(
            &message.blocks[1],
            Block::Section { text, .. } if text.text().contains("*`86400`*")
        ));
        assert!(matches!(
            &message.blocks[2],
            Block::Context { elements, .. } if elements.len() == 1
        ));
    }

    #[test]
    fn bootup_and_shutdown_templates_carry_identifying_text() {
        let boot = bootup_message("Sasha Produdnika", "0.2.0", "2026-01-01 00:00:00");
        assert!(boot.fallback_text.contains("0.2.0"));
        assert!(matches!(
            &boot.blocks[0],
            Block::Context { elements, .. }
                if elements[0].text().contains("booted up at `2026-01-01 00:00:00`")
        ));

        let shutdown = shutdown_message("Sasha Debugnova");
        assert!(shutdown.fallback_text.starts_with("Sasha Debugnova died"));
    }
}
