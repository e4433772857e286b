//! Ordered command table and first-match dispatcher.
//!
//! Entries are kept in a `Vec`; registration order is match priority. Every
//! structural problem (bad regex, duplicate pattern, unknown argument tag,
//! unknown handler, arity mismatch) is rejected while the table is built so
//! dispatch only ever fails when a handler itself fails.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::blocks::{HelpSection, MessageTemplate};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Blocks(MessageTemplate),
}

impl Reply {
    pub fn fallback_text(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Blocks(template) => &template.fallback_text,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchContext {
    pub user_id: String,
    pub channel_id: String,
}

impl DispatchContext {
    pub fn new(user_id: impl Into<String>, channel_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), channel_id: channel_id.into() }
    }
}

/// Where a handler argument comes from at dispatch time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArgSource {
    Message,
    MatchPattern,
    Channel,
    User,
}

impl ArgSource {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::MatchPattern => "match_pattern",
            Self::Channel => "channel",
            Self::User => "user",
        }
    }

    fn resolve(&self, text: &str, matched: &str, ctx: &DispatchContext) -> String {
        match self {
            Self::Message => text.to_owned(),
            Self::MatchPattern => matched.to_owned(),
            Self::Channel => ctx.channel_id.clone(),
            Self::User => ctx.user_id.clone(),
        }
    }
}

impl FromStr for ArgSource {
    type Err = CommandTableError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "message" => Ok(Self::Message),
            "match_pattern" => Ok(Self::MatchPattern),
            "channel" => Ok(Self::Channel),
            "user" => Ok(Self::User),
            other => Err(CommandTableError::UnknownArgTag(other.to_owned())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionDescriptor {
    Literal(String),
    Blocks(MessageTemplate),
    Invoke { handler: String, args: Vec<ArgSource> },
}

impl ActionDescriptor {
    pub fn literal(text: impl Into<String>) -> Self {
        Self::Literal(text.into())
    }

    pub fn blocks(template: MessageTemplate) -> Self {
        Self::Blocks(template)
    }

    pub fn invoke(handler: impl Into<String>, tags: &[&str]) -> Result<Self, CommandTableError> {
        let args = tags.iter().map(|tag| tag.parse()).collect::<Result<Vec<ArgSource>, _>>()?;
        Ok(Self::Invoke { handler: handler.into(), args })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandlerError {
    #[error("handler `{handler}` expected {expected} argument(s), got {actual}")]
    Arity { handler: String, expected: usize, actual: usize },
    #[error("handler `{handler}` failed: {message}")]
    Failed { handler: String, message: String },
}

#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Identifier referenced by `ActionDescriptor::Invoke`.
    fn name(&self) -> &'static str;

    fn arity(&self) -> usize;

    async fn call(&self, args: &[String]) -> Result<Option<Reply>, HandlerError>;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandTableError {
    #[error("invalid command pattern `{pattern}`: {message}")]
    InvalidPattern { pattern: String, message: String },
    #[error("command pattern `{0}` is already registered")]
    DuplicatePattern(String),
    #[error("unknown argument source tag `{0}` (expected message|match_pattern|channel|user)")]
    UnknownArgTag(String),
    #[error("handler `{0}` is already registered")]
    DuplicateHandler(String),
    #[error("command `{pattern}` references unregistered handler `{handler}`")]
    UnknownHandler { pattern: String, handler: String },
    #[error("command `{pattern}` passes {actual} argument(s) to `{handler}`, expected {expected}")]
    ArityMismatch { pattern: String, handler: String, expected: usize, actual: usize },
    #[error("command `{pattern}` uses undeclared category `{category}`")]
    UnknownCategory { pattern: String, category: String },
    #[error("help pattern `{0}` is not registered")]
    HelpNotRegistered(String),
    #[error("help text has already been filled in")]
    HelpAlreadyFilled,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandRouteError {
    #[error("command `{pattern}` failed: {source}")]
    Handler {
        pattern: String,
        #[source]
        source: HandlerError,
    },
    #[error("command `{pattern}` references missing handler `{handler}`")]
    MissingHandler { pattern: String, handler: String },
}

#[derive(Clone, Debug)]
pub struct CommandEntry {
    pub pattern: Regex,
    pub usage: String,
    pub category: String,
    pub description: String,
    pub action: ActionDescriptor,
}

impl CommandEntry {
    pub fn pattern_str(&self) -> &str {
        self.pattern.as_str()
    }
}

/// The winning entry for an input plus the text its pattern matched.
#[derive(Clone, Copy, Debug)]
pub struct CommandMatch<'a> {
    pub index: usize,
    pub entry: &'a CommandEntry,
    pub matched: &'a str,
}

#[derive(Default)]
pub struct CommandTableBuilder {
    categories: Vec<String>,
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
    entries: Vec<CommandEntry>,
}

impl CommandTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares help grouping order. When set, every entry must use one of
    /// these categories.
    pub fn categories(&mut self, categories: &[&str]) -> &mut Self {
        self.categories = categories.iter().map(|category| (*category).to_owned()).collect();
        self
    }

    pub fn handler<H>(&mut self, handler: H) -> Result<&mut Self, CommandTableError>
    where
        H: CommandHandler + 'static,
    {
        let name = handler.name().to_owned();
        if self.handlers.contains_key(&name) {
            return Err(CommandTableError::DuplicateHandler(name));
        }
        self.handlers.insert(name, Arc::new(handler));
        Ok(self)
    }

    pub fn register(
        &mut self,
        pattern: &str,
        usage: &str,
        category: &str,
        description: &str,
        action: ActionDescriptor,
    ) -> Result<&mut Self, CommandTableError> {
        if self.entries.iter().any(|entry| entry.pattern_str() == pattern) {
            return Err(CommandTableError::DuplicatePattern(pattern.to_owned()));
        }

        if !self.categories.is_empty() && !self.categories.iter().any(|known| known == category) {
            return Err(CommandTableError::UnknownCategory {
                pattern: pattern.to_owned(),
                category: category.to_owned(),
            });
        }

        if let ActionDescriptor::Invoke { handler, args } = &action {
            let Some(registered) = self.handlers.get(handler) else {
                return Err(CommandTableError::UnknownHandler {
                    pattern: pattern.to_owned(),
                    handler: handler.clone(),
                });
            };
            if registered.arity() != args.len() {
                return Err(CommandTableError::ArityMismatch {
                    pattern: pattern.to_owned(),
                    handler: handler.clone(),
                    expected: registered.arity(),
                    actual: args.len(),
                });
            }
        }

        let compiled = Regex::new(pattern).map_err(|error| CommandTableError::InvalidPattern {
            pattern: pattern.to_owned(),
            message: error.to_string(),
        })?;

        self.entries.push(CommandEntry {
            pattern: compiled,
            usage: usage.to_owned(),
            category: category.to_owned(),
            description: description.to_owned(),
            action,
        });
        Ok(self)
    }

    pub fn build(self) -> CommandTable {
        CommandTable {
            categories: self.categories,
            handlers: self.handlers,
            entries: self.entries,
            help_filled: false,
        }
    }
}

pub struct CommandTable {
    categories: Vec<String>,
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
    entries: Vec<CommandEntry>,
    help_filled: bool,
}

impl fmt::Debug for CommandTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandTable")
            .field("categories", &self.categories)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("entries", &self.entries)
            .field("help_filled", &self.help_filled)
            .finish()
    }
}

impl CommandTable {
    pub fn builder() -> CommandTableBuilder {
        CommandTableBuilder::new()
    }

    pub fn entries(&self) -> &[CommandEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Linear scan in registration order; the first matching entry wins.
    pub fn find<'a>(&'a self, text: &'a str) -> Option<CommandMatch<'a>> {
        self.entries.iter().enumerate().find_map(|(index, entry)| {
            entry.pattern.find(text).map(|found| CommandMatch {
                index,
                entry,
                matched: found.as_str(),
            })
        })
    }

    /// `Ok(None)` when nothing matches or the handler chose not to reply.
    pub async fn dispatch(
        &self,
        text: &str,
        ctx: &DispatchContext,
    ) -> Result<Option<Reply>, CommandRouteError> {
        let Some(found) = self.find(text) else {
            debug!(channel_id = %ctx.channel_id, "no command matched message");
            return Ok(None);
        };
        let pattern = found.entry.pattern_str();
        debug!(
            event_name = "router.command_matched",
            pattern = %pattern,
            channel_id = %ctx.channel_id,
            user_id = %ctx.user_id,
            "command matched"
        );

        match &found.entry.action {
            ActionDescriptor::Literal(text) => {
                Ok(Some(Reply::Text(text.replacen("{user}", &ctx.user_id, 1))))
            }
            ActionDescriptor::Blocks(template) => Ok(Some(Reply::Blocks(template.clone()))),
            ActionDescriptor::Invoke { handler, args } => {
                let callable = self.handlers.get(handler).ok_or_else(|| {
                    CommandRouteError::MissingHandler {
                        pattern: pattern.to_owned(),
                        handler: handler.clone(),
                    }
                })?;
                let resolved: Vec<String> =
                    args.iter().map(|source| source.resolve(text, found.matched, ctx)).collect();

                callable.call(&resolved).await.map_err(|source| CommandRouteError::Handler {
                    pattern: pattern.to_owned(),
                    source,
                })
            }
        }
    }

    /// One-time replacement of the help entry's action once the rest of the
    /// table exists.
    pub fn backfill_help(
        &mut self,
        pattern: &str,
        help: MessageTemplate,
    ) -> Result<(), CommandTableError> {
        if self.help_filled {
            return Err(CommandTableError::HelpAlreadyFilled);
        }
        let entry = self
            .entries
            .iter_mut()
            .find(|entry| entry.pattern_str() == pattern)
            .ok_or_else(|| CommandTableError::HelpNotRegistered(pattern.to_owned()))?;

        entry.action = ActionDescriptor::Blocks(help);
        self.help_filled = true;
        Ok(())
    }

    /// Entries grouped by declared category order; undeclared categories
    /// follow in first-seen order.
    pub fn help_sections(&self) -> Vec<HelpSection> {
        let mut order: Vec<String> = self.categories.clone();
        for entry in &self.entries {
            if !order.contains(&entry.category) {
                order.push(entry.category.clone());
            }
        }

        order
            .into_iter()
            .map(|category| HelpSection {
                commands: self
                    .entries
                    .iter()
                    .filter(|entry| entry.category == category)
                    .map(|entry| (entry.usage.clone(), entry.description.clone()))
                    .collect(),
                category,
            })
            .collect()
    }
}
