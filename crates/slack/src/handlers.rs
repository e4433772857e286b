//! Sasha's invokable command handlers.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use rand::Rng;
use sasha_core::errors::IntegrationError;
use sasha_core::linguistics::{lookup_subject, Linguistics, LookupKind, TranslationDirection};
use sasha_core::wfh::WfhEpoch;
use tracing::{info, warn};

use crate::blocks::wfh_epoch_message;
use crate::commands::{CommandHandler, HandlerError, Reply};
use crate::delivery::{ImageSource, MessageDelivery};

pub const MAX_GIGGLE_CYCLES: usize = 500;
pub const INSPIRATION_FILENAME: &str = "inspirational.jpg";

fn check_arity<'a>(
    handler: &str,
    expected: usize,
    args: &'a [String],
) -> Result<&'a [String], HandlerError> {
    if args.len() == expected {
        Ok(args)
    } else {
        Err(HandlerError::Arity { handler: handler.to_owned(), expected, actual: args.len() })
    }
}

pub fn giggle_with(cycles: usize) -> String {
    format!("ti{}!", "hi".repeat(cycles))
}

pub fn server_time_at(now: NaiveDateTime) -> String {
    format!("The server time is `{}`", now.format("%F %T"))
}

#[derive(Clone, Copy, Debug, Default)]
pub struct GiggleHandler;

#[async_trait]
impl CommandHandler for GiggleHandler {
    fn name(&self) -> &'static str {
        "giggle"
    }

    fn arity(&self) -> usize {
        0
    }

    async fn call(&self, args: &[String]) -> Result<Option<Reply>, HandlerError> {
        check_arity(self.name(), self.arity(), args)?;
        let cycles = rand::thread_rng().gen_range(1..=MAX_GIGGLE_CYCLES);
        Ok(Some(Reply::Text(giggle_with(cycles))))
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TimeHandler;

#[async_trait]
impl CommandHandler for TimeHandler {
    fn name(&self) -> &'static str {
        "get_time"
    }

    fn arity(&self) -> usize {
        0
    }

    async fn call(&self, args: &[String]) -> Result<Option<Reply>, HandlerError> {
        check_arity(self.name(), self.arity(), args)?;
        Ok(Some(Reply::Text(server_time_at(Local::now().naive_local()))))
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct WfhEpochHandler;

#[async_trait]
impl CommandHandler for WfhEpochHandler {
    fn name(&self) -> &'static str {
        "wfh_epoch"
    }

    fn arity(&self) -> usize {
        0
    }

    async fn call(&self, args: &[String]) -> Result<Option<Reply>, HandlerError> {
        check_arity(self.name(), self.arity(), args)?;
        Ok(Some(Reply::Blocks(wfh_epoch_message(&WfhEpoch::now()))))
    }
}

/// Asks the generator for an image URL, downloads it and uploads it to the
/// channel. Never replies with text; failures are only logged.
pub struct InspirationalHandler {
    generator_url: String,
    images: Arc<dyn ImageSource>,
    delivery: Arc<dyn MessageDelivery>,
}

impl InspirationalHandler {
    pub fn new(
        generator_url: impl Into<String>,
        images: Arc<dyn ImageSource>,
        delivery: Arc<dyn MessageDelivery>,
    ) -> Self {
        Self { generator_url: generator_url.into(), images, delivery }
    }

    async fn fetch_and_upload(&self, channel_id: &str) -> Result<usize, IntegrationError> {
        let image_url = self.images.fetch_text(&self.generator_url).await?;
        let bytes = self.images.fetch_bytes(&image_url).await?;
        let size = bytes.len();
        self.delivery.upload_file(channel_id, bytes, INSPIRATION_FILENAME).await?;
        Ok(size)
    }
}

#[async_trait]
impl CommandHandler for InspirationalHandler {
    fn name(&self) -> &'static str {
        "inspirational"
    }

    fn arity(&self) -> usize {
        1
    }

    async fn call(&self, args: &[String]) -> Result<Option<Reply>, HandlerError> {
        let args = check_arity(self.name(), self.arity(), args)?;
        let channel_id = &args[0];

        match self.fetch_and_upload(channel_id).await {
            Ok(size) => info!(
                event_name = "handler.inspirational.uploaded",
                channel_id = %channel_id,
                bytes = size,
                "uploaded inspirational image"
            ),
            Err(error) => warn!(
                event_name = "handler.inspirational.failed",
                channel_id = %channel_id,
                error = %error,
                "inspirational image unavailable"
            ),
        }
        Ok(None)
    }
}

/// One handler per linguistics operation, all shaped `(message, match_pattern)`.
pub struct LookupHandler {
    kind: LookupKind,
    linguistics: Arc<dyn Linguistics>,
}

impl LookupHandler {
    pub fn new(kind: LookupKind, linguistics: Arc<dyn Linguistics>) -> Self {
        Self { kind, linguistics }
    }

    fn usage_hint(&self) -> String {
        format!("Usage: `{}`", self.kind.usage())
    }
}

#[async_trait]
impl CommandHandler for LookupHandler {
    fn name(&self) -> &'static str {
        self.kind.operation()
    }

    fn arity(&self) -> usize {
        2
    }

    async fn call(&self, args: &[String]) -> Result<Option<Reply>, HandlerError> {
        let args = check_arity(self.name(), self.arity(), args)?;
        let (message, matched) = (&args[0], &args[1]);

        let Some(word) = lookup_subject(message, matched) else {
            return Ok(Some(Reply::Text(self.usage_hint())));
        };

        let result = match self.kind {
            LookupKind::Translation => {
                let Some(direction) = TranslationDirection::from_prefix(matched) else {
                    return Ok(Some(Reply::Text(self.usage_hint())));
                };
                self.linguistics.translate(word, direction).await
            }
            LookupKind::Examples => self.linguistics.examples(word).await,
            LookupKind::Lemma => self.linguistics.lemma(word).await,
            LookupKind::Etymology => self.linguistics.etymology(word).await,
        };

        let text = result.unwrap_or_else(|error| {
            warn!(
                event_name = "handler.lookup.failed",
                operation = self.kind.operation(),
                word = %word,
                error = %error,
                "linguistics lookup failed"
            );
            error.user_message().to_owned()
        });
        Ok(Some(Reply::Text(text)))
    }
}
