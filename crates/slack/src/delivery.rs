//! Outbound seams: posting replies, uploading files, fetching images.

use std::sync::Mutex;

use async_trait::async_trait;
use sasha_core::errors::IntegrationError;

use crate::commands::Reply;

#[async_trait]
pub trait MessageDelivery: Send + Sync {
    async fn post_message(&self, channel_id: &str, reply: &Reply) -> Result<(), IntegrationError>;

    async fn upload_file(
        &self,
        channel_id: &str,
        bytes: Vec<u8>,
        filename: &str,
    ) -> Result<(), IntegrationError>;
}

#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, IntegrationError>;

    /// Body of a text endpoint, trimmed.
    async fn fetch_text(&self, url: &str) -> Result<String, IntegrationError> {
        let bytes = self.fetch_bytes(url).await?;
        String::from_utf8(bytes)
            .map(|text| text.trim().to_owned())
            .map_err(|error| IntegrationError::decode(url, error.to_string()))
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopDelivery;

#[async_trait]
impl MessageDelivery for NoopDelivery {
    async fn post_message(
        &self,
        _channel_id: &str,
        _reply: &Reply,
    ) -> Result<(), IntegrationError> {
        Ok(())
    }

    async fn upload_file(
        &self,
        _channel_id: &str,
        _bytes: Vec<u8>,
        _filename: &str,
    ) -> Result<(), IntegrationError> {
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delivered {
    Message { channel_id: String, reply: Reply },
    File { channel_id: String, filename: String, size: usize },
}

/// Keeps every outbound call in memory. Used for offline dispatch and tests.
#[derive(Debug, Default)]
pub struct RecordingDelivery {
    delivered: Mutex<Vec<Delivered>>,
}

impl RecordingDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> Vec<Delivered> {
        self.delivered.lock().map(|delivered| delivered.clone()).unwrap_or_default()
    }

    fn record(&self, item: Delivered) {
        if let Ok(mut delivered) = self.delivered.lock() {
            delivered.push(item);
        }
    }
}

#[async_trait]
impl MessageDelivery for RecordingDelivery {
    async fn post_message(&self, channel_id: &str, reply: &Reply) -> Result<(), IntegrationError> {
        self.record(Delivered::Message { channel_id: channel_id.to_owned(), reply: reply.clone() });
        Ok(())
    }

    async fn upload_file(
        &self,
        channel_id: &str,
        bytes: Vec<u8>,
        filename: &str,
    ) -> Result<(), IntegrationError> {
        self.record(Delivered::File {
            channel_id: channel_id.to_owned(),
            filename: filename.to_owned(),
            size: bytes.len(),
        });
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct UnavailableImageSource;

#[async_trait]
impl ImageSource for UnavailableImageSource {
    async fn fetch_bytes(&self, _url: &str) -> Result<Vec<u8>, IntegrationError> {
        Err(IntegrationError::NotConfigured("image source".to_owned()))
    }
}
