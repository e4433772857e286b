//! Plain HTTP collaborators: the linguistics service and image downloads.

use async_trait::async_trait;
use reqwest::Client;
use sasha_core::errors::IntegrationError;
use sasha_core::linguistics::{Linguistics, LookupKind, TranslationDirection};
use sasha_slack::delivery::ImageSource;

/// Talks to a lookup service exposing `GET {base}/{operation}?word=..`,
/// answering with the reply text as the body.
pub struct HttpLinguistics {
    client: Client,
    base_url: String,
}

impl HttpLinguistics {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into().trim_end_matches('/').to_owned() }
    }

    fn endpoint(&self, kind: LookupKind) -> String {
        format!("{}/{}", self.base_url, kind.operation())
    }

    async fn lookup(
        &self,
        kind: LookupKind,
        query: &[(&str, &str)],
    ) -> Result<String, IntegrationError> {
        let endpoint = self.endpoint(kind);
        let response = self
            .client
            .get(&endpoint)
            .query(query)
            .send()
            .await
            .map_err(|error| IntegrationError::transport(endpoint.as_str(), error))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IntegrationError::Status { endpoint, status: status.as_u16() });
        }
        let text = response
            .text()
            .await
            .map_err(|error| IntegrationError::decode(endpoint.as_str(), error))?;
        Ok(text.trim().to_owned())
    }
}

#[async_trait]
impl Linguistics for HttpLinguistics {
    async fn translate(
        &self,
        word: &str,
        direction: TranslationDirection,
    ) -> Result<String, IntegrationError> {
        self.lookup(LookupKind::Translation, &[("word", word), ("direction", direction.as_str())])
            .await
    }

    async fn examples(&self, word: &str) -> Result<String, IntegrationError> {
        self.lookup(LookupKind::Examples, &[("word", word)]).await
    }

    async fn lemma(&self, word: &str) -> Result<String, IntegrationError> {
        self.lookup(LookupKind::Lemma, &[("word", word)]).await
    }

    async fn etymology(&self, word: &str) -> Result<String, IntegrationError> {
        self.lookup(LookupKind::Etymology, &[("word", word)]).await
    }
}

pub struct HttpImageSource {
    client: Client,
}

impl HttpImageSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, IntegrationError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|error| IntegrationError::transport(url, error))?;
        let status = response.status();
        if !status.is_success() {
            return Err(IntegrationError::Status {
                endpoint: url.to_owned(),
                status: status.as_u16(),
            });
        }
        let bytes =
            response.bytes().await.map_err(|error| IntegrationError::decode(url, error))?;
        Ok(bytes.to_vec())
    }
}
