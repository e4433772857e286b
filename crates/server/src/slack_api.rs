//! Slack Web API client backing message delivery and the user directory.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client};
use sasha_core::config::AppConfig;
use sasha_core::directory::{UserDirectorySource, UserProfile};
use sasha_core::errors::IntegrationError;
use sasha_slack::commands::Reply;
use sasha_slack::delivery::MessageDelivery;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

const MEMBERS_PAGE_SIZE: &str = "200";

pub fn http_client(timeout_secs: u64) -> Result<Client, IntegrationError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("sasha/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|error| IntegrationError::transport("http client", error))
}

enum Payload<'a> {
    Json(&'a Value),
    Form(&'a [(&'a str, String)]),
}

pub struct SlackWebClient {
    client: Client,
    base_url: String,
    bot_token: SecretString,
    user_token: Option<SecretString>,
}

impl SlackWebClient {
    pub fn new(client: Client, config: &AppConfig) -> Self {
        Self {
            client,
            base_url: config.slack.api_base_url.clone(),
            bot_token: config.slack.bot_token.clone(),
            user_token: config.slack.user_token.clone(),
        }
    }

    /// Directory reads go out with the user token when one is configured.
    fn directory_token(&self) -> &SecretString {
        self.user_token.as_ref().unwrap_or(&self.bot_token)
    }

    async fn call(
        &self,
        method: &str,
        token: &SecretString,
        payload: Payload<'_>,
    ) -> Result<Value, IntegrationError> {
        match self.call_once(method, token, &payload).await {
            Err(error) if error.is_retryable() => {
                warn!(
                    event_name = "egress.slack.retry",
                    method = %method,
                    error = %error,
                    "retrying slack api call once"
                );
                self.call_once(method, token, &payload).await
            }
            other => other,
        }
    }

    async fn call_once(
        &self,
        method: &str,
        token: &SecretString,
        payload: &Payload<'_>,
    ) -> Result<Value, IntegrationError> {
        let url = format!("{}/{method}", self.base_url);
        let request = self.client.post(&url).bearer_auth(token.expose_secret());
        let request = match payload {
            Payload::Json(body) => request.json(body),
            Payload::Form(fields) => request.form(fields),
        };

        let response =
            request.send().await.map_err(|error| IntegrationError::transport(method, error))?;
        let status = response.status();
        if !status.is_success() {
            return Err(IntegrationError::Status {
                endpoint: method.to_owned(),
                status: status.as_u16(),
            });
        }

        let body: Value =
            response.json().await.map_err(|error| IntegrationError::decode(method, error))?;
        if body.get("ok").and_then(Value::as_bool) != Some(true) {
            let error = body.get("error").and_then(Value::as_str).unwrap_or("unknown_error");
            return Err(IntegrationError::Api {
                method: method.to_owned(),
                error: error.to_owned(),
            });
        }

        debug!(event_name = "egress.slack.api_call", method = %method, "slack api call succeeded");
        Ok(body)
    }

    async fn user_profile(&self, user_id: &str) -> Result<UserProfile, IntegrationError> {
        let fields = [("user", user_id.to_owned())];
        let body = self.call("users.info", self.directory_token(), Payload::Form(&fields)).await?;
        let user = body
            .get("user")
            .cloned()
            .ok_or_else(|| IntegrationError::decode("users.info", "missing `user` object"))?;
        let raw: RawUser = serde_json::from_value(user)
            .map_err(|error| IntegrationError::decode("users.info", error))?;
        Ok(raw.into())
    }
}

#[derive(Deserialize)]
struct RawUser {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    real_name: Option<String>,
    #[serde(default)]
    is_bot: bool,
    #[serde(default)]
    profile: RawProfile,
}

#[derive(Default, Deserialize)]
struct RawProfile {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    status_text: Option<String>,
}

impl From<RawUser> for UserProfile {
    fn from(raw: RawUser) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            real_name: raw.real_name,
            display_name: raw.profile.display_name,
            status_text: raw.profile.status_text,
            is_bot: raw.is_bot,
        }
    }
}

pub fn message_body(channel_id: &str, reply: &Reply) -> Value {
    match reply {
        Reply::Text(text) => json!({ "channel": channel_id, "text": text }),
        Reply::Blocks(template) => json!({
            "channel": channel_id,
            "text": template.fallback_text,
            "blocks": template.blocks,
        }),
    }
}

#[async_trait]
impl MessageDelivery for SlackWebClient {
    async fn post_message(&self, channel_id: &str, reply: &Reply) -> Result<(), IntegrationError> {
        let body = message_body(channel_id, reply);
        self.call("chat.postMessage", &self.bot_token, Payload::Json(&body)).await?;
        Ok(())
    }

    /// Three-step external upload: reserve an upload URL, send the bytes,
    /// then complete the upload into the channel.
    async fn upload_file(
        &self,
        channel_id: &str,
        bytes: Vec<u8>,
        filename: &str,
    ) -> Result<(), IntegrationError> {
        let reserve = [("filename", filename.to_owned()), ("length", bytes.len().to_string())];
        let reserved = self
            .call("files.getUploadURLExternal", &self.bot_token, Payload::Form(&reserve))
            .await?;
        let upload_url = reserved.get("upload_url").and_then(Value::as_str).ok_or_else(|| {
            IntegrationError::decode("files.getUploadURLExternal", "missing upload_url")
        })?;
        let file_id = reserved.get("file_id").and_then(Value::as_str).ok_or_else(|| {
            IntegrationError::decode("files.getUploadURLExternal", "missing file_id")
        })?;

        let form = multipart::Form::new()
            .part("file", multipart::Part::bytes(bytes).file_name(filename.to_owned()));
        let uploaded = self
            .client
            .post(upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|error| IntegrationError::transport("file upload", error))?;
        if !uploaded.status().is_success() {
            return Err(IntegrationError::Status {
                endpoint: "file upload".to_owned(),
                status: uploaded.status().as_u16(),
            });
        }

        let complete = json!({
            "files": [{ "id": file_id, "title": filename }],
            "channel_id": channel_id,
        });
        self.call("files.completeUploadExternal", &self.bot_token, Payload::Json(&complete))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl UserDirectorySource for SlackWebClient {
    async fn channel_members(
        &self,
        channel_id: &str,
    ) -> Result<Vec<UserProfile>, IntegrationError> {
        let mut member_ids = Vec::new();
        let mut cursor = String::new();
        loop {
            let mut fields =
                vec![("channel", channel_id.to_owned()), ("limit", MEMBERS_PAGE_SIZE.to_owned())];
            if !cursor.is_empty() {
                fields.push(("cursor", cursor.clone()));
            }
            let page = self
                .call("conversations.members", self.directory_token(), Payload::Form(&fields))
                .await?;

            if let Some(members) = page.get("members").and_then(Value::as_array) {
                member_ids.extend(members.iter().filter_map(Value::as_str).map(str::to_owned));
            }
            cursor = page
                .pointer("/response_metadata/next_cursor")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned();
            if cursor.is_empty() {
                break;
            }
        }

        let mut profiles = Vec::with_capacity(member_ids.len());
        for user_id in member_ids {
            profiles.push(self.user_profile(&user_id).await?);
        }
        Ok(profiles)
    }
}

#[cfg(test)]
mod tests {
    use sasha_core::directory::UserProfile;
    use sasha_slack::blocks::MessageBuilder;
    use sasha_slack::commands::Reply;
    use serde_json::json;

    use super::{message_body, RawUser};

    #[test]
    fn text_replies_post_plain_text() {
        let body = message_body("C1", &Reply::Text("woof".to_owned()));
        assert_eq!(body, json!({ "channel": "C1", "text": "woof" }));
    }

    #[test]
    fn block_replies_carry_fallback_text_and_blocks() {
        let template = MessageBuilder::new("fallback")
            .context("demo.v1", |context| {
                context.mrkdwn("hello");
            })
            .build();
        let body = message_body("C1", &Reply::Blocks(template));

        assert_eq!(body["text"], "fallback");
        assert_eq!(body["blocks"][0]["type"], "context");
        assert_eq!(body["blocks"][0]["elements"][0]["type"], "mrkdwn");
    }

    #[test]
    fn users_info_payload_maps_to_profile() {
        let raw: RawUser = serde_json::from_value(json!({
            "id": "U1",
            "name": "kaarel",
            "real_name": "Kaarel K",
            "is_bot": false,
            "profile": { "display_name": "kk", "status_text": "wfh" }
        }))
        .expect("decode");
        let profile = UserProfile::from(raw);

        assert_eq!(profile.preferred_name(), "kk");
        assert_eq!(profile.status_text.as_deref(), Some("wfh"));
    }
}
