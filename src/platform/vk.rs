//! VK community bot over the Bots Long Poll API.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::{respond, AdapterError, ChatAdapter};
use crate::{
    config::VkConfig,
    controller::{QuizController, Reply},
    keyboard::vk_quiz_keyboard,
};

const API_URL: &str = "https://api.vk.com/method";
const API_VERSION: &str = "5.199";
const LONG_POLL_WAIT_SECS: u64 = 25;
const RETRY_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Error)]
pub enum VkError {
    #[error("VK request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("VK API error {code}: {message}")]
    Api { code: i64, message: String },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiResponse<T> {
    Success { response: T },
    Failure { error: ApiErrorBody },
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error_code: i64,
    error_msg: String,
}

#[derive(Debug, Clone, Deserialize)]
struct LongPollServer {
    key: String,
    server: String,
    #[serde(deserialize_with = "ts_string")]
    ts: String,
}

impl LongPollServer {
    /// Applies a freshly requested server after a `failed` poll. An expired
    /// key (`2`) keeps the current `ts` so no events are skipped; lost
    /// history (`3`) starts over from the fresh `ts`.
    fn resume(&mut self, fresh: LongPollServer, failed: u8) {
        if failed == 2 {
            self.key = fresh.key;
            self.server = fresh.server;
        } else {
            *self = fresh;
        }
    }
}

#[derive(Debug, Deserialize)]
struct PollResponse {
    #[serde(default, deserialize_with = "optional_ts_string")]
    ts: Option<String>,
    #[serde(default)]
    updates: Vec<Event>,
    failed: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct Event {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct NewMessage {
    message: IncomingMessage,
}

#[derive(Debug, Deserialize)]
struct IncomingMessage {
    from_id: i64,
    peer_id: i64,
    #[serde(default)]
    text: String,
}

// `ts` comes back as a string or a number depending on the endpoint.
fn ts_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(ts) => ts,
        other => other.to_string(),
    })
}

fn optional_ts_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    ts_string(deserializer).map(Some)
}

#[derive(Clone)]
pub struct VkClient {
    http: reqwest::Client,
    token: String,
    group_id: u64,
}

impl VkClient {
    pub fn new(token: String, group_id: u64) -> Result<Self, VkError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(LONG_POLL_WAIT_SECS + 10))
            .build()?;
        Ok(Self {
            http,
            token,
            group_id,
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<T, VkError> {
        let mut form: Vec<(&str, String)> = params.to_vec();
        form.push(("access_token", self.token.clone()));
        form.push(("v", API_VERSION.to_owned()));

        let response: ApiResponse<T> = self
            .http
            .post(format!("{API_URL}/{method}"))
            .form(&form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match response {
            ApiResponse::Success { response } => Ok(response),
            ApiResponse::Failure { error } => Err(VkError::Api {
                code: error.error_code,
                message: error.error_msg,
            }),
        }
    }

    async fn long_poll_server(&self) -> Result<LongPollServer, VkError> {
        self.call(
            "groups.getLongPollServer",
            &[("group_id", self.group_id.to_string())],
        )
        .await
    }

    async fn poll(&self, server: &LongPollServer) -> Result<PollResponse, VkError> {
        let wait = LONG_POLL_WAIT_SECS.to_string();
        let response = self
            .http
            .get(&server.server)
            .query(&[
                ("act", "a_check"),
                ("key", server.key.as_str()),
                ("ts", server.ts.as_str()),
                ("wait", wait.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response)
    }

    pub async fn send_message(
        &self,
        user_id: i64,
        text: &str,
        keyboard: &str,
    ) -> Result<(), VkError> {
        let _: serde_json::Value = self
            .call(
                "messages.send",
                &[
                    ("user_id", user_id.to_string()),
                    ("message", text.to_owned()),
                    ("random_id", rand::random::<i32>().to_string()),
                    ("keyboard", keyboard.to_owned()),
                ],
            )
            .await?;
        Ok(())
    }

    async fn reconnect(&self) -> LongPollServer {
        loop {
            match self.long_poll_server().await {
                Ok(server) => return server,
                Err(e) => {
                    warn!("Failed to get a VK long poll server: {e}");
                    sleep(RETRY_DELAY).await;
                }
            }
        }
    }
}

pub struct VkAdapter {
    client: VkClient,
    keyboard: String,
}

impl VkAdapter {
    pub fn new(client: VkClient) -> Self {
        Self {
            client,
            keyboard: vk_quiz_keyboard(),
        }
    }
}

#[async_trait]
impl ChatAdapter for VkAdapter {
    const PLATFORM: &'static str = "vk";
    type UserId = i64;

    // VK users rarely send an explicit start, so the keyboard goes with every reply.
    async fn send_reply(&self, user_id: i64, reply: &Reply) -> Result<(), AdapterError> {
        self.client
            .send_message(user_id, &reply.text, &self.keyboard)
            .await?;
        Ok(())
    }
}

/// Picks the private text message out of a long poll event, if there is one.
fn private_text(event: Event) -> Option<(i64, String)> {
    if event.kind != "message_new" {
        debug!("Skipping VK event '{}'", event.kind);
        return None;
    }

    let message = match serde_json::from_value::<NewMessage>(event.object) {
        Ok(new_message) => new_message.message,
        Err(e) => {
            warn!("Malformed VK message_new event: {e}");
            return None;
        }
    };

    let text = message.text.trim();
    if message.peer_id != message.from_id || text.is_empty() {
        return None;
    }

    Some((message.from_id, text.to_owned()))
}

fn dispatch_event(adapter: &Arc<VkAdapter>, quiz: &Arc<QuizController>, event: Event) {
    let Some((user_id, text)) = private_text(event) else {
        return;
    };

    let adapter = Arc::clone(adapter);
    let quiz = Arc::clone(quiz);
    let span = info_span!("vk_message", event_id = %Uuid::new_v4(), user_id);
    tokio::spawn(
        async move {
            let intent = adapter.map_intent(&text);
            if let Err(e) = respond(adapter.as_ref(), &quiz, user_id, intent).await {
                error!("Failed to reply to {user_id}: {e}");
            }
        }
        .instrument(span),
    );
}

/// Polls VK forever, handling each message on its own task.
pub async fn run(config: VkConfig, quiz: Arc<QuizController>) -> Result<(), AdapterError> {
    let client = VkClient::new(config.token, config.group_id)?;
    let mut server = client.long_poll_server().await?;
    let adapter = Arc::new(VkAdapter::new(client));
    info!("Starting VK bot for group {}...", config.group_id);

    loop {
        let response = match adapter.client.poll(&server).await {
            Ok(response) => response,
            Err(e) => {
                warn!("VK long poll request failed: {e}");
                sleep(RETRY_DELAY).await;
                continue;
            }
        };

        match response.failed {
            None | Some(1) => {
                if let Some(ts) = response.ts {
                    server.ts = ts;
                }
            }
            Some(code) => {
                debug!("VK long poll session expired (failed={code}), reconnecting");
                let fresh = adapter.client.reconnect().await;
                server.resume(fresh, code);
                continue;
            }
        }

        for event in response.updates {
            dispatch_event(&adapter, &quiz, event);
        }
    }
}
