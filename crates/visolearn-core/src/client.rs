//! Remote endpoint client shim for the hosted VisoLearn Space.
//!
//! Translates local calls into the Space's nine named operations, decodes
//! every response into typed values at this boundary, and classifies failures
//! into the [`ClientError`] taxonomy. No operation retries automatically:
//! the remote session is stateful, so each user action gets at most one
//! remote attempt.

use crate::config::GatewayConfig;
use crate::error::{ClientError, ClientResult};
use crate::session::{ConversationState, ImageData, Role, SessionConfig};
use serde_json::{json, Value};
use std::time::Duration;

const RUNTIME_POLL_INTERVAL: Duration = Duration::from_secs(5);

const ENDPOINT_GENERATE: &str = "generate_image_and_reset_chat";
const ENDPOINT_CHAT: &str = "chat_respond";
const ENDPOINT_SAVE_LOG: &str = "save_session_log";
const ENDPOINT_SAVE_IMAGES: &str = "save_all_session_images";
const ENDPOINT_CHECKLIST: &str = "update_checklist_html";
const ENDPOINT_PROGRESS: &str = "update_progress_html";
const ENDPOINT_ATTEMPTS: &str = "update_attempt_counter";
const ENDPOINT_SESSIONS: &str = "update_sessions";
const ENDPOINT_DIFFICULTY: &str = "update_difficulty_label";

/// Result of one chat round-trip, decoded at the boundary.
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub reply: String,
    pub conversation: ConversationState,
    pub detail_count: u32,
    pub image: Option<ImageData>,
}

/// Handle to one fixed remote Space. Created once per session; replaced only
/// when the credential changes and the replacement initialized successfully.
pub struct SpaceClient {
    http: reqwest::Client,
    token: String,
    space_id: String,
    space_url: String,
    runtime_endpoint: String,
    wake_endpoint: String,
    disable_queue: bool,
    validate_wait: Duration,
}

impl SpaceClient {
    /// Build a handle and verify the Space is reachable with this credential.
    ///
    /// The credential is shape-checked before any network call; a sleeping
    /// Space gets one wake request (completion of the wake is [`validate`]'s
    /// job). Initialization either succeeds fully or returns an error and no
    /// handle.
    ///
    /// [`validate`]: SpaceClient::validate
    pub async fn initialize(
        credential: &str,
        config: &GatewayConfig,
        disable_queue: bool,
    ) -> ClientResult<Self> {
        let token = check_credential_shape(credential)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ClientError::Connection(format!("HTTP client build failed: {e}")))?;

        let client = Self {
            http,
            token,
            space_id: config.space_id.clone(),
            space_url: config.space_url(),
            runtime_endpoint: config.runtime_endpoint(),
            wake_endpoint: config.wake_endpoint(),
            disable_queue,
            validate_wait: Duration::from_secs(config.validate_wait_secs),
        };

        match client.runtime_stage().await?.as_str() {
            "RUNNING" | "RUNNING_BUILDING" => Ok(client),
            "SLEEPING" => {
                tracing::info!(target: "visolearn::client", space = %client.space_id, "space is sleeping, sending wake request");
                client.wake().await?;
                Ok(client)
            }
            other => Err(ClientError::Connection(format!(
                "space {} is not running (stage: {other})",
                client.space_id
            ))),
        }
    }

    /// Wake a dormant Space and wait, bounded, until it reports RUNNING.
    /// Returns `false` on timeout or any transport problem (never an error),
    /// so the caller can simply retry.
    pub async fn validate(&self) -> bool {
        let deadline = tokio::time::Instant::now() + self.validate_wait;
        loop {
            match self.runtime_stage().await {
                Ok(stage) if stage == "RUNNING" => return true,
                Ok(stage) => {
                    if stage == "SLEEPING" {
                        if let Err(err) = self.wake().await {
                            tracing::warn!(target: "visolearn::client", %err, "wake request failed during validate");
                        }
                    }
                    tracing::debug!(target: "visolearn::client", %stage, "space not ready yet");
                }
                Err(err) => {
                    tracing::warn!(target: "visolearn::client", %err, "runtime probe failed during validate");
                }
            }
            if tokio::time::Instant::now() + RUNTIME_POLL_INTERVAL > deadline {
                return false;
            }
            tokio::time::sleep(RUNTIME_POLL_INTERVAL).await;
        }
    }

    /// Generate a new image for the given settings. The conversation state
    /// that comes back is always reset to empty with a zero detail count.
    pub async fn generate_image_and_reset_chat(
        &self,
        config: &SessionConfig,
    ) -> ClientResult<(ImageData, ConversationState)> {
        let data = vec![
            json!(config.age),
            json!(config.autism_level),
            json!(config.topic_focus),
            json!(config.treatment_plan),
            json!(config.attempt_limit),
            json!(config.details_threshold),
            json!(config.image_style),
        ];
        let out = self.predict(ENDPOINT_GENERATE, data).await?;
        let image = parse_image_value(out.first()).ok_or_else(|| {
            ClientError::RemoteCall(format!("{ENDPOINT_GENERATE} returned no image payload"))
        })?;
        Ok((image, ConversationState::reset()))
    }

    /// One chat round: returns the teacher reply, the updated conversation
    /// (both turns appended), the monotone detail count, and a replacement
    /// image when the remote sent one.
    pub async fn chat_respond(
        &self,
        state: &ConversationState,
        user_message: &str,
    ) -> ClientResult<ChatReply> {
        let out = self.predict(ENDPOINT_CHAT, vec![json!(user_message)]).await?;
        parse_chat_reply(&out, state, user_message)
    }

    /// Remote session-log export. Returns the remote-side log text.
    pub async fn save_session_log(&self) -> ClientResult<String> {
        let out = self.predict(ENDPOINT_SAVE_LOG, Vec::new()).await?;
        first_string(&out)
            .ok_or_else(|| ClientError::RemoteCall(format!("{ENDPOINT_SAVE_LOG} returned no text")))
    }

    /// Remote export of every image of the current session.
    pub async fn save_all_session_images(&self) -> ClientResult<Vec<ImageData>> {
        let out = self.predict(ENDPOINT_SAVE_IMAGES, Vec::new()).await?;
        let images: Vec<ImageData> = out.iter().filter_map(|v| parse_image_value(Some(v))).collect();
        if images.is_empty() {
            return Err(ClientError::RemoteCall(format!(
                "{ENDPOINT_SAVE_IMAGES} returned no images"
            )));
        }
        Ok(images)
    }

    /// Current checklist fragment. Read-only and idempotent.
    pub async fn update_checklist_html(&self) -> ClientResult<String> {
        self.fragment(ENDPOINT_CHECKLIST).await
    }

    /// Current progress fragment. Read-only and idempotent.
    pub async fn update_progress_html(&self) -> ClientResult<String> {
        self.fragment(ENDPOINT_PROGRESS).await
    }

    /// Current attempt-counter fragment. Read-only and idempotent.
    pub async fn update_attempt_counter(&self) -> ClientResult<String> {
        self.fragment(ENDPOINT_ATTEMPTS).await
    }

    /// Current difficulty label. Read-only and idempotent.
    pub async fn update_difficulty_label(&self) -> ClientResult<String> {
        self.fragment(ENDPOINT_DIFFICULTY).await
    }

    /// Session data as the remote reports it. Opaque payload, surfaced
    /// unchanged.
    pub async fn update_sessions(&self) -> ClientResult<Value> {
        let out = self.predict(ENDPOINT_SESSIONS, Vec::new()).await?;
        Ok(out.into_iter().next().unwrap_or(Value::Null))
    }

    async fn fragment(&self, endpoint: &str) -> ClientResult<String> {
        let out = self.predict(endpoint, Vec::new()).await?;
        first_string(&out)
            .ok_or_else(|| ClientError::RemoteCall(format!("{endpoint} returned no fragment")))
    }

    async fn runtime_stage(&self) -> ClientResult<String> {
        let res = self
            .http
            .get(&self.runtime_endpoint)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ClientError::Connection(format!("runtime probe failed: {e}")))?;
        let status = res.status().as_u16();
        let body = res
            .text()
            .await
            .map_err(|e| ClientError::Connection(format!("runtime probe read failed: {e}")))?;
        decode_runtime(status, &body)
    }

    async fn wake(&self) -> ClientResult<()> {
        let res = self
            .http
            .post(&self.wake_endpoint)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ClientError::Connection(format!("wake request failed: {e}")))?;
        if res.status().is_success() {
            Ok(())
        } else {
            Err(ClientError::Connection(format!(
                "wake request rejected ({})",
                res.status()
            )))
        }
    }

    /// One named endpoint invocation: `POST {space}/run/{endpoint}` with a
    /// JSON data envelope. The queue-disable flag is forwarded unchanged.
    async fn predict(&self, endpoint: &str, data: Vec<Value>) -> ClientResult<Vec<Value>> {
        let mut url = format!("{}/run/{endpoint}", self.space_url);
        if self.disable_queue {
            url.push_str("?queue=false");
        }
        let res = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&json!({ "data": data }))
            .send()
            .await
            .map_err(|e| ClientError::RemoteCall(format!("{endpoint} request failed: {e}")))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ClientError::RemoteCall(format!(
                "{endpoint} returned {status}: {body}"
            )));
        }
        let body = res
            .text()
            .await
            .map_err(|e| ClientError::RemoteCall(format!("{endpoint} read failed: {e}")))?;
        decode_predict(endpoint, &body)
    }
}

/// Shape-check the credential without touching the network. Empty,
/// whitespace-only, or interior-whitespace tokens can never authenticate;
/// reject them before building a handle.
fn check_credential_shape(credential: &str) -> ClientResult<String> {
    let token = credential.trim();
    if token.is_empty() {
        return Err(ClientError::Auth(
            "Hugging Face token is required. Add HF_TOKEN to your .env file or enter it in the application.".to_string(),
        ));
    }
    if token.chars().any(char::is_whitespace) {
        return Err(ClientError::Auth(
            "Hugging Face token must not contain whitespace. Check for copy/paste artifacts.".to_string(),
        ));
    }
    Ok(token.to_string())
}

/// Classify a runtime-status response. Pure so the classification is
/// unit-testable without a network.
fn decode_runtime(status: u16, body: &str) -> ClientResult<String> {
    match status {
        401 => {
            return Err(ClientError::Auth(
                "Invalid or unauthorized token. Check your Hugging Face token.".to_string(),
            ))
        }
        403 => {
            return Err(ClientError::Auth(
                "This token has no permission to access the private space.".to_string(),
            ))
        }
        404 => {
            return Err(ClientError::Auth(
                "Space not found or not visible to this token.".to_string(),
            ))
        }
        s if !(200..300).contains(&s) => {
            return Err(ClientError::Connection(format!(
                "runtime status request failed with HTTP {s}"
            )))
        }
        _ => {}
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(ClientError::Protocol("empty runtime response body".to_string()));
    }
    let value: Value = serde_json::from_str(trimmed).map_err(|_| {
        ClientError::Protocol(format!(
            "runtime response is not valid JSON (first byte: {:?})",
            trimmed.as_bytes().first().copied().map(char::from)
        ))
    })?;
    value
        .get("stage")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ClientError::Protocol("runtime payload has no stage field".to_string()))
}

/// Decode a predict response into its data array. Operation failures are
/// `RemoteCall` (the caller falls back), unlike initialization where the
/// same malformed shapes are `Protocol`.
fn decode_predict(endpoint: &str, body: &str) -> ClientResult<Vec<Value>> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(ClientError::RemoteCall(format!("{endpoint} returned an empty body")));
    }
    let value: Value = serde_json::from_str(trimmed).map_err(|e| {
        ClientError::RemoteCall(format!("{endpoint} returned invalid JSON: {e}"))
    })?;
    match value.get("data").and_then(Value::as_array) {
        Some(data) => Ok(data.clone()),
        None => Err(ClientError::RemoteCall(format!(
            "{endpoint} payload has no data array"
        ))),
    }
}

/// Pull an image payload out of one data value: either an object with a
/// `url` field or a bare URL string.
fn parse_image_value(value: Option<&Value>) -> Option<ImageData> {
    match value? {
        Value::String(url) if !url.trim().is_empty() => Some(ImageData {
            url: url.trim().to_string(),
            mime_type: None,
            size: None,
        }),
        Value::Object(map) => {
            let url = map.get("url").and_then(Value::as_str)?.trim().to_string();
            if url.is_empty() {
                return None;
            }
            Some(ImageData {
                url,
                mime_type: map.get("mime_type").and_then(Value::as_str).map(str::to_string),
                size: map.get("size").and_then(Value::as_u64),
            })
        }
        _ => None,
    }
}

/// Decode one chat round. The reply text is required; the rest of the data
/// array is scanned for the remote's identified-details total (first
/// non-negative integer) and a replacement image (first value with a url).
/// The updated conversation is the caller's state with both turns appended;
/// the detail count never goes below what the caller already had.
fn parse_chat_reply(
    data: &[Value],
    state: &ConversationState,
    user_message: &str,
) -> ClientResult<ChatReply> {
    let reply = first_string(data)
        .ok_or_else(|| ClientError::RemoteCall(format!("{ENDPOINT_CHAT} returned no reply text")))?;

    let remote_total = data
        .iter()
        .skip(1)
        .find_map(Value::as_u64)
        .map(|n| n.min(u32::MAX as u64) as u32);
    let image = data.iter().skip(1).find_map(|v| parse_image_value(Some(v)));

    let mut conversation = state.clone();
    conversation.push(Role::Child, user_message);
    conversation.push(Role::Teacher, reply.clone());
    if let Some(total) = remote_total {
        conversation.record_total_identified(total);
    }

    Ok(ChatReply {
        reply,
        detail_count: conversation.identified_details,
        conversation,
        image,
    })
}

fn first_string(data: &[Value]) -> Option<String> {
    data.first().and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_credential_is_an_auth_error() {
        assert!(matches!(check_credential_shape(""), Err(ClientError::Auth(_))));
        assert!(matches!(check_credential_shape("   "), Err(ClientError::Auth(_))));
    }

    #[test]
    fn interior_whitespace_is_an_auth_error() {
        assert!(matches!(
            check_credential_shape("hf_abc def"),
            Err(ClientError::Auth(_))
        ));
    }

    #[test]
    fn surrounding_whitespace_is_trimmed_away() {
        assert_eq!(check_credential_shape("  hf_abcdef  ").unwrap(), "hf_abcdef");
    }

    #[test]
    fn unauthorized_statuses_classify_as_auth() {
        assert!(matches!(decode_runtime(401, ""), Err(ClientError::Auth(_))));
        assert!(matches!(decode_runtime(403, ""), Err(ClientError::Auth(_))));
        assert!(matches!(decode_runtime(404, ""), Err(ClientError::Auth(_))));
    }

    #[test]
    fn server_errors_classify_as_connection() {
        assert!(matches!(decode_runtime(500, ""), Err(ClientError::Connection(_))));
        assert!(matches!(decode_runtime(503, "busy"), Err(ClientError::Connection(_))));
    }

    #[test]
    fn empty_runtime_body_is_a_protocol_error_not_success() {
        assert!(matches!(decode_runtime(200, ""), Err(ClientError::Protocol(_))));
        assert!(matches!(decode_runtime(200, "   "), Err(ClientError::Protocol(_))));
    }

    #[test]
    fn malformed_first_byte_is_a_protocol_error() {
        let err = decode_runtime(200, "<html>sleeping</html>").unwrap_err();
        match err {
            ClientError::Protocol(msg) => assert!(msg.contains("'<'")),
            other => panic!("expected Protocol, got {other:?}"),
        }
    }

    #[test]
    fn missing_stage_is_a_protocol_error() {
        assert!(matches!(
            decode_runtime(200, r#"{"hardware": "cpu"}"#),
            Err(ClientError::Protocol(_))
        ));
    }

    #[test]
    fn running_stage_decodes() {
        assert_eq!(decode_runtime(200, r#"{"stage": "RUNNING"}"#).unwrap(), "RUNNING");
    }

    #[test]
    fn predict_decode_requires_a_data_array() {
        assert!(matches!(decode_predict("x", ""), Err(ClientError::RemoteCall(_))));
        assert!(matches!(decode_predict("x", "garbage"), Err(ClientError::RemoteCall(_))));
        assert!(matches!(
            decode_predict("x", r#"{"result": 1}"#),
            Err(ClientError::RemoteCall(_))
        ));
        let data = decode_predict("x", r#"{"data": ["ok", 2]}"#).unwrap();
        assert_eq!(data.len(), 2);
    }

    #[test]
    fn image_values_decode_from_string_or_object() {
        let from_str = parse_image_value(Some(&json!("https://example.com/a.png"))).unwrap();
        assert_eq!(from_str.url, "https://example.com/a.png");

        let from_obj = parse_image_value(Some(&json!({
            "url": "data:image/png;base64,AAAA",
            "mime_type": "image/png",
            "size": 4
        })))
        .unwrap();
        assert_eq!(from_obj.mime_type.as_deref(), Some("image/png"));
        assert_eq!(from_obj.size, Some(4));

        assert!(parse_image_value(Some(&json!({ "path": "/tmp/a" }))).is_none());
        assert!(parse_image_value(Some(&json!(42))).is_none());
        assert!(parse_image_value(None).is_none());
    }

    #[test]
    fn chat_reply_appends_both_turns() {
        let state = ConversationState::reset();
        let data = vec![json!("What a lovely dog!"), json!(2)];
        let reply = parse_chat_reply(&data, &state, "I see a dog").unwrap();
        assert_eq!(reply.reply, "What a lovely dog!");
        assert_eq!(reply.conversation.turns.len(), 2);
        assert_eq!(reply.conversation.turns[0].role, Role::Child);
        assert_eq!(reply.conversation.turns[1].role, Role::Teacher);
        assert_eq!(reply.detail_count, 2);
    }

    #[test]
    fn chat_detail_count_is_monotone() {
        let mut state = ConversationState::reset();
        state.record_total_identified(4);
        let data = vec![json!("Keep looking!"), json!(1)];
        let reply = parse_chat_reply(&data, &state, "um").unwrap();
        assert_eq!(reply.detail_count, 4);
    }

    #[test]
    fn chat_without_reply_text_fails() {
        let state = ConversationState::reset();
        assert!(matches!(
            parse_chat_reply(&[json!(7)], &state, "hi"),
            Err(ClientError::RemoteCall(_))
        ));
    }
}
