//! Degraded-or-remote service layer.
//!
//! Owns the single live [`SpaceClient`] handle and the fallback flag, and
//! computes the `degraded` bit exactly once at this boundary: callers get an
//! [`Outcome`] instead of branching on caught errors. Generation and chat are
//! attempted remotely at most once per user action before substituting the
//! local fallback; save/export operations have no local equivalent and
//! propagate their errors.

use crate::client::SpaceClient;
use crate::config::{EnvToggles, GatewayConfig};
use crate::error::{ClientError, ClientResult};
use crate::session::{ActiveSession, ConversationState, Role, SessionConfig};
use crate::{fallback, fragments};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;

/// A result plus whether it was locally substituted. The flag is what lets
/// the UI show its degraded-mode banner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome<T> {
    pub value: T,
    pub degraded: bool,
}

impl<T> Outcome<T> {
    pub fn live(value: T) -> Self {
        Self {
            value,
            degraded: false,
        }
    }

    pub fn degraded(value: T) -> Self {
        Self {
            value,
            degraded: true,
        }
    }
}

/// Connection and fallback indicators for the status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub connected: bool,
    pub fallback: bool,
}

/// A fresh session: generated image, checklist, and a conversation reset to
/// empty with a zero detail count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedSession {
    pub session: ActiveSession,
    pub conversation: ConversationState,
}

/// One chat round: teacher reply plus the updated caller-owned state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatExchange {
    pub reply: String,
    pub conversation: ConversationState,
    pub session: ActiveSession,
}

/// Placeholder checklist shown when the remote fragment yields nothing for an
/// existing image.
const BARE_CHECKLIST: [&str; 4] = ["Object in image", "Color", "Shape", "Background"];

/// The learning front-end's single entry point to the remote Space and its
/// local substitutes.
pub struct LearningService {
    config: GatewayConfig,
    store: crate::storage::SessionStore,
    client: Option<SpaceClient>,
    fallback: bool,
    disable_queue: bool,
}

impl LearningService {
    pub fn new(config: GatewayConfig, toggles: &EnvToggles) -> Self {
        let store = crate::storage::SessionStore::new(&config.storage_path);
        Self {
            config,
            store,
            client: None,
            fallback: toggles.fallback,
            disable_queue: toggles.disable_queue,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    pub fn fallback_enabled(&self) -> bool {
        self.fallback
    }

    /// Toggle the process-wide fallback flag.
    pub fn set_fallback(&mut self, enabled: bool) {
        self.fallback = enabled;
        tracing::info!(target: "visolearn::service", enabled, "fallback mode toggled");
    }

    pub fn status(&self) -> ServiceStatus {
        ServiceStatus {
            connected: self.is_connected(),
            fallback: self.fallback,
        }
    }

    /// Build a new client for `credential` and swap it in. The previous
    /// handle is discarded only after the new one initialized successfully;
    /// on error the previous handle (or none) stays active.
    pub async fn connect(&mut self, credential: &str) -> ClientResult<()> {
        let client = SpaceClient::initialize(credential, &self.config, self.disable_queue).await?;
        self.client = Some(client);
        self.fallback = false;
        tracing::info!(target: "visolearn::service", space = %self.config.space_id, "connected to space");
        Ok(())
    }

    /// Wake the remote and wait (bounded) for it to become ready. `false`
    /// when no client exists or the wait runs out; never an error.
    pub async fn validate(&self) -> bool {
        match &self.client {
            Some(client) => client.validate().await,
            None => false,
        }
    }

    fn remote(&self) -> Option<&SpaceClient> {
        if self.fallback {
            None
        } else {
            self.client.as_ref()
        }
    }

    /// Generate an image and start a fresh session. One remote attempt, then
    /// transparent substitution with the local placeholder; the conversation
    /// that comes back is always reset to empty.
    pub async fn generate(&self, config: SessionConfig) -> Outcome<GeneratedSession> {
        if let Some(client) = self.remote() {
            match client.generate_image_and_reset_chat(&config).await {
                Ok((image, conversation)) => {
                    let mut session = ActiveSession::new(config);
                    session.image = Some(image);
                    match client.update_checklist_html().await {
                        Ok(html) => session.checklist = fragments::extract_checklist(&html),
                        Err(err) => {
                            tracing::warn!(target: "visolearn::service", %err, "checklist refresh failed after generate");
                        }
                    }
                    if session.checklist.is_empty() {
                        session.checklist = bare_checklist();
                    }
                    if let Ok(label) = client.update_difficulty_label().await {
                        if !label.trim().is_empty() {
                            session.difficulty = label.trim().to_string();
                        }
                    }
                    return Outcome::live(GeneratedSession {
                        session,
                        conversation,
                    });
                }
                Err(err) => {
                    tracing::warn!(target: "visolearn::service", %err, "remote generate failed, substituting fallback");
                }
            }
        }

        let mut session = ActiveSession::new(config);
        session.image = Some(fallback::placeholder_image(&session.config.topic_focus));
        session.checklist = fallback::placeholder_checklist(&session.config.topic_focus);
        Outcome::degraded(GeneratedSession {
            session,
            conversation: ConversationState::reset(),
        })
    }

    /// One chat round. The caller owns the conversation state and passes it
    /// back in; the returned state has both turns appended and a detail count
    /// that never decreases. One remote attempt, then the local responder.
    pub async fn chat(
        &self,
        conversation: ConversationState,
        session: ActiveSession,
        message: &str,
    ) -> Outcome<ChatExchange> {
        let message = message.trim();

        if let Some(client) = self.remote() {
            match client.chat_respond(&conversation, message).await {
                Ok(reply) => {
                    let mut session = session;
                    session.record_attempt();
                    if let Some(image) = reply.image {
                        session.image = Some(image);
                    }
                    if let Ok(html) = client.update_checklist_html().await {
                        let items = fragments::extract_checklist(&html);
                        if !items.is_empty() {
                            session.checklist = items;
                        }
                    }
                    return Outcome::live(ChatExchange {
                        reply: reply.reply,
                        conversation: reply.conversation,
                        session,
                    });
                }
                Err(err) => {
                    tracing::warn!(target: "visolearn::service", %err, "remote chat failed, substituting fallback");
                }
            }
        }

        let (reply, updated_checklist) = fallback::respond(
            message,
            &session.checklist,
            session.attempt_count,
            session.config.attempt_limit,
        );
        let newly = updated_checklist
            .iter()
            .zip(session.checklist.iter())
            .filter(|(new, old)| new.identified && !old.identified)
            .count() as u32;

        let mut conversation = conversation;
        conversation.push(Role::Child, message);
        conversation.push(Role::Teacher, reply.clone());
        conversation.record_identified(newly);

        let mut session = session;
        session.checklist = updated_checklist;
        session.record_attempt();

        Outcome::degraded(ChatExchange {
            reply,
            conversation,
            session,
        })
    }

    /// Export the session log: remote export first, then the combined local
    /// text file. No local equivalent exists, so failures propagate.
    pub async fn save_log(
        &self,
        session: &ActiveSession,
        conversation: &ConversationState,
    ) -> ClientResult<PathBuf> {
        let client = self.require_remote("session log export")?;
        let remote_log = client.save_session_log().await?;
        let text = compose_log(session, conversation, &remote_log);
        self.store.write_log(&session.id, &text)
    }

    /// Export every image of the session to local files. No local
    /// equivalent exists, so failures propagate.
    pub async fn save_images(&self, session: &ActiveSession) -> ClientResult<Vec<PathBuf>> {
        let client = self.require_remote("session image export")?;
        let images = client.save_all_session_images().await?;
        self.store.write_images(&session.id, &images)
    }

    fn require_remote(&self, what: &str) -> ClientResult<&SpaceClient> {
        if self.fallback {
            return Err(ClientError::RemoteCall(format!(
                "{what} is unavailable in fallback mode"
            )));
        }
        self.client
            .as_ref()
            .ok_or_else(|| ClientError::RemoteCall(format!("{what} requires a connection")))
    }

    /// Checklist fragment for the current session; remote when connected,
    /// locally rendered otherwise. Idempotent for identical inputs.
    pub async fn checklist_fragment(&self, session: &ActiveSession) -> String {
        if let Some(client) = self.remote() {
            match client.update_checklist_html().await {
                Ok(html) if !html.trim().is_empty() => return html,
                Ok(_) => {}
                Err(err) => {
                    tracing::debug!(target: "visolearn::service", %err, "remote checklist fragment failed");
                }
            }
        }
        fragments::checklist_html(&session.checklist)
    }

    /// Progress fragment; remote when connected, local calculation otherwise.
    pub async fn progress_fragment(&self, session: &ActiveSession) -> String {
        if let Some(client) = self.remote() {
            match client.update_progress_html().await {
                Ok(html) if !html.trim().is_empty() => return html,
                Ok(_) => {}
                Err(err) => {
                    tracing::debug!(target: "visolearn::service", %err, "remote progress fragment failed");
                }
            }
        }
        fragments::progress_html(&session.checklist)
    }

    /// Attempt-counter fragment; remote when connected, local otherwise.
    pub async fn attempts_fragment(&self, session: &ActiveSession) -> String {
        if let Some(client) = self.remote() {
            match client.update_attempt_counter().await {
                Ok(html) if !html.trim().is_empty() => return html,
                Ok(_) => {}
                Err(err) => {
                    tracing::debug!(target: "visolearn::service", %err, "remote attempt fragment failed");
                }
            }
        }
        let (count, limit) = session.attempts_display();
        fragments::attempt_counter_html(count, limit)
    }

    /// Difficulty label fragment.
    pub async fn difficulty_fragment(&self, session: &ActiveSession) -> String {
        if let Some(client) = self.remote() {
            match client.update_difficulty_label().await {
                Ok(label) if !label.trim().is_empty() => {
                    return fragments::difficulty_html(label.trim())
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::debug!(target: "visolearn::service", %err, "remote difficulty fragment failed");
                }
            }
        }
        fragments::difficulty_html(&session.difficulty)
    }

    /// Session data: the remote's opaque payload when connected, the local
    /// session summary otherwise.
    pub async fn sessions_value(&self, session: &ActiveSession) -> Value {
        if let Some(client) = self.remote() {
            match client.update_sessions().await {
                Ok(value) if !value.is_null() => return value,
                Ok(_) => {}
                Err(err) => {
                    tracing::debug!(target: "visolearn::service", %err, "remote sessions payload failed");
                }
            }
        }
        json!({
            "difficulty": session.difficulty,
            "topic_focus": session.config.topic_focus,
            "image_style": session.config.image_style,
            "autism_level": session.config.autism_level,
            "age": session.config.age,
            "identified_details": session.identified_count(),
            "total_details": session.checklist.len(),
            "fallback_mode": self.fallback,
        })
    }
}

fn bare_checklist() -> Vec<crate::session::ChecklistItem> {
    BARE_CHECKLIST
        .iter()
        .enumerate()
        .map(|(id, detail)| crate::session::ChecklistItem {
            detail: (*detail).to_string(),
            identified: false,
            id,
        })
        .collect()
}

/// Combined local log: session header, checklist, conversation, then the
/// remote-side export verbatim.
fn compose_log(
    session: &ActiveSession,
    conversation: &ConversationState,
    remote_log: &str,
) -> String {
    let mut text = String::new();
    text.push_str("VisoLearn session log\n");
    text.push_str(&format!("Session: {}\n", session.id));
    text.push_str(&format!("Started: {}\n", session.started_at.to_rfc3339()));
    text.push_str(&format!("Saved: {}\n", chrono::Utc::now().to_rfc3339()));
    text.push_str(&format!(
        "Age: {} | Autism level: {} | Topic: {} | Style: {}\n",
        session.config.age,
        session.config.autism_level,
        session.config.topic_focus,
        session.config.image_style
    ));
    let (count, limit) = session.attempts_display();
    text.push_str(&format!("Attempts: {count}/{limit}\n"));
    text.push_str(&format!(
        "Identified details: {}/{}\n\n",
        session.identified_count(),
        session.checklist.len()
    ));

    text.push_str("Checklist:\n");
    for item in &session.checklist {
        let mark = if item.identified { "[x]" } else { "[ ]" };
        text.push_str(&format!("  {mark} {}\n", item.detail));
    }

    text.push_str("\nConversation:\n");
    for turn in &conversation.turns {
        let speaker = match turn.role {
            Role::Child => "Child",
            Role::Teacher => "Teacher",
        };
        text.push_str(&format!("  {speaker}: {}\n", turn.message));
    }

    text.push_str("\nRemote log:\n");
    text.push_str(remote_log);
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ChecklistItem;

    fn offline_service() -> LearningService {
        LearningService::new(GatewayConfig::default(), &EnvToggles::default())
    }

    fn fallback_service() -> LearningService {
        let mut service = offline_service();
        service.set_fallback(true);
        service
    }

    #[tokio::test]
    async fn generate_without_a_client_is_degraded() {
        let service = offline_service();
        let outcome = service.generate(SessionConfig::default()).await;
        assert!(outcome.degraded);
        assert!(outcome.value.session.image.is_some());
        assert!(!outcome.value.session.checklist.is_empty());
        assert!(outcome.value.conversation.turns.is_empty());
        assert_eq!(outcome.value.conversation.identified_details, 0);
    }

    #[tokio::test]
    async fn chat_without_a_client_is_degraded_and_appends_turns() {
        let service = offline_service();
        let generated = service.generate(SessionConfig::default()).await.value;
        let outcome = service
            .chat(generated.conversation, generated.session, "I see the main subject")
            .await;
        assert!(outcome.degraded);
        assert_eq!(outcome.value.conversation.turns.len(), 2);
        assert_eq!(outcome.value.session.attempt_count, 1);
        assert!(outcome.value.conversation.identified_details >= 1);
    }

    #[tokio::test]
    async fn chat_detail_count_never_decreases_across_rounds() {
        let service = offline_service();
        let generated = service.generate(SessionConfig::default()).await.value;
        let first = service
            .chat(
                generated.conversation,
                generated.session,
                "the main subject and the background color",
            )
            .await;
        let after_first = first.value.conversation.identified_details;
        assert!(after_first >= 2);
        let second = service
            .chat(first.value.conversation, first.value.session, "hmm")
            .await;
        assert_eq!(second.value.conversation.identified_details, after_first);
    }

    #[tokio::test]
    async fn save_in_fallback_mode_propagates_an_error() {
        let service = fallback_service();
        let session = ActiveSession::new(SessionConfig::default());
        let conversation = ConversationState::reset();
        let err = service.save_log(&session, &conversation).await.unwrap_err();
        assert!(matches!(err, ClientError::RemoteCall(_)));
        let err = service.save_images(&session).await.unwrap_err();
        assert!(matches!(err, ClientError::RemoteCall(_)));
    }

    #[tokio::test]
    async fn save_without_a_connection_propagates_an_error() {
        let service = offline_service();
        let session = ActiveSession::new(SessionConfig::default());
        let err = service.save_images(&session).await.unwrap_err();
        assert!(matches!(err, ClientError::RemoteCall(_)));
    }

    #[tokio::test]
    async fn connect_with_empty_credential_keeps_no_handle() {
        let mut service = offline_service();
        let err = service.connect("").await.unwrap_err();
        assert!(matches!(err, ClientError::Auth(_)));
        assert!(!service.is_connected());
    }

    #[tokio::test]
    async fn validate_without_a_client_is_false_not_an_error() {
        let service = offline_service();
        assert!(!service.validate().await);
    }

    #[tokio::test]
    async fn fragments_render_locally_when_offline() {
        let service = offline_service();
        let mut session = ActiveSession::new(SessionConfig::default());
        session.checklist = vec![ChecklistItem {
            detail: "Main subject".to_string(),
            identified: true,
            id: 0,
        }];
        let checklist = service.checklist_fragment(&session).await;
        assert!(checklist.contains("Main subject"));
        let progress = service.progress_fragment(&session).await;
        assert!(progress.contains("1/1"));
        let attempts = service.attempts_fragment(&session).await;
        assert!(attempts.contains("Attempts: 0/3"));
        let difficulty = service.difficulty_fragment(&session).await;
        assert!(difficulty.contains("Very Simple"));
    }

    #[test]
    fn composed_log_contains_header_checklist_and_turns() {
        let mut session = ActiveSession::new(SessionConfig::default());
        session.checklist = vec![ChecklistItem {
            detail: "Main subject".to_string(),
            identified: true,
            id: 0,
        }];
        let mut conversation = ConversationState::reset();
        conversation.push(Role::Child, "I see a dog");
        conversation.push(Role::Teacher, "Well spotted!");
        let text = compose_log(&session, &conversation, "remote says ok");
        assert!(text.contains(&session.id));
        assert!(text.contains("[x] Main subject"));
        assert!(text.contains("Child: I see a dog"));
        assert!(text.contains("remote says ok"));
    }
}
