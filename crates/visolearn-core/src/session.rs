//! Session model: child profile settings, conversation state, checklist.
//!
//! Conversation state is owned by the caller across calls and passed back in
//! on every chat round-trip; nothing in this crate holds it globally.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Difficulty label used until the remote reports one.
pub const DEFAULT_DIFFICULTY: &str = "Very Simple";

/// Autism support level, as the remote enumerates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AutismLevel {
    #[serde(rename = "Level 1")]
    Level1,
    #[serde(rename = "Level 2")]
    Level2,
    #[serde(rename = "Level 3")]
    Level3,
}

impl AutismLevel {
    pub const ALL: [AutismLevel; 3] = [AutismLevel::Level1, AutismLevel::Level2, AutismLevel::Level3];

    pub fn as_str(&self) -> &'static str {
        match self {
            AutismLevel::Level1 => "Level 1",
            AutismLevel::Level2 => "Level 2",
            AutismLevel::Level3 => "Level 3",
        }
    }
}

impl fmt::Display for AutismLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Image style offered to the remote generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageStyle {
    Realistic,
    Illustration,
    Cartoon,
    Watercolor,
    #[serde(rename = "3D Rendering")]
    ThreeDRendering,
}

impl ImageStyle {
    pub const ALL: [ImageStyle; 5] = [
        ImageStyle::Realistic,
        ImageStyle::Illustration,
        ImageStyle::Cartoon,
        ImageStyle::Watercolor,
        ImageStyle::ThreeDRendering,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageStyle::Realistic => "Realistic",
            ImageStyle::Illustration => "Illustration",
            ImageStyle::Cartoon => "Cartoon",
            ImageStyle::Watercolor => "Watercolor",
            ImageStyle::ThreeDRendering => "3D Rendering",
        }
    }
}

impl fmt::Display for ImageStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Child,
    Teacher,
}

/// One `(role, message)` pair in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub message: String,
}

/// Ordered conversation turns plus the running count of identified details.
///
/// `identified_details` is monotonically non-decreasing within a session:
/// it only moves through [`ConversationState::record_identified`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationState {
    #[serde(default)]
    pub turns: Vec<ConversationTurn>,
    #[serde(default)]
    pub identified_details: u32,
}

impl ConversationState {
    /// Empty conversation with a zero detail count, the state every image
    /// generation resets to.
    pub fn reset() -> Self {
        Self::default()
    }

    pub fn push(&mut self, role: Role, message: impl Into<String>) {
        self.turns.push(ConversationTurn {
            role,
            message: message.into(),
        });
    }

    /// Raise the detail count to `total` if it is higher; the count never
    /// goes down.
    pub fn record_total_identified(&mut self, total: u32) {
        if total > self.identified_details {
            self.identified_details = total;
        }
    }

    /// Add `newly` freshly matched details to the running count.
    pub fn record_identified(&mut self, newly: u32) {
        self.identified_details = self.identified_details.saturating_add(newly);
    }
}

/// Immutable per-generation settings, supplied fresh by the caller each call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_age")]
    pub age: String,
    #[serde(default = "default_autism_level")]
    pub autism_level: AutismLevel,
    #[serde(default)]
    pub topic_focus: String,
    #[serde(default)]
    pub treatment_plan: String,
    #[serde(default = "default_attempt_limit")]
    pub attempt_limit: u32,
    #[serde(default = "default_details_threshold")]
    pub details_threshold: u32,
    #[serde(default = "default_image_style")]
    pub image_style: ImageStyle,
}

fn default_age() -> String {
    "3".to_string()
}

fn default_autism_level() -> AutismLevel {
    AutismLevel::Level1
}

fn default_attempt_limit() -> u32 {
    3
}

fn default_details_threshold() -> u32 {
    70
}

fn default_image_style() -> ImageStyle {
    ImageStyle::Realistic
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            age: default_age(),
            autism_level: default_autism_level(),
            topic_focus: String::new(),
            treatment_plan: String::new(),
            attempt_limit: default_attempt_limit(),
            details_threshold: default_details_threshold(),
            image_style: default_image_style(),
        }
    }
}

/// One detail the child should find in the image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub detail: String,
    pub identified: bool,
    pub id: usize,
}

/// Image payload returned by the remote or synthesized locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageData {
    pub url: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

/// One continuous interaction spanning a generated image and its chat rounds,
/// identified locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveSession {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub config: SessionConfig,
    #[serde(default)]
    pub image: Option<ImageData>,
    #[serde(default)]
    pub checklist: Vec<ChecklistItem>,
    #[serde(default)]
    pub attempt_count: u32,
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
}

fn default_difficulty() -> String {
    DEFAULT_DIFFICULTY.to_string()
}

impl ActiveSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            config,
            image: None,
            checklist: Vec::new(),
            attempt_count: 0,
            difficulty: default_difficulty(),
        }
    }

    /// Count an attempt, never past the configured limit.
    pub fn record_attempt(&mut self) {
        if self.attempt_count < self.config.attempt_limit {
            self.attempt_count += 1;
        }
    }

    /// Attempts as shown to the user: the count is capped at the limit.
    pub fn attempts_display(&self) -> (u32, u32) {
        (
            self.attempt_count.min(self.config.attempt_limit),
            self.config.attempt_limit,
        )
    }

    pub fn identified_count(&self) -> usize {
        self.checklist.iter().filter(|item| item.identified).count()
    }

    pub fn all_identified(&self) -> bool {
        !self.checklist.is_empty() && self.checklist.iter().all(|item| item.identified)
    }

    pub fn progress_percent(&self) -> f32 {
        progress_percent(self.identified_count(), self.checklist.len())
    }
}

/// Identified/total as a percentage, capped at 100.
pub fn progress_percent(identified: usize, total: usize) -> f32 {
    if total == 0 {
        return 0.0;
    }
    let pct = identified as f32 / total as f32 * 100.0;
    pct.min(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_state_is_empty_with_zero_details() {
        let state = ConversationState::reset();
        assert!(state.turns.is_empty());
        assert_eq!(state.identified_details, 0);
    }

    #[test]
    fn detail_count_never_decreases() {
        let mut state = ConversationState::reset();
        state.record_total_identified(3);
        state.record_total_identified(1);
        assert_eq!(state.identified_details, 3);
        state.record_identified(2);
        assert_eq!(state.identified_details, 5);
    }

    #[test]
    fn attempts_cap_at_the_limit() {
        let mut session = ActiveSession::new(SessionConfig {
            attempt_limit: 2,
            ..SessionConfig::default()
        });
        session.record_attempt();
        session.record_attempt();
        session.record_attempt();
        assert_eq!(session.attempt_count, 2);
        assert_eq!(session.attempts_display(), (2, 2));
    }

    #[test]
    fn progress_caps_at_one_hundred() {
        assert_eq!(progress_percent(0, 0), 0.0);
        assert_eq!(progress_percent(7, 7), 100.0);
        assert_eq!(progress_percent(9, 7), 100.0);
    }

    #[test]
    fn enums_serialize_to_remote_display_strings() {
        assert_eq!(
            serde_json::to_value(AutismLevel::Level2).unwrap(),
            serde_json::json!("Level 2")
        );
        assert_eq!(
            serde_json::to_value(ImageStyle::ThreeDRendering).unwrap(),
            serde_json::json!("3D Rendering")
        );
    }
}
