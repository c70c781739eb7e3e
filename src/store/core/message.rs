//! Message model for conversation history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::store::core::clock::now_millis;
use crate::store::core::ids::{ChatModelId, MessageId, SystemPurposeId};

/// Sender label used for messages typed by the human.
pub const SENDER_USER: &str = "You";

/// Sender label used for messages produced by a model or the system.
pub const SENDER_BOT: &str = "Bot";

/// Role of a message, fixed at creation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Model output.
    Assistant,
    /// System prompt.
    System,
    /// Human input.
    User,
}

impl Role {
    /// Stable string form for storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Assistant => "assistant",
            Self::System => "system",
            Self::User => "user",
        }
    }

    /// Sender label a message of this role gets by default.
    #[must_use]
    pub const fn default_sender(self) -> &'static str {
        match self {
            Self::User => SENDER_USER,
            Self::Assistant | Self::System => SENDER_BOT,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "assistant" => Ok(Self::Assistant),
            "system" => Ok(Self::System),
            "user" => Ok(Self::User),
            _ => Err(value.to_string()),
        }
    }
}

/// A single turn in a conversation.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique message identifier.
    pub id: MessageId,
    /// Current content.
    pub text: String,
    /// Display name of the sender.
    pub sender: String,
    /// Optional avatar image reference.
    #[serde(default)]
    pub avatar: Option<String>,
    /// Whether the content is still being produced.
    #[serde(default)]
    pub typing: bool,
    /// Role of the message.
    pub role: Role,
    /// Model that produced the message (assistant messages only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<ChatModelId>,
    /// Purpose the message was produced under (assistant and system messages).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose_id: Option<SystemPurposeId>,
    /// Cached prompt tokens attributed to this message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_tokens_count: Option<u64>,
    /// Creation time.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created: DateTime<Utc>,
    /// Time of the last edit, if any.
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub updated: Option<DateTime<Utc>>,
}

impl Message {
    /// Create a message with a fresh id and the role's default sender label.
    #[must_use]
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            text: text.into(),
            sender: role.default_sender().to_string(),
            avatar: None,
            typing: false,
            role,
            model_id: None,
            purpose_id: None,
            cache_tokens_count: None,
            created: now_millis(),
            updated: None,
        }
    }

    /// Build a user message.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    /// Build an assistant message attributed to a model.
    #[must_use]
    pub fn assistant(text: impl Into<String>, model_id: ChatModelId) -> Self {
        Self {
            model_id: Some(model_id),
            ..Self::new(Role::Assistant, text)
        }
    }

    /// Build a system message carrying the purpose it was created for.
    #[must_use]
    pub fn system(text: impl Into<String>, purpose_id: SystemPurposeId) -> Self {
        Self {
            purpose_id: Some(purpose_id),
            ..Self::new(Role::System, text)
        }
    }

    /// Replace the generated id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<MessageId>) -> Self {
        self.id = id.into();
        self
    }

    /// Attach a cached token count.
    #[must_use]
    pub const fn with_cache_tokens(mut self, count: u64) -> Self {
        self.cache_tokens_count = Some(count);
        self
    }

    /// Mark the message as still being produced.
    #[must_use]
    pub const fn typing(mut self, typing: bool) -> Self {
        self.typing = typing;
        self
    }

    /// Token count contribution, treating an absent count as zero.
    #[must_use]
    pub fn cache_tokens(&self) -> u64 {
        self.cache_tokens_count.unwrap_or(0)
    }
}

/// Partial update merged into an existing message.
///
/// Fields left as `None` are kept. Nullable message fields take a nested
/// `Option` so that a patch can clear them. The role, id and creation time
/// are not editable.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MessagePatch {
    /// New content.
    pub text: Option<String>,
    /// New sender label.
    pub sender: Option<String>,
    /// New avatar, or `Some(None)` to clear it.
    pub avatar: Option<Option<String>>,
    /// New typing flag.
    pub typing: Option<bool>,
    /// New model id, or `Some(None)` to clear it.
    pub model_id: Option<Option<ChatModelId>>,
    /// New purpose id, or `Some(None)` to clear it.
    pub purpose_id: Option<Option<SystemPurposeId>>,
    /// New token count, or `Some(None)` to clear it.
    pub cache_tokens_count: Option<Option<u64>>,
}

impl MessagePatch {
    /// Create an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the content.
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set the sender label.
    #[must_use]
    pub fn sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    /// Set or clear the avatar.
    #[must_use]
    pub fn avatar(mut self, avatar: Option<String>) -> Self {
        self.avatar = Some(avatar);
        self
    }

    /// Set the typing flag.
    #[must_use]
    pub const fn typing(mut self, typing: bool) -> Self {
        self.typing = Some(typing);
        self
    }

    /// Set or clear the model id.
    #[must_use]
    pub fn model_id(mut self, model_id: Option<ChatModelId>) -> Self {
        self.model_id = Some(model_id);
        self
    }

    /// Set or clear the purpose id.
    #[must_use]
    pub fn purpose_id(mut self, purpose_id: Option<SystemPurposeId>) -> Self {
        self.purpose_id = Some(purpose_id);
        self
    }

    /// Set or clear the cached token count.
    #[must_use]
    pub const fn cache_tokens_count(mut self, count: Option<u64>) -> Self {
        self.cache_tokens_count = Some(count);
        self
    }

    /// Merge this patch into `message`, stamping `updated` with `now`.
    #[must_use]
    pub fn apply(&self, message: &Message, now: DateTime<Utc>) -> Message {
        let mut next = message.clone();
        if let Some(text) = &self.text {
            next.text.clone_from(text);
        }
        if let Some(sender) = &self.sender {
            next.sender.clone_from(sender);
        }
        if let Some(avatar) = &self.avatar {
            next.avatar.clone_from(avatar);
        }
        if let Some(typing) = self.typing {
            next.typing = typing;
        }
        if let Some(model_id) = &self.model_id {
            next.model_id.clone_from(model_id);
        }
        if let Some(purpose_id) = &self.purpose_id {
            next.purpose_id.clone_from(purpose_id);
        }
        if let Some(count) = self.cache_tokens_count {
            next.cache_tokens_count = count;
        }
        next.updated = Some(now);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sender_by_role() {
        assert_eq!(Message::user("hi").sender, SENDER_USER);
        assert_eq!(
            Message::assistant("hello", ChatModelId::from("gpt-4")).sender,
            SENDER_BOT
        );
        assert_eq!(Role::System.default_sender(), SENDER_BOT);
    }

    #[test]
    fn test_role_round_trips_through_str() {
        for role in [Role::Assistant, Role::System, Role::User] {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
        assert!("tool".parse::<Role>().is_err());
    }

    #[test]
    fn test_patch_merges_only_given_fields() {
        let original = Message::user("draft").with_cache_tokens(4).typing(true);
        let now = Utc::now();
        let patched = MessagePatch::new()
            .text("final")
            .typing(false)
            .apply(&original, now);

        assert_eq!(patched.text, "final");
        assert!(!patched.typing);
        assert_eq!(patched.cache_tokens_count, Some(4));
        assert_eq!(patched.id, original.id);
        assert_eq!(patched.role, Role::User);
        assert_eq!(patched.created, original.created);
        assert_eq!(patched.updated, Some(now));
    }

    #[test]
    fn test_patch_can_clear_nullable_fields() {
        let original = Message::assistant("x", ChatModelId::from("m")).with_cache_tokens(9);
        let patched = MessagePatch::new()
            .model_id(None)
            .cache_tokens_count(None)
            .apply(&original, Utc::now());

        assert_eq!(patched.model_id, None);
        assert_eq!(patched.cache_tokens(), 0);
    }

    #[test]
    fn test_serialized_field_names() {
        let message = Message::user("hi").with_id("m1").with_cache_tokens(3);
        let value = serde_json::to_value(&message).unwrap_or_default();
        assert_eq!(value["id"], "m1");
        assert_eq!(value["role"], "user");
        assert_eq!(value["cacheTokensCount"], 3);
        assert!(value["created"].is_i64());
        assert!(value["updated"].is_null());
        assert!(value.get("modelId").is_none());
    }
}
