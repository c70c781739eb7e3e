//! Conversation model and the derived token aggregate.

use std::sync::{Arc, LazyLock};

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::store::core::clock::now_millis;
use crate::store::core::config::ConversationDefaults;
use crate::store::core::ids::{ChatModelId, ConversationId, SystemPurposeId};
use crate::store::core::message::Message;

/// Id of the placeholder returned when the active conversation is missing.
pub const MISSING_CONVERSATION_ID: &str = "missing";

/// Number of id characters appended to generated conversation names.
const NAME_ID_CHARS: usize = 6;

static MISSING_CONVERSATION: LazyLock<Arc<Conversation>> = LazyLock::new(|| {
    Arc::new(Conversation {
        id: ConversationId::from(MISSING_CONVERSATION_ID),
        name: "Missing Conversation".to_string(),
        messages: Vec::new(),
        system_purpose_id: SystemPurposeId::from("Generic"),
        chat_model_id: ChatModelId::from(""),
        user_title: None,
        auto_title: None,
        cache_tokens_count: 0,
        created: DateTime::<Utc>::UNIX_EPOCH,
        updated: None,
    })
});

/// An ordered, named thread of messages.
///
/// Messages are shared behind `Arc` so that a new snapshot can reuse every
/// message it did not touch.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Unique conversation identifier.
    pub id: ConversationId,
    /// Display name.
    pub name: String,
    /// Messages in conversation order.
    #[serde(default)]
    pub messages: Vec<Arc<Message>>,
    /// Purpose applied to new messages.
    pub system_purpose_id: SystemPurposeId,
    /// Model applied to new messages.
    pub chat_model_id: ChatModelId,
    /// Title set by the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_title: Option<String>,
    /// Title generated automatically.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_title: Option<String>,
    /// Sum of the messages' cached token counts, capped at `u64::MAX`.
    #[serde(default)]
    pub cache_tokens_count: u64,
    /// Creation time.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created: DateTime<Utc>,
    /// Time of the last mutation, if any.
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub updated: Option<DateTime<Utc>>,
}

impl Conversation {
    /// Create an empty conversation with the given id and defaults.
    ///
    /// `now` is truncated to whole milliseconds.
    #[must_use]
    pub fn new(id: ConversationId, defaults: &ConversationDefaults, now: DateTime<Utc>) -> Self {
        let now = now.trunc_subsecs(3);
        let short: String = id.as_str().chars().take(NAME_ID_CHARS).collect();
        Self {
            name: format!("{} {short}", defaults.name_prefix),
            id,
            messages: Vec::new(),
            system_purpose_id: defaults.system_purpose_id.clone(),
            chat_model_id: defaults.chat_model_id.clone(),
            user_title: None,
            auto_title: None,
            cache_tokens_count: 0,
            created: now,
            updated: Some(now),
        }
    }

    /// Create an empty conversation with a freshly generated id.
    #[must_use]
    pub fn with_defaults(defaults: &ConversationDefaults) -> Self {
        Self::new(ConversationId::generate(), defaults, now_millis())
    }

    /// The shared placeholder for an unresolved active id.
    ///
    /// Every call returns the same allocation.
    #[must_use]
    pub fn missing() -> Arc<Self> {
        Arc::clone(&MISSING_CONVERSATION)
    }

    /// Whether this is the missing-conversation placeholder.
    #[must_use]
    pub fn is_missing(self: &Arc<Self>) -> bool {
        Arc::ptr_eq(self, &MISSING_CONVERSATION)
    }

    /// Title to display: the user title, then the automatic one, then `fallback`.
    #[must_use]
    pub fn display_title<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.user_title
            .as_deref()
            .filter(|title| !title.is_empty())
            .or_else(|| self.auto_title.as_deref().filter(|title| !title.is_empty()))
            .unwrap_or(fallback)
    }

    /// Exact sum of the messages' token counts.
    ///
    /// A sum beyond `u64::MAX` is capped there and logged.
    #[must_use]
    pub fn sum_cache_tokens(messages: &[Arc<Message>]) -> u64 {
        messages
            .iter()
            .try_fold(0_u64, |total, message| total.checked_add(message.cache_tokens()))
            .unwrap_or_else(|| {
                warn!(
                    messages = messages.len(),
                    "Cached token total overflows, capping at u64::MAX"
                );
                u64::MAX
            })
    }

    /// Copy of this conversation holding `messages`, with the aggregate
    /// recomputed and `updated` stamped.
    #[must_use]
    pub fn with_messages(&self, messages: Vec<Arc<Message>>, now: DateTime<Utc>) -> Self {
        self.touched(now, |next| {
            next.cache_tokens_count = Self::sum_cache_tokens(&messages);
            next.messages = messages;
        })
    }

    /// Copy of this conversation with `edit` applied and `updated` stamped.
    #[must_use]
    pub fn touched(&self, now: DateTime<Utc>, edit: impl FnOnce(&mut Self)) -> Self {
        let mut next = self.clone();
        edit(&mut next);
        next.updated = Some(now);
        next
    }

    /// Whether the stored aggregate matches the messages.
    #[must_use]
    pub fn aggregate_is_consistent(&self) -> bool {
        self.cache_tokens_count == Self::sum_cache_tokens(&self.messages)
    }
}
