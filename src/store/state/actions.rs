//! Store mutations and the pure transition function that applies them.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::store::core::clock::now_millis;
use crate::store::core::conversation::Conversation;
use crate::store::core::ids::{ChatModelId, ConversationId, MessageId, SystemPurposeId};
use crate::store::core::message::{Message, MessagePatch};
use crate::store::state::cow;
use crate::store::state::snapshot::ChatSnapshot;

/// Inputs a transition needs besides the action itself.
#[derive(Clone, Copy, Debug)]
pub struct Transition {
    /// Timestamp stamped on everything the action touches.
    pub now: DateTime<Utc>,
    /// Capacity of the conversation list.
    pub max_conversations: usize,
}

impl Transition {
    /// Transition stamped with the current time.
    #[must_use]
    pub fn now(max_conversations: usize) -> Self {
        Self {
            now: now_millis(),
            max_conversations,
        }
    }
}

/// A single mutation of the store.
#[derive(Clone, Debug)]
pub enum ChatAction {
    /// Prepend a conversation, evicting the oldest beyond capacity.
    AddConversation(Conversation),
    /// Prepend a conversation and make it active in the same transition.
    CreateConversation(Conversation),
    /// Remove the conversation with this id.
    DeleteConversation(ConversationId),
    /// Replace every conversation with the given fresh one and activate it.
    ResetConversations(Conversation),
    /// Point the active id somewhere, resolvable or not.
    SetActiveConversationId(ConversationId),
    /// Change a conversation's purpose.
    SetSystemPurposeId {
        /// Target conversation.
        conversation_id: ConversationId,
        /// New purpose.
        purpose_id: SystemPurposeId,
    },
    /// Change a conversation's model.
    SetChatModelId {
        /// Target conversation.
        conversation_id: ConversationId,
        /// New model.
        model_id: ChatModelId,
    },
    /// Set or clear a conversation's user title.
    SetUserTitle {
        /// Target conversation.
        conversation_id: ConversationId,
        /// New title.
        title: Option<String>,
    },
    /// Set or clear a conversation's automatic title.
    SetAutoTitle {
        /// Target conversation.
        conversation_id: ConversationId,
        /// New title.
        title: Option<String>,
    },
    /// Append a message.
    AddMessage {
        /// Target conversation.
        conversation_id: ConversationId,
        /// Message to append.
        message: Message,
    },
    /// Merge a patch into one message.
    EditMessage {
        /// Target conversation.
        conversation_id: ConversationId,
        /// Target message.
        message_id: MessageId,
        /// Fields to merge.
        patch: MessagePatch,
    },
    /// Drop one message.
    RemoveMessage {
        /// Target conversation.
        conversation_id: ConversationId,
        /// Target message.
        message_id: MessageId,
    },
    /// Replace a conversation's whole message list.
    ReplaceMessages {
        /// Target conversation.
        conversation_id: ConversationId,
        /// New messages, in order.
        messages: Vec<Message>,
    },
}

impl ChatAction {
    /// Stable name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AddConversation(_) => "add_conversation",
            Self::CreateConversation(_) => "create_conversation",
            Self::DeleteConversation(_) => "delete_conversation",
            Self::ResetConversations(_) => "reset_conversations",
            Self::SetActiveConversationId(_) => "set_active_conversation_id",
            Self::SetSystemPurposeId { .. } => "set_system_purpose_id",
            Self::SetChatModelId { .. } => "set_chat_model_id",
            Self::SetUserTitle { .. } => "set_user_title",
            Self::SetAutoTitle { .. } => "set_auto_title",
            Self::AddMessage { .. } => "add_message",
            Self::EditMessage { .. } => "edit_message",
            Self::RemoveMessage { .. } => "remove_message",
            Self::ReplaceMessages { .. } => "replace_messages",
        }
    }

    /// Conversation the action is aimed at.
    #[must_use]
    pub const fn conversation_id(&self) -> &ConversationId {
        match self {
            Self::AddConversation(conversation)
            | Self::CreateConversation(conversation)
            | Self::ResetConversations(conversation) => &conversation.id,
            Self::DeleteConversation(id) | Self::SetActiveConversationId(id) => id,
            Self::SetSystemPurposeId {
                conversation_id, ..
            }
            | Self::SetChatModelId {
                conversation_id, ..
            }
            | Self::SetUserTitle {
                conversation_id, ..
            }
            | Self::SetAutoTitle {
                conversation_id, ..
            }
            | Self::AddMessage {
                conversation_id, ..
            }
            | Self::EditMessage {
                conversation_id, ..
            }
            | Self::RemoveMessage {
                conversation_id, ..
            }
            | Self::ReplaceMessages {
                conversation_id, ..
            } => conversation_id,
        }
    }
}

impl ChatSnapshot {
    /// Apply `action`, returning the next snapshot.
    ///
    /// Unknown conversation or message ids leave the content unchanged; the
    /// result is still a new snapshot.
    #[must_use]
    pub fn apply(&self, action: ChatAction, transition: &Transition) -> Self {
        let now = transition.now;
        match action {
            ChatAction::AddConversation(conversation) => self.prepended(
                conversation,
                transition.max_conversations,
                self.active_conversation_id.clone(),
            ),
            ChatAction::CreateConversation(conversation) => {
                let active = Some(conversation.id.clone());
                self.prepended(conversation, transition.max_conversations, active)
            }
            ChatAction::DeleteConversation(id) => Self {
                conversations: cow::remove_matching(&self.conversations, |c| c.id == id),
                active_conversation_id: self.active_conversation_id.clone(),
            },
            ChatAction::ResetConversations(conversation) => Self::with_single(conversation),
            ChatAction::SetActiveConversationId(id) => Self {
                conversations: self.conversations.clone(),
                active_conversation_id: Some(id),
            },
            ChatAction::SetSystemPurposeId {
                conversation_id,
                purpose_id,
            } => self.update_conversation(&conversation_id, |c| {
                c.touched(now, |next| next.system_purpose_id.clone_from(&purpose_id))
            }),
            ChatAction::SetChatModelId {
                conversation_id,
                model_id,
            } => self.update_conversation(&conversation_id, |c| {
                c.touched(now, |next| next.chat_model_id.clone_from(&model_id))
            }),
            ChatAction::SetUserTitle {
                conversation_id,
                title,
            } => self.update_conversation(&conversation_id, |c| {
                c.touched(now, |next| next.user_title.clone_from(&title))
            }),
            ChatAction::SetAutoTitle {
                conversation_id,
                title,
            } => self.update_conversation(&conversation_id, |c| {
                c.touched(now, |next| next.auto_title.clone_from(&title))
            }),
            ChatAction::AddMessage {
                conversation_id,
                message,
            } => {
                let message = Arc::new(message);
                self.update_conversation(&conversation_id, |c| {
                    let mut messages = c.messages.clone();
                    messages.push(Arc::clone(&message));
                    c.with_messages(messages, now)
                })
            }
            ChatAction::EditMessage {
                conversation_id,
                message_id,
                patch,
            } => self.update_conversation(&conversation_id, |c| {
                let messages = cow::replace_matching(
                    &c.messages,
                    |m| m.id == message_id,
                    |m| patch.apply(m, now),
                );
                c.with_messages(messages, now)
            }),
            ChatAction::RemoveMessage {
                conversation_id,
                message_id,
            } => self.update_conversation(&conversation_id, |c| {
                let messages = cow::remove_matching(&c.messages, |m| m.id == message_id);
                c.with_messages(messages, now)
            }),
            ChatAction::ReplaceMessages {
                conversation_id,
                messages,
            } => {
                let messages: Vec<Arc<Message>> = messages.into_iter().map(Arc::new).collect();
                self.update_conversation(&conversation_id, |c| {
                    c.with_messages(messages.clone(), now)
                })
            }
        }
    }

    fn prepended(
        &self,
        conversation: Conversation,
        max_conversations: usize,
        active_conversation_id: Option<ConversationId>,
    ) -> Self {
        Self {
            conversations: cow::prepend_bounded(
                &self.conversations,
                Arc::new(conversation),
                max_conversations,
            ),
            active_conversation_id,
        }
    }

    fn update_conversation(
        &self,
        id: &ConversationId,
        update: impl FnMut(&Conversation) -> Conversation,
    ) -> Self {
        Self {
            conversations: cow::replace_matching(&self.conversations, |c| &c.id == id, update),
            active_conversation_id: self.active_conversation_id.clone(),
        }
    }
}
