//! The process-local conversation store.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info};

use crate::store::core::config::StoreConfig;
use crate::store::core::conversation::Conversation;
use crate::store::core::errors::StoreResult;
use crate::store::core::ids::{ChatModelId, ConversationId, MessageId, SystemPurposeId};
use crate::store::core::message::{Message, MessagePatch};
use crate::store::state::{ChatAction, ChatSnapshot, Transition};

/// Receiver of every snapshot the store publishes.
///
/// Sinks run on the mutating thread while the writer lock is held, so they
/// must not block and must not mutate the store.
pub trait SnapshotSink: Send + Sync {
    /// Called once per mutation with the new snapshot.
    fn snapshot_changed(&self, snapshot: &Arc<ChatSnapshot>);
}

struct Inner {
    config: StoreConfig,
    state: watch::Sender<Arc<ChatSnapshot>>,
    writer: Mutex<()>,
    sinks: Vec<Arc<dyn SnapshotSink>>,
}

/// Shared, observable container of conversations and the active id.
///
/// Cloning is cheap and every clone talks to the same state. All mutations
/// go through [`ConversationStore::dispatch`], which applies them one at a
/// time and publishes each result as a single new snapshot.
#[derive(Clone)]
pub struct ConversationStore {
    inner: Arc<Inner>,
}

impl ConversationStore {
    /// Create a store holding one default conversation.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: StoreConfig) -> StoreResult<Self> {
        StoreBuilder::new(config).build()
    }

    /// Start building a store with a custom initial state or sinks.
    #[must_use]
    pub const fn builder(config: StoreConfig) -> StoreBuilder {
        StoreBuilder::new(config)
    }

    /// Configuration the store was built with.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<ChatSnapshot> {
        Arc::clone(&self.inner.state.borrow())
    }

    /// Receiver notified whenever a new snapshot is published.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<ChatSnapshot>> {
        self.inner.state.subscribe()
    }

    /// Follow a projection of the state, see [`Selector`].
    #[must_use]
    pub fn select<T, F>(&self, project: F) -> Selector<T, F>
    where
        T: Clone + PartialEq,
        F: Fn(&ChatSnapshot) -> T,
    {
        Selector::new(self.subscribe(), project)
    }

    /// Apply one action and publish the resulting snapshot.
    pub fn dispatch(&self, action: ChatAction) {
        let writer = self
            .inner
            .writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        debug!(
            action = action.name(),
            conversation_id = %action.conversation_id(),
            "Applying store action"
        );

        let transition = Transition::now(self.inner.config.max_conversations);
        let next = Arc::new(self.snapshot().apply(action, &transition));
        self.inner.state.send_replace(Arc::clone(&next));

        for sink in &self.inner.sinks {
            sink.snapshot_changed(&next);
        }
        drop(writer);
    }

    /// Prepend a conversation, evicting the oldest beyond capacity.
    pub fn add_conversation(&self, conversation: Conversation) {
        self.dispatch(ChatAction::AddConversation(conversation));
    }

    /// Add a fresh default conversation and make it active in one mutation.
    #[must_use]
    pub fn create_conversation(&self) -> ConversationId {
        let conversation = Conversation::with_defaults(&self.inner.config.defaults);
        let id = conversation.id.clone();
        self.dispatch(ChatAction::CreateConversation(conversation));
        info!(conversation_id = %id, "Created conversation");
        id
    }

    /// Remove a conversation; unknown ids are ignored.
    pub fn delete_conversation(&self, id: impl Into<ConversationId>) {
        self.dispatch(ChatAction::DeleteConversation(id.into()));
    }

    /// Replace every conversation with a single fresh default one.
    pub fn reset_conversations(&self) {
        let conversation = Conversation::with_defaults(&self.inner.config.defaults);
        info!(conversation_id = %conversation.id, "Resetting conversations");
        self.dispatch(ChatAction::ResetConversations(conversation));
    }

    /// Point the active id at `id` without checking that it resolves.
    pub fn set_active_conversation_id(&self, id: impl Into<ConversationId>) {
        self.dispatch(ChatAction::SetActiveConversationId(id.into()));
    }

    /// Change the purpose of a conversation.
    pub fn set_system_purpose_id(
        &self,
        conversation_id: impl Into<ConversationId>,
        purpose_id: impl Into<SystemPurposeId>,
    ) {
        self.dispatch(ChatAction::SetSystemPurposeId {
            conversation_id: conversation_id.into(),
            purpose_id: purpose_id.into(),
        });
    }

    /// Change the model of a conversation.
    pub fn set_chat_model_id(
        &self,
        conversation_id: impl Into<ConversationId>,
        model_id: impl Into<ChatModelId>,
    ) {
        self.dispatch(ChatAction::SetChatModelId {
            conversation_id: conversation_id.into(),
            model_id: model_id.into(),
        });
    }

    /// Set or clear the title chosen by the user.
    pub fn set_user_title(&self, conversation_id: impl Into<ConversationId>, title: Option<String>) {
        self.dispatch(ChatAction::SetUserTitle {
            conversation_id: conversation_id.into(),
            title,
        });
    }

    /// Set or clear the automatically generated title.
    pub fn set_auto_title(&self, conversation_id: impl Into<ConversationId>, title: Option<String>) {
        self.dispatch(ChatAction::SetAutoTitle {
            conversation_id: conversation_id.into(),
            title,
        });
    }

    /// Append a message to a conversation.
    pub fn add_message(&self, conversation_id: impl Into<ConversationId>, message: Message) {
        self.dispatch(ChatAction::AddMessage {
            conversation_id: conversation_id.into(),
            message,
        });
    }

    /// Merge `patch` into a message.
    pub fn edit_message(
        &self,
        conversation_id: impl Into<ConversationId>,
        message_id: impl Into<MessageId>,
        patch: MessagePatch,
    ) {
        self.dispatch(ChatAction::EditMessage {
            conversation_id: conversation_id.into(),
            message_id: message_id.into(),
            patch,
        });
    }

    /// Remove a message from a conversation.
    pub fn remove_message(
        &self,
        conversation_id: impl Into<ConversationId>,
        message_id: impl Into<MessageId>,
    ) {
        self.dispatch(ChatAction::RemoveMessage {
            conversation_id: conversation_id.into(),
            message_id: message_id.into(),
        });
    }

    /// Replace the whole message list of a conversation.
    pub fn replace_messages(&self, conversation_id: impl Into<ConversationId>, messages: Vec<Message>) {
        self.dispatch(ChatAction::ReplaceMessages {
            conversation_id: conversation_id.into(),
            messages,
        });
    }
}

/// Builder for [`ConversationStore`].
pub struct StoreBuilder {
    config: StoreConfig,
    initial: Option<ChatSnapshot>,
    sinks: Vec<Arc<dyn SnapshotSink>>,
}

impl StoreBuilder {
    /// Create a builder with the default initial state and no sinks.
    #[must_use]
    pub const fn new(config: StoreConfig) -> Self {
        Self {
            config,
            initial: None,
            sinks: Vec::new(),
        }
    }

    /// Start from `snapshot` instead of a single default conversation.
    #[must_use]
    pub fn initial(mut self, snapshot: ChatSnapshot) -> Self {
        self.initial = Some(snapshot);
        self
    }

    /// Register a sink notified after every mutation.
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn SnapshotSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Build the store.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> StoreResult<ConversationStore> {
        self.config.validate()?;
        let initial = self.initial.unwrap_or_else(|| {
            ChatSnapshot::with_single(Conversation::with_defaults(&self.config.defaults))
        });
        let (state, _) = watch::channel(Arc::new(initial));

        Ok(ConversationStore {
            inner: Arc::new(Inner {
                config: self.config,
                state,
                writer: Mutex::new(()),
                sinks: self.sinks,
            }),
        })
    }
}

/// Projection of the store state that reports when its value changes.
///
/// Projections returning `Arc`s of `Eq` types compare by pointer first, so
/// following a single conversation only re-reports when that conversation
/// was actually replaced.
pub struct Selector<T, F> {
    receiver: watch::Receiver<Arc<ChatSnapshot>>,
    project: F,
    current: T,
}

impl<T, F> Selector<T, F>
where
    T: Clone + PartialEq,
    F: Fn(&ChatSnapshot) -> T,
{
    fn new(mut receiver: watch::Receiver<Arc<ChatSnapshot>>, project: F) -> Self {
        let snapshot = Arc::clone(&receiver.borrow_and_update());
        let current = project(&snapshot);
        Self {
            receiver,
            project,
            current,
        }
    }

    /// Last projected value.
    #[must_use]
    pub const fn get(&self) -> &T {
        &self.current
    }

    /// Re-project if a snapshot was published since the last check.
    ///
    /// Returns the new value only when it differs from the previous one.
    pub fn poll(&mut self) -> Option<&T> {
        if !self.receiver.has_changed().unwrap_or(false) {
            return None;
        }
        let snapshot = Arc::clone(&self.receiver.borrow_and_update());
        self.update(&snapshot).then_some(&self.current)
    }

    fn update(&mut self, snapshot: &ChatSnapshot) -> bool {
        let next = (self.project)(snapshot);
        if next == self.current {
            return false;
        }
        self.current = next;
        true
    }
}

impl<T, F> Selector<T, F>
where
    T: Clone + PartialEq + Send,
    F: Fn(&ChatSnapshot) -> T + Send,
{
    /// Wait until the projected value changes.
    ///
    /// Returns `None` once the store has been dropped.
    pub async fn changed(&mut self) -> Option<T> {
        loop {
            if self.receiver.changed().await.is_err() {
                return None;
            }
            let snapshot = Arc::clone(&self.receiver.borrow_and_update());
            if self.update(&snapshot) {
                return Some(self.current.clone());
            }
        }
    }
}
