//! Chat thread between the operator and the backend's model.

/// Who wrote a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Remote,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
}

/// Append-only conversation, cleared on every new connection.
#[derive(Debug, Clone, Default)]
pub struct ConversationThread {
    messages: Vec<ChatMessage>,
    awaiting_reply: bool,
}

impl ConversationThread {
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// True between sending a query and receiving its reply.
    pub fn awaiting_reply(&self) -> bool {
        self.awaiting_reply
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub(crate) fn push_user(&mut self, text: impl Into<String>) {
        self.messages.push(ChatMessage {
            sender: Sender::User,
            text: text.into(),
        });
        self.awaiting_reply = true;
    }

    pub(crate) fn push_remote(&mut self, text: impl Into<String>) {
        self.messages.push(ChatMessage {
            sender: Sender::Remote,
            text: text.into(),
        });
        self.awaiting_reply = false;
    }

    pub(crate) fn stop_waiting(&mut self) {
        self.awaiting_reply = false;
    }

    pub(crate) fn clear(&mut self) {
        self.messages.clear();
        self.awaiting_reply = false;
    }
}
