//! Bounded conversation history for a chat session.

use serde::{Deserialize, Serialize};

/// A single chat message in the wire format the API expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Conversation history with a fixed retention bound.
///
/// Every append enforces the bound, dropping the oldest messages first,
/// so a long session cannot grow the request payload without limit.
pub struct History {
    messages: Vec<Message>,
    max_messages: usize,
}

impl History {
    /// Create an empty history retaining at most `max_messages` entries.
    pub fn new(max_messages: usize) -> Self {
        Self {
            messages: Vec::new(),
            max_messages,
        }
    }

    /// Append a message, evicting from the front once over the bound.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
        if self.messages.len() > self.max_messages {
            let excess = self.messages.len() - self.max_messages;
            self.messages.drain(..excess);
        }
    }

    /// The retained messages, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Forget the whole conversation.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_read_back() {
        let mut history = History::new(10);
        history.push(Message::user("hello"));
        history.push(Message::assistant("hi there"));
        assert_eq!(history.len(), 2);
        assert_eq!(history.messages()[0].role, "user");
        assert_eq!(history.messages()[1].content, "hi there");
    }

    #[test]
    fn test_bound_evicts_oldest_first() {
        let mut history = History::new(4);
        for i in 0..6 {
            history.push(Message::user(format!("msg {i}")));
        }
        assert_eq!(history.len(), 4);
        assert_eq!(history.messages()[0].content, "msg 2");
        assert_eq!(history.messages()[3].content, "msg 5");
    }

    #[test]
    fn test_clear_empties_history() {
        let mut history = History::new(4);
        history.push(Message::user("hello"));
        history.clear();
        assert!(history.is_empty());
    }
}
