//! Append-only transcript store.

use aibrew_core::types::Message;

/// Ordered sequence of messages for one session.
///
/// Entries can only be appended; there is no removal, mutation or lookup by id.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// All messages in insertion order.
    pub fn all(&self) -> &[Message] {
        &self.messages
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
    use aibrew_core::types::Role;

    #[test]
    fn test_new_transcript_is_empty() {
        let t = Transcript::new();
        assert!(t.is_empty());
        assert!(t.all().is_empty());
    }

    #[test]
    fn test_append_preserves_order() {
        let mut t = Transcript::new();
        t.append(Message::user("first"));
        t.append(Message::assistant("second"));
        t.append(Message::user("third"));

        let contents: Vec<&str> = t.all().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
        assert_eq!(t.all()[1].role, Role::Assistant);
        assert_eq!(t.len(), 3);
    }
}
