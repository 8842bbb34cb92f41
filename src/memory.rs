use crate::prompt;
use crate::types::ChatMessage;

/// Ordered, append-only message log for one dialogue.
///
/// A memory is owned by exactly one dialogue evaluation at a time. It is
/// reseeded through [`reset`](Self::reset) when a dialogue begins and grows by
/// one user and one assistant message per completed turn, so after N clean
/// turns it holds `1 + 2N` messages.
#[derive(Debug, Clone, Default)]
pub struct ConversationMemory {
    messages: Vec<ChatMessage>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    /// Clear all messages and seed exactly one system message composed from
    /// the task instructions and the dialogue's document context.
    pub fn reset(&mut self, system_instructions: &str, document_context: &str) {
        self.messages.clear();
        self.messages.push(ChatMessage::system(prompt::compose_system_prompt(
            system_instructions,
            document_context,
        )));
    }

    /// Append the literal turn question. Follow-up turns are standalone;
    /// prior context is carried by the message history, not by text
    /// concatenation.
    pub fn append_user(&mut self, question: impl Into<String>) {
        self.messages.push(ChatMessage::user(question));
    }

    /// Append the model's raw textual response, not the parsed structure, so
    /// subsequent turns see exactly what the model said.
    pub fn append_assistant(&mut self, raw_response: impl Into<String>) {
        self.messages.push(ChatMessage::assistant(raw_response));
    }

    /// Current history in insertion order, ready for submission to a provider.
    pub fn snapshot(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageRole;

    #[test]
    fn reset_seeds_single_system_message() {
        let mut memory = ConversationMemory::new();
        memory.reset("Answer with JSON.", "Revenue was $10.");

        assert_eq!(memory.len(), 1);
        let seed = &memory.snapshot()[0];
        assert_eq!(seed.role, MessageRole::System);
        assert!(seed.content.contains("Answer with JSON."));
        assert!(seed.content.contains("Revenue was $10."));
    }

    #[test]
    fn grows_by_two_messages_per_turn() {
        let mut memory = ConversationMemory::new();
        memory.reset("instructions", "context");

        for turn in 0..4 {
            memory.append_user(format!("question {turn}"));
            memory.append_assistant(format!("answer {turn}"));
            assert_eq!(memory.len(), 1 + 2 * (turn + 1));
        }
    }

    #[test]
    fn reset_discards_prior_dialogue() {
        let mut memory = ConversationMemory::new();
        memory.reset("instructions", "first document");
        memory.append_user("what was revenue?");
        memory.append_assistant("10");

        memory.reset("instructions", "second document");
        assert_eq!(memory.len(), 1);
        assert!(!memory.snapshot()[0].content.contains("first document"));
        assert!(memory
            .snapshot()
            .iter()
            .all(|message| !message.content.contains("revenue")));
    }

    #[test]
    fn snapshot_preserves_insertion_order() {
        let mut memory = ConversationMemory::new();
        memory.reset("instructions", "context");
        memory.append_user("first");
        memory.append_assistant("one");
        memory.append_user("second");

        let roles: Vec<MessageRole> = memory.snapshot().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                MessageRole::System,
                MessageRole::User,
                MessageRole::Assistant,
                MessageRole::User
            ]
        );
    }
}
