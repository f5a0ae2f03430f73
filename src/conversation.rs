use anyhow::Result;
use tracing::debug;

use crate::store::{Storage, TranscriptStore};
use crate::transcript::{Message, Transcript, FAILURE_NOTICE};

/// The conversation state machine: the transcript plus the one-in-flight
/// guard.
///
/// A send has two phases. `begin_send` appends the user's message
/// optimistically and hands back the history to put on the wire;
/// `complete_send` applies the outcome of the HTTP call. The call itself
/// happens elsewhere, so the branching here is a pure function of its
/// `Result` and tests can drive it without a network.
pub struct Conversation<S: Storage> {
    store: TranscriptStore<S>,
    transcript: Transcript,
    busy: bool,
}

impl<S: Storage> Conversation<S> {
    pub fn open(store: TranscriptStore<S>) -> Self {
        let transcript = store.load();
        Self {
            store,
            transcript,
            busy: false,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// True exactly while one send is outstanding.
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// First phase of a send. Returns the full history snapshot for the
    /// request, or `None` when the input is blank or a request is already
    /// outstanding — both are complete no-ops.
    pub fn begin_send(&mut self, input: &str) -> Option<Vec<Message>> {
        if input.trim().is_empty() || self.busy {
            return None;
        }
        self.transcript.push(Message::user(input));
        self.store.persist(&self.transcript);
        self.busy = true;
        Some(self.transcript.messages().to_vec())
    }

    /// Second phase: append the reply, or the fixed notice when the call
    /// failed. The user's message from `begin_send` is always retained.
    pub fn complete_send(&mut self, outcome: Result<String>) {
        let message = match outcome {
            Ok(reply) => Message::assistant(reply),
            Err(err) => {
                debug!(%err, "assistant request failed");
                Message::assistant(FAILURE_NOTICE)
            }
        };
        self.transcript.push(message);
        self.store.persist(&self.transcript);
        self.busy = false;
    }

    /// Discards the conversation, in memory and in storage, back to the
    /// single welcome message. An outstanding request is not cancelled; its
    /// late reply will append to the fresh transcript.
    pub fn reset(&mut self) {
        self.transcript = self.store.reset();
        self.store.persist(&self.transcript);
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;
    use crate::store::testing::MemoryStorage;
    use crate::store::TRANSCRIPT_KEY;
    use crate::transcript::{Role, WELCOME_TEXT};

    fn fresh_conversation() -> (Conversation<MemoryStorage>, MemoryStorage) {
        let storage = MemoryStorage::default();
        let conversation = Conversation::open(TranscriptStore::new(storage.clone()));
        (conversation, storage)
    }

    #[test]
    fn first_open_seeds_the_welcome_message() {
        let (conversation, _) = fresh_conversation();
        let messages = conversation.transcript().messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::Assistant);
        assert_eq!(messages[0].content, WELCOME_TEXT);
    }

    #[test]
    fn blank_input_is_a_no_op() {
        let (mut conversation, storage) = fresh_conversation();

        assert!(conversation.begin_send("").is_none());
        assert!(conversation.begin_send("   \t  ").is_none());

        assert_eq!(conversation.transcript().len(), 1);
        assert!(!conversation.is_busy());
        // Nothing was persisted either
        assert!(storage.value(TRANSCRIPT_KEY).is_none());
    }

    #[test]
    fn a_send_appends_the_user_message_before_any_reply() {
        let (mut conversation, _) = fresh_conversation();

        let history = conversation.begin_send("What is the rate today?").unwrap();

        assert!(conversation.is_busy());
        assert_eq!(conversation.transcript().len(), 2);
        let last = conversation.transcript().messages().last().unwrap();
        assert_eq!(last.role, Role::User);
        assert_eq!(last.content, "What is the rate today?");
        // The wire history includes the new user message
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].content, "What is the rate today?");
    }

    #[test]
    fn successful_reply_grows_the_transcript_by_two() {
        let (mut conversation, _) = fresh_conversation();

        conversation.begin_send("What is the rate today?").unwrap();
        conversation.complete_send(Ok("Rates are 7.1% today.".to_string()));

        let messages = conversation.transcript().messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].content, WELCOME_TEXT);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].content, "What is the rate today?");
        assert_eq!(messages[2].role, Role::Assistant);
        assert_eq!(messages[2].content, "Rates are 7.1% today.");
        assert!(!conversation.is_busy());
    }

    #[test]
    fn failed_reply_substitutes_the_notice_and_keeps_the_user_message() {
        let (mut conversation, _) = fresh_conversation();

        conversation.begin_send("Hello").unwrap();
        conversation.complete_send(Err(anyhow!("connection refused")));

        let messages = conversation.transcript().messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].content, "Hello");
        assert_eq!(messages[2].role, Role::Assistant);
        assert_eq!(messages[2].content, FAILURE_NOTICE);
        assert!(!conversation.is_busy());
    }

    #[test]
    fn a_second_send_is_refused_while_busy() {
        let (mut conversation, _) = fresh_conversation();

        conversation.begin_send("first").unwrap();
        assert!(conversation.begin_send("second").is_none());
        assert_eq!(conversation.transcript().len(), 2);

        conversation.complete_send(Ok("reply".to_string()));
        assert!(conversation.begin_send("second").is_some());
    }

    #[test]
    fn every_mutation_is_persisted() {
        let (mut conversation, storage) = fresh_conversation();

        conversation.begin_send("Hello").unwrap();
        let after_user = storage.value(TRANSCRIPT_KEY).unwrap();
        assert!(after_user.contains("Hello"));

        conversation.complete_send(Ok("Hi there".to_string()));
        let after_reply = storage.value(TRANSCRIPT_KEY).unwrap();
        assert!(after_reply.contains("Hi there"));
    }

    #[test]
    fn reset_returns_to_the_welcome_message_in_memory_and_storage() {
        let (mut conversation, storage) = fresh_conversation();

        conversation.begin_send("What is the rate today?").unwrap();
        conversation.complete_send(Ok("Rates are 7.1% today.".to_string()));
        conversation.reset();

        assert!(conversation.transcript().is_welcome_only());
        let stored = storage.value(TRANSCRIPT_KEY).unwrap();
        let stored: Vec<serde_json::Value> = serde_json::from_str(&stored).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0]["role"], "assistant");
    }

    #[test]
    fn reset_is_idempotent() {
        let (mut conversation, _) = fresh_conversation();

        conversation.begin_send("Hello").unwrap();
        conversation.complete_send(Ok("Hi".to_string()));

        conversation.reset();
        let first: Vec<String> = conversation
            .transcript()
            .messages()
            .iter()
            .map(|m| m.content.clone())
            .collect();

        conversation.reset();
        let second: Vec<String> = conversation
            .transcript()
            .messages()
            .iter()
            .map(|m| m.content.clone())
            .collect();

        assert_eq!(first, vec![WELCOME_TEXT.to_string()]);
        assert_eq!(first, second);
    }

    #[test]
    fn a_late_reply_lands_on_the_transcript_current_at_completion() {
        let (mut conversation, _) = fresh_conversation();

        conversation.begin_send("Hello").unwrap();
        conversation.reset();
        conversation.complete_send(Ok("late reply".to_string()));

        let messages = conversation.transcript().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, WELCOME_TEXT);
        assert_eq!(messages[1].content, "late reply");
        assert!(!conversation.is_busy());
    }
}
