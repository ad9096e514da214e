//! Conversation state machine
//!
//! The view owns an append-only message list and a pending-turn state,
//! updated only through `Conversation::apply`. Side effects come back to the
//! caller as `Effect` values, keeping the transitions themselves pure.

use crate::sanitize::sanitize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One conversation turn. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub text: String,
}

/// Pending-turn state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Turn {
    /// No in-flight request; input accepted
    #[default]
    Idle,
    /// A prompt is in flight; further submissions are rejected
    Submitting,
    /// Reset requested on a non-empty conversation, awaiting confirmation
    ConfirmingReset,
}

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    /// User submitted the input buffer
    Submit { text: String },
    /// The relay returned a raw completion
    Resolved { raw: String },
    /// The relay call failed; message is already human-readable
    Failed { message: String },
    /// User asked to clear the conversation
    ResetRequested,
    ResetConfirmed,
    ResetCancelled,
}

/// Effects to be executed after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send this prompt to the relay on a background thread
    SendPrompt(String),
}

#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    turn: Turn,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn turn(&self) -> Turn {
        self.turn
    }

    pub fn is_submitting(&self) -> bool {
        self.turn == Turn::Submitting
    }

    /// Text the copy operation exposes: the most recent assistant message.
    /// Pure read, no state transition.
    pub fn copy_target(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.text.as_str())
    }

    /// Apply one event. Returns the effect the caller must execute, if any.
    pub fn apply(&mut self, event: Event) -> Option<Effect> {
        match (self.turn, event) {
            (Turn::Idle, Event::Submit { text }) => {
                let prompt = text.trim();
                if prompt.is_empty() {
                    // Pure validation: nothing appended, nothing sent.
                    return None;
                }
                // Optimistic insertion, independent of outcome.
                self.messages.push(Message {
                    role: Role::User,
                    text: prompt.to_string(),
                });
                self.turn = Turn::Submitting;
                Some(Effect::SendPrompt(prompt.to_string()))
            }

            // One turn in flight at a time: concurrent submissions are
            // rejected, not queued.
            (Turn::Submitting, Event::Submit { .. }) => None,

            (Turn::Submitting, Event::Resolved { raw }) => {
                self.messages.push(Message {
                    role: Role::Assistant,
                    text: sanitize(&raw),
                });
                self.turn = Turn::Idle;
                None
            }

            (Turn::Submitting, Event::Failed { message }) => {
                self.messages.push(Message {
                    role: Role::Assistant,
                    text: format!("Error: {message}"),
                });
                self.turn = Turn::Idle;
                None
            }

            (Turn::Idle, Event::ResetRequested) => {
                // No-op on an empty conversation: no confirmation prompt.
                if !self.messages.is_empty() {
                    self.turn = Turn::ConfirmingReset;
                }
                None
            }

            (Turn::ConfirmingReset, Event::ResetConfirmed) => {
                self.messages.clear();
                self.turn = Turn::Idle;
                None
            }

            (Turn::ConfirmingReset, Event::ResetCancelled) => {
                self.turn = Turn::Idle;
                None
            }

            // Everything else is a stale or out-of-order event: reset while
            // a turn is in flight, confirmation outside the confirm state,
            // completions that arrive twice. Ignored.
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submitted(conv: &mut Conversation, text: &str) -> Option<Effect> {
        conv.apply(Event::Submit {
            text: text.to_string(),
        })
    }

    #[test]
    fn test_submit_appends_user_message_and_sends() {
        let mut conv = Conversation::new();

        let effect = submitted(&mut conv, "2+2?");
        assert_eq!(effect, Some(Effect::SendPrompt("2+2?".to_string())));
        assert_eq!(conv.turn(), Turn::Submitting);
        assert_eq!(conv.messages().len(), 1);
        assert_eq!(conv.messages()[0].role, Role::User);
        assert_eq!(conv.messages()[0].text, "2+2?");
    }

    #[test]
    fn test_empty_prompt_never_sends_or_appends() {
        let mut conv = Conversation::new();

        for text in ["", "   ", "\n\t "] {
            assert_eq!(submitted(&mut conv, text), None);
        }
        assert!(conv.messages().is_empty());
        assert_eq!(conv.turn(), Turn::Idle);
    }

    #[test]
    fn test_submit_while_submitting_rejected() {
        let mut conv = Conversation::new();
        submitted(&mut conv, "first");

        assert_eq!(submitted(&mut conv, "second"), None);
        assert_eq!(conv.messages().len(), 1);
        assert_eq!(conv.turn(), Turn::Submitting);
    }

    #[test]
    fn test_resolved_appends_sanitized_assistant_message() {
        let mut conv = Conversation::new();
        submitted(&mut conv, "2+2?");

        conv.apply(Event::Resolved {
            raw: "<think>reasoning</think>4".to_string(),
        });

        assert_eq!(conv.turn(), Turn::Idle);
        assert_eq!(conv.messages().len(), 2);
        assert_eq!(conv.messages()[1].role, Role::Assistant);
        assert_eq!(conv.messages()[1].text, "4");
    }

    #[test]
    fn test_failure_keeps_user_message_and_appends_error() {
        let mut conv = Conversation::new();
        submitted(&mut conv, "x");

        conv.apply(Event::Failed {
            message: "upstream unavailable: connection refused".to_string(),
        });

        assert_eq!(conv.turn(), Turn::Idle);
        assert_eq!(conv.messages().len(), 2);
        assert_eq!(conv.messages()[0].text, "x");
        assert_eq!(conv.messages()[0].role, Role::User);
        assert_eq!(conv.messages()[1].role, Role::Assistant);
        assert!(conv.messages()[1].text.contains("upstream unavailable"));
    }

    #[test]
    fn test_reset_on_empty_conversation_is_noop() {
        let mut conv = Conversation::new();

        conv.apply(Event::ResetRequested);
        assert_eq!(conv.turn(), Turn::Idle);
    }

    #[test]
    fn test_reset_requires_confirmation_then_clears() {
        let mut conv = Conversation::new();
        submitted(&mut conv, "hello");
        conv.apply(Event::Resolved {
            raw: "hi".to_string(),
        });

        conv.apply(Event::ResetRequested);
        assert_eq!(conv.turn(), Turn::ConfirmingReset);
        // Nothing cleared until confirmed.
        assert_eq!(conv.messages().len(), 2);

        conv.apply(Event::ResetConfirmed);
        assert!(conv.messages().is_empty());
        assert_eq!(conv.turn(), Turn::Idle);
    }

    #[test]
    fn test_reset_cancel_preserves_conversation() {
        let mut conv = Conversation::new();
        submitted(&mut conv, "hello");
        conv.apply(Event::Resolved {
            raw: "hi".to_string(),
        });

        conv.apply(Event::ResetRequested);
        conv.apply(Event::ResetCancelled);

        assert_eq!(conv.turn(), Turn::Idle);
        assert_eq!(conv.messages().len(), 2);
    }

    #[test]
    fn test_reset_ignored_while_submitting() {
        let mut conv = Conversation::new();
        submitted(&mut conv, "hello");

        conv.apply(Event::ResetRequested);
        assert_eq!(conv.turn(), Turn::Submitting);
        assert_eq!(conv.messages().len(), 1);
    }

    #[test]
    fn test_copy_never_mutates() {
        let mut conv = Conversation::new();
        submitted(&mut conv, "hello");
        conv.apply(Event::Resolved {
            raw: "<think>x</think>answer".to_string(),
        });

        let before = conv.clone();
        assert_eq!(conv.copy_target(), Some("answer"));
        assert_eq!(conv.copy_target(), Some("answer"));
        assert_eq!(conv.messages(), before.messages());
        assert_eq!(conv.turn(), before.turn());
    }

    #[test]
    fn test_copy_on_empty_conversation() {
        let conv = Conversation::new();
        assert_eq!(conv.copy_target(), None);
    }

    #[test]
    fn test_stale_completion_in_idle_ignored() {
        let mut conv = Conversation::new();

        conv.apply(Event::Resolved {
            raw: "orphan".to_string(),
        });
        assert!(conv.messages().is_empty());
    }
}
