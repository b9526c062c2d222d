//! Conversation state and the single request/response cycle
//!
//! A [`ChatSession`] owns the conversation log, the draft being typed and the
//! "awaiting response" flag. At most one generate request is outstanding at a
//! time; submissions made while one is in flight are dropped, not queued.

use std::fmt;
use std::sync::Arc;

use crate::ai::Generator;
use crate::error::RequestFailed;
use crate::state::{ChatMessage, ChatRole};

/// Answer shown in place of a real one whenever a request fails.
pub const FALLBACK_MESSAGE: &str = "Sorry - Something went wrong. Please try again!";

/// State transitions reported to the session observer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    MessageAppended(ChatRole),
    AwaitingChanged(bool),
}

pub type Observer = Box<dyn FnMut(&SessionEvent) + Send>;

pub struct ChatSession {
    messages: Vec<ChatMessage>,
    draft: String,
    awaiting_response: bool,
    generator: Arc<dyn Generator>,
    observer: Option<Observer>,
}

/// A request accepted by [`ChatSession::begin`] that has not been sent yet.
///
/// It owns everything it needs, so `send()` can be spawned onto a runtime
/// while the session keeps serving the UI.
pub struct PendingRequest {
    prompt: String,
    generator: Arc<dyn Generator>,
}

impl PendingRequest {
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub async fn send(self) -> Result<String, RequestFailed> {
        self.generator.generate(&self.prompt).await
    }
}

impl ChatSession {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            messages: Vec::new(),
            draft: String::new(),
            awaiting_response: false,
            generator,
            observer: None,
        }
    }

    /// Register the callback that is told about every state change.
    pub fn with_observer(mut self, observer: impl FnMut(&SessionEvent) + Send + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last_answer(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::Answer)
            .map(|m| m.content.as_str())
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut String {
        &mut self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn is_awaiting_response(&self) -> bool {
        self.awaiting_response
    }

    /// Whether `text` would be accepted right now.
    pub fn can_submit(&self, text: &str) -> bool {
        !self.awaiting_response && !text.trim().is_empty()
    }

    /// Accept a submission: log the question, clear the draft and mark the
    /// session busy. Returns `None` (and changes nothing) when rejected.
    pub fn begin(&mut self, draft_text: &str) -> Option<PendingRequest> {
        if !self.can_submit(draft_text) {
            tracing::debug!(
                awaiting = self.awaiting_response,
                "submission rejected"
            );
            return None;
        }

        self.append(ChatMessage::question(draft_text));

        self.draft.clear();
        self.set_awaiting(true);

        tracing::debug!(prompt_len = draft_text.len(), "request issued");
        Some(PendingRequest {
            prompt: draft_text.to_string(),
            generator: Arc::clone(&self.generator),
        })
    }

    /// Same as [`begin`](Self::begin) using the current draft.
    pub fn begin_draft(&mut self) -> Option<PendingRequest> {
        let draft = self.draft.clone();
        self.begin(&draft)
    }

    /// Completion handler for the outstanding request.
    pub fn finish(&mut self, outcome: Result<String, RequestFailed>) {
        if !self.awaiting_response {
            tracing::warn!("finish called with no outstanding request, ignoring");
            return;
        }

        let answer = match outcome {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "generate request failed");
                FALLBACK_MESSAGE.to_string()
            }
        };
        self.append(ChatMessage::answer(answer));

        self.set_awaiting(false);
    }

    /// Run one full cycle. Returns whether the submission was accepted.
    pub async fn submit(&mut self, draft_text: &str) -> bool {
        let Some(request) = self.begin(draft_text) else {
            return false;
        };
        let outcome = request.send().await;
        self.finish(outcome);
        true
    }

    pub async fn submit_draft(&mut self) -> bool {
        let draft = self.draft.clone();
        self.submit(&draft).await
    }

    fn append(&mut self, message: ChatMessage) {
        let role = message.role;
        self.messages.push(message);
        self.notify(SessionEvent::MessageAppended(role));
    }

    fn set_awaiting(&mut self, awaiting: bool) {
        self.awaiting_response = awaiting;
        self.notify(SessionEvent::AwaitingChanged(awaiting));
    }

    fn notify(&mut self, event: SessionEvent) {
        if let Some(observer) = self.observer.as_mut() {
            observer(&event);
        }
    }
}

impl fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatSession")
            .field("messages", &self.messages)
            .field("draft", &self.draft)
            .field("awaiting_response", &self.awaiting_response)
            .finish_non_exhaustive()
    }
}
