//! Builds the payload for a single model call.
//!
//! Composition is pure: the same topic, log window and mode always yield the
//! same `CompletionRequest`. The model sees the whole topic plan as a framing
//! message but only the trailing window of the conversation.

use crate::session::{Exchange, Role};
use crate::topic::TopicList;
use serde::Serialize;

const DEFAULT_PERSONA: &str = "You are an experienced and considerate interviewer in higher education, \
focusing on AI applications. Use British English in your responses, including spellings like \
'democratised'. Ensure your responses are complete and not truncated. Avoid duplicating topics \
from the main interview questions.";

const DEFAULT_FEEDBACK: &str = "Give brief, warm feedback on the respondent's latest answer. \
Do not repeat earlier feedback and do not ask a new question.";

const DEFAULT_FOLLOW_UP: &str = "Give one short acknowledgement, then ask exactly one probing \
follow-up question derived strictly from the respondent's latest answer. The question must not \
duplicate any of the main interview questions.";

const DEFAULT_TRANSITION: &str = "Write one short, natural sentence that closes the current topic \
and bridges to the next one. Do not repeat earlier feedback and do not ask the next question \
yourself; it will be shown after your sentence.";

/// What the next model reply is supposed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    Feedback,
    FollowUp,
    Transition,
}

impl ResponseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseMode::Feedback => "feedback",
            ResponseMode::FollowUp => "follow_up",
            ResponseMode::Transition => "transition",
        }
    }
}

/// System directive texts. Each can be replaced from a prompt file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directives {
    pub persona: String,
    pub feedback: String,
    pub follow_up: String,
    pub transition: String,
}

impl Default for Directives {
    fn default() -> Self {
        Self {
            persona: DEFAULT_PERSONA.to_string(),
            feedback: DEFAULT_FEEDBACK.to_string(),
            follow_up: DEFAULT_FOLLOW_UP.to_string(),
            transition: DEFAULT_TRANSITION.to_string(),
        }
    }
}

impl Directives {
    pub fn for_mode(&self, mode: ResponseMode) -> &str {
        match mode {
            ResponseMode::Feedback => &self.feedback,
            ResponseMode::FollowUp => &self.follow_up,
            ResponseMode::Transition => &self.transition,
        }
    }

    /// Replaces the directive named `key` ("persona", "feedback", "follow_up",
    /// "transition"). Returns false for unknown keys.
    pub fn set(&mut self, key: &str, text: String) -> bool {
        let slot = match key {
            "persona" => &mut self.persona,
            "feedback" => &mut self.feedback,
            "follow_up" => &mut self.follow_up,
            "transition" => &mut self.transition,
            _ => return false,
        };
        *slot = text;
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

impl From<&Exchange> for ChatMessage {
    fn from(exchange: &Exchange) -> Self {
        let role = match exchange.role {
            Role::Respondent => ChatRole::User,
            Role::Interviewer => ChatRole::Assistant,
        };
        ChatMessage::new(role, exchange.content.clone())
    }
}

/// Everything a gateway needs for one completion.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub mode: ResponseMode,
    pub system_directive: String,
    pub framing: String,
    pub context: Vec<ChatMessage>,
    pub user_payload: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest {
    /// Flattens the request into provider wire order.
    pub fn messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.context.len() + 3);
        messages.push(ChatMessage::new(ChatRole::System, self.system_directive.clone()));
        messages.push(ChatMessage::new(ChatRole::System, self.framing.clone()));
        messages.extend(self.context.iter().cloned());
        messages.push(ChatMessage::new(ChatRole::User, self.user_payload.clone()));
        messages
    }
}

pub struct ComposeInput<'a> {
    pub mode: ResponseMode,
    pub topics: &'a TopicList,
    pub current_topic: &'a str,
    /// Only set for `ResponseMode::Transition`.
    pub next_topic: Option<&'a str>,
    /// Conversation preceding the answer being responded to.
    pub history: &'a [Exchange],
    pub answer: &'a str,
    pub context_window: usize,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

pub fn compose(directives: &Directives, input: &ComposeInput<'_>) -> CompletionRequest {
    let system_directive = format!(
        "{}\n\n{}",
        directives.persona.trim(),
        directives.for_mode(input.mode).trim()
    );

    let start = input.history.len().saturating_sub(input.context_window);
    let context = input.history[start..].iter().map(ChatMessage::from).collect();

    let mut user_payload = format!(
        "The respondent answered the question '{}' with: '{}'.",
        input.current_topic, input.answer
    );
    match (input.mode, input.next_topic) {
        (ResponseMode::Transition, Some(next)) => {
            user_payload.push_str(&format!(" The next question will be: '{next}'."));
        }
        (ResponseMode::Feedback, _) => {
            user_payload.push_str(" This was the final question of the interview.");
        }
        _ => {}
    }

    CompletionRequest {
        mode: input.mode,
        system_directive,
        framing: input.topics.framing_message(),
        context,
        user_payload,
        max_output_tokens: input.max_output_tokens,
        temperature: input.temperature,
    }
}
