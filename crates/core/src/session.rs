//! Per-respondent session store.
//!
//! An `InterviewSession` is plain data owned by one `Interview`. Only the state
//! machine mutates it, through the crate-private helpers below.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Respondent,
    Interviewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Respondent => "respondent",
            Role::Interviewer => "interviewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One turn in the append-only conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exchange {
    pub role: Role,
    pub content: String,
}

impl Exchange {
    pub fn respondent(content: impl Into<String>) -> Self {
        Self {
            role: Role::Respondent,
            content: content.into(),
        }
    }

    pub fn interviewer(content: impl Into<String>) -> Self {
        Self {
            role: Role::Interviewer,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum InterviewState {
    AwaitingConsent,
    InTopic {
        topic_index: usize,
        follow_up_count: usize,
    },
    Complete,
}

impl fmt::Display for InterviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterviewState::AwaitingConsent => write!(f, "awaiting consent"),
            InterviewState::InTopic {
                topic_index,
                follow_up_count,
            } => write!(f, "in topic {topic_index} (follow-up {follow_up_count})"),
            InterviewState::Complete => write!(f, "complete"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterviewSession {
    consent: bool,
    topic_index: usize,
    follow_up_count: usize,
    exchange_log: Vec<Exchange>,
}

impl InterviewSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn consent(&self) -> bool {
        self.consent
    }

    pub fn topic_index(&self) -> usize {
        self.topic_index
    }

    pub fn follow_up_count(&self) -> usize {
        self.follow_up_count
    }

    pub fn exchange_log(&self) -> &[Exchange] {
        &self.exchange_log
    }

    pub fn state(&self, topic_count: usize) -> InterviewState {
        if !self.consent {
            InterviewState::AwaitingConsent
        } else if self.topic_index >= topic_count {
            InterviewState::Complete
        } else {
            InterviewState::InTopic {
                topic_index: self.topic_index,
                follow_up_count: self.follow_up_count,
            }
        }
    }

    pub(crate) fn grant_consent(&mut self) {
        self.consent = true;
    }

    pub(crate) fn append(&mut self, exchange: Exchange) {
        self.exchange_log.push(exchange);
    }

    pub(crate) fn record_follow_up(&mut self) {
        self.follow_up_count += 1;
    }

    /// Moves to the next topic. Topic index is monotonic until a reset.
    pub(crate) fn advance_topic(&mut self) {
        self.topic_index += 1;
        self.follow_up_count = 0;
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Read-only view of a session handed to the UI layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub state: InterviewState,
    pub consent: bool,
    pub topic_index: usize,
    pub follow_up_count: usize,
    pub topic_count: usize,
    pub current_topic: Option<String>,
    pub exchange_log: Vec<Exchange>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_awaits_consent() {
        let session = InterviewSession::new();
        assert_eq!(session.state(3), InterviewState::AwaitingConsent);
        assert!(session.exchange_log().is_empty());
    }

    #[test]
    fn advancing_resets_follow_ups() {
        let mut session = InterviewSession::new();
        session.grant_consent();
        session.record_follow_up();
        assert_eq!(
            session.state(2),
            InterviewState::InTopic {
                topic_index: 0,
                follow_up_count: 1
            }
        );
        session.advance_topic();
        assert_eq!(session.follow_up_count(), 0);
        session.advance_topic();
        assert_eq!(session.state(2), InterviewState::Complete);
    }

    #[test]
    fn clear_restores_initial_values() {
        let mut session = InterviewSession::new();
        session.grant_consent();
        session.append(Exchange::respondent("hello"));
        session.advance_topic();
        session.clear();
        assert_eq!(session, InterviewSession::default());
    }

    #[test]
    fn state_serializes_with_tag() {
        let json = serde_json::to_value(InterviewState::InTopic {
            topic_index: 1,
            follow_up_count: 0,
        })
        .unwrap();
        assert_eq!(json["state"], "in_topic");
        assert_eq!(json["topic_index"], 1);
    }
}
