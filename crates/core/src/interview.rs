use crate::error::{ConfigurationError, GatewayError, ValidationError};
use crate::gateway::Gateway;
use crate::prompt::{self, ComposeInput, CompletionRequest, Directives, ResponseMode};
use crate::session::{Exchange, InterviewSession, InterviewState, SessionSnapshot};
use crate::settings::InterviewSettings;
use crate::topic::TopicList;
use std::time::Duration;

/// Shown in place of a model reply when the gateway fails.
pub const APOLOGY: &str = "I'm sorry, I had trouble responding just now. Let's carry on.";

/// Result of one successfully accepted answer.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// The interviewer exchange that was appended to the log.
    pub reply: String,
    pub gateway_failed: bool,
    pub state: InterviewState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    FollowUp,
    NextTopic(usize),
    Finish,
}

impl Transition {
    fn mode(&self) -> ResponseMode {
        match self {
            Transition::FollowUp => ResponseMode::FollowUp,
            Transition::NextTopic(_) => ResponseMode::Transition,
            Transition::Finish => ResponseMode::Feedback,
        }
    }
}

/// Orchestrates one respondent's interview.
///
/// `Interview` owns the session exclusively and every operation takes `&mut self`,
/// so mutations can never interleave. The gateway is passed per call: the
/// interview decides what to ask, the caller decides who answers.
pub struct Interview {
    settings: InterviewSettings,
    topics: TopicList,
    directives: Directives,
    session: InterviewSession,
    gateway_timeout: Option<Duration>,
}

impl Interview {
    pub fn new(settings: InterviewSettings, directives: Directives) -> Result<Self, ConfigurationError> {
        settings.validate()?;
        let topics = settings.topic_list()?;
        Ok(Self {
            settings,
            topics,
            directives,
            session: InterviewSession::new(),
            gateway_timeout: None,
        })
    }

    /// Bounds each gateway call. An elapsed bound counts as a gateway failure.
    pub fn with_gateway_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.gateway_timeout = timeout;
        self
    }

    pub fn settings(&self) -> &InterviewSettings {
        &self.settings
    }

    pub fn topics(&self) -> &TopicList {
        &self.topics
    }

    pub fn state(&self) -> InterviewState {
        self.session.state(self.topics.len())
    }

    pub fn current_topic(&self) -> Option<&str> {
        match self.state() {
            InterviewState::InTopic { topic_index, .. } => self.topics.get(topic_index),
            _ => None,
        }
    }

    pub fn exchange_log(&self) -> &[Exchange] {
        self.session.exchange_log()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state(),
            consent: self.session.consent(),
            topic_index: self.session.topic_index(),
            follow_up_count: self.session.follow_up_count(),
            topic_count: self.topics.len(),
            current_topic: self.current_topic().map(str::to_string),
            exchange_log: self.session.exchange_log().to_vec(),
        }
    }

    pub fn give_consent(&mut self, consent: bool) -> Result<InterviewState, ValidationError> {
        let state = self.state();
        if state != InterviewState::AwaitingConsent {
            return Err(ValidationError::IllegalState {
                operation: "give_consent",
                state: state.to_string(),
            });
        }
        if !consent {
            tracing::info!("Respondent declined consent");
            return Err(ValidationError::NotStarted);
        }
        self.session.grant_consent();
        tracing::info!("Consent given, starting topic 1 of {}", self.topics.len());
        Ok(self.state())
    }

    pub async fn submit_answer<G>(
        &mut self,
        gateway: &G,
        text: &str,
    ) -> Result<TurnOutcome, ValidationError>
    where
        G: Gateway + ?Sized,
    {
        let topic_index = self.require_in_topic("submit_answer")?;
        let answer = text.trim();
        if answer.is_empty() {
            return Err(ValidationError::EmptyAnswer);
        }

        let transition = self.plan_transition();
        let request = self.compose(topic_index, transition, answer);
        tracing::debug!(
            "Composed {} request with {} context messages",
            request.mode.as_str(),
            request.context.len()
        );

        let (mut reply, gateway_failed) = match self.call_gateway(gateway, &request).await {
            Ok(text) => (text, false),
            Err(err) => {
                tracing::warn!("Gateway failure on topic {}: {}", topic_index + 1, err);
                (APOLOGY.to_string(), true)
            }
        };
        if let Transition::NextTopic(next) = transition {
            if let Some(prompt) = self.topics.get(next) {
                reply.push_str("\n\n");
                reply.push_str(prompt);
            }
        }
        // Both sides land together, after the call, so a dropped future leaves no trace.
        self.session.append(Exchange::respondent(answer));
        self.session.append(Exchange::interviewer(reply.clone()));

        self.apply(transition);
        Ok(TurnOutcome {
            reply,
            gateway_failed,
            state: self.state(),
        })
    }

    /// Moves to the next topic without a model call or a log entry.
    pub fn skip_topic(&mut self) -> Result<InterviewState, ValidationError> {
        let topic_index = self.require_in_topic("skip_topic")?;
        self.session.advance_topic();
        tracing::info!("Skipped topic {}", topic_index + 1);
        Ok(self.state())
    }

    /// Discards the whole session, including the exchange log.
    pub fn reset(&mut self) {
        self.session.clear();
        tracing::info!("Session reset");
    }

    fn require_in_topic(&self, operation: &'static str) -> Result<usize, ValidationError> {
        match self.state() {
            InterviewState::InTopic { topic_index, .. } => Ok(topic_index),
            InterviewState::AwaitingConsent => Err(ValidationError::NotStarted),
            InterviewState::Complete => {
                tracing::debug!("{} rejected, interview complete", operation);
                Err(ValidationError::Complete)
            }
        }
    }

    fn plan_transition(&self) -> Transition {
        if self.session.follow_up_count() < self.settings.follow_up_limit {
            return Transition::FollowUp;
        }
        let next = self.session.topic_index() + 1;
        if next < self.topics.len() {
            Transition::NextTopic(next)
        } else {
            Transition::Finish
        }
    }

    fn compose(
        &self,
        topic_index: usize,
        transition: Transition,
        answer: &str,
    ) -> CompletionRequest {
        let next_topic = match transition {
            Transition::NextTopic(next) => self.topics.get(next),
            _ => None,
        };
        let input = ComposeInput {
            mode: transition.mode(),
            topics: &self.topics,
            current_topic: self.topics.get(topic_index).unwrap_or_default(),
            next_topic,
            history: self.session.exchange_log(),
            answer,
            context_window: self.settings.context_window,
            max_output_tokens: self.settings.max_output_tokens,
            temperature: self.settings.temperature,
        };
        prompt::compose(&self.directives, &input)
    }

    async fn call_gateway<G>(
        &self,
        gateway: &G,
        request: &CompletionRequest,
    ) -> Result<String, GatewayError>
    where
        G: Gateway + ?Sized,
    {
        let result = match self.gateway_timeout {
            Some(limit) => tokio::time::timeout(limit, gateway.complete(request))
                .await
                .unwrap_or(Err(GatewayError::Timeout)),
            None => gateway.complete(request).await,
        };
        match result {
            Ok(text) if text.trim().is_empty() => Err(GatewayError::EmptyResponse),
            Ok(text) => Ok(text.trim().to_string()),
            Err(err) => Err(err),
        }
    }

    fn apply(&mut self, transition: Transition) {
        match transition {
            Transition::FollowUp => {
                self.session.record_follow_up();
                tracing::info!(
                    "Follow-up {} of {} on topic {}",
                    self.session.follow_up_count(),
                    self.settings.follow_up_limit,
                    self.session.topic_index() + 1
                );
            }
            Transition::NextTopic(next) => {
                self.session.advance_topic();
                tracing::info!("Moving to topic {} of {}", next + 1, self.topics.len());
            }
            Transition::Finish => {
                self.session.advance_topic();
                tracing::info!("Interview complete");
            }
        }
    }
}
