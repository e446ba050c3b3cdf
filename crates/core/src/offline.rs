use crate::error::GatewayError;
use crate::gateway::Gateway;
use crate::prompt::{CompletionRequest, ResponseMode};
use async_trait::async_trait;

/// A `Gateway` that never leaves the process.
///
/// Replies are fixed per response mode, which is enough to walk through a
/// whole interview without a provider credential.
pub struct OfflineGateway;

impl OfflineGateway {
    pub fn reply_for(mode: ResponseMode) -> &'static str {
        match mode {
            ResponseMode::FollowUp => {
                "Thank you, that's helpful. Could you give me a concrete example of what you mean?"
            }
            ResponseMode::Transition => "Thank you for sharing that. Let's move on.",
            ResponseMode::Feedback => {
                "Thank you, that's a thoughtful answer and it brings our interview to a close."
            }
        }
    }
}

#[async_trait]
impl Gateway for OfflineGateway {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GatewayError> {
        tracing::debug!("Offline gateway answering in {} mode", request.mode.as_str());
        Ok(Self::reply_for(request.mode).to_string())
    }
}
