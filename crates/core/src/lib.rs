pub mod error;
pub mod gateway;
pub mod interview;
pub mod offline;
pub mod prompt;
pub mod secrets;
pub mod session;
pub mod settings;
pub mod topic;
pub mod transcript;

pub use error::{ConfigurationError, ExportError, GatewayError, ValidationError};
pub use gateway::{Gateway, OpenAiGateway};
pub use interview::{Interview, TurnOutcome, APOLOGY};
pub use offline::OfflineGateway;
pub use prompt::{CompletionRequest, Directives, ResponseMode};
pub use session::{Exchange, InterviewState, Role, SessionSnapshot};
pub use settings::InterviewSettings;
pub use topic::TopicList;
pub use transcript::{export, TranscriptFormat};
