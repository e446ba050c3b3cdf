mod config;
mod console;
mod prompt_loader;

use crate::config::Config;
use crate::console::{Console, ConsoleOptions};
use anyhow::{Context, Result};
use clap::Parser;
use interview_core::secrets::{self, ChainedSecrets, EnvSecrets, FileSecrets};
use interview_core::{
    Gateway, Interview, InterviewSettings, OfflineGateway, OpenAiGateway, TranscriptFormat,
};
use std::path::PathBuf;
use tokio::io::BufReader;
use tracing_subscriber::fmt::time::ChronoLocal;

#[derive(Parser)]
#[command(version, about = "Run a semi-structured interview in the terminal")]
struct Cli {
    /// Interview JSON (topics and model parameters). Overrides INTERVIEW_CONFIG.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory of directive overrides. Overrides PROMPTS_DIR.
    #[arg(long)]
    prompts: Option<PathBuf>,
    /// Use canned replies instead of calling the model provider.
    #[arg(long)]
    offline: bool,
    /// Transcript format: csv or text.
    #[arg(long, default_value = "csv")]
    format: TranscriptFormat,
    /// Directory to write the transcript to. Overrides TRANSCRIPT_DIR.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Initialize Logging ---
    // Logs go to stderr so the dialogue on stdout stays readable.
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Configuration loaded successfully. Starting interviewer...");

    // --- 3. Parse Command-Line Arguments ---
    let args = Cli::parse();
    let settings_path = args.config.unwrap_or_else(|| config.interview_config.clone());
    let prompts_dir = args.prompts.unwrap_or_else(|| config.prompts_dir.clone());
    let transcript_dir = args.out.unwrap_or_else(|| config.transcript_dir.clone());

    // --- 4. Load Interview Settings and Directives ---
    let settings = InterviewSettings::from_file(&settings_path).with_context(|| {
        format!("Failed to load interview settings from {}", settings_path.display())
    })?;
    tracing::info!(
        "Loaded {} topics (follow-up limit {}, context window {})",
        settings.topics.len(),
        settings.follow_up_limit,
        settings.context_window
    );
    let directives =
        prompt_loader::load_directives(&prompts_dir).context("Failed to load prompt directives")?;

    // --- 5. Initialize the Gateway ---
    let (gateway, gateway_timeout) = if args.offline {
        tracing::info!("Running offline; replies are canned");
        (Box::new(OfflineGateway) as Box<dyn Gateway>, None)
    } else {
        let mut provider = ChainedSecrets::new();
        if let Some(path) = &config.secrets_file {
            provider = provider.with(FileSecrets::load(path).context("Failed to load secrets file")?);
        }
        provider = provider.with(EnvSecrets);
        let api_key = secrets::require(&provider, secrets::OPENAI_API_KEY)
            .context("Model provider credential is required unless --offline is set")?;

        let gateway = OpenAiGateway::builder(api_key)
            .with_model(&config.chat_model)
            .with_base_url(&config.base_url)
            .with_request_timeout(settings.request_timeout())
            .with_retry_max_elapsed(settings.retry_max_elapsed())
            .build()
            .context("Failed to build model gateway")?;
        tracing::info!("Using model {}", gateway.model());

        // Outer bound covers one request plus the retry window.
        let timeout = settings
            .request_timeout()
            .map(|t| t + settings.retry_max_elapsed().unwrap_or_default());
        (Box::new(gateway) as Box<dyn Gateway>, timeout)
    };

    // --- 6. Run the Interview ---
    let mut interview = Interview::new(settings, directives)
        .context("Invalid interview configuration")?
        .with_gateway_timeout(gateway_timeout);

    let options = ConsoleOptions {
        password: config.password.clone(),
        format: args.format,
        transcript_dir,
    };
    let mut console = Console::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout(), options);
    console.run(&mut interview, gateway.as_ref()).await?;

    tracing::info!(
        "Interviewer finished with {} exchanges in the log",
        interview.exchange_log().len()
    );
    Ok(())
}
