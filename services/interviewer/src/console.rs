//! Line-oriented terminal front end.
//!
//! The console renders the interview and turns each line the respondent types
//! into exactly one state-machine operation. It never talks to the gateway
//! itself; it hands the gateway to `Interview::submit_answer`.

use anyhow::{Context, Result};
use interview_core::{export, Gateway, Interview, InterviewState, TranscriptFormat};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};

const MAX_PASSWORD_ATTEMPTS: usize = 3;

const CONSENT_TEXT: &str = "This is a short research interview about your experience. Your answers \
are recorded in a transcript that is saved at the end of the session. You can skip any question \
and you can stop at any time.";

const HELP_TEXT: &str =
    "Commands: /skip (next question), /reset (discard everything), /export (save transcript), /quit";

pub struct ConsoleOptions {
    pub password: Option<String>,
    pub format: TranscriptFormat,
    pub transcript_dir: PathBuf,
}

#[derive(Debug, PartialEq, Eq)]
enum Action {
    Answer(String),
    Skip,
    Reset,
    Export,
    Help,
    Quit,
}

impl Action {
    fn parse(line: &str) -> Self {
        match line.trim() {
            "/skip" => Action::Skip,
            "/reset" => Action::Reset,
            "/export" => Action::Export,
            "/help" => Action::Help,
            "/quit" | "/exit" => Action::Quit,
            other if other.starts_with('/') => Action::Help,
            _ => Action::Answer(line.to_string()),
        }
    }
}

pub struct Console<R, W> {
    lines: Lines<R>,
    out: W,
    options: ConsoleOptions,
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(input: R, out: W, options: ConsoleOptions) -> Self {
        Self {
            lines: input.lines(),
            out,
            options,
        }
    }

    pub async fn run<G>(&mut self, interview: &mut Interview, gateway: &G) -> Result<()>
    where
        G: Gateway + ?Sized,
    {
        if !self.check_password().await? {
            return Ok(());
        }

        let mut shown_topic: Option<usize> = None;
        let mut saved = false;
        loop {
            match interview.state() {
                InterviewState::AwaitingConsent => {
                    if !self.request_consent(interview).await? {
                        return Ok(());
                    }
                    shown_topic = None;
                    saved = false;
                }
                InterviewState::InTopic { topic_index, .. } => {
                    if shown_topic != Some(topic_index) {
                        self.show_topic(interview, topic_index, true).await?;
                        shown_topic = Some(topic_index);
                    }
                    let Some(line) = self.ask("> ").await? else {
                        return Ok(());
                    };
                    match Action::parse(&line) {
                        Action::Quit => return Ok(()),
                        Action::Help => self.say(HELP_TEXT).await?,
                        Action::Export => self.save(interview).await?,
                        Action::Reset => {
                            interview.reset();
                            self.say("Session cleared.").await?;
                        }
                        Action::Skip => {
                            if let Err(err) = interview.skip_topic() {
                                self.say(&err.to_string()).await?;
                            }
                        }
                        Action::Answer(text) => {
                            match interview.submit_answer(gateway, &text).await {
                                Ok(outcome) => {
                                    self.say(&format!("\nInterviewer: {}", outcome.reply)).await?;
                                    if let InterviewState::InTopic { topic_index: next, .. } =
                                        outcome.state
                                    {
                                        if next != topic_index {
                                            // The reply already ends with the next prompt.
                                            self.show_topic(interview, next, false).await?;
                                            shown_topic = Some(next);
                                        }
                                    }
                                }
                                Err(err) => {
                                    self.say(&format!("{}. Please try again.", capitalise(&err.to_string())))
                                        .await?;
                                }
                            }
                        }
                    }
                }
                InterviewState::Complete => {
                    if !saved {
                        self.say("\nThank you, the interview is complete.").await?;
                        self.save(interview).await?;
                        self.say("Type /reset to start again or /quit to leave.").await?;
                        saved = true;
                    }
                    let Some(line) = self.ask("> ").await? else {
                        return Ok(());
                    };
                    match Action::parse(&line) {
                        Action::Quit => return Ok(()),
                        Action::Export => self.save(interview).await?,
                        Action::Reset => {
                            interview.reset();
                            self.say("Session cleared.").await?;
                        }
                        Action::Help => self.say(HELP_TEXT).await?,
                        Action::Skip | Action::Answer(_) => {
                            self.say("The interview is already complete.").await?;
                        }
                    }
                }
            }
        }
    }

    async fn check_password(&mut self) -> Result<bool> {
        let Some(expected) = self.options.password.clone() else {
            return Ok(true);
        };
        for _ in 0..MAX_PASSWORD_ATTEMPTS {
            let Some(line) = self.ask("Password: ").await? else {
                return Ok(false);
            };
            if line.trim() == expected {
                return Ok(true);
            }
            tracing::warn!("Rejected password attempt");
            self.say("Incorrect password.").await?;
        }
        self.say("Too many attempts.").await?;
        Ok(false)
    }

    /// Returns false when input ends before consent is given.
    async fn request_consent(&mut self, interview: &mut Interview) -> Result<bool> {
        self.say(CONSENT_TEXT).await?;
        loop {
            let Some(line) = self.ask("Do you consent to take part? [y/n] ").await? else {
                return Ok(false);
            };
            let consent = match line.trim().to_ascii_lowercase().as_str() {
                "y" | "yes" => true,
                "n" | "no" => false,
                "/quit" | "/exit" => return Ok(false),
                _ => continue,
            };
            match interview.give_consent(consent) {
                Ok(_) => {
                    self.say(HELP_TEXT).await?;
                    return Ok(true);
                }
                Err(err) => self.say(&capitalise(&err.to_string())).await?,
            }
        }
    }

    async fn show_topic(
        &mut self,
        interview: &Interview,
        topic_index: usize,
        with_prompt: bool,
    ) -> Result<()> {
        let total = interview.topics().len();
        self.say(&format!("\nQuestion {} of {}", topic_index + 1, total))
            .await?;
        if with_prompt {
            if let Some(prompt) = interview.topics().get(topic_index) {
                self.say(prompt).await?;
            }
        }
        Ok(())
    }

    async fn save(&mut self, interview: &Interview) -> Result<()> {
        let path = save_transcript(interview, self.options.format, &self.options.transcript_dir)?;
        self.say(&format!(
            "Transcript saved to {} ({})",
            path.display(),
            self.options.format.mime_type()
        ))
        .await
    }

    async fn say(&mut self, text: &str) -> Result<()> {
        self.out.write_all(text.as_bytes()).await?;
        self.out.write_all(b"\n").await?;
        self.out.flush().await?;
        Ok(())
    }

    async fn ask(&mut self, prompt: &str) -> Result<Option<String>> {
        self.out.write_all(prompt.as_bytes()).await?;
        self.out.flush().await?;
        self.lines
            .next_line()
            .await
            .context("Failed to read from input")
    }
}

pub fn save_transcript(
    interview: &Interview,
    format: TranscriptFormat,
    dir: &Path,
) -> Result<PathBuf> {
    let bytes = export(interview.exchange_log(), format).context("Failed to export transcript")?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create transcript directory: {}", dir.display()))?;
    let path = dir.join(format.file_name());
    std::fs::write(&path, bytes)
        .with_context(|| format!("Failed to write transcript: {}", path.display()))?;
    tracing::info!(
        "Wrote {} exchanges to {}",
        interview.exchange_log().len(),
        path.display()
    );
    Ok(path)
}

fn capitalise(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
