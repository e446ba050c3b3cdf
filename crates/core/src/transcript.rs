//! Transcript export.
//!
//! Output only depends on the log, so exporting an unchanged log twice gives the
//! same bytes.

use crate::error::ExportError;
use crate::session::{Exchange, Role};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranscriptFormat {
    #[default]
    Csv,
    Text,
}

impl TranscriptFormat {
    pub fn file_name(&self) -> &'static str {
        match self {
            TranscriptFormat::Csv => "interview_transcript.csv",
            TranscriptFormat::Text => "interview_transcript.txt",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            TranscriptFormat::Csv => "text/csv",
            TranscriptFormat::Text => "text/plain",
        }
    }
}

impl std::str::FromStr for TranscriptFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(TranscriptFormat::Csv),
            "text" | "txt" => Ok(TranscriptFormat::Text),
            other => Err(format!("unknown transcript format '{other}'")),
        }
    }
}

#[derive(Serialize)]
struct Row<'a> {
    role: &'static str,
    content: &'a str,
}

pub fn export(log: &[Exchange], format: TranscriptFormat) -> Result<Vec<u8>, ExportError> {
    match format {
        TranscriptFormat::Csv => export_csv(log),
        TranscriptFormat::Text => Ok(export_text(log).into_bytes()),
    }
}

fn export_csv(log: &[Exchange]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if log.is_empty() {
        writer.write_record(["role", "content"])?;
    }
    for exchange in log {
        writer.serialize(Row {
            role: exchange.role.as_str(),
            content: &exchange.content,
        })?;
    }
    writer
        .into_inner()
        .map_err(|e| ExportError::Flush(e.to_string()))
}

fn export_text(log: &[Exchange]) -> String {
    let mut out = String::new();
    for (i, exchange) in log.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let label = match exchange.role {
            Role::Respondent => "Respondent:",
            Role::Interviewer => "Interviewer:",
        };
        out.push_str(label);
        out.push('\n');
        for line in exchange.content.lines() {
            out.push_str("    ");
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}
