//! Diagnostic lines and the per-session report.

use crate::feeder::FeedStats;
use blobscribe_core::{CancellationDetails, RecognitionEvent, RecognitionOutcome, Termination};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineLevel {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticLine {
    pub level: LineLevel,
    pub text: String,
}

impl DiagnosticLine {
    fn new(level: LineLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }
}

/// Human-readable lines describing one event.
pub fn event_lines(event: &RecognitionEvent) -> Vec<DiagnosticLine> {
    match event {
        RecognitionEvent::InterimResult { text, .. } => {
            vec![DiagnosticLine::new(LineLevel::Debug, format!("RECOGNIZING: Text={text}"))]
        }
        RecognitionEvent::FinalResult { outcome, .. } => match outcome {
            RecognitionOutcome::RecognizedSpeech { text } => {
                vec![DiagnosticLine::new(LineLevel::Info, format!("RECOGNIZED: Text={text}"))]
            }
            RecognitionOutcome::NoMatch => vec![DiagnosticLine::new(
                LineLevel::Info,
                "NOMATCH: Speech could not be recognized.",
            )],
            RecognitionOutcome::Canceled(details) => cancellation_lines(details),
        },
        RecognitionEvent::Canceled { details, .. } => cancellation_lines(details),
        RecognitionEvent::SessionStarted { .. } => {
            vec![DiagnosticLine::new(LineLevel::Info, "Session started event.")]
        }
        RecognitionEvent::SessionStopped { .. } => vec![
            DiagnosticLine::new(LineLevel::Info, "Session stopped event."),
            DiagnosticLine::new(LineLevel::Info, "Stop recognition."),
        ],
    }
}

fn cancellation_lines(details: &CancellationDetails) -> Vec<DiagnosticLine> {
    if !details.is_error() {
        return vec![DiagnosticLine::new(
            LineLevel::Info,
            format!("CANCELED: Reason={}", details.reason),
        )];
    }
    vec![
        DiagnosticLine::new(LineLevel::Warn, format!("CANCELED: Reason={}", details.reason)),
        DiagnosticLine::new(
            LineLevel::Error,
            format!("CANCELED: ErrorCode={}", details.error_code),
        ),
        DiagnosticLine::new(
            LineLevel::Error,
            format!("CANCELED: ErrorDetails={}", details.error_details),
        ),
        DiagnosticLine::new(
            LineLevel::Warn,
            "CANCELED: Did you update the subscription info?",
        ),
    ]
}

/// Writes a line through `tracing` at its level.
pub fn emit(line: &DiagnosticLine, blob: &str) {
    match line.level {
        LineLevel::Debug => tracing::debug!(blob = %blob, "{}", line.text),
        LineLevel::Info => tracing::info!(blob = %blob, "{}", line.text),
        LineLevel::Warn => tracing::warn!(blob = %blob, "{}", line.text),
        LineLevel::Error => tracing::error!(blob = %blob, "{}", line.text),
    }
}

/// Accumulates what a session recognized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    pub session_id: Option<String>,
    pub phrases: Vec<String>,
    pub no_match_count: usize,
    pub interim_count: usize,
}

impl Transcript {
    pub fn record(&mut self, event: &RecognitionEvent) {
        if self.session_id.is_none() {
            self.session_id = Some(event.session_id().to_string());
        }
        match event {
            RecognitionEvent::InterimResult { .. } => self.interim_count += 1,
            RecognitionEvent::FinalResult {
                outcome: RecognitionOutcome::RecognizedSpeech { text },
                ..
            } => self.phrases.push(text.clone()),
            RecognitionEvent::FinalResult {
                outcome: RecognitionOutcome::NoMatch,
                ..
            } => self.no_match_count += 1,
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub blob_name: String,
    pub session_id: Option<String>,
    pub phrases: Vec<String>,
    pub no_match_count: usize,
    pub interim_count: usize,
    pub feed: Option<FeedStats>,
    pub termination: Termination,
}

impl SessionReport {
    pub fn new(blob_name: impl Into<String>, transcript: Transcript, termination: Termination) -> Self {
        Self {
            blob_name: blob_name.into(),
            session_id: transcript.session_id,
            phrases: transcript.phrases,
            no_match_count: transcript.no_match_count,
            interim_count: transcript.interim_count,
            feed: None,
            termination,
        }
    }

    /// Recognized phrases joined with single spaces.
    pub fn transcript(&self) -> String {
        self.phrases.join(" ")
    }

    pub fn is_failure(&self) -> bool {
        self.termination.is_failure()
    }

    pub fn summary_line(&self) -> String {
        let bytes = self
            .feed
            .map(|f| format!(", {} bytes in {} chunks", f.bytes, f.chunks))
            .unwrap_or_default();
        format!(
            "{}: {} phrase(s), {} no-match{}, {}",
            self.blob_name,
            self.phrases.len(),
            self.no_match_count,
            bytes,
            self.termination
        )
    }
}
