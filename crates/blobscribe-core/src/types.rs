use std::fmt;

/// Chunk length used when reading blobs into the push stream.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// A slice of raw audio bytes pushed into a recognizer's input stream.
///
/// A zero-length chunk marks end-of-stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    data: Vec<u8>,
}

impl AudioChunk {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn end_of_stream() -> Self {
        Self { data: Vec::new() }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_end_of_stream(&self) -> bool {
        self.data.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancellationReason {
    /// The audio stream was exhausted.
    EndOfStream,
    /// The engine hit an error; see the error code and details.
    Error,
    CancelledByUser,
}

impl fmt::Display for CancellationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EndOfStream => "EndOfStream",
            Self::Error => "Error",
            Self::CancelledByUser => "CancelledByUser",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancellationErrorCode {
    NoError,
    AuthenticationFailure,
    BadRequest,
    TooManyRequests,
    Forbidden,
    ConnectionFailure,
    ServiceTimeout,
    ServiceError,
    ServiceUnavailable,
    RuntimeError,
}

impl fmt::Display for CancellationErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoError => "NoError",
            Self::AuthenticationFailure => "AuthenticationFailure",
            Self::BadRequest => "BadRequest",
            Self::TooManyRequests => "TooManyRequests",
            Self::Forbidden => "Forbidden",
            Self::ConnectionFailure => "ConnectionFailure",
            Self::ServiceTimeout => "ServiceTimeout",
            Self::ServiceError => "ServiceError",
            Self::ServiceUnavailable => "ServiceUnavailable",
            Self::RuntimeError => "RuntimeError",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancellationDetails {
    pub reason: CancellationReason,
    pub error_code: CancellationErrorCode,
    pub error_details: String,
}

impl CancellationDetails {
    pub fn end_of_stream() -> Self {
        Self {
            reason: CancellationReason::EndOfStream,
            error_code: CancellationErrorCode::NoError,
            error_details: String::new(),
        }
    }

    pub fn error(code: CancellationErrorCode, details: impl Into<String>) -> Self {
        Self {
            reason: CancellationReason::Error,
            error_code: code,
            error_details: details.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.reason == CancellationReason::Error
    }
}

/// What a final result turned out to be. Exactly one per `FinalResult`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionOutcome {
    RecognizedSpeech { text: String },
    NoMatch,
    Canceled(CancellationDetails),
}

/// Events emitted by a recognizer while a continuous session runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    InterimResult {
        session_id: String,
        text: String,
    },
    FinalResult {
        session_id: String,
        outcome: RecognitionOutcome,
    },
    Canceled {
        session_id: String,
        details: CancellationDetails,
    },
    SessionStarted {
        session_id: String,
    },
    SessionStopped {
        session_id: String,
    },
}

impl RecognitionEvent {
    pub fn session_id(&self) -> &str {
        match self {
            Self::InterimResult { session_id, .. }
            | Self::FinalResult { session_id, .. }
            | Self::Canceled { session_id, .. }
            | Self::SessionStarted { session_id }
            | Self::SessionStopped { session_id } => session_id,
        }
    }

    /// `Canceled` and `SessionStopped` end a session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Canceled { .. } | Self::SessionStopped { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::InterimResult { .. } => "interim_result",
            Self::FinalResult { .. } => "final_result",
            Self::Canceled { .. } => "canceled",
            Self::SessionStarted { .. } => "session_started",
            Self::SessionStopped { .. } => "session_stopped",
        }
    }
}

/// How a recognition session came to an end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    SessionStopped,
    Canceled(CancellationDetails),
    /// The wait deadline elapsed before the engine reported a terminal event.
    TimedOut,
    /// The caller cancelled the session.
    Aborted,
    /// The engine dropped its event sender without a terminal event.
    EngineDisconnected,
}

impl Termination {
    pub fn code(&self) -> i32 {
        match self {
            Self::SessionStopped => 0,
            Self::Canceled(details) if !details.is_error() => 0,
            Self::Canceled(_) => 1,
            Self::TimedOut => 2,
            Self::Aborted => 3,
            Self::EngineDisconnected => 4,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.code() != 0
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionStopped => f.write_str("session stopped"),
            Self::Canceled(details) if details.is_error() => write!(
                f,
                "canceled ({}: {})",
                details.error_code, details.error_details
            ),
            Self::Canceled(details) => write!(f, "canceled ({})", details.reason),
            Self::TimedOut => f.write_str("timed out"),
            Self::Aborted => f.write_str("aborted"),
            Self::EngineDisconnected => f.write_str("engine disconnected"),
        }
    }
}

/// A named byte stream handed to the pipeline by a trigger.
pub struct BlobInput<R> {
    pub name: String,
    pub size: Option<u64>,
    pub reader: R,
}

impl<R> BlobInput<R> {
    pub fn new(name: impl Into<String>, size: Option<u64>, reader: R) -> Self {
        Self {
            name: name.into(),
            size,
            reader,
        }
    }
}
