use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    #[error("audio stream closed")]
    Closed,

    #[error("audio stream writer dropped before end of stream")]
    Truncated,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read audio source: {0}")]
    Read(#[from] std::io::Error),

    #[error("audio sink rejected chunk: {0}")]
    Sink(#[from] StreamError),

    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
}

#[derive(Debug, Error)]
pub enum RecognizerError {
    #[error("recognizer initialization failed: {0}")]
    InitializationFailed(String),

    #[error("failed to start continuous recognition: {0}")]
    StartFailed(String),

    #[error("failed to stop continuous recognition: {0}")]
    StopFailed(String),

    #[error("recognition engine not found: {0}")]
    EngineNotFound(String),

    #[error("recognizer not configured: {0}")]
    NotConfigured(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("audio ingestion failed: {0}")]
    Ingestion(#[from] IngestError),

    #[error("session configuration failed: {0}")]
    Configure(#[source] RecognizerError),

    #[error("session start failed: {0}")]
    Start(#[source] RecognizerError),

    #[error("session stop failed: {0}")]
    Stop(#[source] RecognizerError),

    #[error("cannot {operation} while session is {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("failed to watch blob container: {0}")]
    Watch(String),

    #[error("blob I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_wraps_ingest_error() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "truncated");
        let err: SessionError = IngestError::from(io).into();
        assert!(matches!(err, SessionError::Ingestion(IngestError::Read(_))));
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn test_invalid_state_message() {
        let err = SessionError::InvalidState {
            operation: "start",
            state: "Idle",
        };
        assert_eq!(err.to_string(), "cannot start while session is Idle");
    }

    #[test]
    fn test_stop_error_message_includes_engine_detail() {
        let err = SessionError::Stop(RecognizerError::StopFailed("socket reset".to_string()));
        assert!(err.to_string().contains("socket reset"));
    }
}
