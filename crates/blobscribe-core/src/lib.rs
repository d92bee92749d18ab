pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, GeneralConfig, IngestMode, SessionConfig, SpeechConfig, TriggerConfig};
pub use error::{ConfigError, IngestError, RecognizerError, SessionError, StreamError, TriggerError};
pub use types::{
    AudioChunk, BlobInput, CancellationDetails, CancellationErrorCode, CancellationReason,
    RecognitionEvent, RecognitionOutcome, Termination, DEFAULT_CHUNK_SIZE,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_chunk_creation() {
        let chunk = AudioChunk::new(vec![1, 2, 3, 4]);
        assert_eq!(chunk.len(), 4);
        assert_eq!(chunk.data(), &[1, 2, 3, 4]);
        assert!(!chunk.is_end_of_stream());
    }

    #[test]
    fn test_audio_chunk_end_of_stream() {
        let chunk = AudioChunk::end_of_stream();
        assert!(chunk.is_empty());
        assert!(chunk.is_end_of_stream());
        assert_eq!(AudioChunk::new(Vec::new()), chunk);
    }

    #[test]
    fn test_recognition_event_terminal_kinds() {
        let sid = || "s1".to_string();
        assert!(RecognitionEvent::SessionStopped { session_id: sid() }.is_terminal());
        assert!(RecognitionEvent::Canceled {
            session_id: sid(),
            details: CancellationDetails::end_of_stream(),
        }
        .is_terminal());
        assert!(!RecognitionEvent::SessionStarted { session_id: sid() }.is_terminal());
        assert!(!RecognitionEvent::InterimResult {
            session_id: sid(),
            text: "hel".to_string(),
        }
        .is_terminal());
        assert!(!RecognitionEvent::FinalResult {
            session_id: sid(),
            outcome: RecognitionOutcome::NoMatch,
        }
        .is_terminal());
    }

    #[test]
    fn test_recognition_event_session_id() {
        let event = RecognitionEvent::FinalResult {
            session_id: "abc".to_string(),
            outcome: RecognitionOutcome::RecognizedSpeech {
                text: "hello".to_string(),
            },
        };
        assert_eq!(event.session_id(), "abc");
        assert_eq!(event.kind(), "final_result");
    }

    #[test]
    fn test_cancellation_reason_display_matches_engine_names() {
        assert_eq!(CancellationReason::Error.to_string(), "Error");
        assert_eq!(CancellationReason::EndOfStream.to_string(), "EndOfStream");
        assert_eq!(
            CancellationErrorCode::AuthenticationFailure.to_string(),
            "AuthenticationFailure"
        );
    }

    #[test]
    fn test_termination_codes() {
        assert_eq!(Termination::SessionStopped.code(), 0);
        assert_eq!(
            Termination::Canceled(CancellationDetails::end_of_stream()).code(),
            0
        );
        let error = CancellationDetails::error(CancellationErrorCode::Forbidden, "quota");
        assert_eq!(Termination::Canceled(error).code(), 1);
        assert!(Termination::TimedOut.is_failure());
        assert!(Termination::Aborted.is_failure());
        assert!(Termination::EngineDisconnected.is_failure());
    }

    #[test]
    fn test_termination_display_includes_error_detail() {
        let error = CancellationDetails::error(CancellationErrorCode::BadRequest, "bad header");
        assert_eq!(
            Termination::Canceled(error).to_string(),
            "canceled (BadRequest: bad header)"
        );
    }

    #[test]
    fn test_blob_input_fields() {
        let blob = BlobInput::new("clip.wav", Some(3), &b"abc"[..]);
        assert_eq!(blob.name, "clip.wav");
        assert_eq!(blob.size, Some(3));
        assert_eq!(blob.reader, b"abc");
    }
}
