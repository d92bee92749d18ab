use crate::push_stream::PushAudioReader;
use crate::recognizer::Recognizer;
use async_trait::async_trait;
use blobscribe_core::{
    CancellationDetails, CancellationErrorCode, RecognitionEvent, RecognitionOutcome,
    RecognizerError, SpeechConfig,
};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

/// Engine that recognizes nothing but byte counts.
///
/// Consumes the whole push stream, then reports `[null] N bytes` (or
/// `NoMatch` for empty audio), `Canceled(EndOfStream)` and `SessionStopped`,
/// the same tail a push-stream session on a real service produces.
pub struct NullRecognizer {
    emit_interim: bool,
    reader: Option<PushAudioReader>,
    event_sender: Option<mpsc::UnboundedSender<RecognitionEvent>>,
    task: Option<JoinHandle<()>>,
}

impl NullRecognizer {
    pub fn new() -> Self {
        Self {
            emit_interim: true,
            reader: None,
            event_sender: None,
            task: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Default for NullRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Recognizer for NullRecognizer {
    fn name(&self) -> &str {
        "null"
    }

    async fn initialize(&mut self, config: &SpeechConfig) -> Result<(), RecognizerError> {
        if let Some(value) = config.options.get("emit_interim") {
            self.emit_interim = value.as_bool().ok_or_else(|| {
                RecognizerError::InitializationFailed(
                    "'emit_interim' must be a boolean".to_string(),
                )
            })?;
        }
        Ok(())
    }

    fn bind_audio(&mut self, reader: PushAudioReader) {
        self.reader = Some(reader);
    }

    fn set_event_sender(&mut self, sender: mpsc::UnboundedSender<RecognitionEvent>) {
        self.event_sender = Some(sender);
    }

    async fn start_continuous_recognition(&mut self) -> Result<(), RecognizerError> {
        if self.task.is_some() {
            return Err(RecognizerError::StartFailed("already running".to_string()));
        }
        let mut reader = self
            .reader
            .take()
            .ok_or_else(|| RecognizerError::NotConfigured("no audio bound".to_string()))?;
        let tx = self
            .event_sender
            .clone()
            .ok_or_else(|| RecognizerError::NotConfigured("no event sender".to_string()))?;
        let emit_interim = self.emit_interim;
        let session_id = format!("null-{:08x}", NEXT_SESSION.fetch_add(1, Ordering::Relaxed));

        let handle = tokio::spawn(async move {
            let _ = tx.send(RecognitionEvent::SessionStarted {
                session_id: session_id.clone(),
            });

            let mut total = 0u64;
            loop {
                match reader.next_chunk().await {
                    Ok(Some(chunk)) => {
                        total += chunk.len() as u64;
                        if emit_interim {
                            let _ = tx.send(RecognitionEvent::InterimResult {
                                session_id: session_id.clone(),
                                text: format!("[null] {total} bytes"),
                            });
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::debug!(
                            session_id = %session_id,
                            "audio ended after {total} bytes: {e}"
                        );
                        let _ = tx.send(RecognitionEvent::Canceled {
                            session_id: session_id.clone(),
                            details: CancellationDetails::error(
                                CancellationErrorCode::RuntimeError,
                                e.to_string(),
                            ),
                        });
                        let _ = tx.send(RecognitionEvent::SessionStopped { session_id });
                        return;
                    }
                }
            }
            tracing::trace!(session_id = %session_id, "NullRecognizer consumed {total} bytes");

            let outcome = if total == 0 {
                RecognitionOutcome::NoMatch
            } else {
                RecognitionOutcome::RecognizedSpeech {
                    text: format!("[null] {total} bytes"),
                }
            };
            let _ = tx.send(RecognitionEvent::FinalResult {
                session_id: session_id.clone(),
                outcome,
            });
            let _ = tx.send(RecognitionEvent::Canceled {
                session_id: session_id.clone(),
                details: CancellationDetails::end_of_stream(),
            });
            let _ = tx.send(RecognitionEvent::SessionStopped { session_id });
        });

        self.task = Some(handle);
        Ok(())
    }

    async fn stop_continuous_recognition(&mut self) -> Result<(), RecognizerError> {
        if let Some(handle) = self.task.take() {
            handle.abort();
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    return Err(RecognizerError::StopFailed(e.to_string()));
                }
            }
        }
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(handle) = self.task.take() {
            handle.abort();
        }
        self.reader = None;
        self.event_sender = None;
    }
}

impl Drop for NullRecognizer {
    fn drop(&mut self) {
        if let Some(handle) = self.task.take() {
            handle.abort();
        }
    }
}
