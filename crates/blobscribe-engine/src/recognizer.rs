use crate::push_stream::PushAudioReader;
use async_trait::async_trait;
use blobscribe_core::{RecognitionEvent, RecognizerError, SpeechConfig};
use tokio::sync::mpsc;

/// A continuous speech recognizer fed from a push audio stream.
///
/// Events are delivered on the sender installed with
/// [`set_event_sender`](Self::set_event_sender), from whatever task the
/// engine runs on. An engine ends a session by emitting `Canceled` or
/// `SessionStopped`.
#[async_trait]
pub trait Recognizer: Send + Sync {
    fn name(&self) -> &str;
    async fn initialize(&mut self, config: &SpeechConfig) -> Result<(), RecognizerError>;
    fn bind_audio(&mut self, reader: PushAudioReader);
    fn set_event_sender(&mut self, sender: mpsc::UnboundedSender<RecognitionEvent>);
    /// Returns once recognition is running; results arrive as events.
    async fn start_continuous_recognition(&mut self) -> Result<(), RecognizerError>;
    /// Returns once the engine acknowledged the stop.
    async fn stop_continuous_recognition(&mut self) -> Result<(), RecognizerError>;
    /// Releases the audio binding, the event sender and any engine session.
    async fn close(&mut self);
}
