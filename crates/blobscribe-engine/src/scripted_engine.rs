use crate::push_stream::PushAudioReader;
use crate::recognizer::Recognizer;
use async_trait::async_trait;
use blobscribe_core::{RecognitionEvent, RecognitionOutcome, RecognizerError, SpeechConfig};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub enum ScriptStep {
    Emit(RecognitionEvent),
    Delay(Duration),
    /// Read the bound audio until end-of-stream before continuing.
    AwaitEndOfStream,
    /// Never finish; the session only ends through stop.
    Hang,
}

/// Lifecycle counters shared between a [`ScriptedRecognizer`] and a test.
#[derive(Debug, Default)]
pub struct ScriptProbe {
    initialized: AtomicUsize,
    started: AtomicUsize,
    stopped: AtomicUsize,
    closed: AtomicUsize,
    bytes_read: AtomicU64,
}

impl ScriptProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn initialized(&self) -> usize {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn stopped(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::SeqCst)
    }

    /// Sessions initialized but never closed.
    pub fn open_sessions(&self) -> usize {
        self.initialized().saturating_sub(self.closed())
    }
}

/// Engine that replays a fixed list of steps, with optional failures.
pub struct ScriptedRecognizer {
    steps: Vec<ScriptStep>,
    fail_initialize: bool,
    fail_start: bool,
    fail_stop: bool,
    probe: Arc<ScriptProbe>,
    reader: Option<PushAudioReader>,
    event_sender: Option<mpsc::UnboundedSender<RecognitionEvent>>,
    task: Option<JoinHandle<()>>,
}

impl ScriptedRecognizer {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self {
            steps,
            fail_initialize: false,
            fail_start: false,
            fail_stop: false,
            probe: ScriptProbe::new(),
            reader: None,
            event_sender: None,
            task: None,
        }
    }

    /// Started, one final result per phrase after the audio ends, stopped.
    pub fn clean_session(session_id: &str, phrases: &[&str]) -> Self {
        let mut steps = vec![
            ScriptStep::Emit(RecognitionEvent::SessionStarted {
                session_id: session_id.to_string(),
            }),
            ScriptStep::AwaitEndOfStream,
        ];
        steps.extend(phrases.iter().map(|text| {
            ScriptStep::Emit(RecognitionEvent::FinalResult {
                session_id: session_id.to_string(),
                outcome: RecognitionOutcome::RecognizedSpeech {
                    text: text.to_string(),
                },
            })
        }));
        steps.push(ScriptStep::Emit(RecognitionEvent::SessionStopped {
            session_id: session_id.to_string(),
        }));
        Self::new(steps)
    }

    pub fn with_probe(mut self, probe: Arc<ScriptProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn failing_initialize(mut self) -> Self {
        self.fail_initialize = true;
        self
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    pub fn probe(&self) -> Arc<ScriptProbe> {
        Arc::clone(&self.probe)
    }
}

#[async_trait]
impl Recognizer for ScriptedRecognizer {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn initialize(&mut self, _config: &SpeechConfig) -> Result<(), RecognizerError> {
        self.probe.initialized.fetch_add(1, Ordering::SeqCst);
        if self.fail_initialize {
            return Err(RecognizerError::InitializationFailed(
                "injected initialize failure".to_string(),
            ));
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
        if self.fail_start {
            return Err(RecognizerError::StartFailed(
                "injected start failure".to_string(),
            ));
        }
        // The task owns the only sender, so the channel closes when the script ends.
        let tx = self
            .event_sender
            .take()
            .ok_or_else(|| RecognizerError::NotConfigured("no event sender".to_string()))?;
        let mut reader = self.reader.take();
        let steps = self.steps.clone();
        let probe = Arc::clone(&self.probe);
        self.probe.started.fetch_add(1, Ordering::SeqCst);

        self.task = Some(tokio::spawn(async move {
            for step in steps {
                match step {
                    ScriptStep::Emit(event) => {
                        let _ = tx.send(event);
                    }
                    ScriptStep::Delay(d) => tokio::time::sleep(d).await,
                    ScriptStep::AwaitEndOfStream => {
                        if let Some(reader) = reader.as_mut() {
                            while let Ok(Some(chunk)) = reader.next_chunk().await {
                                probe
                                    .bytes_read
                                    .fetch_add(chunk.len() as u64, Ordering::SeqCst);
                            }
                        }
                    }
                    ScriptStep::Hang => std::future::pending::<()>().await,
                }
            }
        }));
        Ok(())
    }

    async fn stop_continuous_recognition(&mut self) -> Result<(), RecognizerError> {
        if let Some(handle) = self.task.take() {
            handle.abort();
            let _ = handle.await;
        }
        self.probe.stopped.fetch_add(1, Ordering::SeqCst);
        if self.fail_stop {
            return Err(RecognizerError::StopFailed("injected stop failure".to_string()));
        }
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(handle) = self.task.take() {
            handle.abort();
        }
        self.reader = None;
        self.event_sender = None;
        self.probe.closed.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for ScriptedRecognizer {
    fn drop(&mut self) {
        if let Some(handle) = self.task.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::push_stream::{create_push_stream, AudioSink};
    use blobscribe_core::AudioChunk;

    #[tokio::test]
    async fn test_scripted_replays_clean_session() {
        let mut engine = ScriptedRecognizer::clean_session("s1", &["hello", "world"]);
        let probe = engine.probe();
        let (mut writer, reader) = create_push_stream();
        let (tx, mut rx) = mpsc::unbounded_channel();
        engine.initialize(&SpeechConfig::default()).await.unwrap();
        engine.bind_audio(reader);
        engine.set_event_sender(tx);

        writer.push(AudioChunk::new(vec![0; 100])).unwrap();
        writer.push(AudioChunk::end_of_stream()).unwrap();
        engine.start_continuous_recognition().await.unwrap();

        let mut kinds = Vec::new();
        while let Some(event) = rx.recv().await {
            kinds.push(event.kind());
        }
        assert_eq!(
            kinds,
            vec!["session_started", "final_result", "final_result", "session_stopped"]
        );
        assert_eq!(probe.bytes_read(), 100);
    }

    #[tokio::test]
    async fn test_scripted_start_failure_is_injected() {
        let mut engine = ScriptedRecognizer::new(Vec::new()).failing_start();
        let (tx, _rx) = mpsc::unbounded_channel();
        engine.set_event_sender(tx);
        assert!(matches!(
            engine.start_continuous_recognition().await,
            Err(RecognizerError::StartFailed(_))
        ));
        assert_eq!(engine.probe().started(), 0);
    }

    #[tokio::test]
    async fn test_scripted_stop_failure_still_counts_stop() {
        let mut engine = ScriptedRecognizer::new(vec![ScriptStep::Hang]).failing_stop();
        let (tx, _rx) = mpsc::unbounded_channel();
        engine.set_event_sender(tx);
        engine.start_continuous_recognition().await.unwrap();
        assert!(engine.stop_continuous_recognition().await.is_err());
        assert_eq!(engine.probe().stopped(), 1);
    }

    #[tokio::test]
    async fn test_scripted_probe_tracks_open_sessions() {
        let probe = ScriptProbe::new();
        let mut engine = ScriptedRecognizer::new(Vec::new()).with_probe(Arc::clone(&probe));
        engine.initialize(&SpeechConfig::default()).await.unwrap();
        assert_eq!(probe.open_sessions(), 1);
        engine.close().await;
        assert_eq!(probe.open_sessions(), 0);
    }
}
