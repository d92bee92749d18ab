use crate::report::{emit, event_lines, SessionReport, Transcript};
use crate::termination::TerminationSignal;
use blobscribe_core::{RecognitionEvent, SessionError, SpeechConfig, Termination};
use blobscribe_engine::{create_push_stream, PushAudioInputStream, Recognizer};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Configured,
    Running,
    Terminating,
    Terminated,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Configured => "Configured",
            Self::Running => "Running",
            Self::Terminating => "Terminating",
            Self::Terminated => "Terminated",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Upper bound on the wait for a terminal event. `None` waits forever.
    pub wait_timeout: Option<Duration>,
}

/// Drives one recognition session from configuration to release.
///
/// Events from the engine are consumed by a single loop; whichever of
/// `Canceled`, `SessionStopped`, timeout or caller cancellation writes the
/// [`TerminationSignal`] first decides how the session ended.
pub struct SessionController {
    blob_name: String,
    state: SessionState,
    recognizer: Box<dyn Recognizer>,
    events: Option<mpsc::UnboundedReceiver<RecognitionEvent>>,
    signal: TerminationSignal,
    transcript: Transcript,
    options: SessionOptions,
    cancel: CancellationToken,
    released: bool,
}

impl SessionController {
    pub fn new(
        blob_name: impl Into<String>,
        recognizer: Box<dyn Recognizer>,
        options: SessionOptions,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            blob_name: blob_name.into(),
            state: SessionState::Idle,
            recognizer,
            events: None,
            signal: TerminationSignal::new(),
            transcript: Transcript::default(),
            options,
            cancel,
            released: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn termination_signal(&self) -> TerminationSignal {
        self.signal.clone()
    }

    fn expect_state(
        &self,
        expected: SessionState,
        operation: &'static str,
    ) -> Result<(), SessionError> {
        if self.state != expected {
            return Err(SessionError::InvalidState {
                operation,
                state: self.state.as_str(),
            });
        }
        Ok(())
    }

    /// Initializes the recognizer and binds a fresh push stream to it.
    /// Returns the writer half for the caller to feed.
    pub async fn configure(
        &mut self,
        config: &SpeechConfig,
    ) -> Result<PushAudioInputStream, SessionError> {
        self.expect_state(SessionState::Idle, "configure")?;

        if let Err(e) = self.recognizer.initialize(config).await {
            tracing::error!(
                blob = %self.blob_name,
                engine = %self.recognizer.name(),
                "initialize failed: {e}"
            );
            self.release().await;
            return Err(SessionError::Configure(e));
        }

        let (writer, reader) = create_push_stream();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        self.recognizer.bind_audio(reader);
        self.recognizer.set_event_sender(event_tx);
        self.events = Some(event_rx);
        self.state = SessionState::Configured;

        tracing::debug!(
            blob = %self.blob_name,
            engine = %self.recognizer.name(),
            region = %config.region,
            language = %config.language,
            "session configured"
        );
        Ok(writer)
    }

    pub async fn start(&mut self) -> Result<(), SessionError> {
        self.expect_state(SessionState::Configured, "start")?;

        if let Err(e) = self.recognizer.start_continuous_recognition().await {
            tracing::error!(blob = %self.blob_name, "start failed: {e}");
            self.release().await;
            return Err(SessionError::Start(e));
        }
        self.state = SessionState::Running;
        tracing::debug!(blob = %self.blob_name, "continuous recognition started");
        Ok(())
    }

    /// Handles events until the termination signal is written.
    pub async fn await_termination(&mut self) -> Result<Termination, SessionError> {
        self.expect_state(SessionState::Running, "await termination")?;
        let Some(mut events) = self.events.take() else {
            return Err(SessionError::InvalidState {
                operation: "await termination",
                state: "Released",
            });
        };

        let wait_timeout = self.options.wait_timeout;
        let deadline = async move {
            match wait_timeout {
                Some(d) => tokio::time::sleep(d).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(deadline);
        let cancel = self.cancel.clone();

        let termination = loop {
            if let Some(termination) = self.signal.get() {
                break termination;
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::warn!(blob = %self.blob_name, "session cancelled");
                    self.signal.fire(Termination::Aborted);
                }
                _ = &mut deadline => {
                    tracing::warn!(
                        blob = %self.blob_name,
                        timeout = ?wait_timeout,
                        "no terminal event before deadline"
                    );
                    self.signal.fire(Termination::TimedOut);
                }
                event = events.recv() => match event {
                    Some(event) => self.handle_event(&event),
                    None => {
                        tracing::warn!(blob = %self.blob_name, "engine closed its event channel");
                        self.signal.fire(Termination::EngineDisconnected);
                    }
                },
            }
        };

        self.events = Some(events);
        self.state = SessionState::Terminating;
        Ok(termination)
    }

    /// Stops recognition and releases the session, even when the stop fails.
    pub async fn stop(&mut self) -> Result<(), SessionError> {
        self.expect_state(SessionState::Terminating, "stop")?;

        let result = self.recognizer.stop_continuous_recognition().await;
        self.drain_pending();
        self.release().await;

        match result {
            Ok(()) => {
                tracing::debug!(blob = %self.blob_name, "continuous recognition stopped");
                Ok(())
            }
            Err(e) => {
                tracing::error!(blob = %self.blob_name, "stop failed: {e}");
                Err(SessionError::Stop(e))
            }
        }
    }

    /// Start, wait, stop.
    pub async fn run(mut self) -> Result<SessionReport, SessionError> {
        if let Err(e) = self.start().await {
            self.release().await;
            return Err(e);
        }
        self.finish().await
    }

    /// Wait and stop a session that is already running.
    pub async fn finish(mut self) -> Result<SessionReport, SessionError> {
        let result = self.wait_and_stop().await;
        self.release().await;
        result
    }

    async fn wait_and_stop(&mut self) -> Result<SessionReport, SessionError> {
        let termination = self.await_termination().await?;
        self.stop().await?;
        let transcript = std::mem::take(&mut self.transcript);
        Ok(SessionReport::new(self.blob_name.clone(), transcript, termination))
    }

    /// Closes the recognizer and drops the event channel. Idempotent.
    pub async fn release(&mut self) {
        if !self.released {
            self.recognizer.close().await;
            self.events = None;
            self.released = true;
            tracing::trace!(blob = %self.blob_name, "session resources released");
        }
        self.state = SessionState::Terminated;
    }

    fn handle_event(&mut self, event: &RecognitionEvent) {
        for line in event_lines(event) {
            emit(&line, &self.blob_name);
        }
        self.transcript.record(event);

        let termination = match event {
            RecognitionEvent::Canceled { details, .. } => Termination::Canceled(details.clone()),
            RecognitionEvent::SessionStopped { .. } => Termination::SessionStopped,
            _ => return,
        };
        if !self.signal.fire(termination) {
            tracing::debug!(
                blob = %self.blob_name,
                event = event.kind(),
                "terminal event ignored, session already terminating"
            );
        }
    }

    /// Handles events that were queued when the session terminated.
    fn drain_pending(&mut self) {
        let Some(mut events) = self.events.take() else {
            return;
        };
        while let Ok(event) = events.try_recv() {
            self.handle_event(&event);
        }
        self.events = Some(events);
    }
}
