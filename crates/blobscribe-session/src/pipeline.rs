use crate::controller::{SessionController, SessionOptions};
use crate::feeder::{feed_chunks, FeedStats};
use crate::report::SessionReport;
use blobscribe_core::{
    BlobInput, IngestError, IngestMode, SessionConfig, SessionError, SpeechConfig,
    DEFAULT_CHUNK_SIZE,
};
use blobscribe_engine::{PushAudioInputStream, Recognizer};
use std::io::Read;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub chunk_size: usize,
    pub ingest_mode: IngestMode,
    pub session: SessionOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            ingest_mode: IngestMode::DrainFirst,
            session: SessionOptions::default(),
        }
    }
}

impl From<&SessionConfig> for PipelineOptions {
    fn from(config: &SessionConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            ingest_mode: config.ingest_mode,
            session: SessionOptions {
                wait_timeout: config.wait_timeout(),
            },
        }
    }
}

/// Transcribes one blob with `recognizer`.
///
/// In [`IngestMode::DrainFirst`] the whole blob is pushed before recognition
/// starts; in [`IngestMode::Concurrent`] feeding runs alongside recognition.
pub async fn transcribe<R>(
    blob: BlobInput<R>,
    recognizer: Box<dyn Recognizer>,
    speech: &SpeechConfig,
    options: &PipelineOptions,
    cancel: CancellationToken,
) -> Result<SessionReport, SessionError>
where
    R: Read + Send + 'static,
{
    let BlobInput { name, size, reader } = blob;
    tracing::info!(
        blob = %name,
        size = size.unwrap_or_default(),
        engine = %recognizer.name(),
        "processing blob"
    );

    // Cancelled by the caller, or by the feeder when the blob cannot be read.
    let session_cancel = cancel.child_token();
    let mut controller = SessionController::new(
        name.clone(),
        recognizer,
        options.session.clone(),
        session_cancel.clone(),
    );
    let sink = controller.configure(speech).await?;

    let report = match options.ingest_mode {
        IngestMode::DrainFirst => {
            let feed = match feed_on_worker(reader, sink, options.chunk_size).await {
                Ok(feed) => feed,
                Err(e) => {
                    tracing::error!(blob = %name, "ingestion failed: {e}");
                    controller.release().await;
                    return Err(e.into());
                }
            };
            let mut report = controller.run().await?;
            report.feed = Some(feed);
            report
        }
        IngestMode::Concurrent => {
            controller.start().await?;
            let chunk_size = options.chunk_size;
            let feeder = tokio::spawn(async move {
                let fed = feed_on_worker(reader, sink, chunk_size).await;
                if matches!(fed, Err(IngestError::Read(_))) {
                    session_cancel.cancel();
                }
                fed
            });
            let finished = controller.finish().await;
            let fed = feeder
                .await
                .map_err(|e| IngestError::Read(std::io::Error::other(e)))
                .and_then(|fed| fed);
            let feed = match fed {
                Ok(feed) => Some(feed),
                Err(IngestError::Sink(e)) => {
                    tracing::warn!(
                        blob = %name,
                        "recognizer stopped before the blob was fully fed: {e}"
                    );
                    None
                }
                Err(e) => {
                    tracing::error!(blob = %name, "ingestion failed: {e}");
                    return Err(e.into());
                }
            };
            let mut report = finished?;
            report.feed = feed;
            report
        }
    };

    if report.is_failure() {
        tracing::warn!(blob = %name, "{}", report.summary_line());
    } else {
        tracing::info!(blob = %name, "{}", report.summary_line());
    }
    Ok(report)
}

async fn feed_on_worker<R>(
    mut reader: R,
    mut sink: PushAudioInputStream,
    chunk_size: usize,
) -> Result<FeedStats, IngestError>
where
    R: Read + Send + 'static,
{
    tokio::task::spawn_blocking(move || feed_chunks(&mut reader, &mut sink, chunk_size))
        .await
        .map_err(|e| IngestError::Read(std::io::Error::other(e)))?
}
