use anyhow::{Context, Result};
use blobscribe_core::{AppConfig, SpeechConfig};
use blobscribe_engine::RecognizerRegistry;
use blobscribe_session::{transcribe, PipelineOptions, SessionReport};
use blobscribe_trigger::{open_blob, BlobRef, BlobWatcher};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "config.toml";

#[derive(Parser)]
#[command(name = "blobscribe", about = "Transcribes audio blobs with a continuous speech recognizer")]
struct Cli {
    /// Path to the configuration file (defaults to ./config.toml when present)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Transcribe the given files one after another
    Run {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Transcribe every file that lands in a directory
    Watch {
        /// Directory to watch; overrides `trigger.path`
        dir: Option<PathBuf>,
    },
}

/// Everything a single transcription needs, shared across blobs.
struct Transcriber {
    registry: RecognizerRegistry,
    speech: SpeechConfig,
    options: PipelineOptions,
}

impl Transcriber {
    async fn process(&self, blob: &BlobRef, cancel: CancellationToken) -> Result<SessionReport> {
        let input = open_blob(blob).with_context(|| format!("failed to open {:?}", blob.path))?;
        let recognizer = self
            .registry
            .for_config(&self.speech)
            .with_context(|| format!("failed to create engine '{}'", self.speech.engine))?;
        let report = transcribe(input, recognizer, &self.speech, &self.options, cancel)
            .await
            .with_context(|| format!("failed to transcribe '{}'", blob.name))?;
        Ok(report)
    }
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load_from_file(path)
            .with_context(|| format!("failed to load config from {path:?}")),
        None if Path::new(DEFAULT_CONFIG).exists() => {
            AppConfig::load_from_file(Path::new(DEFAULT_CONFIG))
                .with_context(|| format!("failed to load config from {DEFAULT_CONFIG:?}"))
        }
        None => Ok(AppConfig::default()),
    }
}

fn print_report(report: &SessionReport) {
    if !report.phrases.is_empty() {
        println!("{}\t{}", report.blob_name, report.transcript());
    }
}

/// Prints or logs one session's outcome and returns its exit code: the
/// termination code, or 1 when the blob could not be processed at all.
fn settle_session(blob: &BlobRef, result: Result<SessionReport>) -> u8 {
    match result {
        Ok(report) => {
            print_report(&report);
            u8::try_from(report.termination.code()).unwrap_or(1)
        }
        Err(e) => {
            tracing::error!(blob = %blob.name, "{e:#}");
            1
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;

    let env_filter = EnvFilter::try_new(&config.general.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::Registry::default().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(false),
    );

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    tracing::info!("blobscribe starting");

    let registry = RecognizerRegistry::new();
    if !registry.contains(&config.speech.engine) {
        anyhow::bail!(
            "unknown engine '{}' (available: {})",
            config.speech.engine,
            registry.list_engines().join(", ")
        );
    }
    tracing::info!(
        engine = %config.speech.engine,
        language = %config.speech.language,
        mode = ?config.session.ingest_mode,
        "recognizer configured"
    );

    let transcriber = Arc::new(Transcriber {
        registry,
        speech: config.speech.clone(),
        options: PipelineOptions::from(&config.session),
    });

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, stopping");
            ctrl_c.cancel();
        }
    });

    let code = match cli.command {
        Command::Run { files } => run_files(&transcriber, files, &cancel).await,
        Command::Watch { dir } => {
            let mut trigger = config.trigger.clone();
            if let Some(dir) = dir {
                trigger.path = dir;
            }
            watch(transcriber, &trigger, cancel).await?
        }
    };

    tracing::info!("shutting down");
    Ok(ExitCode::from(code))
}

/// Processes each file in order. The exit code is the highest termination
/// code seen, or 1 when a blob could not be processed at all.
async fn run_files(
    transcriber: &Transcriber,
    files: Vec<PathBuf>,
    cancel: &CancellationToken,
) -> u8 {
    let mut worst = 0u8;
    for path in files {
        if cancel.is_cancelled() {
            break;
        }
        let blob = BlobRef::from_path(path);
        let result = transcriber.process(&blob, cancel.child_token()).await;
        worst = worst.max(settle_session(&blob, result));
    }
    worst
}

/// Processes blobs as they land until interrupted. The exit code is the
/// highest session code seen, as in `run`.
async fn watch(
    transcriber: Arc<Transcriber>,
    trigger: &blobscribe_core::TriggerConfig,
    cancel: CancellationToken,
) -> Result<u8> {
    let mut watcher = BlobWatcher::start(trigger)
        .with_context(|| format!("failed to watch {:?}", trigger.path))?;
    let limit = Arc::new(Semaphore::new(trigger.max_concurrent));
    let mut in_flight = JoinSet::new();
    let mut worst = 0u8;

    loop {
        let blob = tokio::select! {
            _ = cancel.cancelled() => break,
            blob = watcher.next_blob() => match blob {
                Some(blob) => blob,
                None => break,
            },
        };
        let permit = tokio::select! {
            _ = cancel.cancelled() => break,
            permit = Arc::clone(&limit).acquire_owned() => permit.context("semaphore closed")?,
        };

        let transcriber = Arc::clone(&transcriber);
        let session_cancel = cancel.child_token();
        in_flight.spawn(async move {
            let _permit = permit;
            let result = transcriber.process(&blob, session_cancel).await;
            settle_session(&blob, result)
        });

        while let Some(joined) = in_flight.try_join_next() {
            worst = worst.max(joined_code(joined));
        }
    }

    drop(watcher);
    while let Some(joined) = in_flight.join_next().await {
        worst = worst.max(joined_code(joined));
    }
    Ok(worst)
}

fn joined_code(joined: Result<u8, tokio::task::JoinError>) -> u8 {
    joined.unwrap_or_else(|e| {
        tracing::error!("session task failed: {e}");
        1
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use blobscribe_core::{CancellationDetails, CancellationErrorCode, Termination};
    use blobscribe_session::Transcript;

    fn blob() -> BlobRef {
        BlobRef::from_path(PathBuf::from("a.wav"))
    }

    fn report(termination: Termination) -> Result<SessionReport> {
        Ok(SessionReport::new("a.wav", Transcript::default(), termination))
    }

    #[test]
    fn test_settle_session_uses_termination_code() {
        assert_eq!(settle_session(&blob(), report(Termination::SessionStopped)), 0);
        assert_eq!(settle_session(&blob(), report(Termination::TimedOut)), 2);
        let error = CancellationDetails::error(CancellationErrorCode::ServiceError, "boom");
        assert_eq!(settle_session(&blob(), report(Termination::Canceled(error))), 1);
    }

    #[test]
    fn test_settle_session_failure_is_one() {
        let result: Result<SessionReport> = Err(anyhow::anyhow!("cannot open"));
        assert_eq!(settle_session(&blob(), result), 1);
    }

    #[tokio::test]
    async fn test_watch_reports_worst_session_code() {
        let dir = std::env::temp_dir().join("blobscribe_watch_exit_code");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("empty.wav"), b"").unwrap();

        let mut speech = SpeechConfig::default();
        speech.engine = "missing".to_string();
        let transcriber = Arc::new(Transcriber {
            registry: RecognizerRegistry::new(),
            speech,
            options: PipelineOptions::default(),
        });
        let trigger = blobscribe_core::TriggerConfig {
            path: dir.clone(),
            process_existing: true,
            ..blobscribe_core::TriggerConfig::default()
        };
        let cancel = CancellationToken::new();
        let stopper = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(300)).await;
            stopper.cancel();
        });

        let code = watch(transcriber, &trigger, cancel).await.unwrap();
        assert_eq!(code, 1);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
