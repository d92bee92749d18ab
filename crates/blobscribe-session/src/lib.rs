pub mod controller;
pub mod feeder;
pub mod pipeline;
pub mod report;
pub mod termination;

pub use controller::{SessionController, SessionOptions, SessionState};
pub use feeder::{feed_chunks, FeedStats};
pub use pipeline::{transcribe, PipelineOptions};
pub use report::{event_lines, DiagnosticLine, LineLevel, SessionReport, Transcript};
pub use termination::TerminationSignal;
