pub mod null_engine;
pub mod push_stream;
pub mod recognizer;
pub mod registry;
pub mod scripted_engine;

pub use null_engine::NullRecognizer;
pub use push_stream::{create_push_stream, AudioSink, PushAudioInputStream, PushAudioReader};
pub use recognizer::Recognizer;
pub use registry::{RecognizerFactory, RecognizerRegistry};
pub use scripted_engine::{ScriptProbe, ScriptStep, ScriptedRecognizer};
