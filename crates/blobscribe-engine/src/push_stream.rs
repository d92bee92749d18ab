use blobscribe_core::{AudioChunk, StreamError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Destination for audio chunks. A zero-length chunk ends the stream.
pub trait AudioSink {
    fn push(&mut self, chunk: AudioChunk) -> Result<(), StreamError>;
}

/// Creates a connected push stream: the writer half is fed by the caller,
/// the reader half is bound to a recognizer.
pub fn create_push_stream() -> (PushAudioInputStream, PushAudioReader) {
    let (tx, rx) = mpsc::unbounded_channel();
    let bytes_pushed = Arc::new(AtomicU64::new(0));
    (
        PushAudioInputStream {
            tx: Some(tx),
            bytes_pushed: Arc::clone(&bytes_pushed),
        },
        PushAudioReader {
            rx,
            finished: false,
            bytes_pushed,
        },
    )
}

pub struct PushAudioInputStream {
    tx: Option<mpsc::UnboundedSender<AudioChunk>>,
    bytes_pushed: Arc<AtomicU64>,
}

impl PushAudioInputStream {
    /// Signals end-of-stream. Further pushes fail with [`StreamError::Closed`].
    pub fn close(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(AudioChunk::end_of_stream());
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_none()
    }

    pub fn bytes_pushed(&self) -> u64 {
        self.bytes_pushed.load(Ordering::Relaxed)
    }
}

impl AudioSink for PushAudioInputStream {
    fn push(&mut self, chunk: AudioChunk) -> Result<(), StreamError> {
        if chunk.is_end_of_stream() {
            return match self.tx.take() {
                Some(tx) => tx.send(chunk).map_err(|_| StreamError::Closed),
                None => Err(StreamError::Closed),
            };
        }
        let tx = self.tx.as_ref().ok_or(StreamError::Closed)?;
        let len = chunk.len() as u64;
        tx.send(chunk).map_err(|_| StreamError::Closed)?;
        self.bytes_pushed.fetch_add(len, Ordering::Relaxed);
        Ok(())
    }
}

impl<S: AudioSink + ?Sized> AudioSink for Box<S> {
    fn push(&mut self, chunk: AudioChunk) -> Result<(), StreamError> {
        (**self).push(chunk)
    }
}

/// Recognizer-side half of a push stream.
pub struct PushAudioReader {
    rx: mpsc::UnboundedReceiver<AudioChunk>,
    finished: bool,
    bytes_pushed: Arc<AtomicU64>,
}

impl PushAudioReader {
    /// Next non-empty chunk, or `Ok(None)` once the end-of-stream chunk has
    /// been read. A writer dropped without sending end-of-stream yields
    /// [`StreamError::Truncated`].
    pub async fn next_chunk(&mut self) -> Result<Option<AudioChunk>, StreamError> {
        if self.finished {
            return Ok(None);
        }
        match self.rx.recv().await {
            Some(chunk) if !chunk.is_end_of_stream() => Ok(Some(chunk)),
            Some(_) => {
                self.finished = true;
                Ok(None)
            }
            None => {
                self.finished = true;
                Err(StreamError::Truncated)
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Bytes the writer has pushed so far, whether or not they were read.
    pub fn bytes_pushed(&self) -> u64 {
        self.bytes_pushed.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_push_stream_delivers_chunks_in_order() {
        let (mut writer, mut reader) = create_push_stream();
        writer.push(AudioChunk::new(vec![1, 2])).unwrap();
        writer.push(AudioChunk::new(vec![3])).unwrap();
        writer.push(AudioChunk::end_of_stream()).unwrap();

        assert_eq!(reader.next_chunk().await.unwrap().unwrap().data(), &[1, 2]);
        assert_eq!(reader.next_chunk().await.unwrap().unwrap().data(), &[3]);
        assert_eq!(reader.next_chunk().await, Ok(None));
        assert!(reader.is_finished());
    }

    #[test]
    fn test_push_after_end_of_stream_fails() {
        let (mut writer, _reader) = create_push_stream();
        writer.push(AudioChunk::end_of_stream()).unwrap();
        assert!(writer.is_closed());
        assert_eq!(
            writer.push(AudioChunk::new(vec![0; 4])),
            Err(StreamError::Closed)
        );
        assert_eq!(writer.push(AudioChunk::end_of_stream()), Err(StreamError::Closed));
    }

    #[test]
    fn test_push_after_reader_dropped_fails() {
        let (mut writer, reader) = create_push_stream();
        drop(reader);
        assert_eq!(
            writer.push(AudioChunk::new(vec![0; 4])),
            Err(StreamError::Closed)
        );
    }

    #[tokio::test]
    async fn test_writer_dropped_without_end_of_stream_is_truncated() {
        let (mut writer, mut reader) = create_push_stream();
        writer.push(AudioChunk::new(vec![9; 8])).unwrap();
        drop(writer);
        assert_eq!(reader.next_chunk().await.unwrap().unwrap().len(), 8);
        assert_eq!(reader.next_chunk().await, Err(StreamError::Truncated));
        assert_eq!(reader.next_chunk().await, Ok(None));
    }

    #[tokio::test]
    async fn test_writer_dropped_after_end_of_stream_is_clean() {
        let (mut writer, mut reader) = create_push_stream();
        writer.push(AudioChunk::new(vec![9; 8])).unwrap();
        writer.push(AudioChunk::end_of_stream()).unwrap();
        drop(writer);
        assert_eq!(reader.next_chunk().await.unwrap().unwrap().len(), 8);
        assert_eq!(reader.next_chunk().await, Ok(None));
    }

    #[tokio::test]
    async fn test_close_sends_end_of_stream() {
        let (mut writer, mut reader) = create_push_stream();
        writer.close();
        writer.close();
        assert_eq!(reader.next_chunk().await, Ok(None));
    }

    #[test]
    fn test_bytes_pushed_counts_payload_only() {
        let (mut writer, reader) = create_push_stream();
        writer.push(AudioChunk::new(vec![0; 1024])).unwrap();
        writer.push(AudioChunk::new(vec![0; 10])).unwrap();
        writer.push(AudioChunk::end_of_stream()).unwrap();
        assert_eq!(writer.bytes_pushed(), 1034);
        assert_eq!(reader.bytes_pushed(), 1034);
    }
}
