use blobscribe_core::{AudioChunk, IngestError};
use blobscribe_engine::AudioSink;
use std::io::{ErrorKind, Read};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedStats {
    /// Pushes made, the zero-length terminator included.
    pub chunks: usize,
    pub bytes: u64,
}

/// Copies `reader` into `sink` in chunks of `chunk_size` bytes, then pushes
/// one zero-length chunk.
///
/// Only the last data chunk may be shorter than `chunk_size`. On a read
/// error nothing more is pushed and the sink is left without its
/// terminator.
pub fn feed_chunks<R, S>(
    reader: &mut R,
    sink: &mut S,
    chunk_size: usize,
) -> Result<FeedStats, IngestError>
where
    R: Read + ?Sized,
    S: AudioSink + ?Sized,
{
    if chunk_size == 0 {
        return Err(IngestError::InvalidChunkSize);
    }

    let mut stats = FeedStats::default();
    let mut buf = vec![0u8; chunk_size];
    loop {
        let n = fill_chunk(reader, &mut buf)?;
        sink.push(AudioChunk::new(buf[..n].to_vec()))?;
        stats.chunks += 1;
        stats.bytes += n as u64;
        if n == 0 {
            break;
        }
        tracing::trace!("pushed chunk #{} ({n} bytes)", stats.chunks);
    }

    tracing::debug!(chunks = stats.chunks, bytes = stats.bytes, "audio source drained");
    Ok(stats)
}

/// Reads until `buf` is full or the source is exhausted.
fn fill_chunk<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use blobscribe_core::StreamError;
    use std::io::Cursor;

    #[derive(Default)]
    struct RecordingSink {
        chunks: Vec<AudioChunk>,
    }

    impl AudioSink for RecordingSink {
        fn push(&mut self, chunk: AudioChunk) -> Result<(), StreamError> {
            self.chunks.push(chunk);
            Ok(())
        }
    }

    /// Yields at most `step` bytes per read, with an `Interrupted` between reads.
    struct TrickleReader {
        data: Vec<u8>,
        pos: usize,
        step: usize,
        interrupt_next: bool,
    }

    impl Read for TrickleReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.interrupt_next {
                self.interrupt_next = false;
                return Err(std::io::Error::new(ErrorKind::Interrupted, "signal"));
            }
            self.interrupt_next = true;
            let n = self.step.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    /// Delivers `good` bytes, then fails.
    struct FailingReader {
        good: usize,
        served: usize,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.served >= self.good {
                return Err(std::io::Error::new(ErrorKind::ConnectionReset, "blob read failed"));
            }
            let n = buf.len().min(self.good - self.served);
            buf[..n].fill(7);
            self.served += n;
            Ok(n)
        }
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    fn concat(chunks: &[AudioChunk]) -> Vec<u8> {
        chunks.iter().flat_map(|c| c.data().to_vec()).collect()
    }

    #[test]
    fn test_feed_concatenation_equals_source() {
        for len in [1usize, 1023, 1025, 3000, 4096, 10_000] {
            let data = pattern(len);
            let mut sink = RecordingSink::default();
            let stats = feed_chunks(&mut Cursor::new(data.clone()), &mut sink, 1024).unwrap();

            assert_eq!(concat(&sink.chunks), data, "len {len}");
            assert_eq!(stats.bytes, len as u64);
            assert_eq!(stats.chunks, sink.chunks.len());
            let terminators = sink.chunks.iter().filter(|c| c.is_end_of_stream()).count();
            assert_eq!(terminators, 1, "len {len}");
            assert!(sink.chunks.last().unwrap().is_end_of_stream());
        }
    }

    #[test]
    fn test_feed_empty_stream_pushes_single_terminator() {
        let mut sink = RecordingSink::default();
        let stats = feed_chunks(&mut Cursor::new(Vec::<u8>::new()), &mut sink, 1024).unwrap();
        assert_eq!(sink.chunks, vec![AudioChunk::end_of_stream()]);
        assert_eq!(stats, FeedStats { chunks: 1, bytes: 0 });
    }

    #[test]
    fn test_feed_exact_chunk_size_pushes_twice() {
        let mut sink = RecordingSink::default();
        feed_chunks(&mut Cursor::new(pattern(1024)), &mut sink, 1024).unwrap();
        assert_eq!(sink.chunks.len(), 2);
        assert_eq!(sink.chunks[0].len(), 1024);
        assert!(sink.chunks[1].is_end_of_stream());
    }

    #[test]
    fn test_feed_only_last_chunk_is_short() {
        let mut sink = RecordingSink::default();
        feed_chunks(&mut Cursor::new(pattern(2500)), &mut sink, 1024).unwrap();
        let lens: Vec<usize> = sink.chunks.iter().map(|c| c.len()).collect();
        assert_eq!(lens, vec![1024, 1024, 452, 0]);
    }

    #[test]
    fn test_feed_fills_chunks_from_short_reads() {
        let data = pattern(2100);
        let mut reader = TrickleReader {
            data: data.clone(),
            pos: 0,
            step: 100,
            interrupt_next: false,
        };
        let mut sink = RecordingSink::default();
        feed_chunks(&mut reader, &mut sink, 1024).unwrap();
        let lens: Vec<usize> = sink.chunks.iter().map(|c| c.len()).collect();
        assert_eq!(lens, vec![1024, 1024, 52, 0]);
        assert_eq!(concat(&sink.chunks), data);
    }

    #[test]
    fn test_feed_read_error_stops_pushing() {
        let mut reader = FailingReader {
            good: 1500,
            served: 0,
        };
        let mut sink = RecordingSink::default();
        let err = feed_chunks(&mut reader, &mut sink, 1024).unwrap_err();

        assert!(matches!(err, IngestError::Read(_)));
        assert_eq!(sink.chunks.len(), 1);
        assert!(!sink.chunks.iter().any(|c| c.is_end_of_stream()));
    }

    #[test]
    fn test_feed_sink_rejection_propagates() {
        let (mut writer, reader) = blobscribe_engine::create_push_stream();
        drop(reader);
        let err = feed_chunks(&mut Cursor::new(pattern(10)), &mut writer, 1024).unwrap_err();
        assert!(matches!(err, IngestError::Sink(StreamError::Closed)));
    }

    #[test]
    fn test_feed_zero_chunk_size_rejected() {
        let mut sink = RecordingSink::default();
        let err = feed_chunks(&mut Cursor::new(pattern(10)), &mut sink, 0).unwrap_err();
        assert!(matches!(err, IngestError::InvalidChunkSize));
        assert!(sink.chunks.is_empty());
    }

    #[test]
    fn test_feed_into_push_stream() {
        let (mut writer, _reader) = blobscribe_engine::create_push_stream();
        let stats = feed_chunks(&mut Cursor::new(pattern(5000)), &mut writer, 1024).unwrap();
        assert_eq!(stats.chunks, 6);
        assert_eq!(writer.bytes_pushed(), 5000);
        assert!(writer.is_closed());
    }
}
