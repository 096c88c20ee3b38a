use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, bounded};

use super::{Sample, SampleSource, SourceError};

pub const READER_THREAD_NAME: &str = "replayamp-reader";

/// Receiving end of a source running on its own thread.
///
/// Iterates samples in stream order and finishes after end-of-stream or the
/// first error. Dropping the stream makes the worker exit at its next send.
pub struct SampleStream {
    receiver: Receiver<Result<Sample, SourceError>>,
    handle: JoinHandle<()>,
}

/// Move `source` to a worker thread that pulls samples into a bounded queue.
///
/// The worker blocks on the source's reads and on a full queue, never the
/// caller.
///
/// # Examples
/// ```
/// use std::io::Cursor;
///
/// use replayamp_core::{AmplifierOptions, FileAmplifier, LayoutConfig, spawn_source};
///
/// let bytes: Vec<u8> = [1u32, 2, 3].iter().flat_map(|v| v.to_ne_bytes()).collect();
/// let config = LayoutConfig::from_joined("x", "uint32", "", "");
/// let amp = FileAmplifier::from_reader("mem", Cursor::new(bytes), &config, AmplifierOptions::default())?;
///
/// let stream = spawn_source(amp, 8)?;
/// let values: Vec<f64> = stream.map(|s| s.map(|s| s.values[0])).collect::<Result<_, _>>()?;
/// assert_eq!(values, vec![1.0, 2.0, 3.0]);
/// # Ok::<(), replayamp_core::SourceError>(())
/// ```
pub fn spawn_source<S>(mut source: S, capacity: usize) -> Result<SampleStream, SourceError>
where
    S: SampleSource + Send + 'static,
{
    let (sender, receiver) = bounded(capacity.max(1));
    let handle = thread::Builder::new()
        .name(READER_THREAD_NAME.to_string())
        .spawn(move || {
            loop {
                match source.next_sample() {
                    Ok(Some(sample)) => {
                        if sender.send(Ok(sample)).is_err() {
                            tracing::debug!("sample stream dropped, reader exiting");
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(err) => {
                        let _ = sender.send(Err(err));
                        break;
                    }
                }
            }
        })?;
    Ok(SampleStream { receiver, handle })
}

impl SampleStream {
    /// Stop receiving and wait for the worker to exit.
    pub fn join(self) -> Result<(), SourceError> {
        let SampleStream { receiver, handle } = self;
        drop(receiver);
        handle.join().map_err(|_| SourceError::Disconnected)
    }
}

impl Iterator for SampleStream {
    type Item = Result<Sample, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.receiver.recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::spawn_source;
    use crate::source::{Sample, SampleSource, SourceError};

    struct Counter {
        next: u64,
        limit: u64,
        fail_at: Option<u64>,
    }

    impl SampleSource for Counter {
        fn next_sample(&mut self) -> Result<Option<Sample>, SourceError> {
            if Some(self.next) == self.fail_at {
                return Err(SourceError::Disconnected);
            }
            if self.next == self.limit {
                return Ok(None);
            }
            let index = self.next;
            self.next += 1;
            Ok(Some(Sample {
                index,
                timestamp: index as f64,
                values: vec![index as f64],
            }))
        }
    }

    #[test]
    fn delivers_samples_in_order() {
        let stream = spawn_source(
            Counter {
                next: 0,
                limit: 100,
                fail_at: None,
            },
            4,
        )
        .unwrap();
        let indices: Vec<u64> = stream.map(|s| s.unwrap().index).collect();
        assert_eq!(indices, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn error_ends_the_stream() {
        let mut stream = spawn_source(
            Counter {
                next: 0,
                limit: 10,
                fail_at: Some(2),
            },
            1,
        )
        .unwrap();
        assert!(stream.next().unwrap().is_ok());
        assert!(stream.next().unwrap().is_ok());
        assert!(matches!(stream.next(), Some(Err(SourceError::Disconnected))));
        assert!(stream.next().is_none());
    }

    #[test]
    fn join_releases_a_blocked_worker() {
        let mut stream = spawn_source(
            Counter {
                next: 0,
                limit: u64::MAX,
                fail_at: None,
            },
            1,
        )
        .unwrap();
        assert!(stream.next().is_some());
        stream.join().unwrap();
    }
}
