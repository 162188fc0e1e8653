//! Output streaming from running processes.

use std::io::Write;
use std::sync::mpsc::Sender;

/// Receives a process's combined stdout/stderr as it is produced.
///
/// Chunks arrive in the order the process wrote them, on the thread that
/// called [`SecureProcessRunner::run`](super::SecureProcessRunner::run).
/// Chunk boundaries are arbitrary; a line may be split across calls.
///
/// # Examples
///
/// ```
/// use packsafe_core::process::OutputSink;
///
/// struct ByteCounter(usize);
///
/// impl OutputSink for ByteCounter {
///     fn on_output(&mut self, chunk: &[u8]) {
///         self.0 += chunk.len();
///     }
/// }
/// ```
pub trait OutputSink {
    /// Called once per chunk read from the process.
    fn on_output(&mut self, chunk: &[u8]);

    /// Returns `true` once the sink has seen enough output. The runner then
    /// terminates the process the same way it handles a timeout and reports
    /// [`ProcessResult::stopped`](super::ProcessResult::stopped).
    fn wants_stop(&self) -> bool {
        false
    }
}

/// Sink that discards everything.
#[derive(Debug, Default)]
pub struct NoopOutput;

impl OutputSink for NoopOutput {
    fn on_output(&mut self, _chunk: &[u8]) {}
}

/// Forwards chunks over a channel so another thread can consume them.
///
/// A closed receiver is ignored; the run continues.
impl OutputSink for Sender<Vec<u8>> {
    fn on_output(&mut self, chunk: &[u8]) {
        let _ = self.send(chunk.to_vec());
    }
}

/// Copies chunks to any writer, e.g. the terminal.
#[derive(Debug)]
pub struct WriterOutput<W: Write>(pub W);

impl<W: Write> OutputSink for WriterOutput<W> {
    fn on_output(&mut self, chunk: &[u8]) {
        if self.0.write_all(chunk).is_ok() {
            let _ = self.0.flush();
        }
    }
}

/// Bounded accumulator for the captured copy of the output.
#[derive(Debug)]
pub(crate) struct CapturedOutput {
    buffer: Vec<u8>,
    limit: usize,
    truncated: bool,
}

impl CapturedOutput {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            buffer: Vec::new(),
            limit,
            truncated: false,
        }
    }

    pub(crate) fn push(&mut self, chunk: &[u8]) {
        let room = self.limit.saturating_sub(self.buffer.len());
        if chunk.len() > room {
            self.truncated = true;
        }
        self.buffer.extend_from_slice(&chunk[..chunk.len().min(room)]);
    }

    pub(crate) fn finish(self) -> (String, bool) {
        (
            String::from_utf8_lossy(&self.buffer).into_owned(),
            self.truncated,
        )
    }
}
