use crate::error::{ControlError, ControlResult};
use log::{debug, trace, warn};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::time::Duration;

const LINE_TERMINATOR: u8 = b'\n';

/// Fixed-capacity staging area for at most one undelimited message.
///
/// `offset` marks the end of valid data and never exceeds the capacity.
pub struct ReceiveBuffer {
    data: Box<[u8]>,
    offset: usize,
}

impl ReceiveBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            offset: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn pending(&self) -> &[u8] {
        &self.data[..self.offset]
    }

    /// Free space a read may fill.
    pub fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.offset..]
    }

    /// Account for `n` freshly read bytes and extract a line if one is complete.
    ///
    /// When the buffer fills without a terminator the oldest byte is dropped so
    /// the next read always has room; an overlong line loses its head.
    pub fn commit(&mut self, n: usize) -> Option<String> {
        self.offset = (self.offset + n).min(self.capacity());
        if let Some(line) = self.take_line() {
            return Some(line);
        }
        if self.offset >= self.capacity() {
            self.data.copy_within(1..self.offset, 0);
            self.offset -= 1;
            trace!("[RX] Receive buffer full, dropped oldest byte");
        }
        None
    }

    /// Remove the first complete line, shifting any remainder down to index 0.
    pub fn take_line(&mut self) -> Option<String> {
        let end = self.pending().iter().position(|&b| b == LINE_TERMINATOR)?;
        let line = String::from_utf8_lossy(&self.data[..end]).into_owned();

        let rest = end + 1;
        if rest >= self.offset {
            self.offset = 0;
        } else {
            self.data.copy_within(rest..self.offset, 0);
            self.offset -= rest;
        }
        Some(line)
    }

    pub fn clear(&mut self) {
        self.offset = 0;
    }
}

/// Outcome of a single non-blocking read attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadStep {
    /// A complete line was extracted.
    Message(String),
    /// Bytes arrived but no terminator yet; read again straight away.
    Partial,
    /// Nothing available (zero-byte read or would-block); wait before retrying.
    Idle,
}

/// Resumable line framing over a non-blocking input channel.
pub struct LineMessageReader<R = File> {
    input: Option<R>,
    buffer: ReceiveBuffer,
}

impl<R: Read> LineMessageReader<R> {
    pub fn new(capacity: usize) -> Self {
        Self {
            input: None,
            buffer: ReceiveBuffer::new(capacity),
        }
    }

    pub fn attach(&mut self, input: R) {
        self.input = Some(input);
    }

    /// Drop the input channel. Buffered partial data is kept for the next attach.
    pub fn detach(&mut self) -> Option<R> {
        self.input.take()
    }

    pub fn is_open(&self) -> bool {
        self.input.is_some()
    }

    pub fn buffer(&self) -> &ReceiveBuffer {
        &self.buffer
    }

    /// Perform one read attempt and advance the framing state.
    pub fn poll_once(&mut self) -> ControlResult<ReadStep> {
        let input = self
            .input
            .as_mut()
            .ok_or(ControlError::ChannelUnavailable("Receive message"))?;

        // A previous read may have carried more than one line.
        if let Some(line) = self.buffer.take_line() {
            return Ok(ReadStep::Message(line));
        }

        match input.read(self.buffer.spare_mut()) {
            Ok(0) => Ok(ReadStep::Idle),
            Ok(n) => {
                trace!("[RX] Read {} bytes (offset {})", n, self.buffer.offset());
                Ok(match self.buffer.commit(n) {
                    Some(line) => {
                        debug!("[RX] Message received ({} bytes)", line.len());
                        ReadStep::Message(line)
                    }
                    None => ReadStep::Partial,
                })
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                Ok(ReadStep::Idle)
            }
            Err(e) => {
                warn!("[RX] Read failed: {}", e);
                Err(ControlError::ReadFailure(e))
            }
        }
    }

    /// Poll until a full line is available or the read fails.
    pub async fn receive(&mut self, poll_interval: Duration) -> ControlResult<String> {
        poll_until_message(|| self.poll_once(), poll_interval).await
    }
}

/// Drive `step` until it yields a message. Every retry is a fresh await point,
/// so sustained would-block conditions never deepen the stack.
pub async fn poll_until_message<F>(mut step: F, poll_interval: Duration) -> ControlResult<String>
where
    F: FnMut() -> ControlResult<ReadStep>,
{
    loop {
        match step()? {
            ReadStep::Message(line) => return Ok(line),
            ReadStep::Partial => tokio::task::yield_now().await,
            ReadStep::Idle => tokio::time::sleep(poll_interval).await,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io;

    /// Replays a fixed sequence of read results, then reports would-block.
    pub(crate) struct ScriptedInput {
        steps: VecDeque<io::Result<Vec<u8>>>,
    }

    impl ScriptedInput {
        pub(crate) fn new() -> Self {
            Self {
                steps: VecDeque::new(),
            }
        }

        pub(crate) fn data(mut self, bytes: &[u8]) -> Self {
            self.steps.push_back(Ok(bytes.to_vec()));
            self
        }

        pub(crate) fn would_block(mut self) -> Self {
            self.steps
                .push_back(Err(io::Error::from(ErrorKind::WouldBlock)));
            self
        }

        pub(crate) fn error(mut self, kind: ErrorKind) -> Self {
            self.steps.push_back(Err(io::Error::from(kind)));
            self
        }
    }

    impl Read for ScriptedInput {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.steps.pop_front() {
                None => Err(io::Error::from(ErrorKind::WouldBlock)),
                Some(Err(e)) => Err(e),
                Some(Ok(bytes)) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    if n < bytes.len() {
                        self.steps.push_front(Ok(bytes[n..].to_vec()));
                    }
                    Ok(n)
                }
            }
        }
    }

    fn reader(capacity: usize, input: ScriptedInput) -> LineMessageReader<ScriptedInput> {
        let mut reader = LineMessageReader::new(capacity);
        reader.attach(input);
        reader
    }

    fn drain(reader: &mut LineMessageReader<ScriptedInput>, polls: usize) -> Vec<ReadStep> {
        (0..polls).map(|_| reader.poll_once().unwrap()).collect()
    }

    #[test]
    fn reassembles_line_split_across_reads() {
        let input = ScriptedInput::new()
            .data(b"Hel")
            .would_block()
            .data(b"")
            .data(b"lo Wor")
            .would_block()
            .data(b"ld\n");
        let mut reader = reader(255, input);

        let steps = drain(&mut reader, 6);
        assert_eq!(
            steps,
            vec![
                ReadStep::Partial,
                ReadStep::Idle,
                ReadStep::Idle,
                ReadStep::Partial,
                ReadStep::Idle,
                ReadStep::Message("Hello World".to_string()),
            ]
        );
        assert_eq!(reader.buffer().offset(), 0);
    }

    #[test]
    fn keeps_remainder_for_the_next_call() {
        let input = ScriptedInput::new().data(b"first\nsecond\nthi").data(b"rd\n");
        let mut reader = reader(255, input);

        assert_eq!(
            reader.poll_once().unwrap(),
            ReadStep::Message("first".to_string())
        );
        assert_eq!(reader.buffer().pending(), b"second\nthi");

        // The buffered line is delivered before any new read.
        assert_eq!(
            reader.poll_once().unwrap(),
            ReadStep::Message("second".to_string())
        );
        assert_eq!(
            reader.poll_once().unwrap(),
            ReadStep::Message("third".to_string())
        );
        assert_eq!(reader.buffer().offset(), 0);
    }

    #[test]
    fn overflow_drops_oldest_bytes() {
        let input = ScriptedInput::new().data(b"0123456789AB").data(b"\n");
        let mut reader = reader(8, input);

        let mut message = None;
        for _ in 0..16 {
            match reader.poll_once().unwrap() {
                ReadStep::Message(line) => {
                    message = Some(line);
                    break;
                }
                _ => assert!(reader.buffer().offset() < reader.buffer().capacity()),
            }
        }
        assert_eq!(message.as_deref(), Some("56789AB"));
    }

    #[test]
    fn unterminated_stream_never_emits() {
        let mut input = ScriptedInput::new();
        for _ in 0..40 {
            input = input.data(b"abcdefgh");
        }
        let mut reader = reader(16, input);

        for _ in 0..400 {
            assert!(!matches!(reader.poll_once().unwrap(), ReadStep::Message(_)));
            assert!(reader.buffer().offset() < 16);
        }
    }

    #[test]
    fn hard_error_is_reported() {
        let input = ScriptedInput::new()
            .data(b"par")
            .error(ErrorKind::BrokenPipe);
        let mut reader = reader(255, input);

        assert_eq!(reader.poll_once().unwrap(), ReadStep::Partial);
        let err = reader.poll_once().unwrap_err();
        assert!(matches!(err, ControlError::ReadFailure(_)));
        assert_eq!(reader.buffer().pending(), b"par");
    }

    #[test]
    fn detached_reader_is_unavailable() {
        let mut reader: LineMessageReader<ScriptedInput> = LineMessageReader::new(16);
        assert!(matches!(
            reader.poll_once(),
            Err(ControlError::ChannelUnavailable(_))
        ));

        reader.attach(ScriptedInput::new().data(b"ok\n"));
        reader.detach();
        assert!(reader.poll_once().is_err());
    }

    #[test]
    fn invalid_bytes_are_replaced() {
        let mut buffer = ReceiveBuffer::new(16);
        buffer.spare_mut()[..4].copy_from_slice(b"a\xffb\n");
        assert_eq!(buffer.commit(4).as_deref(), Some("a\u{fffd}b"));
    }

    #[tokio::test]
    async fn receive_waits_through_idle_reads() {
        let input = ScriptedInput::new()
            .would_block()
            .would_block()
            .data(b"")
            .data(b"pay")
            .would_block()
            .data(b"load\nnext");
        let mut reader = reader(64, input);

        let line = reader.receive(Duration::from_millis(1)).await.unwrap();
        assert_eq!(line, "payload");
        assert_eq!(reader.buffer().pending(), b"next");
    }

    #[tokio::test]
    async fn receive_stops_on_failure() {
        let input = ScriptedInput::new()
            .would_block()
            .error(ErrorKind::ConnectionReset);
        let mut reader = reader(64, input);

        let result = reader.receive(Duration::from_millis(1)).await;
        assert!(matches!(result, Err(ControlError::ReadFailure(_))));
    }
}
