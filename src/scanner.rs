//! Pull-based line splitting over an async byte stream.
//!
//! Log streams can be arbitrarily long (or endless with `--follow`), so lines
//! are produced one at a time from a growable buffer instead of reading the
//! whole body up front.

use futures::io::{AsyncRead, AsyncReadExt};
use std::io;

const INITIAL_CAPACITY: usize = 4 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Ready,
    HasLine,
    Exhausted,
    Errored,
}

pub struct LineScanner<R> {
    reader: R,
    /// Backing storage; only `buf[..filled]` holds data.
    buf: Vec<u8>,
    filled: usize,
    /// Prefix of `buf[..filled]` already searched without finding a `\n`.
    scanned: usize,
    /// Index of the `\n` ending the pending line, `None` for a final unterminated line.
    line_end: Option<usize>,
    eof: bool,
    error: Option<io::Error>,
    state: ScanState,
    lines: u64,
}

impl<R: AsyncRead + Unpin> LineScanner<R> {
    pub fn new(reader: R) -> Self {
        Self::with_capacity(reader, INITIAL_CAPACITY)
    }

    pub fn with_capacity(reader: R, capacity: usize) -> Self {
        Self {
            reader,
            buf: vec![0; capacity.max(1)],
            filled: 0,
            scanned: 0,
            line_end: None,
            eof: false,
            error: None,
            state: ScanState::Ready,
            lines: 0,
        }
    }

    /// Try to make the next line available.
    ///
    /// Returns `true` when a line can be taken with [`current_line`](Self::current_line).
    /// Buffered data is checked before reading, so a line already in the buffer
    /// never waits on the underlying stream.
    pub async fn advance(&mut self) -> bool {
        match self.state {
            ScanState::Exhausted | ScanState::Errored => return false,
            ScanState::HasLine => return true,
            ScanState::Ready => {}
        }

        loop {
            let unscanned = &self.buf[self.scanned..self.filled];
            if let Some(offset) = unscanned.iter().position(|&b| b == b'\n') {
                self.line_end = Some(self.scanned + offset);
                self.state = ScanState::HasLine;
                return true;
            }
            self.scanned = self.filled;

            if self.eof {
                if self.filled > 0 {
                    self.line_end = None;
                    self.state = ScanState::HasLine;
                    return true;
                }
                self.state = ScanState::Exhausted;
                return false;
            }

            if self.filled == self.buf.len() {
                let doubled = self.buf.len() * 2;
                self.buf.resize(doubled, 0);
            }

            match self.reader.read(&mut self.buf[self.filled..]).await {
                Ok(0) => self.eof = true,
                Ok(n) => self.filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    self.error = Some(e);
                    self.state = ScanState::Errored;
                    return false;
                }
            }
        }
    }

    /// Take the pending line (without its `\n`) and drop it from the buffer.
    ///
    /// Returns `None` unless the last [`advance`](Self::advance) produced a line.
    pub fn current_line(&mut self) -> Option<String> {
        self.take_line_bytes()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Byte-exact variant of [`current_line`](Self::current_line).
    pub fn take_line_bytes(&mut self) -> Option<Vec<u8>> {
        if self.state != ScanState::HasLine {
            return None;
        }

        let (line_len, consumed) = match self.line_end {
            Some(pos) => (pos, pos + 1),
            None => (self.filled, self.filled),
        };
        let line = self.buf[..line_len].to_vec();
        self.buf.copy_within(consumed..self.filled, 0);
        self.filled -= consumed;
        self.scanned = 0;
        self.line_end = None;
        self.state = ScanState::Ready;
        self.lines += 1;
        Some(line)
    }

    /// The read error that terminated the scan, if any. End of stream is not an error.
    pub fn last_error(&self) -> Option<&io::Error> {
        self.error.as_ref()
    }

    /// True once the stream ended cleanly and every buffered byte was handed out.
    pub fn end_of_stream(&self) -> bool {
        self.state == ScanState::Exhausted
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn lines_produced(&self) -> u64 {
        self.lines
    }

    #[cfg(test)]
    fn capacity(&self) -> usize {
        self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::io::Cursor;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    async fn scan_all(input: &[u8]) -> (Vec<String>, LineScanner<Cursor<Vec<u8>>>) {
        let mut scanner = LineScanner::new(Cursor::new(input.to_vec()));
        let mut lines = Vec::new();
        while scanner.advance().await {
            lines.push(scanner.current_line().unwrap());
        }
        (lines, scanner)
    }

    /// Hands out the input a few bytes per read, then optionally fails.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        step: usize,
        fail_at_end: bool,
        reads: usize,
    }

    impl Trickle {
        fn new(data: &[u8], step: usize) -> Self {
            Self {
                data: data.to_vec(),
                pos: 0,
                step,
                fail_at_end: false,
                reads: 0,
            }
        }

        fn failing(mut self) -> Self {
            self.fail_at_end = true;
            self
        }
    }

    impl AsyncRead for Trickle {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            out: &mut [u8],
        ) -> Poll<io::Result<usize>> {
            self.reads += 1;
            if self.pos >= self.data.len() {
                if self.fail_at_end {
                    return Poll::Ready(Err(io::Error::new(
                        io::ErrorKind::ConnectionReset,
                        "connection reset",
                    )));
                }
                return Poll::Ready(Ok(0));
            }
            let n = self.step.min(out.len()).min(self.data.len() - self.pos);
            let start = self.pos;
            out[..n].copy_from_slice(&self.data[start..start + n]);
            self.pos += n;
            Poll::Ready(Ok(n))
        }
    }

    #[tokio::test]
    async fn test_empty_input() {
        let (lines, scanner) = scan_all(b"").await;
        assert!(lines.is_empty());
        assert!(scanner.end_of_stream());
        assert!(scanner.last_error().is_none());
        assert_eq!(scanner.lines_produced(), 0);
    }

    #[tokio::test]
    async fn test_single_terminated_line() {
        let (lines, scanner) = scan_all(b"hello\n").await;
        assert_eq!(lines, vec!["hello"]);
        assert!(scanner.end_of_stream());
    }

    #[tokio::test]
    async fn test_unterminated_final_line() {
        let (lines, _) = scan_all(b"hello\nworld").await;
        assert_eq!(lines, vec!["hello", "world"]);
    }

    #[tokio::test]
    async fn test_blank_lines() {
        let (lines, _) = scan_all(b"\n\nhello\n").await;
        assert_eq!(lines, vec!["", "", "hello"]);

        let (lines, _) = scan_all(b"\n").await;
        assert_eq!(lines, vec![""]);
    }

    #[tokio::test]
    async fn test_reconstructs_input() {
        let input: &[u8] = b"first\n\nthird line\r\n\xff\xfe raw\nlast";
        let mut scanner = LineScanner::with_capacity(Trickle::new(input, 3), 2);
        let mut rebuilt = Vec::new();
        let mut lines = Vec::new();
        while scanner.advance().await {
            lines.push(scanner.take_line_bytes().unwrap());
        }
        for (i, line) in lines.iter().enumerate() {
            rebuilt.extend_from_slice(line);
            if i + 1 < lines.len() {
                rebuilt.push(b'\n');
            }
        }
        assert_eq!(rebuilt, input);
    }

    #[tokio::test]
    async fn test_buffer_grows_for_long_lines() {
        let long = "x".repeat(10_000);
        let input = format!("{long}\nshort\n");
        let mut scanner = LineScanner::with_capacity(Trickle::new(input.as_bytes(), 512), 16);
        assert!(scanner.advance().await);
        assert_eq!(scanner.current_line().unwrap(), long);
        assert!(scanner.capacity() >= 10_001);
        assert!(scanner.advance().await);
        assert_eq!(scanner.current_line().unwrap(), "short");
        assert!(!scanner.advance().await);
    }

    #[tokio::test]
    async fn test_long_line_is_searched_once() {
        let long = "y".repeat(3_000);
        let input = format!("{long}\nnext");
        let mut scanner = LineScanner::with_capacity(Trickle::new(input.as_bytes(), 7), 8);
        assert!(scanner.advance().await);
        // Only the final read, which brought the newline, was left unsearched.
        assert!(scanner.scanned <= 3_000 && scanner.scanned > 3_000 - 7);
        assert_eq!(scanner.line_end, Some(3_000));
        assert_eq!(scanner.current_line().unwrap(), long);
        assert_eq!(scanner.scanned, 0);

        assert!(scanner.advance().await);
        assert_eq!(scanner.scanned, scanner.filled);
        assert_eq!(scanner.current_line().unwrap(), "next");
        assert!(!scanner.advance().await);
    }

    #[tokio::test]
    async fn test_buffered_line_needs_no_read() {
        let mut scanner = LineScanner::new(Trickle::new(b"a\nb\nc\n", 64));
        assert!(scanner.advance().await);
        assert_eq!(scanner.current_line().unwrap(), "a");
        let reads = scanner.reader.reads;
        assert!(scanner.advance().await);
        assert_eq!(scanner.current_line().unwrap(), "b");
        assert_eq!(scanner.reader.reads, reads);
    }

    #[tokio::test]
    async fn test_advance_without_take_keeps_line() {
        let mut scanner = LineScanner::new(Cursor::new(b"one\ntwo\n".to_vec()));
        assert!(scanner.advance().await);
        assert!(scanner.advance().await);
        assert_eq!(scanner.current_line().unwrap(), "one");
        assert_eq!(scanner.current_line(), None);
    }

    #[tokio::test]
    async fn test_read_error_is_terminal() {
        let mut scanner = LineScanner::new(Trickle::new(b"ok\npartial", 4).failing());
        assert!(scanner.advance().await);
        assert_eq!(scanner.current_line().unwrap(), "ok");
        assert!(!scanner.advance().await);
        assert_eq!(scanner.state(), ScanState::Errored);
        assert_eq!(
            scanner.last_error().map(|e| e.kind()),
            Some(io::ErrorKind::ConnectionReset)
        );
        assert!(!scanner.end_of_stream());
        assert!(!scanner.advance().await);
    }
}
