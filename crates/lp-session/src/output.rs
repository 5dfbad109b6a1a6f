//! UART output assembly: per-core line buffers and the shared pause buffer.
//!
//! Pure data structures; routing decisions (paint now, stage, or drop) live
//! in the poller. Invariant: a byte read from a core ends up in exactly one
//! of the painted stream, the pause buffer, or the overflow drop path.

/// Per-core line assembly capacity in bytes.
pub const MAX_BUFFER_SIZE: usize = 2048;
/// Shared staging capacity for output accumulated while painting is
/// suspended.
pub const PAUSE_BUFFER_CAPACITY: usize = 1024 * 1024;

/// What happened to a byte offered to an [`OutputLine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// Absorbed (or a dropped carriage return); nothing to paint yet.
    Buffered,
    /// Newline observed: the completed line, including its terminator.
    Flush(Vec<u8>),
    /// Buffer at capacity, byte dropped. `first` is set for the first drop
    /// since the last flush so callers warn exactly once per overrun.
    Dropped { first: bool },
}

/// Fixed-capacity assembly buffer for one core's UART stream.
#[derive(Debug)]
pub struct OutputLine {
    buf: Vec<u8>,
    overflowed: bool,
}

impl Default for OutputLine {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputLine {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(MAX_BUFFER_SIZE),
            overflowed: false,
        }
    }

    /// Offer one byte. Carriage returns are dropped on insertion; a newline
    /// always terminates the line, even one that has overflowed.
    pub fn push(&mut self, byte: u8) -> PushOutcome {
        if byte == b'\r' {
            return PushOutcome::Buffered;
        }
        if byte == b'\n' {
            self.buf.push(b'\n');
            let line = std::mem::replace(&mut self.buf, Vec::with_capacity(MAX_BUFFER_SIZE));
            self.overflowed = false;
            return PushOutcome::Flush(line);
        }
        if self.buf.len() >= MAX_BUFFER_SIZE {
            let first = !self.overflowed;
            self.overflowed = true;
            return PushOutcome::Dropped { first };
        }
        self.buf.push(byte);
        PushOutcome::Buffered
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// Shared staging area for output observed while `paint_ok` is false.
/// Single producer (the poller), drained or discarded by the same poller
/// when painting resumes.
#[derive(Debug, Default)]
pub struct PauseBuffer {
    buf: Vec<u8>,
}

impl PauseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage bytes for a later drain. Returns false (dropping the bytes)
    /// once the capacity is exhausted; staging never blocks the poller.
    pub fn stage(&mut self, bytes: &[u8]) -> bool {
        if self.buf.len() + bytes.len() > PAUSE_BUFFER_CAPACITY {
            return false;
        }
        self.buf.extend_from_slice(bytes);
        true
    }

    /// Take everything staged, leaving the buffer empty.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carriage_returns_dropped() {
        let mut line = OutputLine::new();
        assert_eq!(line.push(b'a'), PushOutcome::Buffered);
        assert_eq!(line.push(b'\r'), PushOutcome::Buffered);
        assert_eq!(line.push(b'b'), PushOutcome::Buffered);
        assert_eq!(line.push(b'\n'), PushOutcome::Flush(b"ab\n".to_vec()));
    }

    #[test]
    fn flush_resets_for_next_line() {
        let mut line = OutputLine::new();
        line.push(b'x');
        line.push(b'\n');
        assert!(line.is_empty());
        assert_eq!(line.push(b'\n'), PushOutcome::Flush(b"\n".to_vec()));
    }

    #[test]
    fn overflow_warns_once_until_newline() {
        let mut line = OutputLine::new();
        for _ in 0..MAX_BUFFER_SIZE {
            assert_eq!(line.push(b'z'), PushOutcome::Buffered);
        }
        assert_eq!(line.push(b'z'), PushOutcome::Dropped { first: true });
        assert_eq!(line.push(b'z'), PushOutcome::Dropped { first: false });
        // Newline still terminates the overrun line and re-arms the warning.
        match line.push(b'\n') {
            PushOutcome::Flush(flushed) => assert_eq!(flushed.len(), MAX_BUFFER_SIZE + 1),
            other => panic!("expected flush, got {other:?}"),
        }
        for _ in 0..MAX_BUFFER_SIZE {
            line.push(b'q');
        }
        assert_eq!(line.push(b'q'), PushOutcome::Dropped { first: true });
    }

    #[test]
    fn pause_buffer_caps_at_capacity() {
        let mut pause = PauseBuffer::new();
        let chunk = vec![0u8; PAUSE_BUFFER_CAPACITY - 1];
        assert!(pause.stage(&chunk));
        assert!(pause.stage(b"x"));
        assert!(!pause.stage(b"xx"));
        assert_eq!(pause.len(), PAUSE_BUFFER_CAPACITY);
    }

    #[test]
    fn take_empties_the_stage() {
        let mut pause = PauseBuffer::new();
        pause.stage(b"queued");
        assert_eq!(pause.take(), b"queued");
        assert!(pause.is_empty());
        assert_eq!(pause.take(), Vec::<u8>::new());
    }
}
