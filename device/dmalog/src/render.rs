use core::fmt;
use core::fmt::Write;

/// Free-running millisecond counter used for message timestamps. Rollover is ignored.
pub trait MillisClock {
    fn millis(&self) -> u32;
}

impl<F: Fn() -> u32> MillisClock for F {
    fn millis(&self) -> u32 {
        self()
    }
}

/// Clock for targets without a tick source; every message is stamped `(0)`.
#[derive(Debug, Copy, Clone, Default)]
pub struct NoClock;

impl MillisClock for NoClock {
    fn millis(&self) -> u32 {
        0
    }
}

/// Outcome of rendering one message.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Rendered {
    /// Total bytes, timestamp and line feed included.
    pub len: usize,
    /// The text was cut short to fit the compose buffer. Still a usable message.
    pub truncated: bool,
}

/// `core::fmt::Write` sink over a fixed slice that keeps what fits and drops the rest.
struct BoundedWriter<'a> {
    buf: &'a mut [u8],
    cursor: usize,
    truncated: bool,
}

impl<'a> Write for BoundedWriter<'a> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = self.buf.len() - self.cursor;
        let n = s.len().min(room);
        self.buf[self.cursor..self.cursor + n].copy_from_slice(&s.as_bytes()[..n]);
        self.cursor += n;
        if n < s.len() {
            self.truncated = true;
            // stop the formatter; nothing more will fit
            Err(fmt::Error)
        } else {
            Ok(())
        }
    }
}

/// Scratch buffer a message is composed in before it is copied into the queue.
#[derive(Debug)]
pub struct ComposeBuffer<const M: usize> {
    bytes: [u8; M],
}

impl<const M: usize> Default for ComposeBuffer<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const M: usize> ComposeBuffer<M> {
    pub const fn new() -> Self {
        const { assert!(M >= 2, "compose buffer needs room for text and a line feed") };
        Self { bytes: [0; M] }
    }

    /// Render `"(<timestamp_ms>) <message>\n"`, truncating the text so the whole item including
    /// the line feed fits in `M` bytes.
    pub fn render(&mut self, timestamp_ms: u32, args: fmt::Arguments) -> Rendered {
        let (text, _) = self.bytes.split_at_mut(M - 1);
        let mut w = BoundedWriter {
            buf: text,
            cursor: 0,
            truncated: false,
        };
        let _ = write!(w, "({timestamp_ms}) ");
        if !w.truncated {
            let _ = w.write_fmt(args);
        }
        let BoundedWriter {
            cursor, truncated, ..
        } = w;

        // the line feed takes the place a C string terminator would have
        self.bytes[cursor] = b'\n';
        Rendered {
            len: cursor + 1,
            truncated,
        }
    }

    pub fn rendered(&self, rendered: Rendered) -> &[u8] {
        &self.bytes[..rendered.len]
    }
}
