//! Capture of user print output.
//!
//! Standard output carries the line protocol, so anything user logic prints
//! goes to an [`OutputStream`] instead. Outside a capture the stream forwards
//! to its fallback sink; inside one, text accumulates in a buffer that is
//! split into lines when the capture finishes.

use std::cell::RefCell;
use std::fmt;
use std::io::Write;
use std::rc::Rc;

/// Where text goes while no capture is active.
pub enum Fallback {
    /// Drop it.
    Discard,
    /// Write it to a stream, ignoring write errors.
    Writer(Box<dyn Write>),
}

impl fmt::Debug for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discard => f.write_str("Discard"),
            Self::Writer(_) => f.write_str("Writer(..)"),
        }
    }
}

#[derive(Debug)]
enum Sink {
    Fallback(Fallback),
    Buffer(String),
}

/// Shared handle to the print stream user logic writes to.
///
/// Clones refer to the same stream. Single-threaded by construction.
#[derive(Debug, Clone)]
pub struct OutputStream {
    sink: Rc<RefCell<Sink>>,
}

impl Default for OutputStream {
    fn default() -> Self {
        Self::new(Fallback::Discard)
    }
}

impl OutputStream {
    /// Create a stream with the given fallback.
    #[must_use]
    pub fn new(fallback: Fallback) -> Self {
        Self {
            sink: Rc::new(RefCell::new(Sink::Fallback(fallback))),
        }
    }

    /// Write raw text.
    pub fn write_str(&self, text: &str) {
        match &mut *self.sink.borrow_mut() {
            Sink::Buffer(buffer) => buffer.push_str(text),
            Sink::Fallback(Fallback::Writer(writer)) => {
                let _ = writer.write_all(text.as_bytes());
            }
            Sink::Fallback(Fallback::Discard) => {}
        }
    }

    /// Write `text` followed by a newline.
    pub fn write_line(&self, text: &str) {
        let mut sink = self.sink.borrow_mut();
        match &mut *sink {
            Sink::Buffer(buffer) => {
                buffer.push_str(text);
                buffer.push('\n');
            }
            Sink::Fallback(Fallback::Writer(writer)) => {
                let _ = writeln!(writer, "{text}");
            }
            Sink::Fallback(Fallback::Discard) => {}
        }
    }

    /// Whether a capture is active.
    #[must_use]
    pub fn is_capturing(&self) -> bool {
        matches!(*self.sink.borrow(), Sink::Buffer(_))
    }

    /// Redirect the stream into a fresh buffer until the returned guard is
    /// finished or dropped. Captures nest.
    #[must_use = "output is restored when the capture is dropped"]
    pub fn capture(&self) -> Capture {
        let previous = self.sink.replace(Sink::Buffer(String::new()));
        Capture {
            stream: self.clone(),
            previous: Some(previous),
        }
    }
}

/// An active capture. Restores the previous sink exactly once, on
/// [`Capture::finish`] or on drop.
#[derive(Debug)]
pub struct Capture {
    stream: OutputStream,
    previous: Option<Sink>,
}

impl Capture {
    /// End the capture and return what was written, split into lines.
    ///
    /// Each line keeps its trailing newline; a final unterminated fragment
    /// is returned as is.
    #[must_use]
    pub fn finish(mut self) -> Vec<String> {
        let buffer = self.restore();
        buffer.split_inclusive('\n').map(str::to_string).collect()
    }

    fn restore(&mut self) -> String {
        let Some(previous) = self.previous.take() else {
            return String::new();
        };
        match self.stream.sink.replace(previous) {
            Sink::Buffer(buffer) => buffer,
            Sink::Fallback(_) => String::new(),
        }
    }
}

impl Drop for Capture {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Shared(Arc<Mutex<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_capture_splits_lines() {
        let stream = OutputStream::default();
        let capture = stream.capture();
        stream.write_line("hello");
        stream.write_str("partial ");
        stream.write_line("world");
        stream.write_str("tail");
        assert_eq!(capture.finish(), vec!["hello\n", "partial world\n", "tail"]);
        assert!(!stream.is_capturing());
    }

    #[test]
    fn test_empty_capture() {
        let stream = OutputStream::default();
        let capture = stream.capture();
        assert!(capture.finish().is_empty());
    }

    #[test]
    fn test_fallback_restored_after_capture() {
        let shared = Shared::default();
        let stream = OutputStream::new(Fallback::Writer(Box::new(shared.clone())));
        stream.write_line("before");
        {
            let capture = stream.capture();
            stream.write_line("inside");
            assert_eq!(capture.finish(), vec!["inside\n"]);
        }
        stream.write_line("after");
        let written = String::from_utf8(shared.0.lock().unwrap().clone()).unwrap();
        assert_eq!(written, "before\nafter\n");
    }

    #[test]
    fn test_drop_restores() {
        let stream = OutputStream::default();
        {
            let _capture = stream.capture();
            stream.write_line("lost");
            assert!(stream.is_capturing());
        }
        assert!(!stream.is_capturing());
    }

    #[test]
    fn test_nested_captures() {
        let stream = OutputStream::default();
        let outer = stream.capture();
        stream.write_line("outer 1");
        let inner = stream.capture();
        stream.write_line("inner");
        assert_eq!(inner.finish(), vec!["inner\n"]);
        stream.write_line("outer 2");
        assert_eq!(outer.finish(), vec!["outer 1\n", "outer 2\n"]);
    }

    #[test]
    fn test_discard_never_fails() {
        let stream = OutputStream::new(Fallback::Discard);
        stream.write_line("nobody listens");
        stream.write_str("still fine");
        assert!(!stream.is_capturing());
    }
}
