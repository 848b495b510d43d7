use std::fmt;
use std::panic::Location;
use thiserror::Error;

use crate::trace;

/// Result type for archive decoding
pub type Result<T> = std::result::Result<T, Error>;

/// What went wrong, independent of where
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("{0}")]
    Str(String),

    // Container signatures
    #[error("Invalid executable signature")]
    InvalidExeSignature,

    #[error("Invalid PE signature")]
    InvalidPeSignature,

    #[error("Invalid game signature")]
    InvalidGameSignature,

    #[error("Invalid pack count")]
    InvalidPackCount,

    // Chunk stream
    #[error("Invalid state")]
    InvalidState,

    #[error("Invalid mode")]
    InvalidMode,

    #[error("Invalid chunk")]
    InvalidChunk,

    // Modes compiled out of this build
    #[error("MODE0 not available in this build")]
    NoMode0,

    #[error("MODE1 not available in this build")]
    NoMode1,

    #[error("MODE2 not available in this build")]
    NoMode2,

    #[error("MODE3 not available in this build")]
    NoMode3,

    #[error("Out of data: requested {requested} bytes, {remaining} remaining")]
    OutOfData { requested: usize, remaining: usize },

    #[error("Inflate failed")]
    InflateFailed,

    #[error("Decrypt failed")]
    DecryptFailed,

    // Modes compiled in but without a registered decoder
    #[error("No MODE0 decoder")]
    NoMode0Decoder,

    #[error("No MODE1 decoder")]
    NoMode1Decoder,

    #[error("No MODE2 decoder")]
    NoMode2Decoder,

    #[error("No MODE3 decoder")]
    NoMode3Decoder,
}

/// One step of an error's propagation path.
#[derive(Debug, Clone)]
pub struct TraceFrame {
    pub location: &'static Location<'static>,
    pub message: String,
    pub context: Option<String>,
    pub depth: usize,
}

impl fmt::Display for TraceFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}:{}: {}",
            trace::Indent(self.depth),
            self.location.file(),
            self.location.line(),
            self.message
        )?;
        if let Some(context) = &self.context {
            write!(f, ": {}", context)?;
        }
        Ok(())
    }
}

/// Error kind plus the trace of every layer it passed through.
///
/// Frames are ordered innermost first. The first frame is recorded where
/// the error was raised; each forwarding layer appends one more.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    trace: Vec<TraceFrame>,
}

impl Error {
    #[track_caller]
    pub fn new(kind: ErrorKind) -> Self {
        Self::raise(kind, None, Location::caller())
    }

    #[track_caller]
    pub fn with_context(kind: ErrorKind, context: impl Into<String>) -> Self {
        Self::raise(kind, Some(context.into()), Location::caller())
    }

    /// Free-text error.
    #[track_caller]
    pub fn str(message: impl Into<String>) -> Self {
        Self::raise(ErrorKind::Str(message.into()), None, Location::caller())
    }

    #[track_caller]
    pub fn out_of_data(requested: usize, remaining: usize) -> Self {
        Self::raise(
            ErrorKind::OutOfData {
                requested,
                remaining,
            },
            None,
            Location::caller(),
        )
    }

    fn raise(
        kind: ErrorKind,
        context: Option<String>,
        location: &'static Location<'static>,
    ) -> Self {
        let frame = TraceFrame {
            location,
            message: kind.to_string(),
            context,
            depth: trace::depth(),
        };
        Self {
            kind,
            trace: vec![frame],
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn trace(&self) -> &[TraceFrame] {
        &self.trace
    }

    /// Whether any frame's message contains `needle`.
    pub fn mentions(&self, needle: &str) -> bool {
        self.trace.iter().any(|frame| {
            frame.message.contains(needle)
                || frame
                    .context
                    .as_deref()
                    .is_some_and(|context| context.contains(needle))
        })
    }

    /// Append a frame and hand the error back.
    pub fn traced(
        mut self,
        location: &'static Location<'static>,
        message: impl Into<String>,
        context: Option<String>,
    ) -> Self {
        self.trace.push(TraceFrame {
            location,
            message: message.into(),
            context,
            depth: trace::depth(),
        });
        self
    }
}

impl From<ErrorKind> for Error {
    #[track_caller]
    fn from(kind: ErrorKind) -> Self {
        Self::raise(kind, None, Location::caller())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, frame) in self.trace.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", frame)?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

/// Trace-frame helpers on results.
///
/// Every method records the caller's location and only does work on the
/// error path.
pub trait ResultExt<T> {
    fn trace(self, message: &'static str) -> Result<T>;

    fn trace_with<F: FnOnce() -> String>(self, message: F) -> Result<T>;

    fn trace_context<F: FnOnce() -> String>(self, message: &'static str, context: F)
        -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    #[track_caller]
    fn trace(self, message: &'static str) -> Result<T> {
        let location = Location::caller();
        match self {
            Ok(value) => Ok(value),
            Err(err) => Err(err.traced(location, message, None)),
        }
    }

    #[track_caller]
    fn trace_with<F: FnOnce() -> String>(self, message: F) -> Result<T> {
        let location = Location::caller();
        match self {
            Ok(value) => Ok(value),
            Err(err) => Err(err.traced(location, message(), None)),
        }
    }

    #[track_caller]
    fn trace_context<F: FnOnce() -> String>(
        self,
        message: &'static str,
        context: F,
    ) -> Result<T> {
        let location = Location::caller();
        match self {
            Ok(value) => Ok(value),
            Err(err) => Err(err.traced(location, message, Some(context()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inner() -> Result<()> {
        Err(Error::new(ErrorKind::InflateFailed))
    }

    fn middle() -> Result<()> {
        inner().trace_context("Failed To Decode Body", || "chunk 0x6666".to_string())
    }

    fn outer() -> Result<()> {
        middle().trace("Failed To Read Image Bank")
    }

    #[test]
    fn test_frames_are_innermost_first() {
        let err = outer().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InflateFailed);

        let messages: Vec<&str> = err.trace().iter().map(|f| f.message.as_str()).collect();
        assert_eq!(
            messages,
            vec!["Inflate failed", "Failed To Decode Body", "Failed To Read Image Bank"]
        );
        assert_eq!(err.trace()[1].context.as_deref(), Some("chunk 0x6666"));
    }

    #[test]
    fn test_frames_name_the_call_site() {
        let err = outer().unwrap_err();
        for frame in err.trace() {
            assert!(frame.location.file().ends_with("error.rs"));
        }
        // Each layer sits on its own line.
        let lines: Vec<u32> = err.trace().iter().map(|f| f.location.line()).collect();
        assert_ne!(lines[0], lines[1]);
        assert_ne!(lines[1], lines[2]);
    }

    #[test]
    fn test_display_renders_one_line_per_frame() {
        let err = outer().unwrap_err();
        let rendered = err.to_string();
        assert_eq!(rendered.lines().count(), 3);
        assert!(rendered.lines().next().unwrap().contains("Inflate failed"));
        assert!(rendered.contains("Failed To Decode Body: chunk 0x6666"));
    }

    #[test]
    fn test_display_indents_by_recorded_depth() {
        let err = {
            let _nest = trace::nest();
            let _nest2 = trace::nest();
            Error::str("deep")
        };
        let err = err.traced(Location::caller(), "shallow", None);
        let rendered = err.to_string();
        let mut lines = rendered.lines();
        let deep = lines.next().unwrap();
        let shallow = lines.next().unwrap();
        let base = trace::depth() * 2;
        assert!(deep.starts_with(&" ".repeat(base + 4)));
        assert!(!shallow[base..].starts_with(' '));
    }

    #[test]
    fn test_ok_path_is_untouched() {
        let value: Result<u32> = Ok(7);
        assert_eq!(value.trace("never recorded").unwrap(), 7);
    }

    #[test]
    fn test_mentions_searches_messages_and_context() {
        let err = outer().unwrap_err();
        assert!(err.mentions("Image Bank"));
        assert!(err.mentions("0x6666"));
        assert!(!err.mentions("Sound Bank"));
    }
}
