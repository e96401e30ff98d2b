//! Diagnostics: typed error kinds, the error record, and the append-only sink.
//!
//! The reader and validator never abort on the first problem. Each failure is
//! recorded in an [`ErrorSink`] as an [`Error`] (kind, message, location)
//! plus the stack of context labels that were active when it was raised, e.g.
//! `["section", "import", "field name"]`. Callers own the sink and decide
//! whether a non-empty sink means failure.

use crate::location::Location;
use std::cell::RefCell;
use std::fmt;

/// The closed set of error kinds this crate reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    // Binary decoding
    #[error("truncated input")]
    TruncatedInput,
    #[error("bad magic")]
    BadMagic,
    #[error("bad version")]
    BadVersion,
    #[error("overlong LEB128")]
    OverlongLeb,
    #[error("invalid UTF-8")]
    InvalidUtf8,
    #[error("unknown opcode")]
    UnknownOpcode,
    #[error("unknown section")]
    UnknownSection,
    #[error("unknown value type")]
    UnknownValueType,
    #[error("bad limits")]
    BadLimits,
    #[error("length mismatch")]
    LengthMismatch,
    #[error("invalid constant expression")]
    InvalidConstExpr,

    // Validation
    #[error("bad section order")]
    BadSectionOrder,
    #[error("duplicate section")]
    DuplicateSection,
    #[error("duplicate name")]
    DuplicateName,
    #[error("invalid alignment")]
    InvalidAlignment,
    #[error("index out of bounds")]
    IndexOutOfBounds,
    #[error("type mismatch")]
    TypeMismatch,
    #[error("stack underflow")]
    StackUnderflow,
    #[error("unbalanced control")]
    UnbalancedControl,
    #[error("feature disabled")]
    FeatureDisabled,

    // Lexing
    #[error("invalid character")]
    InvalidChar,
    #[error("invalid text literal")]
    InvalidText,
    #[error("invalid block comment")]
    InvalidBlockComment,
    #[error("invalid line comment")]
    InvalidLineComment,
}

/// A single diagnostic: what went wrong, where, and in words.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{location}: {kind}: {message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
    pub location: Location,
}

impl Error {
    pub fn new(kind: ErrorKind, location: Location, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location,
        }
    }
}

/// Marker type returned once a failure has been recorded in the sink.
///
/// Functions that report through the sink propagate `Reported` instead of the
/// original [`Error`], so a failure deep inside a reader is appended exactly
/// once no matter how far it unwinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reported;

/// An [`Error`] together with the context labels active when it was raised.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub error: Error,
    /// Outermost label first, e.g. `["section", "import", "field name"]`.
    pub context: Vec<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.context.is_empty() {
            write!(f, "{}", self.error)
        } else {
            write!(f, "{} (in {})", self.error, self.context.join(" > "))
        }
    }
}

/// Append-only diagnostics buffer with a scoped context-label stack.
///
/// The sink is logically owned by the caller and only appended to by the
/// library. Interior mutability lets lazy iterators and readers share one sink
/// without threading `&mut` borrows through every structure; the crate is
/// strictly single-threaded (see the crate docs), so a `RefCell` suffices.
#[derive(Debug, Default)]
pub struct ErrorSink {
    entries: RefCell<Vec<Diagnostic>>,
    labels: RefCell<Vec<String>>,
}

impl ErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a context label, returning a guard that pops it when dropped.
    ///
    /// Every reader pushes a label on entry; the guard guarantees the pop on
    /// all exit paths, including error propagation.
    pub fn enter(&self, label: impl Into<String>) -> ContextScope<'_> {
        self.labels.borrow_mut().push(label.into());
        ContextScope { sink: self }
    }

    /// Append an error with a snapshot of the active context labels.
    pub fn report(&self, error: Error) -> Reported {
        log::debug!("diagnostic: {error}");
        self.entries.borrow_mut().push(Diagnostic {
            error,
            context: self.labels.borrow().clone(),
        });
        Reported
    }

    /// Append the error of a failed result, passing successes through.
    pub fn check<T>(&self, result: Result<T, Error>) -> Result<T, Reported> {
        result.map_err(|e| self.report(e))
    }

    /// Number of diagnostics recorded so far.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Clone the recorded diagnostics, in encounter order.
    pub fn to_vec(&self) -> Vec<Diagnostic> {
        self.entries.borrow().clone()
    }

    /// Consume the sink, yielding the recorded diagnostics.
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries.into_inner()
    }
}

/// Guard returned by [`ErrorSink::enter`]; pops the label on drop.
pub struct ContextScope<'s> {
    sink: &'s ErrorSink,
}

impl Drop for ContextScope<'_> {
    fn drop(&mut self) {
        self.sink.labels.borrow_mut().pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn err(kind: ErrorKind, at: usize) -> Error {
        Error::new(kind, Location::at(at), "test")
    }

    #[test]
    fn report_snapshots_context() {
        let sink = ErrorSink::new();
        {
            let _section = sink.enter("section");
            {
                let _import = sink.enter("import");
                sink.report(err(ErrorKind::InvalidUtf8, 12));
            }
            sink.report(err(ErrorKind::TruncatedInput, 20));
        }

        let entries = sink.into_vec();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].context, vec!["section", "import"]);
        assert_eq!(entries[1].context, vec!["section"]);
    }

    #[test]
    fn context_pops_on_early_exit() {
        let sink = ErrorSink::new();
        fn inner(sink: &ErrorSink) -> Result<(), Reported> {
            let _scope = sink.enter("inner");
            Err(sink.report(Error::new(
                ErrorKind::TruncatedInput,
                Location::at(0),
                "eof",
            )))
        }
        let _ = inner(&sink);
        sink.report(err(ErrorKind::BadMagic, 0));

        let entries = sink.into_vec();
        assert_eq!(entries[0].context, vec!["inner"]);
        assert!(entries[1].context.is_empty(), "label leaked past its scope");
    }

    #[test]
    fn check_passes_ok_through() {
        let sink = ErrorSink::new();
        assert_eq!(sink.check(Ok(7)), Ok(7));
        assert!(sink.is_empty());
        assert_eq!(
            sink.check::<u32>(Err(err(ErrorKind::OverlongLeb, 3))),
            Err(Reported)
        );
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn diagnostic_display() {
        let sink = ErrorSink::new();
        let _scope = sink.enter("code");
        sink.report(Error::new(
            ErrorKind::TypeMismatch,
            Location::new(4, 5),
            "expected i32, got f64",
        ));
        let shown = format!("{}", sink.to_vec()[0]);
        assert!(shown.contains("type mismatch"), "{shown}");
        assert!(shown.contains("(in code)"), "{shown}");
    }
}
