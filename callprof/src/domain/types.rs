//! Domain types for call-boundary profiling
//!
//! A [`CodeLocation`] is what instrumented code reports; a
//! [`FunctionIdentity`] is the key every statistic is stored under.

use std::borrow::Cow;
use std::fmt;
use std::path::Path;

/// Function name of the synthetic whole-program scope.
pub const MAIN_SCOPE: &str = "<main>";

/// Line reported for the synthetic whole-program scope.
const MAIN_LINE: u32 = 1;

/// Source position reported by an instrumented call boundary.
///
/// `file` is matched against the session target; `function` and `line`
/// identify the call site within it. Usually built with [`location!`].
///
/// [`location!`]: crate::location
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CodeLocation {
    pub file: Cow<'static, str>,
    pub function: Cow<'static, str>,
    pub line: u32,
}

impl CodeLocation {
    pub fn new(
        file: impl Into<Cow<'static, str>>,
        function: impl Into<Cow<'static, str>>,
        line: u32,
    ) -> Self {
        Self { file: file.into(), function: function.into(), line }
    }
}

impl fmt::Display for CodeLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.function, self.file, self.line)
    }
}

/// Build a [`CodeLocation`] for the enclosing source file and line.
///
/// ```
/// let loc = callprof::location!("parse_header");
/// assert_eq!(loc.function, "parse_header");
/// assert!(loc.line > 0);
/// ```
#[macro_export]
macro_rules! location {
    ($function:expr) => {
        $crate::domain::CodeLocation::new(file!(), $function, line!())
    };
}

/// Immutable key for a call site: `(file basename, function, defining line)`.
///
/// Same-named functions at different lines or in different files get
/// distinct identities. Renders as `file:function:line`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionIdentity {
    file: String,
    function: String,
    line: u32,
}

impl FunctionIdentity {
    pub fn new(file: impl Into<String>, function: impl Into<String>, line: u32) -> Self {
        Self { file: file.into(), function: function.into(), line }
    }

    /// Identity for a reported location. Only the basename of the file is kept.
    pub fn from_location(location: &CodeLocation) -> Self {
        Self::new(basename(&location.file), location.function.as_ref(), location.line)
    }

    /// The synthetic whole-program identity for a target file.
    pub fn main(target_file: &str) -> Self {
        Self::new(basename(target_file), MAIN_SCOPE, MAIN_LINE)
    }

    pub fn is_main(&self) -> bool {
        self.function == MAIN_SCOPE
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    /// Textual key used in persisted statistics (`file:function:line`).
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FunctionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.function, self.line)
    }
}

fn basename(file: &str) -> String {
    Path::new(file)
        .file_name()
        .map_or_else(|| file.to_string(), |name| name.to_string_lossy().into_owned())
}

/// Kind of call boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Enter,
    Exit,
}

/// One call-boundary event as seen by the tracer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallEvent {
    pub kind: EventKind,
    pub location: CodeLocation,
}

impl CallEvent {
    pub fn enter(location: CodeLocation) -> Self {
        Self { kind: EventKind::Enter, location }
    }

    pub fn exit(location: CodeLocation) -> Self {
        Self { kind: EventKind::Exit, location }
    }
}
