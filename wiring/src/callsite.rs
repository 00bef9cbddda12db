//! Declaration-site capture for error attribution.
//!
//! Every wiring declaration records where in the operator's wiring file it
//! was made, so that build-time diagnostics name the offending line.  Capture
//! uses `#[track_caller]`: declaration APIs throughout the workspace carry
//! the attribute, so the recorded frame propagates through plugin helper
//! functions all the way out to the wiring file itself.

use std::fmt;
use std::panic::Location;

/// The source location of a wiring declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Callsite {
    file: &'static str,
    line: u32,
    column: u32,
}

impl Callsite {
    /// Captures the caller's location.
    ///
    /// Functions between the wiring file and this call must themselves be
    /// `#[track_caller]` for the capture to skip them.
    #[track_caller]
    #[must_use]
    pub fn capture() -> Self {
        let loc = Location::caller();
        Callsite {
            file: loc.file(),
            line: loc.line(),
            column: loc.column(),
        }
    }

    /// The source file of the declaration.
    #[must_use]
    pub fn file(&self) -> &'static str {
        self.file
    }

    /// The line of the declaration.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }
}

impl fmt::Display for Callsite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}
