//! Loom conformance suite.
//!
//! This crate holds the end-to-end wiring scenarios that pin down the
//! observable behavior of the compiler core: IR layout for co-located and
//! distributed topologies, address threading across namespace boundaries,
//! pointer modifier ordering, and the error semantics for reachability
//! violations and invalid wiring.
//!
//! The [`demos`] module declares each scenario as a reusable wiring spec so
//! that the test suite and the `loom` CLI share one set of fixtures.  The
//! assertion helpers compare rendered IR trees line by line, ignoring
//! indentation, the same way a reviewer reads them.

pub mod demos;

use loom_ir::NodeRef;
use loom_wiring::{BuildError, WiringSpec};
use pretty_assertions::assert_eq;

/// Builds `spec` and panics with the full wiring spec and partial IR if the
/// build fails.
pub fn assert_build_success(spec: &WiringSpec, roots: &[&str]) -> NodeRef {
    match spec.build_ir(roots) {
        Ok(app) => app,
        Err(err) => panic!(
            "unexpected build failure: {err:#}\nwiring spec: {spec}\napplication: {}",
            err.app.render()
        ),
    }
}

/// Builds `spec` and panics with the resulting IR if the build unexpectedly
/// succeeds.
pub fn assert_build_failure(spec: &WiringSpec, roots: &[&str]) -> BuildError {
    match spec.build_ir(roots) {
        Err(err) => err,
        Ok(app) => panic!(
            "expected a build failure but the build succeeded\nwiring spec: {spec}\napplication: {}",
            app.render()
        ),
    }
}

fn trimmed_lines(s: &str) -> Vec<String> {
    s.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Asserts that the rendered IR of `app` matches `expected`, comparing
/// trimmed lines so callers can indent expectations naturally.
pub fn assert_ir(app: &NodeRef, expected: &str) {
    assert_eq!(trimmed_lines(expected), trimmed_lines(&app.render()));
}
