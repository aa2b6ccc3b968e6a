//! Build/test port: the collaborator that builds a unit and runs its
//! tests.

use std::collections::BTreeMap;
use std::error::Error;
use std::future::Future;
use std::pin::Pin;

use crate::unit::Unit;

/// Boxed future type alias used by [`BuildRunner`] to keep the trait
/// dyn-compatible.
pub type BuildFuture<'a> =
    Pin<Box<dyn Future<Output = Result<BuildReport, Box<dyn Error + Send + Sync>>> + Send + 'a>>;

/// The outcome of one build-and-test invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport {
    /// Whether the build and tests passed.
    pub passed: bool,
    /// Raw collaborator output, kept for failure context.
    pub raw_output: String,
    /// Numeric metrics parsed from the output (`NAME: VALUE` lines).
    /// A metric the output never mentioned is simply absent.
    pub metrics: BTreeMap<String, f64>,
}

/// Builds one unit and runs its test suite.
///
/// An `Err` means the collaborator itself failed (engine unavailable,
/// spawn error); a failing build is an `Ok` report with
/// `passed == false`.
pub trait BuildRunner: Send + Sync {
    /// Builds and tests the unit, returning the raw result.
    fn build_and_test(&self, unit: &Unit) -> BuildFuture<'_>;
}
