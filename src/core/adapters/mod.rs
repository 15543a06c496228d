//! Diagnostic adapters: producers that shell out to external tools and parse
//! their output into the shared issue shape.
//!
//! Both adapters are tolerant of the tools themselves exiting non-zero (the
//! tools do that whenever they find problems); launch failures, parse
//! failures, and output overflow are producer failures, caught at the
//! aggregator and surfaced as error strings rather than aborting the run.

mod lint;
mod runner;
mod typecheck;

pub use lint::LintAdapter;
pub use runner::run_tool;
pub use typecheck::TypecheckAdapter;
