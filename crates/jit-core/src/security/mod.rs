//! Security gate for text crossing a trust boundary.
//!
//! Every script, documentation excerpt, model response or container output
//! is screened here before it becomes a subprocess argument or part of a
//! prompt:
//! - `patterns`: immutable detector catalog, compiled once per process
//! - `verdict`: sanitization results
//! - `gate`: the `SecurityGate` entry points

pub mod gate;
pub mod patterns;
pub mod verdict;

pub use gate::SecurityGate;
pub use patterns::{InjectionClass, PatternCatalog};
pub use verdict::{SanitizationVerdict, TestCaseVerdict};
