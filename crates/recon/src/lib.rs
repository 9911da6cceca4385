//! `biblion-recon`: Multi-source bibliographic record reconciliation.
//!
//! Pure engine crate: receives pre-loaded raw rows, returns one canonical
//! record per book plus a summary and the recoverable conditions it hit.
//! No CLI or file-system dependencies.

pub mod config;
pub mod diagnostics;
pub mod emit;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod fill;
pub mod graph;
pub mod identity;
pub mod merge;
pub mod model;
pub mod normalize;
pub mod source;

pub use config::{ReconConfig, SourceConfig};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use engine::run;
pub use error::ReconError;
pub use model::{CanonicalRecord, Field, RawRecord, ReconInput, ReconResult, ReconSummary, Supplement};
