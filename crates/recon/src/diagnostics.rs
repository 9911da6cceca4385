//! Recoverable conditions collected during a run.
//!
//! Nothing the data can do aborts a reconciliation. Loaders and the engine
//! record what they skipped or could not convert here; every entry is also
//! logged at `warn` level when it is recorded.

use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Whole file unreadable or unparseable; the source contributes nothing.
    SourceLoad,
    /// Row skipped (wrong column count, unparsable record).
    MalformedRow,
    /// Row has neither ISBN nor title; excluded from output.
    NoIdentity,
    /// Field value could not be converted; treated as unknown.
    FieldConversion,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SourceLoad => write!(f, "source_load"),
            Self::MalformedRow => write!(f, "malformed_row"),
            Self::NoIdentity => write!(f, "no_identity"),
            Self::FieldConversion => write!(f, "field_conversion"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u64>,
    /// Offending ISBN (or other identifying cell) when one was available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            source: source.into(),
            line: None,
            key: None,
            message: message.into(),
        }
    }

    pub fn at_line(mut self, line: u64) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_key(mut self, key: Option<&str>) -> Self {
        self.key = key.map(str::trim).filter(|k| !k.is_empty()).map(str::to_string);
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.source)?;
        if let Some(line) = self.line {
            write!(f, ":{line}")?;
        }
        if let Some(ref key) = self.key {
            write!(f, " ({key})")?;
        }
        write!(f, ": {}", self.message)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn record(&mut self, diagnostic: Diagnostic) {
        tracing::warn!(
            kind = %diagnostic.kind,
            source = %diagnostic.source,
            line = diagnostic.line,
            key = diagnostic.key.as_deref(),
            "{}",
            diagnostic.message
        );
        self.entries.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    pub fn counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for d in &self.entries {
            *counts.entry(d.kind.to_string()).or_insert(0) += 1;
        }
        counts
    }
}
