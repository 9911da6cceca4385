//! Identity resolution: which canonical record a contribution belongs to.
//!
//! Key is the normalized ISBN when present, otherwise the title key. An ISBN
//! never merges into a title-keyed identity, so the fallback can split one
//! book in two but never fuse two books.

use std::collections::HashMap;

use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::merge::{Contribution, OpenRecord};
use crate::model::{CanonicalRecord, IdentityKey};
use crate::normalize;

/// Identity key for a contribution, or `None` when it has neither ISBN nor title.
pub fn identity_key(values: &CanonicalRecord) -> Option<IdentityKey> {
    if let Some(isbn) = values.isbn.as_deref().and_then(normalize::normalize_isbn) {
        return Some(IdentityKey::Isbn(isbn));
    }
    values
        .title
        .as_deref()
        .and_then(normalize::title_key)
        .map(IdentityKey::Title)
}

#[derive(Debug, Default)]
pub struct Resolver {
    index: HashMap<IdentityKey, usize>,
    /// Open records in creation order.
    open: Vec<OpenRecord>,
    rejected: usize,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route one contribution: seed a new identity or merge into an open one.
    /// Returns the key it resolved to, or `None` if it was rejected.
    pub fn observe(
        &mut self,
        contribution: &Contribution,
        rank: usize,
        diags: &mut Diagnostics,
    ) -> Option<IdentityKey> {
        let Some(key) = identity_key(&contribution.values) else {
            self.rejected += 1;
            diags.record(
                Diagnostic::new(
                    DiagnosticKind::NoIdentity,
                    &contribution.source,
                    "row has neither isbn nor title",
                )
                .at_line(contribution.line),
            );
            return None;
        };

        match self.index.get(&key) {
            Some(&idx) => {
                tracing::trace!(%key, source = %contribution.source, "merging into open identity");
                self.open[idx].merge(contribution, rank);
            }
            None => {
                self.index.insert(key.clone(), self.open.len());
                self.open.push(OpenRecord::seed(contribution, rank));
            }
        }
        Some(key)
    }

    /// Apply a looked-up contribution to the open identity with the same
    /// ISBN. Returns the number of fields filled; unseen ISBNs are ignored.
    pub fn supplement(&mut self, contribution: &Contribution) -> usize {
        let Some(isbn) = contribution.values.isbn.as_deref().and_then(normalize::normalize_isbn) else {
            return 0;
        };
        match self.index.get(&IdentityKey::Isbn(isbn)) {
            Some(&idx) => self.open[idx].fill_unknown(contribution),
            None => 0,
        }
    }

    pub fn identities(&self) -> usize {
        self.open.len()
    }

    pub fn rejected(&self) -> usize {
        self.rejected
    }

    /// Identities that received more than one contribution.
    pub fn merged(&self) -> usize {
        self.open.iter().filter(|o| o.contributions() > 1).count()
    }

    pub fn get(&self, key: &IdentityKey) -> Option<&CanonicalRecord> {
        self.index.get(key).map(|&idx| self.open[idx].record())
    }

    /// Close every identity, in creation order.
    pub fn finish(self) -> Vec<CanonicalRecord> {
        self.open.into_iter().map(OpenRecord::into_record).collect()
    }
}
