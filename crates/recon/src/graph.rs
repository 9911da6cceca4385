//! Graph-store projection of the canonical table.
//!
//! The only write a sink exposes is an upsert keyed by ISBN, so loading the
//! same table twice cannot duplicate nodes or edges.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::model::CanonicalRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum NodeLabel {
    Book,
    Author,
    Genre,
    Publisher,
    Language,
    Year,
}

impl NodeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Book => "Book",
            Self::Author => "Author",
            Self::Genre => "Genre",
            Self::Publisher => "Publisher",
            Self::Language => "Language",
            Self::Year => "Year",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Relation {
    AuthoredBy,
    BelongsToGenre,
    PublishedBy,
    HasLanguage,
    PublishedIn,
}

impl Relation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthoredBy => "AUTHORED_BY",
            Self::BelongsToGenre => "BELONGS_TO_GENRE",
            Self::PublishedBy => "PUBLISHED_BY",
            Self::HasLanguage => "HAS_LANGUAGE",
            Self::PublishedIn => "PUBLISHED_IN",
        }
    }

    pub fn target(&self) -> NodeLabel {
        match self {
            Self::AuthoredBy => NodeLabel::Author,
            Self::BelongsToGenre => NodeLabel::Genre,
            Self::PublishedBy => NodeLabel::Publisher,
            Self::HasLanguage => NodeLabel::Language,
            Self::PublishedIn => NodeLabel::Year,
        }
    }
}

/// A Book node plus the edges hanging off it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphBook {
    pub isbn: String,
    pub title: Option<String>,
    pub num_pages: Option<u32>,
    pub publication_year: Option<i32>,
    pub rating_goodreads: Option<f64>,
    /// (relation, target node name). Only known targets appear.
    pub edges: Vec<(Relation, String)>,
}

impl GraphBook {
    /// `None` for records without an ISBN; the store is keyed by it.
    pub fn from_record(record: &CanonicalRecord) -> Option<Self> {
        let isbn = record.isbn.clone()?;
        let mut edges: Vec<(Relation, String)> = record
            .authors
            .iter()
            .map(|a| (Relation::AuthoredBy, a.clone()))
            .collect();
        // First comma-separated category is the genre; '/' belongs to the name
        if let Some(genre) = record
            .category
            .as_deref()
            .and_then(|c| c.split(',').map(str::trim).find(|g| !g.is_empty()))
        {
            edges.push((Relation::BelongsToGenre, genre.to_string()));
        }
        if let Some(ref publisher) = record.publisher {
            edges.push((Relation::PublishedBy, publisher.clone()));
        }
        if let Some(ref language) = record.language {
            edges.push((Relation::HasLanguage, language.clone()));
        }
        if let Some(year) = record.publication_year {
            edges.push((Relation::PublishedIn, year.to_string()));
        }

        Some(Self {
            isbn,
            title: record.title.clone(),
            num_pages: record.num_pages,
            publication_year: record.publication_year,
            rating_goodreads: record.rating_goodreads,
            edges,
        })
    }
}

/// Persistence collaborator. Implementations must make `upsert_book` idempotent.
pub trait GraphSink {
    type Error;

    fn upsert_book(&mut self, book: &GraphBook) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphExportStats {
    pub books: usize,
    pub skipped_without_isbn: usize,
}

/// Upsert every record that has an ISBN.
pub fn export_graph<S: GraphSink>(records: &[CanonicalRecord], sink: &mut S) -> Result<GraphExportStats, S::Error> {
    let mut stats = GraphExportStats::default();
    for record in records {
        match GraphBook::from_record(record) {
            Some(book) => {
                sink.upsert_book(&book)?;
                stats.books += 1;
            }
            None => stats.skipped_without_isbn += 1,
        }
    }
    tracing::info!(books = stats.books, skipped = stats.skipped_without_isbn, "graph export finished");
    Ok(stats)
}

/// Set-backed sink. Upserting the same book twice is a no-op.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGraph {
    books: BTreeMap<String, GraphBook>,
    nodes: BTreeSet<(NodeLabel, String)>,
    edges: BTreeSet<(String, Relation, String)>,
}

impl InMemoryGraph {
    pub fn node_count(&self) -> usize {
        self.books.len() + self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn book(&self, isbn: &str) -> Option<&GraphBook> {
        self.books.get(isbn)
    }

    pub fn has_node(&self, label: NodeLabel, name: &str) -> bool {
        match label {
            NodeLabel::Book => self.books.contains_key(name),
            other => self.nodes.contains(&(other, name.to_string())),
        }
    }

    pub fn has_edge(&self, isbn: &str, relation: Relation, target: &str) -> bool {
        self.edges
            .contains(&(isbn.to_string(), relation, target.to_string()))
    }
}

impl GraphSink for InMemoryGraph {
    type Error = std::convert::Infallible;

    fn upsert_book(&mut self, book: &GraphBook) -> Result<(), Self::Error> {
        self.books.insert(book.isbn.clone(), book.clone());
        for (relation, target) in &book.edges {
            self.nodes.insert((relation.target(), target.clone()));
            self.edges
                .insert((book.isbn.clone(), *relation, target.clone()));
        }
        Ok(())
    }
}
