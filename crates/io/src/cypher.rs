//! Cypher script sink for the graph store.
//!
//! Every statement is a `MERGE`, so running the script twice against the same
//! database leaves it unchanged.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use biblion_recon::graph::{export_graph, GraphBook, GraphExportStats, GraphSink};
use biblion_recon::model::CanonicalRecord;

use crate::error::IoError;

/// Single-quoted Cypher string literal.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}

pub struct CypherScript<W: Write> {
    out: W,
    statements: usize,
}

impl<W: Write> CypherScript<W> {
    pub fn new(out: W) -> Self {
        Self { out, statements: 0 }
    }

    pub fn statements(&self) -> usize {
        self.statements
    }

    pub fn finish(mut self) -> Result<W, std::io::Error> {
        self.out.flush()?;
        Ok(self.out)
    }

    fn emit(&mut self, statement: &str) -> Result<(), std::io::Error> {
        writeln!(self.out, "{statement};")?;
        self.statements += 1;
        Ok(())
    }
}

fn book_statement(book: &GraphBook) -> String {
    let mut props = Vec::new();
    if let Some(ref title) = book.title {
        props.push(format!("b.title = {}", quote(title)));
    }
    if let Some(pages) = book.num_pages {
        props.push(format!("b.num_pages = {pages}"));
    }
    if let Some(year) = book.publication_year {
        props.push(format!("b.publication_year = {year}"));
    }
    if let Some(rating) = book.rating_goodreads {
        props.push(format!("b.rating = {rating}"));
    }

    let mut statement = format!("MERGE (b:Book {{isbn: {}}})", quote(&book.isbn));
    if !props.is_empty() {
        statement.push_str(" SET ");
        statement.push_str(&props.join(", "));
    }
    statement
}

impl<W: Write> GraphSink for CypherScript<W> {
    type Error = std::io::Error;

    fn upsert_book(&mut self, book: &GraphBook) -> Result<(), Self::Error> {
        self.emit(&book_statement(book))?;
        let isbn = quote(&book.isbn);
        for (relation, target) in &book.edges {
            self.emit(&format!(
                "MATCH (b:Book {{isbn: {isbn}}}) MERGE (n:{} {{name: {}}}) MERGE (b)-[:{}]->(n)",
                relation.target().as_str(),
                quote(target),
                relation.as_str()
            ))?;
        }
        Ok(())
    }
}

/// Write a Cypher import script for `records`.
pub fn write_script(path: &Path, records: &[CanonicalRecord]) -> Result<GraphExportStats, IoError> {
    let file = File::create(path).map_err(|e| IoError::io(path, e))?;
    let mut script = CypherScript::new(BufWriter::new(file));
    let stats = export_graph(records, &mut script).map_err(|e| IoError::Graph(format!("{}: {e}", path.display())))?;
    let statements = script.statements();
    script.finish().map_err(|e| IoError::io(path, e))?;
    tracing::info!(path = %path.display(), statements, "wrote cypher script");
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dune() -> CanonicalRecord {
        CanonicalRecord {
            isbn: Some("0441013597".into()),
            title: Some("Dune".into()),
            authors: vec!["Frank Herbert".into()],
            publication_year: Some(1965),
            ..Default::default()
        }
    }

    #[test]
    fn quoting() {
        assert_eq!(quote("plain"), "'plain'");
        assert_eq!(quote("O'Brien"), "'O\\'Brien'");
        assert_eq!(quote("a\\b"), "'a\\\\b'");
    }

    #[test]
    fn statements_are_merges() {
        let mut script = CypherScript::new(Vec::new());
        let stats = export_graph(&[dune()], &mut script).unwrap();
        assert_eq!(stats.books, 1);
        assert_eq!(script.statements(), 3);

        let text = String::from_utf8(script.finish().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "MERGE (b:Book {isbn: '0441013597'}) SET b.title = 'Dune', b.publication_year = 1965;"
        );
        assert_eq!(
            lines[1],
            "MATCH (b:Book {isbn: '0441013597'}) MERGE (n:Author {name: 'Frank Herbert'}) MERGE (b)-[:AUTHORED_BY]->(n);"
        );
        assert!(lines[2].contains("(n:Year {name: '1965'})"));
        assert!(lines.iter().all(|l| !l.contains("CREATE")));
    }

    #[test]
    fn script_file_skips_records_without_isbn() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("import.cypher");
        let mut anonymous = dune();
        anonymous.isbn = None;

        let stats = write_script(&path, &[dune(), anonymous]).unwrap();
        assert_eq!(stats.books, 1);
        assert_eq!(stats.skipped_without_isbn, 1);
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 3);
    }
}
