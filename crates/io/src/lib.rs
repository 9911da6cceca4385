// File collaborators for the reconciliation engine

pub mod artifact;
pub mod csv;
pub mod cypher;
pub mod enrich;
pub mod error;
pub mod source;
pub mod xlsx;

pub use error::IoError;
