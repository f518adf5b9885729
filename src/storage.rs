/// Candidate files in TOML.
pub mod candidate;
pub use candidate::CandidateError;

/// System documents in XML.
pub mod document;
pub use document::{Document, DocumentError};
