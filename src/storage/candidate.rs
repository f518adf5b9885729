//! TOML candidate files: one scheme selection per module.
//!
//! ```toml
//! [[module]]
//! num = 0
//! scheme = "rb11"
//! hw = [0, 1]
//! sw = [2, 0]
//! ```

use std::{io, path::Path};

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::domain::{
    Assignment, AssignmentError, Scheme, SchemeError, SchemeKind, SystemGraph,
};

/// Errors that can occur when reading or writing a candidate file.
#[derive(Debug, thiserror::Error)]
pub enum CandidateError {
    /// An I/O error occurred.
    #[error("failed to access candidate file")]
    Io(#[from] io::Error),
    /// The file is not valid candidate TOML.
    #[error("failed to parse candidate file")]
    Parse(#[from] toml::de::Error),
    /// The candidate could not be serialized.
    #[error("failed to serialize candidate")]
    Serialize(#[from] toml::ser::Error),
    /// A module's selection is invalid.
    #[error("invalid selection for module {module}")]
    Scheme {
        /// Module position.
        module: usize,
        /// The underlying error.
        source: SchemeError,
    },
    /// The selections do not form a complete candidate.
    #[error(transparent)]
    Assignment(#[from] AssignmentError),
}

#[derive(Debug, Serialize, Deserialize)]
struct CandidateFile {
    #[serde(rename = "module", default)]
    modules: Vec<Entry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Entry {
    num: usize,
    scheme: SchemeKind,
    hw: Vec<i64>,
    sw: Vec<i64>,
}

/// Reads a candidate for `system` from `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid TOML, or does
/// not describe a valid candidate for `system`.
#[instrument(level = "debug", skip(system))]
pub fn load(path: &Path, system: &SystemGraph) -> Result<Assignment, CandidateError> {
    let text = std::fs::read_to_string(path)?;
    parse(&text, system)
}

/// Parses a candidate for `system`.
///
/// # Errors
///
/// Returns an error if the text is not valid TOML or does not describe a
/// valid candidate for `system`. Negative positions are rejected.
pub fn parse(text: &str, system: &SystemGraph) -> Result<Assignment, CandidateError> {
    let file: CandidateFile = toml::from_str(text)?;
    let schemes = file
        .modules
        .into_iter()
        .map(|entry| {
            Scheme::from_signed(entry.scheme, entry.num, &entry.hw, &entry.sw, system).map_err(
                |source| CandidateError::Scheme {
                    module: entry.num,
                    source,
                },
            )
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Assignment::new(system, schemes)?)
}

/// Renders a candidate as TOML.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_toml_string(assignment: &Assignment) -> Result<String, CandidateError> {
    let file = CandidateFile {
        modules: assignment
            .schemes()
            .iter()
            .map(|scheme| Entry {
                num: scheme.module(),
                scheme: scheme.kind(),
                hw: signed(scheme.hardware()),
                sw: signed(scheme.software()),
            })
            .collect(),
    };
    Ok(toml::to_string(&file)?)
}

fn signed(positions: &[usize]) -> Vec<i64> {
    positions
        .iter()
        .map(|&position| i64::try_from(position).unwrap_or(i64::MAX))
        .collect()
}

/// Writes a candidate to `path`.
///
/// # Errors
///
/// Returns an error if serialization fails or the file cannot be written.
pub fn save(assignment: &Assignment, path: &Path) -> Result<(), CandidateError> {
    std::fs::write(path, to_toml_string(assignment)?)?;
    Ok(())
}
