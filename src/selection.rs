//! Engine selection policy.
//!
//! Candidates are tried in configured order and the first one whose
//! applicability test accepts the payload wins. A candidate without a test
//! accepts unconditionally. Later candidates are never consulted once one
//! matches.

use crate::imaging::{Engine, EngineError};
use tracing::debug;

/// A configured engine and the identifier it was registered under.
pub struct Candidate {
    pub id: String,
    pub engine: Box<dyn Engine>,
}

impl Candidate {
    pub fn new(id: impl Into<String>, engine: Box<dyn Engine>) -> Self {
        Self {
            id: id.into(),
            engine,
        }
    }
}

/// Index of the first candidate that accepts `(extension, buffer)`.
///
/// Fails with [`EngineError::SelectionFailed`] naming every candidate when
/// the list is empty or nothing matches.
pub fn select(
    candidates: &[Candidate],
    extension: &str,
    buffer: &[u8],
) -> Result<usize, EngineError> {
    for (index, candidate) in candidates.iter().enumerate() {
        let accepted = match candidate.engine.applicability() {
            Some(test) => test.should_run(extension, buffer),
            None => true,
        };
        if accepted {
            debug!(
                engine = %candidate.id,
                tried = index + 1,
                extension,
                "engine selected"
            );
            return Ok(index);
        }
    }
    Err(EngineError::SelectionFailed {
        attempted: candidates.iter().map(|c| c.id.clone()).collect(),
    })
}
