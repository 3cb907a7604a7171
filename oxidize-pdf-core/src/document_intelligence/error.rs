use thiserror::Error;

/// Error taxonomy for the Document Intelligence Engine.
///
/// None of these ever reach a caller of [`crate::document_intelligence::Orchestrator::process`]:
/// the orchestrator converts every `Err` here into the appropriate
/// `ExtractionResult` shape.
#[derive(Error, Debug)]
pub enum DocIntelError {
    #[error("learning memory I/O error: {0}")]
    MemoryIo(#[from] std::io::Error),

    #[error("learning memory serialization error: {0}")]
    MemorySerialization(#[from] serde_json::Error),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("detector failed: {0}")]
    DetectorFailure(String),

    #[error("input missing: {0}")]
    InputMissing(String),
}

pub type Result<T> = std::result::Result<T, DocIntelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_io_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: DocIntelError = io_err.into();
        assert!(err.to_string().contains("learning memory I/O error"));
    }

    #[test]
    fn invariant_violation_display() {
        let err = DocIntelError::InvariantViolation("date out of range".to_string());
        assert_eq!(err.to_string(), "invariant violated: date out of range");
    }
}
