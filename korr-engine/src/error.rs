use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("knowledge-base enrichment failed: {0}")]
    Kb(#[from] korr_kb::KbError),
}
