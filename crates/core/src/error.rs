#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unknown {kind} '{value}'")]
    UnknownVariant { kind: &'static str, value: String },
}
