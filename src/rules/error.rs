use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("Invalid condition: {0}")]
    InvalidCondition(String),

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Condition nesting exceeds maximum depth of {0}")]
    DepthExceeded(u32),
}
