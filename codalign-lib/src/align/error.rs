use thiserror::Error;

/// Errors raised by the alignment engine and the scoring model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlignError {
    /// The scoring model or option combination is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Codon alignment requires a whole number of reference codons.
    #[error("reference length {len} is not divisible by 3")]
    FrameMismatch { len: usize },

    /// Backtracking walked off the matrix; the recurrence and the backtrack disagree.
    #[error("inconsistent backtrack at reference {reference}, query {query}")]
    Inconsistent { reference: i64, query: i64 },
}

impl AlignError {
    pub(crate) fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }
}
