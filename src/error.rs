use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the simulation core.
///
/// All fallible paths in the engine return this enum; the core never panics
/// on bad input and never fabricates state to paper over a numerical issue.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid constructor, configuration or command parameter.
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    /// Numerical issue (non-finite event time, degenerate geometry).
    #[error("numerical error: {0}")]
    MathError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_is_informative() {
        let e = Error::InvalidParam("radius must be > 0".to_string());
        let msg = format!("{e}");
        assert!(msg.contains("invalid parameter"));
        assert!(msg.contains("radius"));
    }

    #[test]
    fn math_error_display() {
        let e = Error::MathError("event time must be finite".to_string());
        assert!(format!("{e}").contains("numerical error"));
    }
}
