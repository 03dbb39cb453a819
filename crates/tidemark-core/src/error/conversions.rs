//! From trait implementations for TidemarkError conversions

use super::types::TidemarkError;

impl From<std::io::Error> for TidemarkError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<serde_json::Error> for TidemarkError {
    fn from(error: serde_json::Error) -> Self {
        Self::json(error.to_string())
    }
}

impl From<notify::Error> for TidemarkError {
    fn from(error: notify::Error) -> Self {
        let path = error
            .paths
            .first()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        Self::watch(error.to_string()).with_context(path)
    }
}

impl From<glob::PatternError> for TidemarkError {
    fn from(error: glob::PatternError) -> Self {
        Self::invalid_input_field(
            format!("Invalid ignore pattern: {}", error.msg),
            "ignored_paths",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: TidemarkError = io_err.into();
        assert_eq!(err.error_code(), "TIDEMARK_IO");
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: TidemarkError = json_err.into();
        assert_eq!(err.error_code(), "TIDEMARK_JSON");
    }

    #[test]
    fn test_pattern_error_conversion() {
        let pattern_err = glob::Pattern::new("a/**b").unwrap_err();
        let err: TidemarkError = pattern_err.into();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_with_context() {
        let err = TidemarkError::not_found_resource("checkpoint_1", "checkpoint")
            .with_context("Deleting checkpoint");
        assert!(err.is_not_found());
        assert_eq!(err.resource_type(), Some("checkpoint"));
        assert_eq!(err.context(), Some("Deleting checkpoint"));
    }
}
