use thiserror::Error;

/// Top-level error type for the chat server.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for AibrewError` so that `?` works across crate
/// boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AibrewError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Model gateway error: {0}")]
    Gateway(String),

    #[error("Chat error: {0}")]
    Chat(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Payload too large: {size} bytes exceeds {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },
}

impl From<toml::de::Error> for AibrewError {
    fn from(err: toml::de::Error) -> Self {
        AibrewError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for AibrewError {
    fn from(err: toml::ser::Error) -> Self {
        AibrewError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for AibrewError {
    fn from(err: serde_json::Error) -> Self {
        AibrewError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for chat server operations.
pub type Result<T> = std::result::Result<T, AibrewError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AibrewError::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field");
    }

    #[test]
    fn test_error_display_all_variants() {
        let cases: Vec<(AibrewError, &str)> = vec![
            (
                AibrewError::Transcription("status 500".to_string()),
                "Transcription error: status 500",
            ),
            (
                AibrewError::Gateway("quota exceeded".to_string()),
                "Model gateway error: quota exceeded",
            ),
            (
                AibrewError::Chat("turn in flight".to_string()),
                "Chat error: turn in flight",
            ),
            (
                AibrewError::Api("bind failed".to_string()),
                "API error: bind failed",
            ),
            (
                AibrewError::PayloadTooLarge {
                    size: 100,
                    limit: 50,
                },
                "Payload too large: 100 bytes exceeds 50 bytes",
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: AibrewError = io_err.into();
        assert!(matches!(err, AibrewError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let err: std::result::Result<toml::Value, _> = toml::from_str("invalid = [[[");
        let err: AibrewError = err.unwrap_err().into();
        assert!(matches!(err, AibrewError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let err: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ nope }");
        let err: AibrewError = err.unwrap_err().into();
        assert!(matches!(err, AibrewError::Serialization(_)));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let value = io_result?;
            Ok(value.to_string())
        }

        assert_eq!(inner().unwrap(), "42");
    }
}
