use thiserror::Error;

/// Errors produced by the studio, its orchestrators and the Gemini client.
#[derive(Error, Debug)]
pub enum StudioError {
    /// User-facing input problem (no menu, empty prompt, busy item).
    #[error("{0}")]
    Validation(String),

    #[error("Image not found: {0}")]
    NotFound(String),

    /// The batch task itself could not finish.
    #[error("{0}")]
    Generation(String),

    #[error("{0}")]
    Edit(String),

    /// The service answered but carried no usable image.
    #[error("{0}")]
    NoImage(String),

    #[error("Gemini returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Network-level request failure with context.
    #[error("{context}: {source}")]
    Network {
        context: String,
        source: reqwest::Error,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0} is not defined in environment variables.")]
    MissingApiKey(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl StudioError {
    /// Whether this error was raised before any service interaction.
    pub fn is_validation(&self) -> bool {
        matches!(self, StudioError::Validation(_) | StudioError::NotFound(_))
    }
}

impl From<anyhow::Error> for StudioError {
    fn from(err: anyhow::Error) -> Self {
        StudioError::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StudioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_classification() {
        assert!(StudioError::Validation("x".into()).is_validation());
        assert!(StudioError::NotFound("id".into()).is_validation());
        assert!(!StudioError::Generation("boom".into()).is_validation());
        assert!(!StudioError::NoImage("none".into()).is_validation());
    }

    #[test]
    fn test_display_messages() {
        let err = StudioError::Http {
            status: 429,
            body: "quota".into(),
        };
        assert_eq!(err.to_string(), "Gemini returned HTTP 429: quota");

        let err = StudioError::MissingApiKey("API_KEY".into());
        assert_eq!(
            err.to_string(),
            "API_KEY is not defined in environment variables."
        );
    }

    #[test]
    fn test_from_anyhow() {
        let err: StudioError = anyhow::anyhow!("wrapped").into();
        assert!(matches!(err, StudioError::Other(ref m) if m == "wrapped"));
    }
}
