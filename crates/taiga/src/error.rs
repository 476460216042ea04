use thiserror::Error;

/// Failures talking to Taiga.
#[derive(Debug, Error)]
pub enum TaigaError {
    #[error("Taiga API error: {status}")]
    Status { status: u16, body: String },

    #[error("Taiga network error: {0}")]
    Network(String),

    #[error("Unexpected Taiga response: {0}")]
    Decode(String),

    #[error("Taiga request failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<TaigaError>,
    },
}

impl TaigaError {
    /// Transient failures worth another attempt: rate limiting, server
    /// errors and transport failures.
    pub fn is_retryable(&self) -> bool {
        match self {
            TaigaError::Status { status, .. } => *status == 429 || *status >= 500,
            TaigaError::Network(_) => true,
            TaigaError::Decode(_) | TaigaError::RetriesExhausted { .. } => false,
        }
    }

    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_decode() {
            TaigaError::Decode(e.to_string())
        } else {
            TaigaError::Network(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        let status = |status| TaigaError::Status {
            status,
            body: String::new(),
        };
        assert!(status(429).is_retryable());
        assert!(status(500).is_retryable());
        assert!(status(503).is_retryable());
        assert!(!status(400).is_retryable());
        assert!(!status(401).is_retryable());
        assert!(!status(404).is_retryable());
        assert!(TaigaError::Network("reset".into()).is_retryable());
        assert!(!TaigaError::Decode("bad json".into()).is_retryable());
    }

    #[test]
    fn exhausted_display_includes_last_error() {
        let err = TaigaError::RetriesExhausted {
            attempts: 2,
            last: Box::new(TaigaError::Status {
                status: 502,
                body: "bad gateway".into(),
            }),
        };
        let msg = err.to_string();
        assert!(msg.contains("2 attempts"));
        assert!(msg.contains("502"));
    }
}
