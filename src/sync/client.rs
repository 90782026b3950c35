//! Boundary to the analysis backend.

use super::wire::{
    AttemptResponse, DecomposeAllRequest, DecomposeAllResponse, ProjectFdsResponse,
    decode_undo_history,
};
use serde::de::DeserializeOwned;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// The backend operations the core depends on. One attempt each, no retry.
pub trait Backend {
    fn reset_attempt(&self) -> Result<Option<u32>, SyncError>;
    fn increment_attempt(&self) -> Result<Option<u32>, SyncError>;
    fn project_fds(&self, columns: &[usize]) -> Result<Vec<String>, SyncError>;
    fn decompose_all(&self, request: &DecomposeAllRequest)
    -> Result<DecomposeAllResponse, SyncError>;
    fn undo(&self) -> Result<Vec<String>, SyncError>;
}

/// Turn a raw HTTP answer into a payload. Non-2xx bodies are kept verbatim
/// so business-rule rejections reach the user unchanged.
pub fn decode<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, SyncError> {
    check_status(status, body)?;
    Ok(serde_json::from_str(body)?)
}

pub fn check_status(status: u16, body: &str) -> Result<(), SyncError> {
    if (200..300).contains(&status) {
        return Ok(());
    }
    let message = if body.trim().is_empty() {
        format!("HTTP {status}")
    } else {
        body.to_string()
    };
    Err(SyncError::Rejected { status, message })
}

pub fn decode_project_fds(status: u16, body: &str) -> Result<Vec<String>, SyncError> {
    decode::<ProjectFdsResponse>(status, body).map(ProjectFdsResponse::into_list)
}

/// Attempt counters may come back with an empty body; that is not an error.
pub fn decode_attempts(status: u16, body: &str) -> Result<Option<u32>, SyncError> {
    check_status(status, body)?;
    if body.trim().is_empty() {
        return Ok(None);
    }
    Ok(serde_json::from_str::<AttemptResponse>(body)?.attempts)
}

pub fn decode_undo(status: u16, body: &str) -> Result<Vec<String>, SyncError> {
    check_status(status, body)?;
    Ok(decode_undo_history(body)?)
}

#[cfg(not(target_arch = "wasm32"))]
pub use http::HttpBackend;

#[cfg(not(target_arch = "wasm32"))]
mod http {
    use super::*;
    use crate::config::BackendConfig;
    use crate::sync::wire::ProjectFdsRequest;
    use ureq::Agent;

    /// Blocking JSON-over-HTTP backend.
    #[derive(Debug, Clone)]
    pub struct HttpBackend {
        config: BackendConfig,
        http: Agent,
    }

    impl HttpBackend {
        pub fn from_env() -> Self {
            Self::new(BackendConfig::from_env())
        }

        pub fn new(config: BackendConfig) -> Self {
            let http = ureq::AgentBuilder::new()
                .timeout_read(config.timeout)
                .timeout_write(config.timeout)
                .timeout_connect(config.timeout)
                .build();
            Self { config, http }
        }

        fn post(
            &self,
            path: &str,
            body: Option<serde_json::Value>,
        ) -> Result<(u16, String), SyncError> {
            let url = self.config.url(path);
            let request = self.http.post(&url).set("Content-Type", "application/json");
            let result = match body {
                Some(json) => request.send_json(json),
                None => request.call(),
            };
            match result {
                Ok(response) => {
                    let status = response.status();
                    let text = response
                        .into_string()
                        .map_err(|err| SyncError::Transport(err.to_string()))?;
                    Ok((status, text))
                }
                Err(ureq::Error::Status(status, response)) => {
                    Ok((status, response.into_string().unwrap_or_default()))
                }
                Err(err) => Err(SyncError::Transport(err.to_string())),
            }
        }
    }

    impl Backend for HttpBackend {
        fn reset_attempt(&self) -> Result<Option<u32>, SyncError> {
            let (status, body) = self.post(&self.config.endpoints.reset_attempt, None)?;
            decode_attempts(status, &body)
        }

        fn increment_attempt(&self) -> Result<Option<u32>, SyncError> {
            let (status, body) = self.post(&self.config.endpoints.increment_attempt, None)?;
            decode_attempts(status, &body)
        }

        fn project_fds(&self, columns: &[usize]) -> Result<Vec<String>, SyncError> {
            let payload = serde_json::to_value(ProjectFdsRequest {
                columns: columns.to_vec(),
            })?;
            let (status, body) = self.post(&self.config.endpoints.project_fds, Some(payload))?;
            decode_project_fds(status, &body)
        }

        fn decompose_all(
            &self,
            request: &DecomposeAllRequest,
        ) -> Result<DecomposeAllResponse, SyncError> {
            let payload = serde_json::to_value(request)?;
            let (status, body) = self.post(&self.config.endpoints.decompose_all, Some(payload))?;
            decode(status, &body)
        }

        fn undo(&self) -> Result<Vec<String>, SyncError> {
            let (status, body) = self.post(&self.config.endpoints.undo, None)?;
            decode_undo(status, &body)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_keeps_body_verbatim() {
        let err = decode::<DecomposeAllResponse>(400, "Lossless-join violated\n").unwrap_err();
        match err {
            SyncError::Rejected { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Lossless-join violated\n");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rejection_without_body() {
        let err = check_status(503, "").unwrap_err();
        assert_eq!(err.to_string(), "HTTP 503");
        let err = check_status(502, " \n").unwrap_err();
        assert_eq!(err.to_string(), "HTTP 502");
    }

    #[test]
    fn test_malformed_body() {
        assert!(matches!(
            decode_project_fds(200, "<html>"),
            Err(SyncError::Malformed(_))
        ));
    }

    #[test]
    fn test_attempts() {
        assert_eq!(decode_attempts(200, r#"{"attempts": 4}"#).unwrap(), Some(4));
        assert_eq!(decode_attempts(200, "").unwrap(), None);
        assert!(decode_attempts(500, "boom").is_err());
    }

    #[test]
    fn test_undo_history() {
        assert_eq!(decode_undo(200, r#"["[[0]]"]"#).unwrap(), vec!["[[0]]"]);
        assert!(decode_undo(200, "[]").unwrap().is_empty());
    }
}
