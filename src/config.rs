//! Runtime configuration.

use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TIME_LIMIT: u32 = 30;

/// Backend routes, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub reset_attempt: String,
    pub increment_attempt: String,
    pub project_fds: String,
    pub decompose_all: String,
    pub undo: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            reset_attempt: "/normalize/resetAttempt".to_string(),
            increment_attempt: "/normalize/incrementAttempt".to_string(),
            project_fds: "/normalize/project-fds".to_string(),
            decompose_all: "/normalize/decompose-all".to_string(),
            undo: "/normalization/undo".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub endpoints: Endpoints,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            endpoints: Endpoints::default(),
        }
    }
}

impl BackendConfig {
    /// `PLAQUE_BACKEND_URL` and `PLAQUE_BACKEND_TIMEOUT_SECS` override the defaults.
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("PLAQUE_BACKEND_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let timeout = std::env::var("PLAQUE_BACKEND_TIMEOUT_SECS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        Self {
            base_url,
            timeout,
            endpoints: Endpoints::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Per-table knobs and top-level FD sources sent with a full recomputation.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    pub time_limit: u32,
    pub monte_carlo: bool,
    pub samples: u32,
    /// User FDs plus their closure, preferred when present.
    pub fd_list_with_closure: Option<String>,
    /// Raw user FDs.
    pub fd_list: Option<String>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            time_limit: DEFAULT_TIME_LIMIT,
            monte_carlo: false,
            samples: 0,
            fd_list_with_closure: None,
            fd_list: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let cfg = BackendConfig::default().with_base_url("http://host:9000/");
        assert_eq!(
            cfg.url(&cfg.endpoints.project_fds),
            "http://host:9000/normalize/project-fds"
        );
        assert_eq!(cfg.url("undo"), "http://host:9000/undo");
    }

    #[test]
    fn test_default_options() {
        let opts = RequestOptions::default();
        assert_eq!(opts.time_limit, 30);
        assert!(!opts.monte_carlo);
        assert_eq!(opts.samples, 0);
    }
}
