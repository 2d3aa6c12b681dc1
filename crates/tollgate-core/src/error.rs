/// Errors that can occur during a tollgate run.
///
/// Library crates return this type; only the binary decides how a failure
/// turns into a process exit code.
///
/// # Examples
///
/// ```
/// use tollgate_core::TollgateError;
///
/// let err = TollgateError::Config("missing GITHUB_TOKEN".into());
/// assert!(err.to_string().contains("GITHUB_TOKEN"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum TollgateError {
    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    #[diagnostic(
        code(tollgate::config),
        help("tollgate reads its settings from the CI environment; check the job's env vars")
    )]
    Config(String),

    /// The host API rejected the request with a 4xx status. Never retried.
    #[error("GitHub API returned client error {status} for {method} {url}: {body}")]
    #[diagnostic(code(tollgate::github::client_error))]
    Client {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    /// Every attempt hit a 5xx status or a transport failure.
    #[error("GitHub request {method} {url} failed after {attempts} attempts")]
    #[diagnostic(code(tollgate::github::retries_exhausted))]
    RetriesExhausted {
        method: String,
        url: String,
        attempts: u32,
    },

    /// A status that is neither expected, a client error nor a server error.
    #[error("GitHub API returned unexpected status {status} for {method} {url}")]
    #[diagnostic(code(tollgate::github::unexpected_status))]
    UnexpectedStatus {
        method: String,
        url: String,
        status: u16,
    },

    /// GitHub client construction or response decoding failure.
    #[error("GitHub error: {0}")]
    #[diagnostic(code(tollgate::github))]
    GitHub(String),

    /// LLM API or response error.
    #[error("LLM error: {0}")]
    #[diagnostic(code(tollgate::llm))]
    Llm(String),

    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    #[diagnostic(code(tollgate::io))]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    #[diagnostic(code(tollgate::serialization))]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    #[diagnostic(code(tollgate::toml))]
    Toml(#[from] toml::de::Error),
}

impl TollgateError {
    /// HTTP status carried by the error, if it came from a host response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Client { status, .. } | Self::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_displays_message() {
        let err = TollgateError::Config("bad value".into());
        assert_eq!(err.to_string(), "configuration error: bad value");
    }

    #[test]
    fn client_error_names_status_and_url() {
        let err = TollgateError::Client {
            method: "GET".into(),
            url: "https://api.github.com/repos/o/r/pulls/1".into(),
            status: 404,
            body: "Not Found".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("404"));
        assert!(msg.contains("/repos/o/r/pulls/1"));
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn retries_exhausted_has_no_status() {
        let err = TollgateError::RetriesExhausted {
            method: "PATCH".into(),
            url: "u".into(),
            attempts: 3,
        };
        assert!(err.to_string().contains("3 attempts"));
        assert_eq!(err.status(), None);
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: TollgateError = io_err.into();
        assert!(err.to_string().contains("gone"));
    }
}
