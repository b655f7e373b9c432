use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({platform}): {message}")]
    Api {
        platform: String,
        message: String,
        status_code: Option<u16>,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("AI error: {0}")]
    Ai(String),

    #[error("AI provider blocked the response: {0}")]
    Blocked(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template error: {0}")]
    Template(String),

    #[error("No registered action named '{0}'")]
    UnknownAction(String),
}

impl Error {
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    pub fn api(platform: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            platform: platform.into(),
            message: message.into(),
            status_code: None,
        }
    }

    pub fn api_with_status(
        platform: impl Into<String>,
        message: impl Into<String>,
        status_code: u16,
    ) -> Self {
        Self::Api {
            platform: platform.into(),
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn ai(msg: impl Into<String>) -> Self {
        Self::Ai(msg.into())
    }

    /// Status code of a backend rejection, if this error carries one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status_code, .. } => *status_code,
            _ => None,
        }
    }

    /// Short text suitable for an apology message shown to the user.
    pub fn user_summary(&self) -> String {
        match self {
            Self::Api {
                status_code: Some(code),
                ..
            } => format!("API request failed: {code}"),
            Self::Http(msg) => format!("Connection error: {msg}"),
            other => other.to_string(),
        }
    }
}

impl From<askama::Error> for Error {
    fn from(e: askama::Error) -> Self {
        Self::Template(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_status_summary_mentions_code() {
        let err = Error::api_with_status("localhost:3001", "nope", 404);
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(err.user_summary(), "API request failed: 404");
    }

    #[test]
    fn http_summary_is_connection_error() {
        let err = Error::http("refused");
        assert_eq!(err.status_code(), None);
        assert!(err.user_summary().starts_with("Connection error"));
    }
}
