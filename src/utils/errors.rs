use thiserror::Error;

/// Main error type for the dojo client
#[derive(Error, Debug)]
pub enum DojoError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("You are not logged in.")]
    NotLoggedIn,

    #[error("Session expired, please login again.")]
    SessionExpired,

    #[error("Request is not authorized, please login or run this in the dojo.")]
    Unauthorized,

    #[error("No active challenge session; {0}")]
    NoActiveChallenge(String),

    #[error("Challenge does not exist.")]
    ChallengeNotFound,

    #[error("Invalid challenge ID: {0}")]
    InvalidChallengeId(String),

    #[error("Please run this locally instead of on the dojo.")]
    RunLocally,

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to extract nonce.")]
    Csrf,

    #[error("SSH error: {0}")]
    Ssh(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Could not decode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Unsupported(String),
}

impl DojoError {
    /// Shorthand for the common "start a challenge first" case
    pub fn no_challenge() -> Self {
        Self::NoActiveChallenge("start a challenge!".to_string())
    }
}
