//! Error handler for otpflow.

use thiserror::Error;
use validator::ValidationErrors;

pub type Result<T> = std::result::Result<T, AuthError>;

/// Enum representing every failure an authentication attempt can surface.
///
/// The [`std::fmt::Display`] rendering of a variant is the user-facing
/// message exposed through `last_error`; exactly one is shown at a time.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Challenge(#[from] ChallengeError),

    #[error(transparent)]
    Code(#[from] CodeError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Network error. Please check your connection and try again.")]
    Transport {
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl AuthError {
    /// Network failure with no useful source attached.
    pub fn transport() -> Self {
        AuthError::Transport { source: None }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::Transport {
            source: Some(Box::new(err)),
        }
    }
}

/// Failures caught before any network call is made.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Please enter the complete OTP")]
    IncompleteCode,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Invalid phone number format.")]
    MalformedPhone,

    #[error("validation error occurred")]
    Form(#[from] ValidationErrors),

    #[error("no verification is in progress")]
    NoActiveChallenge,

    #[error("attempt already started")]
    AlreadyStarted,

    #[error("resend is not available yet")]
    ResendUnavailable,
}

/// Provider refused to issue a one-time code.
#[derive(Debug, Error)]
pub enum ChallengeError {
    #[error("Invalid phone number format.")]
    InvalidNumber,

    #[error("Verification challenge failed. Please try again.")]
    AntiAbuse,

    #[error("Too many attempts. Please try again later.")]
    TooManyRequests,

    #[error("anti-abuse mount point `{0}` is not attached")]
    MissingMountPoint(String),
}

/// Provider rejected a submitted one-time code.
#[derive(Debug, Error)]
pub enum CodeError {
    #[error("Invalid verification code. Please try again.")]
    Invalid,

    #[error("Verification code has expired. Please request a new one.")]
    Expired,

    #[error("Failed to verify code. Please try again.")]
    Unknown,
}

/// Backend exchange or credential re-authentication failed.
///
/// Fatal to the attempt: the user returns to the initial form and no
/// partial session is ever persisted.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{0}")]
    Rejected(String),

    #[error("Could not restore your session. Please log in again.")]
    Reauth,

    #[error("Could not save your session. Please try again.")]
    Persist(#[from] crate::storage::StorageError),
}
