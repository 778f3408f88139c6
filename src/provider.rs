//! Interface to the identity verification provider.
//!
//! The provider sends one-time codes to phone numbers and verifies the
//! entered code. Every reference it hands back is opaque: the attempt
//! only stores and returns them, it never looks inside.

use async_trait::async_trait;

use crate::error::{ChallengeError, CodeError, SessionError};
use crate::phone::PhoneNumber;

/// Attachment point for the provider's anti-abuse widget.
///
/// The underlying element's lifecycle belongs to the host, but its
/// existence is a hard precondition of
/// [`IdentityProvider::create_anti_abuse_token`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPoint {
    element_id: String,
}

impl MountPoint {
    pub fn new(element_id: impl Into<String>) -> Self {
        Self {
            element_id: element_id.into(),
        }
    }

    #[inline]
    pub fn element_id(&self) -> &str {
        &self.element_id
    }
}

/// Opaque reference to the provider's live anti-abuse challenge.
///
/// At most one is live per attempt. A replaced token must be passed
/// back through [`IdentityProvider::invalidate`] before a new one is
/// created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AntiAbuseToken {
    id: String,
}

impl AntiAbuseToken {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Opaque reference to an outstanding one-time-code request, used to
/// submit the entered code for verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeHandle {
    verification_id: String,
}

impl ChallengeHandle {
    pub fn new(verification_id: impl Into<String>) -> Self {
        Self {
            verification_id: verification_id.into(),
        }
    }

    #[inline]
    pub fn verification_id(&self) -> &str {
        &self.verification_id
    }
}

/// Assertion that the caller controls the verified identity.
#[derive(Clone, PartialEq, Eq)]
pub struct IdentityProof {
    subject: String,
    assertion: String,
}

impl IdentityProof {
    pub fn new(subject: impl Into<String>, assertion: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            assertion: assertion.into(),
        }
    }

    /// Provider-side subject identifier.
    #[inline]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Raw assertion, sent as bearer material to the backend.
    #[inline]
    pub fn assertion(&self) -> &str {
        &self.assertion
    }
}

impl std::fmt::Debug for IdentityProof {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityProof")
            .field("subject", &self.subject)
            .field("assertion", &"[REDACTED]")
            .finish()
    }
}

/// Email/password pair captured during the login pre-check.
///
/// Lives in memory only, between a successful pre-check and session
/// establishment; it is never written to durable storage.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    email: String,
    password: String,
}

impl Credential {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    #[inline]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[inline]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Port to the phone verification provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Solve the provider's client-side anti-abuse challenge.
    ///
    /// The mount point must already be attached.
    async fn create_anti_abuse_token(
        &self,
        mount: &MountPoint,
    ) -> Result<AntiAbuseToken, ChallengeError>;

    /// Ask the provider to send a one-time code to `phone`.
    async fn issue_challenge(
        &self,
        phone: &PhoneNumber,
        token: &AntiAbuseToken,
    ) -> Result<ChallengeHandle, ChallengeError>;

    /// Submit the entered code against an outstanding challenge.
    async fn submit_code(
        &self,
        handle: &ChallengeHandle,
        code: &str,
    ) -> Result<IdentityProof, CodeError>;

    /// Re-authenticate with a pre-checked email/password credential.
    ///
    /// Login flows exchange the resulting proof, not the phone proof:
    /// the second factor gates the credential, it does not replace it.
    async fn redeem_credential(
        &self,
        credential: &Credential,
    ) -> Result<IdentityProof, SessionError>;

    /// Retire an anti-abuse token. Best effort.
    async fn invalidate(&self, token: AntiAbuseToken);
}
