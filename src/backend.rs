//! Backend session API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, Result, SessionError};
use crate::provider::IdentityProof;

/// Pre-check result for a login attempt.
///
/// Establishes nothing by itself: it reveals the phone number to
/// challenge and a profile snapshot cached for later persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct Precheck {
    pub phone_number: String,
    pub user_id: String,
    pub profile: Option<serde_json::Value>,
}

/// Established application session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Opaque session token minted by the backend.
    pub token: String,
    pub user_id: String,
    pub issued_at: DateTime<Utc>,
}

/// Registration payload sent once the phone number is verified.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(rename = "userType")]
    pub user_types: Vec<String>,
    pub phone_verified: bool,
}

/// Port to the backend session API.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Validate an email/password pair before phone verification.
    ///
    /// Never establishes a session.
    async fn check_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Precheck>;

    /// Exchange an identity proof and the accepted code for a session.
    async fn verify_code(
        &self,
        proof: &IdentityProof,
        code: &str,
    ) -> Result<Session>;

    /// Register a new user whose phone number has been verified.
    ///
    /// Returns the backend user identifier.
    async fn register(
        &self,
        registration: &Registration,
        proof: &IdentityProof,
    ) -> Result<String>;
}

/// [`SessionBackend`] speaking the session API's REST dialect.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct CredentialsBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrecheckReply {
    success: bool,
    phone_number: Option<String>,
    user_id: Option<String>,
    #[serde(default)]
    user_profile: Option<serde_json::Value>,
    error: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyBody<'a> {
    id_token: &'a str,
    code: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyReply {
    success: bool,
    custom_token: Option<String>,
    user_id: Option<String>,
    error: Option<String>,
}

#[derive(Serialize)]
struct RegisterBody<'a> {
    uid: &'a str,
    #[serde(flatten)]
    registration: &'a Registration,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterReply {
    success: bool,
    user_id: Option<String>,
    error: Option<String>,
}

/// Non-success reply mapped into the taxonomy, preferring the
/// backend-provided reason.
fn rejection(error: Option<String>, fallback: &str) -> AuthError {
    AuthError::Session(SessionError::Rejected(
        error.unwrap_or_else(|| fallback.to_owned()),
    ))
}

#[async_trait]
impl SessionBackend for HttpBackend {
    async fn check_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Precheck> {
        let reply: PrecheckReply = self
            .client
            .post(format!("{}/api/check-credentials", self.base_url))
            .json(&CredentialsBody { email, password })
            .send()
            .await?
            .json()
            .await?;

        if !reply.success {
            return Err(rejection(reply.error, "Invalid credentials"));
        }

        match (reply.phone_number, reply.user_id) {
            (Some(phone_number), Some(user_id)) => Ok(Precheck {
                phone_number,
                user_id,
                profile: reply.user_profile,
            }),
            _ => Err(rejection(None, "Malformed pre-check reply")),
        }
    }

    async fn verify_code(
        &self,
        proof: &IdentityProof,
        code: &str,
    ) -> Result<Session> {
        let reply: VerifyReply = self
            .client
            .post(format!("{}/api/verify-code", self.base_url))
            .json(&VerifyBody {
                id_token: proof.assertion(),
                code,
            })
            .send()
            .await?
            .json()
            .await?;

        if !reply.success {
            return Err(rejection(reply.error, "Invalid token"));
        }

        match (reply.custom_token, reply.user_id) {
            (Some(token), Some(user_id)) => Ok(Session {
                token,
                user_id,
                issued_at: Utc::now(),
            }),
            _ => Err(rejection(None, "Malformed verification reply")),
        }
    }

    async fn register(
        &self,
        registration: &Registration,
        proof: &IdentityProof,
    ) -> Result<String> {
        let reply: RegisterReply = self
            .client
            .post(format!("{}/api/register", self.base_url))
            .bearer_auth(proof.assertion())
            .json(&RegisterBody {
                uid: proof.subject(),
                registration,
            })
            .send()
            .await?
            .json()
            .await?;

        if !reply.success {
            return Err(rejection(reply.error, "Registration failed"));
        }

        reply
            .user_id
            .ok_or_else(|| rejection(None, "Malformed registration reply"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_body_wire_shape() {
        let registration = Registration {
            email: "ada@example.com".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            phone_number: "+15551234567".into(),
            address: None,
            user_types: vec!["student".into()],
            phone_verified: true,
        };
        let body = RegisterBody {
            uid: "uid-1",
            registration: &registration,
        };

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["uid"], "uid-1");
        assert_eq!(value["firstName"], "Ada");
        assert_eq!(value["lastName"], "Lovelace");
        assert_eq!(value["phoneNumber"], "+15551234567");
        assert_eq!(value["userType"][0], "student");
        assert_eq!(value["phoneVerified"], true);
        assert!(value.get("address").is_none());
    }

    #[test]
    fn test_verify_body_uses_id_token_field() {
        let value = serde_json::to_value(VerifyBody {
            id_token: "assertion",
            code: "123456",
        })
        .unwrap();

        assert_eq!(value["idToken"], "assertion");
        assert_eq!(value["code"], "123456");
    }

    #[test]
    fn test_replies_parse_camel_case() {
        let reply: PrecheckReply = serde_json::from_str(
            r#"{"success":true,"phoneNumber":"+15551234567","email":"a@b.c","userId":"u1"}"#,
        )
        .unwrap();
        assert!(reply.success);
        assert_eq!(reply.phone_number.as_deref(), Some("+15551234567"));
        assert_eq!(reply.user_id.as_deref(), Some("u1"));
        assert_eq!(reply.user_profile, None);

        let reply: VerifyReply = serde_json::from_str(
            r#"{"success":true,"customToken":"t1","userId":"u1"}"#,
        )
        .unwrap();
        assert_eq!(reply.custom_token.as_deref(), Some("t1"));

        let reply: RegisterReply = serde_json::from_str(
            r#"{"success":false,"error":"Missing required fields: email"}"#,
        )
        .unwrap();
        assert!(!reply.success);
        assert_eq!(
            reply.error.as_deref(),
            Some("Missing required fields: email")
        );
    }
}
