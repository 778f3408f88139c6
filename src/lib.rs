//! otpflow drives phone-verified logins and signups end to end.

#![forbid(unsafe_code)]

pub mod attempt;
pub mod backend;
pub mod code;
pub mod config;
pub mod countdown;
pub mod error;
pub mod forms;
pub mod phone;
pub mod provider;
pub mod storage;
pub mod telemetry;

use std::sync::Arc;

use attempt::AuthAttempt;
use backend::SessionBackend;
use config::Configuration;
use error::{Result, SessionError};
use forms::{LoginForm, SignupForm};
use provider::IdentityProvider;
use storage::SessionStore;

/// Shared collaborators behind every authentication attempt.
///
/// The coordinator is cheap to clone and hand out; each call to
/// [`Coordinator::begin_login`] or [`Coordinator::begin_signup`] mints
/// an independent [`AuthAttempt`] over the same provider, backend and
/// storage.
#[derive(Clone)]
pub struct Coordinator {
    config: Arc<Configuration>,
    provider: Arc<dyn IdentityProvider>,
    backend: Arc<dyn SessionBackend>,
    storage: Arc<dyn SessionStore>,
}

impl Coordinator {
    pub fn new(
        config: Arc<Configuration>,
        provider: Arc<dyn IdentityProvider>,
        backend: Arc<dyn SessionBackend>,
        storage: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            config,
            provider,
            backend,
            storage,
        }
    }

    /// Mint a login attempt from a submitted form.
    ///
    /// # Errors
    /// Returns the form's [`error::ValidationError`] before any attempt
    /// exists.
    pub fn begin_login(&self, form: LoginForm) -> Result<AuthAttempt> {
        AuthAttempt::login(
            self.config.clone(),
            self.provider.clone(),
            self.backend.clone(),
            self.storage.clone(),
            form,
        )
    }

    /// Mint a signup attempt from a submitted form.
    ///
    /// # Errors
    /// Returns the form's [`error::ValidationError`] before any attempt
    /// exists.
    pub fn begin_signup(&self, form: SignupForm) -> Result<AuthAttempt> {
        AuthAttempt::signup(
            self.config.clone(),
            self.provider.clone(),
            self.backend.clone(),
            self.storage.clone(),
            form,
        )
    }

    /// Wipe every persisted session artifact.
    pub fn logout(&self) -> Result<()> {
        self.storage.clear().map_err(SessionError::from)?;
        tracing::info!("session artifacts cleared");
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::storage::{MemoryStore, TOKEN_KEY};
    use crate::testing::{StubBackend, StubProvider};

    fn coordinator(storage: Arc<MemoryStore>) -> Coordinator {
        Coordinator::new(
            Arc::new(Configuration::default()),
            Arc::new(StubProvider::default()),
            Arc::new(StubBackend::default()),
            storage,
        )
    }

    #[test]
    fn test_begin_login_rejects_invalid_form() {
        let coordinator = coordinator(Arc::new(MemoryStore::new()));
        let form = LoginForm {
            email: "not-an-email".to_owned(),
            password: "secret".to_owned(),
        };

        assert!(coordinator.begin_login(form).is_err());
    }

    #[test]
    fn test_logout_clears_the_store() {
        let storage = Arc::new(MemoryStore::new());
        storage.put(TOKEN_KEY, "session-token").unwrap();

        let coordinator = coordinator(storage.clone());
        coordinator.logout().unwrap();

        assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
    }
}
